use crate::models::SlotKind;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Default Gemini REST base URL
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default image-capable Gemini model
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image-preview";

/// Suggested file name offered when saving a generated picture
pub const DEFAULT_DOWNLOAD_FILE_NAME: &str = "billions-network-pfp.png";

/// Default instruction sent alongside the two images
pub const DEFAULT_PROMPT: &str = "Take the person from the first image and make them wear the \
glasses or mask shown in the second image. Keep the face, expression, lighting and background of \
the first image unchanged, fit the overlay naturally to the head pose, and return a single square \
profile picture.";

/// Extensions offered by the file picker for a bare `image/*` filter
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif", "bmp"];

/// Application configuration from `pfpgen.yaml`
///
/// Every section falls back to its defaults, so an empty or missing file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,

    /// Per-slot picker settings keyed by slot name (`face`, `overlay`), in display order
    pub slots: IndexMap<String, SlotSettings>,

    pub download: DownloadSettings,

    pub logging: LoggingSettings,
}

/// Remote generation service settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    pub api_base: String,
    pub model: String,
    pub api_key: String,
    pub prompt: String,

    /// HTTP timeout for the generation call; `None` waits for the service
    pub request_timeout_secs: Option<u64>,
}

/// File picker settings for one upload slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlotSettings {
    pub label: String,

    /// Accept filter in `<input accept>` syntax: MIME types, `image/*` or `.ext`, comma separated
    pub accept: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadSettings {
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub directory: String,
    pub debug: bool,
    pub console: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        let mut slots = IndexMap::new();
        for kind in SlotKind::ALL {
            slots.insert(kind.as_str().to_string(), SlotSettings::default_for(kind));
        }

        Self {
            service: ServiceSettings::default(),
            slots,
            download: DownloadSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl AppConfig {
    /// Settings for a slot, falling back to the built-in defaults when the slot is not configured
    pub fn slot(&self, kind: SlotKind) -> SlotSettings {
        self.slots
            .get(kind.as_str())
            .cloned()
            .unwrap_or_else(|| SlotSettings::default_for(kind))
    }

    /// Whether an API key has been resolved
    pub fn has_api_key(&self) -> bool {
        !self.service.api_key.trim().is_empty()
    }
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: String::new(),
            prompt: DEFAULT_PROMPT.to_string(),
            request_timeout_secs: None,
        }
    }
}

impl SlotSettings {
    /// Built-in defaults: any image for the face, PNG only for the overlay
    pub fn default_for(kind: SlotKind) -> Self {
        match kind {
            SlotKind::Face => Self {
                label: "Upload Face Photo".to_string(),
                accept: "image/*".to_string(),
            },
            SlotKind::Overlay => Self {
                label: "Upload Glasses/Mask (PNG)".to_string(),
                accept: "image/png".to_string(),
            },
        }
    }

    /// Translate the accept filter into file picker extensions
    ///
    /// Unknown MIME types are ignored; an empty result means "no filter".
    pub fn picker_extensions(&self) -> Vec<String> {
        let mut extensions: Vec<String> = Vec::new();

        for token in self.accept.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            let token = token.to_ascii_lowercase();

            let found: Vec<String> = if let Some(ext) = token.strip_prefix('.') {
                vec![ext.to_string()]
            } else if token == "image/*" {
                IMAGE_EXTENSIONS.iter().map(|e| e.to_string()).collect()
            } else if let Some(format) = image::ImageFormat::from_mime_type(&token) {
                format.extensions_str().iter().map(|e| e.to_string()).collect()
            } else {
                tracing::debug!("Ignoring unsupported accept filter token: {}", token);
                Vec::new()
            };

            for ext in found {
                if !extensions.contains(&ext) {
                    extensions.push(ext);
                }
            }
        }

        extensions
    }
}

impl Default for SlotSettings {
    fn default() -> Self {
        Self {
            label: String::new(),
            accept: "image/*".to_string(),
        }
    }
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            file_name: DEFAULT_DOWNLOAD_FILE_NAME.to_string(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            directory: "logs".to_string(),
            debug: false,
            console: true,
        }
    }
}

// GUI Controller - wires the Slint window to the session
//
// Slint callbacks call into the SessionController (generation runs on tokio
// through the EventLoopBridge). Session events come back on a listener thread,
// which captures a view of the session and re-renders the window on the event
// loop thread.

use crate::models::{AppConfig, SelectedFile, SessionSnapshot, SlotKind, SlotSettings, StatusKind};
use crate::services::ImageGenerator;
use crate::session::{
    DownloadArtifact, Resource, ResourceContent, ResourceId, SessionController,
};
use crate::ui::bridge::EventLoopBridge;
use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use std::path::PathBuf;
use std::sync::{Arc, Weak};
use tokio::sync::broadcast;

// Include the generated Slint code
slint::include_modules!();

/// GUI Controller that wires the Slint window to a [`SessionController`]
///
/// # Example
/// ```ignore
/// let session = Arc::new(SessionController::new());
/// let generator: Arc<dyn ImageGenerator> = Arc::new(GeminiClient::new(&config.service)?);
/// let runtime = tokio::runtime::Runtime::new()?;
///
/// let controller = GuiController::new(session, generator, &config, runtime.handle().clone())?;
/// controller.run()?;  // Blocks until window is closed
/// ```
pub struct GuiController {
    ui: MainWindow,
    _bridge: EventLoopBridge<MainWindow>,
    session: Arc<SessionController>,
}

impl GuiController {
    pub fn new(
        session: Arc<SessionController>,
        generator: Arc<dyn ImageGenerator>,
        config: &AppConfig,
        tokio_handle: tokio::runtime::Handle,
    ) -> Result<Self> {
        let ui = MainWindow::new().context("Failed to create Slint UI")?;
        let bridge = EventLoopBridge::new(&ui, tokio_handle);

        ui.set_face_label(config.slot(SlotKind::Face).label.into());
        ui.set_overlay_label(config.slot(SlotKind::Overlay).label.into());
        Self::render(&ui, ViewModel::capture(&session));

        Self::setup_callbacks(&ui, &bridge, &session, &generator, config);
        Self::setup_session_subscription(&bridge, &session);

        tracing::info!("GUI controller initialized");

        Ok(Self {
            ui,
            _bridge: bridge,
            session,
        })
    }

    /// Run the GUI (blocks until window is closed)
    pub fn run(self) -> Result<(), slint::PlatformError> {
        tracing::info!("Starting GUI event loop");
        let result = self.ui.run();
        tracing::debug!("Event loop exited in state {}", self.session.status());
        result
    }

    // ===== Callbacks =====

    fn setup_callbacks(
        ui: &MainWindow,
        bridge: &EventLoopBridge<MainWindow>,
        session: &Arc<SessionController>,
        generator: &Arc<dyn ImageGenerator>,
        config: &AppConfig,
    ) {
        let face_session = Arc::clone(session);
        let face_settings = config.slot(SlotKind::Face);
        ui.on_pick_face(move || {
            Self::pick_into_slot(&face_session, SlotKind::Face, &face_settings);
        });

        let overlay_session = Arc::clone(session);
        let overlay_settings = config.slot(SlotKind::Overlay);
        ui.on_pick_overlay(move || {
            Self::pick_into_slot(&overlay_session, SlotKind::Overlay, &overlay_settings);
        });

        let bridge_handle = bridge.clone();
        let generate_session = Arc::clone(session);
        let generator = Arc::clone(generator);
        ui.on_generate(move || {
            tracing::info!("Generate button clicked");

            let session = Arc::clone(&generate_session);
            let generator = Arc::clone(&generator);
            bridge_handle.spawn_async(move || async move {
                let outcome = session.generate(generator.as_ref()).await;
                tracing::debug!("Generate finished: {:?}", outcome);
            });
        });

        let reset_session = Arc::clone(session);
        ui.on_reset(move || {
            tracing::info!("Reset button clicked");
            reset_session.reset();
        });

        let download_session = Arc::clone(session);
        let ui_weak = ui.as_weak();
        ui.on_download(move || {
            let Some(artifact) = download_session.download() else {
                tracing::warn!("Download requested without a generated image");
                return;
            };

            match Self::save_artifact(&artifact) {
                Ok(Some(path)) => tracing::info!("Saved profile picture to {}", path.display()),
                Ok(None) => tracing::debug!("Save dialog cancelled"),
                Err(e) => {
                    tracing::error!("Download failed: {:#}", e);
                    if let Some(ui) = ui_weak.upgrade() {
                        ui.set_error_message(format!("{:#}", e).into());
                        ui.set_has_error(true);
                    }
                }
            }
        });

        let ui_weak = ui.as_weak();
        ui.on_dismiss_error(move || {
            if let Some(ui) = ui_weak.upgrade() {
                ui.set_has_error(false);
            }
        });
    }

    fn pick_into_slot(session: &SessionController, kind: SlotKind, settings: &SlotSettings) {
        tracing::info!("Choose {} image clicked", kind);

        if let Some(path) = Self::show_file_picker(&settings.label, &settings.picker_extensions()) {
            session.set_file(kind, SelectedFile::from_path(path));
        }
    }

    /// Show a native file picker dialog
    ///
    /// Returns the selected file path, or None if cancelled
    fn show_file_picker(title: &str, extensions: &[String]) -> Option<Utf8PathBuf> {
        let mut dialog = rfd::FileDialog::new().set_title(title);

        if !extensions.is_empty() {
            dialog = dialog.add_filter("Images", extensions);
        }

        dialog.pick_file().and_then(|path| {
            Utf8PathBuf::try_from(path)
                .map_err(|e| {
                    tracing::error!("Failed to convert path to UTF-8: {}", e);
                    e
                })
                .ok()
        })
    }

    /// Ask where to save the generated picture and write it there
    fn save_artifact(artifact: &DownloadArtifact) -> Result<Option<PathBuf>> {
        let extensions = image::ImageFormat::from_mime_type(&artifact.media_type)
            .map(|format| format.extensions_str())
            .unwrap_or(&["png"]);

        let Some(path) = rfd::FileDialog::new()
            .set_title("Save profile picture")
            .set_file_name(&artifact.file_name)
            .add_filter("Image", extensions)
            .save_file()
        else {
            return Ok(None);
        };

        artifact
            .write_to(&path)
            .with_context(|| format!("Failed to save {}", path.display()))?;
        Ok(Some(path))
    }

    // ===== Rendering =====

    /// Re-render the window whenever the session changes
    ///
    /// The listener holds a weak reference so it ends once the session is dropped.
    fn setup_session_subscription(
        bridge: &EventLoopBridge<MainWindow>,
        session: &Arc<SessionController>,
    ) {
        let bridge_handle = bridge.clone();
        let session_weak: Weak<SessionController> = Arc::downgrade(session);
        let mut rx = session.subscribe();

        let spawned = std::thread::Builder::new()
            .name("pfpgen-session-events".to_string())
            .spawn(move || {
                tracing::debug!("Session subscription thread started");

                loop {
                    match rx.blocking_recv() {
                        Ok(event) => tracing::trace!("Session event received: {:?}", event),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!("UI fell behind by {} session events", skipped);
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }

                    // One render covers every event already queued
                    while rx.try_recv().is_ok() {}

                    let Some(session) = session_weak.upgrade() else {
                        break;
                    };
                    let view = ViewModel::capture(&session);
                    drop(session);

                    bridge_handle.update_ui(move |ui| Self::render(ui, view));
                }

                tracing::debug!("Session subscription thread terminated");
            });

        if let Err(e) = spawned {
            tracing::error!("Failed to start session subscription thread: {}", e);
        }
    }

    fn render(ui: &MainWindow, view: ViewModel) {
        let snapshot = &view.snapshot;

        ui.set_face_preview(Self::load_image(view.face.as_ref()));
        ui.set_has_face_preview(snapshot.face_file.is_some());
        ui.set_face_file_name(snapshot.face_file.clone().unwrap_or_default().into());

        ui.set_overlay_preview(Self::load_image(view.overlay.as_ref()));
        ui.set_has_overlay_preview(snapshot.overlay_file.is_some());
        ui.set_overlay_file_name(snapshot.overlay_file.clone().unwrap_or_default().into());

        ui.set_result_image(Self::load_image(view.result.as_ref()));
        ui.set_has_result(snapshot.result_image.is_some());

        ui.set_is_generating(snapshot.is_generating());
        ui.set_can_generate(snapshot.can_generate());
        ui.set_can_reset(snapshot.can_reset());

        let error_message = snapshot
            .error
            .as_ref()
            .map(|error| error.message.clone())
            .unwrap_or_default();
        ui.set_has_error(snapshot.error.is_some());
        ui.set_error_message(error_message.into());

        ui.set_status_text(status_text(snapshot).into());
    }

    /// Turn a registered resource into a Slint image; missing or undecodable
    /// content renders as an empty image
    fn load_image(resource: Option<&Resource>) -> slint::Image {
        let Some(resource) = resource else {
            return slint::Image::default();
        };

        match &resource.content {
            ResourceContent::File(path) => slint::Image::load_from_path(path.as_std_path())
                .unwrap_or_else(|_| {
                    tracing::warn!("Could not load preview from {}", path);
                    slint::Image::default()
                }),
            ResourceContent::Bytes(bytes) => match image::load_from_memory(bytes) {
                Ok(decoded) => {
                    let rgba = decoded.into_rgba8();
                    let buffer = slint::SharedPixelBuffer::<slint::Rgba8Pixel>::clone_from_slice(
                        rgba.as_raw(),
                        rgba.width(),
                        rgba.height(),
                    );
                    slint::Image::from_rgba8(buffer)
                }
                Err(e) => {
                    tracing::warn!("Could not decode {} image: {}", resource.media_type, e);
                    slint::Image::default()
                }
            },
        }
    }
}

/// Session state gathered off the UI thread for one render
///
/// Resources are resolved here because `slint::Image` cannot cross threads.
#[derive(Debug, Clone)]
struct ViewModel {
    snapshot: SessionSnapshot,
    face: Option<Resource>,
    overlay: Option<Resource>,
    result: Option<Resource>,
}

impl ViewModel {
    fn capture(session: &SessionController) -> Self {
        let snapshot = session.snapshot();
        let resolve = |id: Option<ResourceId>| id.and_then(|id| session.resources().resolve(id));

        Self {
            face: resolve(snapshot.face_preview),
            overlay: resolve(snapshot.overlay_preview),
            result: resolve(snapshot.result_image),
            snapshot,
        }
    }
}

/// One-line status shown under the main controls
fn status_text(snapshot: &SessionSnapshot) -> &'static str {
    match snapshot.status {
        StatusKind::Idle if snapshot.face_file.is_some() || snapshot.overlay_file.is_some() => {
            "Add the second image to continue."
        }
        StatusKind::Idle => "Upload a face photo and a glasses/mask image to get started.",
        StatusKind::Ready => "Ready to generate.",
        StatusKind::InFlight => "Generating your PFP...",
        StatusKind::Succeeded => "Your PFP is ready to download.",
        StatusKind::Failed => "Generation failed. Adjust the images and try again.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GeneratedImage;
    use crate::services::MockImageGenerator;

    fn face() -> SelectedFile {
        SelectedFile::from_bytes("face.jpg", "image/jpeg", vec![0xFF, 0xD8, 0xFF])
    }

    fn overlay() -> SelectedFile {
        SelectedFile::from_bytes("glasses.png", "image/png", vec![0x89, b'P', b'N', b'G'])
    }

    #[test]
    fn test_status_text_follows_session() {
        let session = SessionController::new();
        assert_eq!(
            status_text(&session.snapshot()),
            "Upload a face photo and a glasses/mask image to get started."
        );

        session.set_file(SlotKind::Face, face());
        assert_eq!(
            status_text(&session.snapshot()),
            "Add the second image to continue."
        );

        session.set_file(SlotKind::Overlay, overlay());
        assert_eq!(status_text(&session.snapshot()), "Ready to generate.");
    }

    #[test]
    fn test_view_model_resolves_live_resources() {
        let session = SessionController::new();
        session.set_file(SlotKind::Face, face());

        let view = ViewModel::capture(&session);

        assert_eq!(view.face.unwrap().media_type, "image/jpeg");
        assert!(view.overlay.is_none());
        assert!(view.result.is_none());
    }

    #[tokio::test]
    async fn test_view_model_includes_result() {
        let session = SessionController::new();
        session.set_file(SlotKind::Face, face());
        session.set_file(SlotKind::Overlay, overlay());

        let mut generator = MockImageGenerator::new();
        generator.expect_generate().returning(|_, _| {
            Ok(GeneratedImage {
                bytes: vec![1, 2, 3],
                media_type: "image/png".to_string(),
            })
        });
        session.generate(&generator).await;

        let view = ViewModel::capture(&session);
        let result = view.result.unwrap();
        assert_eq!(
            result.content,
            ResourceContent::Bytes(Arc::from(vec![1u8, 2, 3]))
        );
        assert_eq!(status_text(&view.snapshot), "Your PFP is ready to download.");
    }
}

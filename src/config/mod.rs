use crate::models::AppConfig;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::HashMap;
use std::fs;

/// Default configuration directory, relative to the working directory
pub const DEFAULT_CONFIG_DIR: &str = "PFP Generator Data";

/// Configuration file name inside the configuration directory
pub const CONFIG_FILE_NAME: &str = "pfpgen.yaml";

/// Prefix for environment overrides, e.g. `PFPGEN_SERVICE__MODEL`
pub const ENV_PREFIX: &str = "PFPGEN";

/// Variables consulted, in order, when no API key was configured
pub const API_KEY_FALLBACK_VARS: &[&str] = &["GEMINI_API_KEY", "GOOGLE_API_KEY"];

/// Configuration manager for loading and saving `pfpgen.yaml`.
///
/// Values are layered: built-in defaults, then the YAML file (if present), then
/// `PFPGEN_*` environment variables.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    config_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager with the specified configuration directory.
    ///
    /// The directory is created if it doesn't exist.
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {}", config_dir))?;
        }

        Ok(Self {
            config_path: config_dir.join(CONFIG_FILE_NAME),
            config_dir,
        })
    }

    /// Load the configuration using the process environment.
    pub fn load(&self) -> Result<AppConfig> {
        self.load_with_environment(None)
    }

    /// Load the configuration with an explicit environment.
    ///
    /// `None` reads the process environment; `Some(map)` uses only the given
    /// variables, for both the `PFPGEN_` overrides and the API key fallbacks.
    pub fn load_with_environment(&self, env: Option<HashMap<String, String>>) -> Result<AppConfig> {
        if self.config_path.exists() {
            tracing::info!("Loading config from {}", self.config_path);
        } else {
            tracing::warn!(
                "Config file not found at {}, using defaults",
                self.config_path
            );
        }

        let defaults = ::config::Config::try_from(&AppConfig::default())
            .context("Failed to build default configuration")?;

        let settings = ::config::Config::builder()
            .add_source(defaults)
            .add_source(
                ::config::File::from(self.config_path.as_std_path())
                    .format(::config::FileFormat::Yaml)
                    .required(false),
            )
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(env.clone()),
            )
            .build()
            .with_context(|| format!("Failed to read config: {}", self.config_path))?;

        let mut config: AppConfig = settings
            .try_deserialize()
            .with_context(|| format!("Failed to parse config: {}", self.config_path))?;

        if !config.has_api_key() {
            if let Some((var, key)) = fallback_api_key(env.as_ref()) {
                tracing::info!("Using API key from {}", var);
                config.service.api_key = key;
            } else {
                tracing::warn!(
                    "No API key configured; set service.api_key, {}_SERVICE__API_KEY or {}",
                    ENV_PREFIX,
                    API_KEY_FALLBACK_VARS.join(" / ")
                );
            }
        }

        tracing::info!(
            "Loaded config: model={}, api_base={}",
            config.service.model,
            config.service.api_base
        );
        Ok(config)
    }

    /// Save the configuration file.
    pub fn save(&self, config: &AppConfig) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(config).context("Failed to serialize config to YAML")?;

        fs::write(&self.config_path, yaml_string)
            .with_context(|| format!("Failed to write config: {}", self.config_path))?;

        tracing::info!("Saved config to {}", self.config_path);
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }

    pub fn config_path(&self) -> &Utf8Path {
        &self.config_path
    }
}

fn fallback_api_key(env: Option<&HashMap<String, String>>) -> Option<(&'static str, String)> {
    API_KEY_FALLBACK_VARS.iter().find_map(|var| {
        let value = match env {
            Some(map) => map.get(*var).cloned(),
            None => std::env::var(var).ok(),
        };
        value
            .filter(|key| !key.trim().is_empty())
            .map(|key| (*var, key))
    })
}

//! Integration tests for ConfigManager
//!
//! These tests verify that the configuration:
//! - Falls back to built-in defaults for a fresh directory
//! - Reads a hand-written `pfpgen.yaml`, including partial files
//! - Lets `PFPGEN_*` variables override the file
//! - Feeds the session and the generation client

use camino::Utf8PathBuf;
use pfpgen::config::{CONFIG_FILE_NAME, ConfigManager};
use pfpgen::models::config::{DEFAULT_API_BASE, DEFAULT_MODEL};
use pfpgen::{GeminiClient, SessionController, SlotKind};
use std::collections::HashMap;
use tempfile::TempDir;

fn manager_in_temp_dir() -> (ConfigManager, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let dir = Utf8PathBuf::try_from(temp_dir.path().join("PFP Generator Data")).unwrap();
    let manager = ConfigManager::new(&dir).unwrap();
    (manager, temp_dir)
}

fn no_env() -> Option<HashMap<String, String>> {
    Some(HashMap::new())
}

#[test]
fn test_fresh_directory_is_created_with_defaults() {
    let (manager, _temp_dir) = manager_in_temp_dir();

    assert!(manager.config_dir().exists());
    assert!(!manager.config_path().exists());

    let config = manager.load_with_environment(no_env()).unwrap();
    assert_eq!(config.service.api_base, DEFAULT_API_BASE);
    assert_eq!(config.service.model, DEFAULT_MODEL);
    assert_eq!(config.download.file_name, "billions-network-pfp.png");
    assert_eq!(config.slot(SlotKind::Face).label, "Upload Face Photo");
    assert_eq!(config.slot(SlotKind::Overlay).label, "Upload Glasses/Mask (PNG)");
}

#[test]
fn test_hand_written_file() {
    let (manager, _temp_dir) = manager_in_temp_dir();
    let yaml = r#"
service:
  model: gemini-custom-image
  api_key: from-file
  request_timeout_secs: 90
slots:
  overlay:
    label: Upload Mask
    accept: "image/png, .webp"
download:
  file_name: my-pfp.png
logging:
  debug: true
"#;
    std::fs::write(manager.config_dir().join(CONFIG_FILE_NAME), yaml).unwrap();

    let config = manager.load_with_environment(no_env()).unwrap();

    assert_eq!(config.service.model, "gemini-custom-image");
    assert_eq!(config.service.api_key, "from-file");
    assert_eq!(config.service.request_timeout_secs, Some(90));
    assert_eq!(config.slot(SlotKind::Overlay).label, "Upload Mask");
    assert_eq!(
        config.slot(SlotKind::Overlay).picker_extensions(),
        vec!["png".to_string(), "webp".to_string()]
    );
    // The face slot keeps its default
    assert_eq!(config.slot(SlotKind::Face).accept, "image/*");
    assert_eq!(config.download.file_name, "my-pfp.png");
    assert!(config.logging.debug);
    assert_eq!(config.logging.directory, "logs");
}

#[test]
fn test_invalid_yaml_is_an_error() {
    let (manager, _temp_dir) = manager_in_temp_dir();
    std::fs::write(manager.config_path(), "service: [unclosed").unwrap();

    assert!(manager.load_with_environment(no_env()).is_err());
}

#[test]
fn test_environment_overrides() {
    let (manager, _temp_dir) = manager_in_temp_dir();
    std::fs::write(manager.config_path(), "service:\n  api_key: from-file\n").unwrap();

    let env = HashMap::from([
        ("PFPGEN_SERVICE__API_KEY".to_string(), "from-env".to_string()),
        ("PFPGEN_DOWNLOAD__FILE_NAME".to_string(), "env.png".to_string()),
        ("UNRELATED".to_string(), "ignored".to_string()),
    ]);
    let config = manager.load_with_environment(Some(env)).unwrap();

    assert_eq!(config.service.api_key, "from-env");
    assert_eq!(config.download.file_name, "env.png");
}

#[test]
fn test_save_then_load() {
    let (manager, _temp_dir) = manager_in_temp_dir();
    let mut config = manager.load_with_environment(no_env()).unwrap();
    config.service.prompt = "Add sunglasses.".to_string();

    manager.save(&config).unwrap();
    let reloaded = manager.load_with_environment(no_env()).unwrap();

    assert_eq!(reloaded, config);
}

#[test]
fn test_config_feeds_session_and_client() {
    let (manager, _temp_dir) = manager_in_temp_dir();
    std::fs::write(
        manager.config_path(),
        "service:\n  api_base: http://localhost:9000/v1beta/\n  model: models/custom\ndownload:\n  file_name: custom.png\n",
    )
    .unwrap();
    let config = manager.load_with_environment(no_env()).unwrap();

    let client = GeminiClient::new(&config.service).unwrap();
    assert_eq!(
        client.endpoint(),
        "http://localhost:9000/v1beta/models/custom:generateContent"
    );

    let session =
        SessionController::new().with_download_file_name(config.download.file_name.clone());
    assert_eq!(session.download_file_name(), "custom.png");
}

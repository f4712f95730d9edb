// pfpgen - Billions Network PFP Generator
//
// This is the library crate containing the session logic, the generation
// client and the data structures. The binary crate (main.rs) provides the GUI
// entry point.

pub mod config;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
pub mod session;
pub mod ui;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use metrics::Metrics;
pub use models::{AppConfig, SelectedFile, SessionSnapshot, SlotKind, StatusKind};
pub use services::{GeminiClient, GenerationError, ImageGenerator};
pub use session::{GenerationOutcome, SessionController, SessionEvent};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

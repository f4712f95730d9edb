//! pfpgen - Billions Network PFP Generator
//!
//! Main entry point for the GUI application.
//!
//! # Overview
//!
//! The window offers two upload slots (a face photo and a glasses/mask overlay),
//! sends both to a Gemini image model, shows the merged profile picture and lets
//! the user save it. At startup this binary initializes:
//! - Configuration ([`ConfigManager`]: defaults, `pfpgen.yaml`, `PFPGEN_*` variables)
//! - Logging (daily file rotation + optional console output)
//! - Tokio async runtime (2 worker threads for file reads and the generation call)
//! - The session ([`SessionController`]) and the generation client ([`GeminiClient`])
//! - GUI controller ([`GuiController`] - bridges Slint UI with the session)
//!
//! The application uses a hybrid threading model:
//! - **Main thread**: Runs the Slint event loop (blocking, synchronous)
//! - **Tokio workers**: Encode the images and call the generation service
//! - **Session listener**: Background std::thread that re-renders on session events
//!
//! # Configuration Files
//!
//! Expected in `PFP Generator Data/` (created if missing):
//! - `pfpgen.yaml`: service, slot, download and logging settings (optional)
//!
//! The API key can also come from `PFPGEN_SERVICE__API_KEY`, `GEMINI_API_KEY`
//! or `GOOGLE_API_KEY`.

use anyhow::Result;
use pfpgen::config::DEFAULT_CONFIG_DIR;
use pfpgen::ui::GuiController;
use pfpgen::{
    APP_NAME, ConfigManager, GeminiClient, ImageGenerator, Metrics, SessionController, VERSION,
};
use std::sync::Arc;
use std::time::Duration;

const WORKER_THREADS: usize = 2;

/// Main entry point for the pfpgen GUI application
///
/// # Errors
///
/// This function can fail if:
/// - The configuration directory cannot be created or the config file is invalid
/// - Logging initialization fails (disk space, permissions)
/// - Tokio runtime or HTTP client creation fails
/// - Slint UI initialization fails (graphics drivers, display)
fn main() -> Result<()> {
    // Configuration comes first: it decides where and how to log
    let config_manager = ConfigManager::new(DEFAULT_CONFIG_DIR)?;
    let config = config_manager.load()?;

    // Held until the end of main so buffered log lines are flushed
    let _log_guard = pfpgen::logging::init(&config.logging)?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);
    tracing::info!("Configuration directory: {}", config_manager.config_dir());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(WORKER_THREADS)
        .thread_name("pfpgen-worker")
        .build()?;

    tracing::info!(
        "Tokio runtime initialized with {} worker threads",
        WORKER_THREADS
    );

    let metrics = Arc::new(Metrics::new());
    let session = Arc::new(
        SessionController::new()
            .with_download_file_name(config.download.file_name.clone())
            .with_metrics(Arc::clone(&metrics)),
    );

    let client = GeminiClient::new(&config.service)?;
    tracing::info!("Generation endpoint: {}", client.endpoint());
    let generator: Arc<dyn ImageGenerator> = Arc::new(client);

    let gui_controller =
        GuiController::new(Arc::clone(&session), generator, &config, runtime.handle().clone())?;

    tracing::info!("GUI controller initialized, launching window");

    // Run the GUI (blocks until window is closed)
    let result = gui_controller.run();

    tracing::info!("GUI closed, shutting down");

    if session.snapshot().is_generating() {
        tracing::warn!("Window closed during generation - the result will be discarded");
    }

    // Releases every preview and result; a call still in flight is discarded
    session.shutdown();

    runtime.shutdown_timeout(Duration::from_secs(5));

    metrics.log_summary();
    tracing::info!("Application shutdown complete");

    result.map_err(|e| {
        tracing::error!("GUI error: {}", e);
        anyhow::anyhow!("GUI error: {}", e)
    })
}

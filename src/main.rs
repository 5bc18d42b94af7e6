//! Candlescope - Candlestick chart analysis desktop client
//!
//! Main entry point for the GUI application.
//!
//! # Overview
//!
//! The binary builds one application context and tears it down once:
//! - Settings ([`ConfigManager`]) and logging (file rotation + console output)
//! - Tokio runtime for the analysis request, preview reads and backend output readers
//! - [`AnalysisSession`] over the HTTP analysis client
//! - [`Supervisor`] owning the Python backend process and the Slint window
//!
//! # Execution Flow
//!
//! 1. Load `Candlescope Data/candlescope.yaml` (written with defaults on first run)
//! 2. Initialize logging → `logs/candlescope.<date>`
//! 3. Launch the backend and wait for its health check (bounded)
//! 4. Create the window and run the Slint event loop on the main thread
//! 5. On window close, terminate the backend and shut the runtime down

use anyhow::{Context, Result};
use candlescope::metrics::Metrics;
use candlescope::services::{BackendLauncher, HttpAnalysisClient, platform_terminator};
use candlescope::ui::SlintWindowHost;
use candlescope::{
    APP_NAME, AnalysisSession, CONFIG_DIR, ClosePolicy, ConfigManager, SessionManager, Supervisor,
    VERSION,
};
use std::sync::Arc;
use std::time::Duration;

fn main() -> Result<()> {
    let config_manager = ConfigManager::new(CONFIG_DIR)?;
    let created_settings = config_manager.ensure_settings_file()?;
    let settings = config_manager.load_settings()?;

    let _log_guard = candlescope::logging::setup_logging(&settings)?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);
    if created_settings {
        tracing::info!("Wrote default settings to {}", config_manager.settings_path());
    }
    tracing::info!("Analysis service: {}", settings.api_url);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("candlescope-worker")
        .build()
        .context("Failed to build tokio runtime")?;
    let runtime_guard = runtime.enter();

    let metrics = Arc::new(Metrics::new());
    let client = HttpAnalysisClient::new(&settings).context("Failed to build analysis client")?;
    let session = AnalysisSession::new(SessionManager::new(), Arc::new(client), Arc::clone(&metrics));

    let launcher =
        BackendLauncher::from_settings(&settings).context("Failed to prepare backend launcher")?;
    let host = SlintWindowHost::new(session, &settings, runtime.handle().clone());
    let mut supervisor = Supervisor::new(
        launcher,
        platform_terminator(),
        host,
        ClosePolicy::for_platform(),
    );

    supervisor.launch_backend();
    runtime.block_on(supervisor.await_backend_ready());

    let result = supervisor.create_window().and_then(|()| supervisor.run());
    if let Err(ref e) = result {
        tracing::error!("GUI error: {:#}", e);
    }

    // Terminates the backend if the window never ran
    drop(supervisor);

    tracing::info!("GUI closed, shutting down");
    metrics.log_summary();

    drop(runtime_guard);
    runtime.shutdown_timeout(Duration::from_secs(5));

    tracing::info!("Application shutdown complete");
    result
}

// Candlescope - Candlestick chart analysis desktop client
//
// This is the library crate containing the session state machine, the backend
// process supervisor and the analysis pipeline. The binary crate (main.rs)
// builds the application context and runs the window.

pub mod commands;
pub mod config;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod presentation;
pub mod services;
pub mod session;
pub mod state;
pub mod supervisor;
pub mod ui;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use models::{AnalysisResult, SessionPhase, SessionState, Settings};
pub use session::AnalysisSession;
pub use state::{SessionChange, SessionError, SessionManager};
pub use supervisor::{ClosePolicy, Supervisor, SupervisorPhase, WindowHost};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// Directory holding `candlescope.yaml`
pub const CONFIG_DIR: &str = "Candlescope Data";

//! Services module - I/O-facing logic with no UI dependencies.
//!
//! # Components
//!
//! - [`analysis`]: the analysis request pipeline. [`analyze`] turns a selected file into one
//!   multipart `POST {baseURL}/analyze` through an [`AnalysisService`]; [`HttpAnalysisClient`]
//!   is the reqwest-backed implementation with the fixed 30 s timeout.
//! - [`preview`]: reads a chart image and encodes it as a `data:` URI.
//! - [`backend`]: discovers the Python interpreter, spawns the backend with its output attached
//!   to the log, and runs the health-check readiness handshake.
//! - [`terminate`]: per-platform [`ProcessTerminator`] implementations used at shutdown.
//!
//! Everything here is async on tokio and testable without a window.

pub mod analysis;
pub mod backend;
pub mod preview;
pub mod terminate;

pub use analysis::{
    AnalysisError, AnalysisRequest, AnalysisService, GENERIC_FAILURE_MESSAGE, HttpAnalysisClient,
    NO_FILE_MESSAGE, analyze,
};
pub use backend::{BackendError, BackendLauncher, BackendProcess, Readiness};
pub use preview::{PreviewError, generate_preview};
pub use terminate::{DirectKill, ProcessTerminator, TerminateError, platform_terminator};

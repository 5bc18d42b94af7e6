//! Data models for Candlescope.
//!
//! - [`AnalysisResult`]: the structured result returned by the analysis service
//! - [`SessionState`] / [`SessionPhase`]: the upload/analyze session as a single tagged variant
//! - [`SelectedFile`] / [`Preview`]: the chosen chart image and its inline preview
//! - [`Settings`]: layered application settings loaded by [`ConfigManager`](crate::config::ConfigManager)

pub mod analysis;
pub mod config;
pub mod session;

pub use analysis::{AnalysisResult, KeyLevels, Prediction, PriceValue, Strength};
pub use config::{DEFAULT_API_URL, DEFAULT_REQUEST_TIMEOUT_MS, Settings};
pub use session::{ImageKind, PhaseKind, Preview, SelectedFile, SessionPhase, SessionState};

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Fixed timeout for one analysis request
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

/// Analysis service address used when no override is configured
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Application settings from `candlescope.yaml`, overridable through `CANDLESCOPE_*` variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Base URL of the analysis service (`CANDLESCOPE_API_URL`)
    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Working directory of the backend process
    #[serde(default = "default_backend_dir")]
    pub backend_dir: Utf8PathBuf,

    #[serde(default = "default_backend_script")]
    pub backend_script: String,

    /// Explicit interpreter; when unset the bundled venv or system Python is used
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_interpreter: Option<String>,

    /// Upper bound on the backend readiness handshake
    #[serde(default = "default_ready_timeout_secs")]
    pub ready_timeout_secs: u64,

    #[serde(default = "default_ready_poll_interval_ms")]
    pub ready_poll_interval_ms: u64,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default)]
    pub debug_logging: bool,

    #[serde(default = "default_console_logging")]
    pub console_logging: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            request_timeout_ms: default_request_timeout_ms(),
            backend_dir: default_backend_dir(),
            backend_script: default_backend_script(),
            backend_interpreter: None,
            ready_timeout_secs: default_ready_timeout_secs(),
            ready_poll_interval_ms: default_ready_poll_interval_ms(),
            log_dir: default_log_dir(),
            debug_logging: false,
            console_logging: default_console_logging(),
        }
    }
}

impl Settings {
    fn base_url(&self) -> &str {
        self.api_url.trim_end_matches('/')
    }

    /// `POST` target for chart uploads
    pub fn analyze_url(&self) -> String {
        format!("{}/analyze", self.base_url())
    }

    /// Readiness probe target
    pub fn health_url(&self) -> String {
        format!("{}/health", self.base_url())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_secs(self.ready_timeout_secs)
    }

    pub fn ready_poll_interval(&self) -> Duration {
        Duration::from_millis(self.ready_poll_interval_ms)
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

fn default_backend_dir() -> Utf8PathBuf {
    Utf8PathBuf::from("backend")
}

fn default_backend_script() -> String {
    "main.py".to_string()
}

fn default_ready_timeout_secs() -> u64 {
    15
}

fn default_ready_poll_interval_ms() -> u64 {
    250
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_console_logging() -> bool {
    true
}

// Session metrics module
//
// Lightweight counters for analysis activity, logged on shutdown

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Process-wide analysis metrics
///
/// Uses atomic operations for thread-safe tracking without locks.
#[derive(Debug)]
pub struct Metrics {
    /// Analysis requests sent to the service
    pub analyses_started: AtomicUsize,

    pub analyses_succeeded: AtomicUsize,

    pub analyses_failed: AtomicUsize,

    /// Analyze commands refused before any request was sent
    pub analyses_rejected: AtomicUsize,

    /// Outcomes dropped because the session was reset meanwhile
    pub outcomes_discarded: AtomicUsize,

    pub previews_generated: AtomicUsize,

    /// Previews dropped because a newer selection replaced them
    pub previews_superseded: AtomicUsize,

    /// Total request time in milliseconds
    pub total_analysis_time_ms: AtomicU64,

    /// Number of window renders
    pub ui_updates: AtomicU64,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            analyses_started: AtomicUsize::new(0),
            analyses_succeeded: AtomicUsize::new(0),
            analyses_failed: AtomicUsize::new(0),
            analyses_rejected: AtomicUsize::new(0),
            outcomes_discarded: AtomicUsize::new(0),
            previews_generated: AtomicUsize::new(0),
            previews_superseded: AtomicUsize::new(0),
            total_analysis_time_ms: AtomicU64::new(0),
            ui_updates: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_analysis_started(&self) {
        self.analyses_started.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a finished request and how long it took
    pub fn record_analysis_finished(&self, succeeded: bool, duration: Duration) {
        if succeeded {
            self.analyses_succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.analyses_failed.fetch_add(1, Ordering::Relaxed);
        }
        self.total_analysis_time_ms
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn record_analysis_rejected(&self) {
        self.analyses_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_outcome_discarded(&self) {
        self.outcomes_discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_preview(&self, applied: bool) {
        if applied {
            self.previews_generated.fetch_add(1, Ordering::Relaxed);
        } else {
            self.previews_superseded.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_ui_update(&self) {
        self.ui_updates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Average request time in milliseconds over all finished requests
    pub fn avg_analysis_time_ms(&self) -> f64 {
        let total = self.total_analysis_time_ms.load(Ordering::Relaxed);
        let count = self.analyses_succeeded.load(Ordering::Relaxed)
            + self.analyses_failed.load(Ordering::Relaxed);
        if count > 0 {
            total as f64 / count as f64
        } else {
            0.0
        }
    }

    /// One-line summary, also shown in the diagnostics panel
    pub fn summary(&self) -> String {
        format!(
            "analyses: {} started, {} succeeded, {} failed, {} rejected, {} discarded | previews: {} shown, {} superseded | avg {:.0}ms | uptime {:.0}s",
            self.analyses_started.load(Ordering::Relaxed),
            self.analyses_succeeded.load(Ordering::Relaxed),
            self.analyses_failed.load(Ordering::Relaxed),
            self.analyses_rejected.load(Ordering::Relaxed),
            self.outcomes_discarded.load(Ordering::Relaxed),
            self.previews_generated.load(Ordering::Relaxed),
            self.previews_superseded.load(Ordering::Relaxed),
            self.avg_analysis_time_ms(),
            self.uptime().as_secs_f64()
        )
    }

    pub fn log_summary(&self) {
        tracing::info!("=== Session Metrics Summary ===");
        tracing::info!("Uptime: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Analyses: {} started, {} succeeded, {} failed, {} rejected, {} discarded",
            self.analyses_started.load(Ordering::Relaxed),
            self.analyses_succeeded.load(Ordering::Relaxed),
            self.analyses_failed.load(Ordering::Relaxed),
            self.analyses_rejected.load(Ordering::Relaxed),
            self.outcomes_discarded.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Total analysis time: {:.2}s (avg: {:.2}ms per request)",
            self.total_analysis_time_ms.load(Ordering::Relaxed) as f64 / 1000.0,
            self.avg_analysis_time_ms()
        );
        tracing::info!(
            "Previews: {} shown, {} superseded; UI updates: {}",
            self.previews_generated.load(Ordering::Relaxed),
            self.previews_superseded.load(Ordering::Relaxed),
            self.ui_updates.load(Ordering::Relaxed)
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

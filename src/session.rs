//! Drives the client state machine from user commands.
//!
//! [`AnalysisSession`] pairs the [`SessionManager`] with the I/O that its
//! transitions trigger: the preview read after a selection and the analysis
//! request after `analyze`. Both run outside the state lock and hand their
//! outcome back with a ticket, so late results are dropped instead of applied.

use crate::metrics::Metrics;
use crate::models::SelectedFile;
use crate::services::analysis::{self, AnalysisService};
use crate::services::preview::generate_preview;
use crate::state::{SessionError, SessionManager};
use std::sync::Arc;
use std::time::Instant;

pub struct AnalysisSession<S> {
    manager: SessionManager,
    service: Arc<S>,
    metrics: Arc<Metrics>,
}

impl<S> Clone for AnalysisSession<S> {
    fn clone(&self) -> Self {
        Self {
            manager: self.manager.clone(),
            service: Arc::clone(&self.service),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

impl<S: AnalysisService> AnalysisSession<S> {
    pub fn new(manager: SessionManager, service: Arc<S>, metrics: Arc<Metrics>) -> Self {
        Self {
            manager,
            service,
            metrics,
        }
    }

    pub fn manager(&self) -> &SessionManager {
        &self.manager
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Select the first of `candidates` and load its preview.
    ///
    /// Returns `true` once the preview is displayed; `false` when nothing was
    /// selected, the read failed, or a newer selection superseded it.
    pub async fn select_files(&self, candidates: Vec<SelectedFile>) -> bool {
        let Some(ticket) = self.manager.select_file(candidates) else {
            return false;
        };

        tracing::info!("Selected {}", ticket.file.path);

        match generate_preview(&ticket.file).await {
            Ok(preview) => {
                let applied = self.manager.apply_preview(&ticket, preview);
                self.metrics.record_preview(applied);
                applied
            }
            Err(e) => {
                tracing::warn!("Preview unavailable: {}", e);
                false
            }
        }
    }

    /// Submit the selected file for analysis and record the outcome.
    ///
    /// Rejected commands leave no trace on the network. A failed request still
    /// moves the session to its error phase before the error is returned.
    pub async fn analyze(&self) -> Result<(), SessionError> {
        let ticket = match self.manager.begin_analysis() {
            Ok(ticket) => ticket,
            Err(e) => {
                tracing::debug!("Analyze rejected: {}", e);
                self.metrics.record_analysis_rejected();
                return Err(e);
            }
        };

        self.metrics.record_analysis_started();
        let start = Instant::now();

        let outcome = analysis::analyze(self.service.as_ref(), Some(&ticket.file)).await;

        let elapsed = start.elapsed();
        self.metrics.record_analysis_finished(outcome.is_ok(), elapsed);

        match &outcome {
            Ok(result) => tracing::info!(
                "Analysis of {} finished in {:.2}s: {} {}%",
                ticket.file.name,
                elapsed.as_secs_f32(),
                result.prediction,
                result.strength.value()
            ),
            Err(e) => tracing::warn!("Analysis of {} failed: {}", ticket.file.name, e),
        }

        if !self.manager.finish_analysis(&ticket, outcome.clone()) {
            self.metrics.record_outcome_discarded();
        }

        outcome.map(|_| ()).map_err(SessionError::from)
    }

    pub fn reset(&self) {
        tracing::debug!("Session reset");
        self.manager.reset();
    }
}

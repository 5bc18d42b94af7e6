// State management module
//
// This module provides the SessionManager, the client state machine. It wraps
// SessionState with thread-safe access using Arc<RwLock<T>> and emits change
// events for the window.

use crate::models::{
    AnalysisResult, PhaseKind, Prediction, Preview, SelectedFile, SessionPhase, SessionState,
};
use crate::services::analysis::{AnalysisError, NO_FILE_MESSAGE};
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;
use tokio::sync::broadcast;

/// Change events emitted when the session transitions
#[derive(Clone, Debug, PartialEq)]
pub enum SessionChange {
    /// The active phase changed
    PhaseChanged { from: PhaseKind, to: PhaseKind },

    /// A new file replaced the current selection
    FileSelected { name: String },

    /// The preview of the current file finished loading
    PreviewReady,

    AnalysisStarted,

    AnalysisSucceeded { prediction: Prediction, strength: u8 },

    AnalysisFailed { message: String },

    /// Everything was cleared back to idle
    SessionReset,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("An analysis is already in progress")]
    AnalysisInFlight,

    #[error("Cannot start an analysis from the {0} phase")]
    InvalidTransition(PhaseKind),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

impl SessionError {
    pub fn is_validation(&self) -> bool {
        matches!(self, SessionError::Analysis(AnalysisError::Validation))
    }
}

/// Proof that a preview read belongs to a particular selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionTicket {
    generation: u64,
    pub file: SelectedFile,
}

/// Proof that an analysis outcome belongs to the request currently in flight
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisTicket {
    generation: u64,
    pub file: SelectedFile,
}

/// Thread-safe client state machine with event emission
///
/// This is the single owner of [`SessionState`]:
/// - Transitions are applied under one write lock, so no two interleave and a
///   reset is never partially observable
/// - [`snapshot()`](Self::snapshot) and [`read()`](Self::read) give the window read-only access
/// - [`subscribe()`](Self::subscribe) delivers [`SessionChange`] events
///
/// Preview reads and analysis requests run outside the lock. Their results come
/// back with a ticket and are dropped if the selection or request they belong to
/// has since been replaced or reset.
pub struct SessionManager {
    state: Arc<RwLock<SessionState>>,
    change_tx: broadcast::Sender<SessionChange>,
}

impl SessionManager {
    /// Create a new SessionManager in the idle phase
    ///
    /// # Returns
    /// A new SessionManager with a broadcast channel buffer of 100 events
    pub fn new() -> Self {
        let (change_tx, _) = broadcast::channel(100);
        Self {
            state: Arc::new(RwLock::new(SessionState::default())),
            change_tx,
        }
    }

    /// Get a read-only copy of the current state
    pub fn snapshot(&self) -> SessionState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Subscribe to session change events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionChange> {
        self.change_tx.subscribe()
    }

    /// Apply a transition and emit the resulting change events.
    ///
    /// The closure returns a value that is handed back to the caller along with
    /// the emitted changes.
    fn transition<F, R>(&self, transition_fn: F) -> (R, Vec<SessionChange>)
    where
        F: FnOnce(&mut SessionState) -> R,
    {
        self.transition_then(transition_fn, None)
    }

    /// Like [`Self::transition`], with `trailing` sent after the detected
    /// changes while the write lock is still held.
    fn transition_then<F, R>(
        &self,
        transition_fn: F,
        trailing: Option<SessionChange>,
    ) -> (R, Vec<SessionChange>)
    where
        F: FnOnce(&mut SessionState) -> R,
    {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let old_phase = state.phase.clone();

        let outcome = transition_fn(&mut state);

        let mut changes = Self::detect_changes(&old_phase, &state.phase);
        changes.extend(trailing);
        for change in &changes {
            // Ignore send errors - it's OK if no one is listening
            let _ = self.change_tx.send(change.clone());
        }

        (outcome, changes)
    }

    /// Detect what changed between two phases and generate events
    fn detect_changes(old: &SessionPhase, new: &SessionPhase) -> Vec<SessionChange> {
        let mut changes = Vec::new();

        if old.kind() != new.kind() {
            changes.push(SessionChange::PhaseChanged {
                from: old.kind(),
                to: new.kind(),
            });
        }

        if let Some(file) = new.file() {
            if old.file() != Some(file) {
                changes.push(SessionChange::FileSelected {
                    name: file.name.clone(),
                });
            }
        }

        if new.preview().is_some() && old.preview() != new.preview() {
            changes.push(SessionChange::PreviewReady);
        }

        match (old, new) {
            (SessionPhase::Analyzing { .. }, SessionPhase::Analyzing { .. }) => {}
            (_, SessionPhase::Analyzing { .. }) => changes.push(SessionChange::AnalysisStarted),
            (SessionPhase::Analyzing { .. }, SessionPhase::Result { data, .. }) => {
                changes.push(SessionChange::AnalysisSucceeded {
                    prediction: data.prediction,
                    strength: data.strength.value(),
                });
            }
            _ => {}
        }

        if let SessionPhase::Error { message, .. } = new {
            if old.error() != Some(message.as_str()) {
                changes.push(SessionChange::AnalysisFailed {
                    message: message.clone(),
                });
            }
        }

        changes
    }

    // Transitions

    /// Accept the first of `candidates` as the current file.
    ///
    /// Returns `None` and leaves the session untouched when there is no
    /// candidate, or while an analysis is in flight or a result is displayed.
    pub fn select_file(&self, candidates: Vec<SelectedFile>) -> Option<SelectionTicket> {
        let dropped = candidates.len().saturating_sub(1);
        let file = candidates.into_iter().next()?;

        if dropped > 0 {
            tracing::debug!("Ignoring {} extra selected file(s)", dropped);
        }

        let (ticket, _) = self.transition(|state| match state.kind() {
            PhaseKind::Analyzing | PhaseKind::Result => {
                tracing::debug!("Selection ignored in {} phase", state.kind());
                None
            }
            PhaseKind::Idle | PhaseKind::Previewing | PhaseKind::Error => {
                state.selection += 1;
                state.phase = SessionPhase::Previewing {
                    file: file.clone(),
                    preview: None,
                };
                Some(SelectionTicket {
                    generation: state.selection,
                    file,
                })
            }
        });

        ticket
    }

    /// Store a finished preview if its selection is still current.
    ///
    /// Returns `false` when the preview was superseded by a newer selection or a reset.
    pub fn apply_preview(&self, ticket: &SelectionTicket, preview: Preview) -> bool {
        let (applied, _) = self.transition(|state| {
            if state.selection != ticket.generation || state.file() != Some(&ticket.file) {
                return false;
            }

            match state.phase.preview_slot() {
                Some(slot) => {
                    *slot = Some(preview);
                    true
                }
                None => false,
            }
        });

        if !applied {
            tracing::debug!("Discarding superseded preview of {}", ticket.file.name);
        }

        applied
    }

    /// Move to `Analyzing` if a file is selected and nothing is in flight.
    ///
    /// With no file selected the session moves to `Error` and the call fails
    /// with a validation error. While analyzing, the call is rejected and the
    /// session is unchanged.
    pub fn begin_analysis(&self) -> Result<AnalysisTicket, SessionError> {
        let (result, _) = self.transition(|state| {
            match std::mem::take(&mut state.phase) {
                phase @ SessionPhase::Analyzing { .. } => {
                    state.phase = phase;
                    Err(SessionError::AnalysisInFlight)
                }
                phase @ SessionPhase::Result { .. } => {
                    state.phase = phase;
                    Err(SessionError::InvalidTransition(PhaseKind::Result))
                }
                SessionPhase::Previewing { file, preview }
                | SessionPhase::Error {
                    file: Some(file),
                    preview,
                    ..
                } => {
                    state.request += 1;
                    state.phase = SessionPhase::Analyzing {
                        file: file.clone(),
                        preview,
                    };
                    Ok(AnalysisTicket {
                        generation: state.request,
                        file,
                    })
                }
                SessionPhase::Idle | SessionPhase::Error { file: None, .. } => {
                    state.phase = SessionPhase::Error {
                        file: None,
                        preview: None,
                        message: NO_FILE_MESSAGE.to_string(),
                    };
                    Err(SessionError::Analysis(AnalysisError::Validation))
                }
            }
        });

        result
    }

    /// Record the outcome of the request identified by `ticket`.
    ///
    /// Returns `false` when the outcome arrived after a reset and was discarded.
    pub fn finish_analysis(
        &self,
        ticket: &AnalysisTicket,
        outcome: Result<AnalysisResult, AnalysisError>,
    ) -> bool {
        let (applied, _) = self.transition(|state| {
            if state.request != ticket.generation {
                return false;
            }

            match std::mem::take(&mut state.phase) {
                SessionPhase::Analyzing { file, preview } => {
                    state.phase = match outcome {
                        Ok(data) => SessionPhase::Result {
                            file,
                            preview,
                            data: Arc::new(data),
                        },
                        Err(error) => SessionPhase::Error {
                            file: Some(file),
                            preview,
                            message: error.user_message(),
                        },
                    };
                    true
                }
                other => {
                    state.phase = other;
                    false
                }
            }
        });

        if !applied {
            tracing::debug!("Discarding analysis outcome for {}", ticket.file.name);
        }

        applied
    }

    /// Clear file, preview, result and error in one step
    pub fn reset(&self) -> Vec<SessionChange> {
        let (_, changes) = self.transition_then(
            |state| {
                state.selection += 1;
                state.request += 1;
                state.phase = SessionPhase::Idle;
            },
            Some(SessionChange::SessionReset),
        );

        changes
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for SessionManager {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            change_tx: self.change_tx.clone(),
        }
    }
}

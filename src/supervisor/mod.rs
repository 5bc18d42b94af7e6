// Process supervisor module
//
// Sequences backend startup before window creation and ties backend teardown
// to the window lifecycle. Backend failures are logged here and never reach
// the window: a dead backend surfaces later as a failed analysis request.

use crate::services::backend::{BackendLauncher, BackendProcess, Readiness};
use crate::services::terminate::{DirectKill, ProcessTerminator};
use anyhow::Result;
use std::fmt;

/// Lifecycle of the application process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorPhase {
    NotStarted,
    BackendLaunching,
    WindowCreating,
    Running,
    Terminating,
    Stopped,
}

impl fmt::Display for SupervisorPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SupervisorPhase::NotStarted => "not started",
            SupervisorPhase::BackendLaunching => "backend launching",
            SupervisorPhase::WindowCreating => "window creating",
            SupervisorPhase::Running => "running",
            SupervisorPhase::Terminating => "terminating",
            SupervisorPhase::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// What closing the last window does to the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClosePolicy {
    /// Quit the application
    Quit,

    /// Keep the process alive until it is reactivated (macOS)
    StayResident,
}

impl ClosePolicy {
    pub fn for_platform() -> Self {
        if cfg!(target_os = "macos") {
            ClosePolicy::StayResident
        } else {
            ClosePolicy::Quit
        }
    }
}

/// Next step after the window closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownAction {
    Quit,
    AwaitActivation,
}

/// Window system seam of the supervisor
pub trait WindowHost {
    type Window;

    fn create_window(&mut self) -> Result<Self::Window>;

    /// Show `window` and block until it is closed
    fn run_window(&mut self, window: &Self::Window) -> Result<()>;

    /// Block until the application is reactivated. Returns `false` when that
    /// can no longer happen and the application should exit.
    fn wait_for_activation(&mut self) -> bool {
        false
    }
}

/// Owns the backend process and the single application window.
pub struct Supervisor<H: WindowHost> {
    phase: SupervisorPhase,
    launcher: BackendLauncher,
    terminator: Box<dyn ProcessTerminator>,
    backend: Option<BackendProcess>,
    host: H,
    window: Option<H::Window>,
    policy: ClosePolicy,
}

impl<H: WindowHost> Supervisor<H> {
    pub fn new(
        launcher: BackendLauncher,
        terminator: Box<dyn ProcessTerminator>,
        host: H,
        policy: ClosePolicy,
    ) -> Self {
        Self {
            phase: SupervisorPhase::NotStarted,
            launcher,
            terminator,
            backend: None,
            host,
            window: None,
            policy,
        }
    }

    pub fn phase(&self) -> SupervisorPhase {
        self.phase
    }

    pub fn has_backend(&self) -> bool {
        self.backend.is_some()
    }

    pub fn has_window(&self) -> bool {
        self.window.is_some()
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Spawn the backend. Failure is logged and window creation still proceeds.
    ///
    /// Must be called from within a tokio runtime.
    pub fn launch_backend(&mut self) {
        self.phase = SupervisorPhase::BackendLaunching;
        tracing::info!(
            "Launching backend from {} (terminator: {})",
            self.launcher.backend_dir(),
            self.terminator.name()
        );

        match self.launcher.spawn(self.terminator.as_ref()) {
            Ok(process) => self.backend = Some(process),
            Err(e) => {
                tracing::error!("Backend failed to start: {}", e);
                self.backend = None;
            }
        }
    }

    /// Wait for the backend to answer its health check.
    ///
    /// Returns `None` when there is no backend to wait for. Every outcome lets
    /// the caller go on to create the window.
    pub async fn await_backend_ready(&mut self) -> Option<Readiness> {
        let Some(backend) = self.backend.as_mut() else {
            tracing::warn!("No backend running; opening the window without it");
            return None;
        };

        let readiness = self.launcher.wait_until_ready(backend).await;
        match &readiness {
            Readiness::Ready(elapsed) => {
                tracing::info!("Backend ready after {:.2}s", elapsed.as_secs_f32())
            }
            Readiness::TimedOut(elapsed) => tracing::warn!(
                "Backend not ready after {:.2}s; continuing",
                elapsed.as_secs_f32()
            ),
            Readiness::Exited(code) => {
                tracing::error!("Backend exited before becoming ready (code {:?})", code)
            }
        }

        Some(readiness)
    }

    /// Create the application window unless one already exists
    pub fn create_window(&mut self) -> Result<()> {
        if self.window.is_some() {
            return Ok(());
        }

        self.phase = SupervisorPhase::WindowCreating;
        let window = self.host.create_window()?;
        self.window = Some(window);
        self.phase = SupervisorPhase::Running;

        tracing::debug!("Application window created");
        Ok(())
    }

    /// Recreate the window after reactivation.
    ///
    /// Returns `true` when a window was created, `false` when one already existed.
    pub fn activate(&mut self) -> Result<bool> {
        if self.window.is_some() {
            return Ok(false);
        }

        tracing::info!("Application reactivated; recreating window");
        self.create_window()?;
        Ok(true)
    }

    /// Handle the window-closed event: the backend is always torn down.
    pub fn window_closed(&mut self) -> ShutdownAction {
        self.window = None;
        self.terminate();

        match self.policy {
            ClosePolicy::Quit => ShutdownAction::Quit,
            ClosePolicy::StayResident => ShutdownAction::AwaitActivation,
        }
    }

    /// Kill the backend, falling back to a direct kill when the platform
    /// terminator fails. Best-effort; exit is not awaited.
    pub fn terminate(&mut self) {
        self.phase = SupervisorPhase::Terminating;

        if let Some(mut backend) = self.backend.take() {
            tracing::info!(
                "Terminating backend {} (pid {:?}) via {}",
                backend.program(),
                backend.id(),
                self.terminator.name()
            );

            if let Err(e) = self.terminator.terminate(backend.child_mut()) {
                tracing::warn!("{} terminator failed: {}; killing directly", self.terminator.name(), e);

                if let Err(e) = DirectKill.terminate(backend.child_mut()) {
                    tracing::error!("Failed to kill backend: {}", e);
                }
            }
        }

        self.phase = SupervisorPhase::Stopped;
    }

    /// Run the window until the application quits.
    pub fn run(&mut self) -> Result<()> {
        loop {
            if let Some(window) = self.window.as_ref() {
                if let Err(e) = self.host.run_window(window) {
                    self.window = None;
                    self.terminate();
                    return Err(e);
                }
            }

            match self.window_closed() {
                ShutdownAction::Quit => break,
                ShutdownAction::AwaitActivation => {
                    if !self.host.wait_for_activation() {
                        break;
                    }
                    self.activate()?;
                }
            }
        }

        tracing::info!("Supervisor {}", self.phase);
        Ok(())
    }
}

impl<H: WindowHost> Drop for Supervisor<H> {
    fn drop(&mut self) {
        if self.backend.is_some() {
            self.terminate();
        }
    }
}

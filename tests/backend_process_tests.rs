//! Integration tests for backend startup and teardown through the supervisor
//!
//! The backend is stood in for by small system commands (`sleep`, `false`) and
//! the health endpoint by the fake service.

#![cfg(unix)]

mod common;

use anyhow::Result;
use camino::Utf8PathBuf;
use candlescope::services::{BackendLauncher, DirectKill, Readiness, platform_terminator};
use candlescope::{ClosePolicy, Settings, Supervisor, SupervisorPhase, WindowHost};
use common::{FakeResponse, FakeService, unused_base_url};
use serde_json::json;
use tempfile::TempDir;

/// Host whose window closes as soon as it is shown
#[derive(Default)]
struct HeadlessHost {
    windows: usize,
}

impl WindowHost for HeadlessHost {
    type Window = ();

    fn create_window(&mut self) -> Result<()> {
        self.windows += 1;
        Ok(())
    }

    fn run_window(&mut self, _window: &()) -> Result<()> {
        Ok(())
    }
}

fn supervisor_for(
    dir: &TempDir,
    api_url: String,
    interpreter: &str,
    script: &str,
) -> Supervisor<HeadlessHost> {
    let settings = Settings {
        api_url,
        backend_dir: Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap(),
        backend_interpreter: Some(interpreter.to_string()),
        backend_script: script.to_string(),
        ready_timeout_secs: 1,
        ready_poll_interval_ms: 50,
        ..Settings::default()
    };

    Supervisor::new(
        BackendLauncher::from_settings(&settings).unwrap(),
        platform_terminator(),
        HeadlessHost::default(),
        ClosePolicy::Quit,
    )
}

#[tokio::test]
async fn test_backend_ready_when_health_answers() {
    let health = FakeService::start(FakeResponse::json(200, json!({ "status": "healthy" }))).await;
    let dir = TempDir::new().unwrap();
    let mut supervisor = supervisor_for(&dir, health.base_url().to_string(), "sleep", "30");

    supervisor.launch_backend();
    assert!(supervisor.has_backend());

    let readiness = supervisor.await_backend_ready().await;
    assert!(matches!(readiness, Some(Readiness::Ready(_))), "{:?}", readiness);

    let check = &health.requests()[0];
    assert_eq!(check.method, "GET");
    assert_eq!(check.path, "/health");

    supervisor.create_window().unwrap();
    supervisor.run().unwrap();
    assert!(!supervisor.has_backend());
    assert_eq!(supervisor.phase(), SupervisorPhase::Stopped);
}

#[tokio::test]
async fn test_backend_exit_before_ready() {
    let dir = TempDir::new().unwrap();
    let mut supervisor = supervisor_for(&dir, unused_base_url().await, "false", "main.py");

    supervisor.launch_backend();
    let readiness = supervisor.await_backend_ready().await;

    assert!(
        matches!(readiness, Some(Readiness::Exited(Some(code))) if code != 0),
        "{:?}",
        readiness
    );

    // Window creation still proceeds
    supervisor.create_window().unwrap();
    assert_eq!(supervisor.phase(), SupervisorPhase::Running);
}

#[tokio::test]
async fn test_readiness_window_elapses() {
    let dir = TempDir::new().unwrap();
    let mut supervisor = supervisor_for(&dir, unused_base_url().await, "sleep", "30");

    supervisor.launch_backend();
    let readiness = supervisor.await_backend_ready().await;

    assert!(matches!(readiness, Some(Readiness::TimedOut(_))), "{:?}", readiness);

    supervisor.terminate();
    assert!(!supervisor.has_backend());
}

#[tokio::test]
async fn test_missing_interpreter_is_not_fatal() {
    let dir = TempDir::new().unwrap();
    let mut supervisor = supervisor_for(
        &dir,
        unused_base_url().await,
        "candlescope-no-such-interpreter",
        "main.py",
    );

    supervisor.launch_backend();
    assert!(!supervisor.has_backend());
    assert!(supervisor.await_backend_ready().await.is_none());

    supervisor.create_window().unwrap();
    supervisor.run().unwrap();
    assert_eq!(supervisor.host().windows, 1);
    assert_eq!(supervisor.phase(), SupervisorPhase::Stopped);
}

#[test]
fn test_direct_kill_is_available_as_fallback() {
    use candlescope::services::ProcessTerminator;
    assert_eq!(DirectKill.name(), "direct");
}

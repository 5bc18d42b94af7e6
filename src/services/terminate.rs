//! Platform-specific teardown of the backend process.
//!
//! The terminator is chosen once, when the supervisor is built, and it also
//! prepares the spawn so that its kill strategy applies (a Unix terminator makes
//! the backend a process-group leader so the whole group can be signalled).

use thiserror::Error;
use tokio::process::{Child, Command};

#[derive(Error, Debug)]
pub enum TerminateError {
    #[error("Failed to run {tool}: {source}")]
    Spawn {
        tool: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} exited with {status}")]
    ToolFailed {
        tool: &'static str,
        status: std::process::ExitStatus,
    },

    #[error("Failed to kill process: {0}")]
    Kill(#[from] std::io::Error),
}

/// Kill strategy for the backend process.
#[cfg_attr(test, mockall::automock)]
pub trait ProcessTerminator: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Adjust the backend command before it is spawned
    fn configure(&self, command: &mut Command);

    /// Best-effort kill; does not wait for the process to exit
    fn terminate(&self, child: &mut Child) -> Result<(), TerminateError>;
}

/// Kill the process handle itself.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectKill;

impl ProcessTerminator for DirectKill {
    fn name(&self) -> &'static str {
        "direct"
    }

    fn configure(&self, _command: &mut Command) {}

    fn terminate(&self, child: &mut Child) -> Result<(), TerminateError> {
        child.start_kill()?;
        Ok(())
    }
}

/// Send SIGTERM to the backend's whole process group.
#[cfg(unix)]
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessGroupKill;

#[cfg(unix)]
impl ProcessTerminator for ProcessGroupKill {
    fn name(&self) -> &'static str {
        "process-group"
    }

    fn configure(&self, command: &mut Command) {
        command.process_group(0);
    }

    fn terminate(&self, child: &mut Child) -> Result<(), TerminateError> {
        let Some(pid) = child.id() else {
            return Ok(());
        };

        // Negative pid addresses the whole process group
        let status = std::process::Command::new("sh")
            .args(["-c", &format!("kill -TERM -{}", pid)])
            .status()
            .map_err(|source| TerminateError::Spawn { tool: "kill", source })?;

        if status.success() {
            Ok(())
        } else {
            Err(TerminateError::ToolFailed { tool: "kill", status })
        }
    }
}

/// Kill the backend and every process it started.
#[cfg(windows)]
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessTreeKill;

#[cfg(windows)]
impl ProcessTerminator for ProcessTreeKill {
    fn name(&self) -> &'static str {
        "process-tree"
    }

    fn configure(&self, _command: &mut Command) {}

    fn terminate(&self, child: &mut Child) -> Result<(), TerminateError> {
        let Some(pid) = child.id() else {
            return Ok(());
        };

        let status = std::process::Command::new("taskkill")
            .args(["/PID", &pid.to_string(), "/T", "/F"])
            .status()
            .map_err(|source| TerminateError::Spawn {
                tool: "taskkill",
                source,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(TerminateError::ToolFailed {
                tool: "taskkill",
                status,
            })
        }
    }
}

/// The terminator for the platform this binary was built for.
pub fn platform_terminator() -> Box<dyn ProcessTerminator> {
    #[cfg(unix)]
    {
        Box::new(ProcessGroupKill)
    }

    #[cfg(windows)]
    {
        Box::new(ProcessTreeKill)
    }

    #[cfg(not(any(unix, windows)))]
    {
        Box::new(DirectKill)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    fn sleeper(terminator: &dyn ProcessTerminator) -> Child {
        let mut command = Command::new("sleep");
        command.arg("30");
        terminator.configure(&mut command);
        command.spawn().unwrap()
    }

    #[tokio::test]
    async fn test_process_group_kill_stops_child() {
        let terminator = ProcessGroupKill;
        let mut child = sleeper(&terminator);

        terminator.terminate(&mut child).unwrap();

        let status = timeout(Duration::from_secs(5), child.wait())
            .await
            .expect("child did not exit")
            .unwrap();
        assert!(!status.success());
    }

    #[tokio::test]
    async fn test_direct_kill_stops_child() {
        let terminator = DirectKill;
        let mut child = sleeper(&terminator);

        terminator.terminate(&mut child).unwrap();

        let status = timeout(Duration::from_secs(5), child.wait())
            .await
            .expect("child did not exit")
            .unwrap();
        assert!(!status.success());
    }

    #[tokio::test]
    async fn test_terminate_after_exit_is_noop() {
        let terminator = ProcessGroupKill;
        let mut child = Command::new("true").spawn().unwrap();
        child.wait().await.unwrap();

        assert!(terminator.terminate(&mut child).is_ok());
    }

    #[test]
    fn test_platform_terminator_is_process_group() {
        assert_eq!(platform_terminator().name(), "process-group");
    }
}

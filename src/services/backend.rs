use crate::models::Settings;
use crate::services::terminate::ProcessTerminator;
use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use reqwest::Client;
use std::process::Stdio;
use std::sync::LazyLock;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};

/// Timeout of a single readiness probe
const PROBE_TIMEOUT: Duration = Duration::from_secs(1);

/// Python logging prefix, e.g. `INFO:     Uvicorn running on http://0.0.0.0:8000`
static LOG_LEVEL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(DEBUG|INFO|WARNING|ERROR|CRITICAL)\s*:").expect("Invalid log level regex")
});

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Failed to spawn backend {program}: {source}")]
    Spawn {
        program: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to build health-check client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Which output stream a backend line came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// Level a backend output line is logged at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendLogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Pick the log level for a line of backend output.
///
/// Lines with a Python logging prefix keep their level; other lines are info on
/// stdout and warn on stderr.
pub fn classify_output_line(line: &str, stream: OutputStream) -> BackendLogLevel {
    match LOG_LEVEL_PATTERN
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
    {
        Some("DEBUG") => BackendLogLevel::Debug,
        Some("INFO") => BackendLogLevel::Info,
        Some("WARNING") => BackendLogLevel::Warn,
        Some("ERROR" | "CRITICAL") => BackendLogLevel::Error,
        _ => match stream {
            OutputStream::Stdout => BackendLogLevel::Info,
            OutputStream::Stderr => BackendLogLevel::Warn,
        },
    }
}

fn log_output_line(line: &str, stream: OutputStream) {
    match classify_output_line(line, stream) {
        BackendLogLevel::Debug => tracing::debug!(target: "backend", "{}", line),
        BackendLogLevel::Info => tracing::info!(target: "backend", "{}", line),
        BackendLogLevel::Warn => tracing::warn!(target: "backend", "{}", line),
        BackendLogLevel::Error => tracing::error!(target: "backend", "{}", line),
    }
}

async fn forward_output<R>(reader: R, stream: OutputStream)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => log_output_line(&line, stream),
            Ok(None) => break,
            Err(e) => {
                tracing::debug!("Backend {:?} stream closed: {}", stream, e);
                break;
            }
        }
    }
}

/// Outcome of the readiness handshake
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    /// The health endpoint answered with a success status
    Ready(Duration),

    /// The readiness window elapsed without a healthy answer
    TimedOut(Duration),

    /// The backend exited before it became ready
    Exited(Option<i32>),
}

/// The spawned backend. Only the supervisor holds one.
#[derive(Debug)]
pub struct BackendProcess {
    child: Child,
    program: Utf8PathBuf,
}

impl BackendProcess {
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    pub fn program(&self) -> &Utf8Path {
        &self.program
    }

    pub(crate) fn child_mut(&mut self) -> &mut Child {
        &mut self.child
    }
}

/// Starts the Python analysis backend and waits for it to serve requests.
#[derive(Debug, Clone)]
pub struct BackendLauncher {
    backend_dir: Utf8PathBuf,
    script: String,
    interpreter: Option<String>,
    health_url: String,
    ready_timeout: Duration,
    poll_interval: Duration,
    probe: Client,
}

impl BackendLauncher {
    pub fn from_settings(settings: &Settings) -> Result<Self, BackendError> {
        let probe = Client::builder().timeout(PROBE_TIMEOUT).build()?;

        Ok(Self {
            backend_dir: settings.backend_dir.clone(),
            script: settings.backend_script.clone(),
            interpreter: settings.backend_interpreter.clone(),
            health_url: settings.health_url(),
            ready_timeout: settings.ready_timeout(),
            poll_interval: settings.ready_poll_interval(),
            probe,
        })
    }

    pub fn backend_dir(&self) -> &Utf8Path {
        &self.backend_dir
    }

    /// Interpreter used to run the backend script.
    ///
    /// An explicit setting wins, then a virtual environment bundled in the
    /// backend directory, then the system interpreter.
    pub fn resolve_interpreter(&self) -> Utf8PathBuf {
        if let Some(ref interpreter) = self.interpreter {
            return Utf8PathBuf::from(interpreter);
        }

        bundled_interpreter_candidates(&self.backend_dir)
            .into_iter()
            .find(|candidate| candidate.is_file())
            .unwrap_or_else(|| Utf8PathBuf::from(system_interpreter()))
    }

    /// Spawn the backend with its output attached to the log.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(&self, terminator: &dyn ProcessTerminator) -> Result<BackendProcess, BackendError> {
        let program = self.resolve_interpreter();

        let mut command = Command::new(program.as_std_path());
        command
            .arg(&self.script)
            .current_dir(&self.backend_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        terminator.configure(&mut command);

        let mut child = command.spawn().map_err(|source| BackendError::Spawn {
            program: program.clone(),
            source,
        })?;

        tracing::info!(
            "Backend started: {} {} (pid {:?}, cwd {})",
            program,
            self.script,
            child.id(),
            self.backend_dir
        );

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_output(stdout, OutputStream::Stdout));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_output(stderr, OutputStream::Stderr));
        }

        Ok(BackendProcess { child, program })
    }

    /// Poll the health endpoint until it answers, the backend exits, or the
    /// readiness window elapses.
    pub async fn wait_until_ready(&self, process: &mut BackendProcess) -> Readiness {
        let start = Instant::now();

        loop {
            if let Ok(Some(status)) = process.child.try_wait() {
                return Readiness::Exited(status.code());
            }

            if self.probe_health().await {
                return Readiness::Ready(start.elapsed());
            }

            if start.elapsed() >= self.ready_timeout {
                return Readiness::TimedOut(start.elapsed());
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn probe_health(&self) -> bool {
        match self.probe.get(&self.health_url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::trace!("Health probe failed: {}", e);
                false
            }
        }
    }
}

fn bundled_interpreter_candidates(backend_dir: &Utf8Path) -> Vec<Utf8PathBuf> {
    let venv = backend_dir.join("venv");

    if cfg!(windows) {
        vec![venv.join("Scripts").join("python.exe")]
    } else {
        vec![venv.join("bin").join("python3"), venv.join("bin").join("python")]
    }
}

fn system_interpreter() -> &'static str {
    if cfg!(windows) { "python" } else { "python3" }
}

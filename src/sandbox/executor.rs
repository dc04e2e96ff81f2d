//! Running commands under `sandbox-exec` with a deadline.
//!
//! The executor turns an [`Invocation`] into a [`RawProcessResult`]. It never
//! fails with an error of its own once the platform check has passed: launch
//! problems, timeouts and signals are all results, so that the normalizer can
//! fold them into a single outcome shape.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::error::{SandboxError, SandboxResult};
use super::process_group::GroupGuard;
use crate::config::SandboxConfig;

/// The only host OS with `sandbox-exec`.
const SUPPORTED_OS: &str = "macos";

/// Size of each read from the child's pipes.
const READ_CHUNK: usize = 8192;

/// Stand-in deadline for timeouts too large to add to the current instant.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Everything needed to launch one sandboxed command.
#[derive(Debug, Clone)]
pub struct Invocation<'a> {
    /// Shell command line, passed verbatim to `<shell> -c`.
    pub command: &'a str,
    /// Staged policy file for `sandbox-exec -f`.
    pub policy_path: &'a Path,
    pub working_dir: Option<&'a Path>,
    pub timeout: Duration,
}

/// Why a process stopped without reporting an exit code.
#[derive(Debug, Clone, PartialEq)]
pub enum Termination {
    /// Killed because the deadline elapsed.
    TimedOut(Duration),
    /// Killed by a signal we did not send (`None` when the platform can't say).
    Signal(Option<i32>),
    /// Waiting on the child failed after it had started.
    WaitFailed(String),
}

impl std::fmt::Display for Termination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Termination::TimedOut(limit) => {
                write!(f, "command timed out after {}s", limit.as_secs_f64())
            }
            Termination::Signal(Some(sig)) => write!(f, "command terminated by signal {sig}"),
            Termination::Signal(None) => write!(f, "command terminated abnormally"),
            Termination::WaitFailed(e) => write!(f, "failed to wait for command: {e}"),
        }
    }
}

/// What happened to the subprocess, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum RawProcessResult {
    /// The process exited on its own with an exit code (zero or not).
    Completed {
        stdout: Vec<u8>,
        stderr: Vec<u8>,
        exit_code: i32,
    },
    /// The process was killed or lost before reporting an exit code.
    /// Output captured up to that point is kept.
    Terminated {
        stdout: Vec<u8>,
        stderr: Vec<u8>,
        cause: Termination,
    },
    /// The process never started.
    LaunchFailed(String),
}

/// Runs a command under a staged policy.
///
/// Implemented by [`SandboxExec`]; tests substitute their own executors to
/// observe whether anything would have been launched.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Fails with `UnsupportedPlatform` when the sandbox facility is missing.
    /// Called before any profile is staged.
    fn check_platform(&self) -> SandboxResult<()>;

    /// Runs the invocation to completion, timeout or launch failure.
    async fn run(&self, invocation: &Invocation<'_>) -> RawProcessResult;
}

/// macOS Seatbelt executor: `sandbox-exec -f <policy> <shell> -c <command>`.
#[derive(Debug, Clone)]
pub struct SandboxExec {
    executable: PathBuf,
    shell: PathBuf,
    host_os: String,
    kill_grace: Duration,
}

impl SandboxExec {
    pub fn new(config: &SandboxConfig) -> Self {
        Self {
            executable: config.executable.clone(),
            shell: config.shell.clone(),
            host_os: std::env::consts::OS.to_string(),
            kill_grace: Duration::from_millis(config.kill_grace_ms),
        }
    }

    /// Overrides the detected host OS.
    #[cfg(test)]
    pub fn with_host_os(mut self, host_os: &str) -> Self {
        self.host_os = host_os.to_string();
        self
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    fn command(&self, invocation: &Invocation<'_>) -> Command {
        let mut cmd = Command::new(&self.executable);
        cmd.arg("-f")
            .arg(invocation.policy_path)
            .arg(&self.shell)
            .arg("-c")
            .arg(invocation.command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = invocation.working_dir {
            cmd.current_dir(dir);
        }
        #[cfg(unix)]
        cmd.process_group(0);
        cmd
    }
}

#[async_trait]
impl Executor for SandboxExec {
    fn check_platform(&self) -> SandboxResult<()> {
        if self.host_os == SUPPORTED_OS && self.executable.is_file() {
            Ok(())
        } else {
            Err(SandboxError::UnsupportedPlatform {
                host_os: self.host_os.clone(),
                executable: self.executable.display().to_string(),
            })
        }
    }

    async fn run(&self, invocation: &Invocation<'_>) -> RawProcessResult {
        let deadline = deadline_after(invocation.timeout);

        let mut child = match self.command(invocation).spawn() {
            Ok(child) => child,
            Err(e) => {
                let mut msg = format!("failed to launch {}: {e}", self.executable.display());
                if let Some(dir) = invocation.working_dir {
                    msg.push_str(&format!(" (working_dir: {})", dir.display()));
                }
                return RawProcessResult::LaunchFailed(msg);
            }
        };

        let mut group = GroupGuard::new(child.id());
        let stdout = OutputPipe::spawn(child.stdout.take());
        let stderr = OutputPipe::spawn(child.stderr.take());

        let waited = tokio::select! {
            status = child.wait() => Some(status),
            _ = tokio::time::sleep_until(deadline) => None,
        };

        match waited {
            Some(Ok(status)) => {
                // Background jobs may still hold the pipes; give them until
                // the deadline, then take the group down.
                let ((stdout, out_done), (stderr, err_done)) =
                    tokio::join!(stdout.drain(deadline), stderr.drain(deadline));
                if out_done && err_done {
                    group.disarm();
                } else {
                    debug!("Output pipes still open at deadline, killing process group");
                    group.kill();
                }
                classify(status, stdout, stderr)
            }
            Some(Err(e)) => {
                group.kill();
                let until = deadline_after(self.kill_grace);
                let ((stdout, _), (stderr, _)) =
                    tokio::join!(stdout.drain(until), stderr.drain(until));
                RawProcessResult::Terminated {
                    stdout,
                    stderr,
                    cause: Termination::WaitFailed(e.to_string()),
                }
            }
            None => {
                warn!(
                    "Command exceeded {}s deadline, killing it",
                    invocation.timeout.as_secs_f64()
                );
                group.kill();
                if let Err(e) = child.kill().await {
                    debug!("kill after timeout: {e}");
                }
                let until = deadline_after(self.kill_grace);
                let ((stdout, _), (stderr, _)) =
                    tokio::join!(stdout.drain(until), stderr.drain(until));
                RawProcessResult::Terminated {
                    stdout,
                    stderr,
                    cause: Termination::TimedOut(invocation.timeout),
                }
            }
        }
    }
}

/// `now + timeout`, saturating to [`FAR_FUTURE`] instead of overflowing.
fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout).unwrap_or(now + FAR_FUTURE)
}

fn classify(status: ExitStatus, stdout: Vec<u8>, stderr: Vec<u8>) -> RawProcessResult {
    match status.code() {
        Some(exit_code) => RawProcessResult::Completed {
            stdout,
            stderr,
            exit_code,
        },
        None => RawProcessResult::Terminated {
            stdout,
            stderr,
            cause: Termination::Signal(exit_signal(&status)),
        },
    }
}

#[cfg(unix)]
fn exit_signal(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: &ExitStatus) -> Option<i32> {
    None
}

/// Background reader for one of the child's output pipes.
///
/// Chunks are forwarded as they arrive, so whatever was written before a
/// kill is still available to [`OutputPipe::drain`]. The reader task is
/// aborted when the pipe is dropped, even if a stray descendant still holds
/// the write end.
struct OutputPipe {
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
    reader: Option<JoinHandle<()>>,
}

impl OutputPipe {
    fn spawn<R>(pipe: Option<R>) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let reader = pipe.map(|mut pipe| {
            tokio::spawn(async move {
                let mut buf = vec![0u8; READ_CHUNK];
                loop {
                    match pipe.read(&mut buf).await {
                        Ok(0) => break,
                        Ok(n) => {
                            if tx.send(buf[..n].to_vec()).is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            debug!("Pipe read error: {e}");
                            break;
                        }
                    }
                }
            })
        });
        Self { rx, reader }
    }

    /// Collects output until EOF or `until`. The flag is `true` on EOF.
    async fn drain(mut self, until: Instant) -> (Vec<u8>, bool) {
        let mut collected = Vec::new();
        loop {
            match tokio::time::timeout_at(until, self.rx.recv()).await {
                Ok(Some(chunk)) => collected.extend_from_slice(&chunk),
                Ok(None) => return (collected, true),
                Err(_) => {
                    // Pick up anything already queued before giving up.
                    while let Ok(chunk) = self.rx.try_recv() {
                        collected.extend_from_slice(&chunk);
                    }
                    return (collected, false);
                }
            }
        }
    }
}

impl Drop for OutputPipe {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}

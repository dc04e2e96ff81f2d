//! The execution pipeline: platform check, profile lookup, staging, run,
//! normalization, release.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use super::error::{SandboxError, SandboxResult};
use super::executor::{Executor, Invocation};
use super::outcome::{normalize, ExecutionOutcome};
use super::profiles;
use super::staging::StagedPolicy;

/// One command to run, with defaults already applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionRequest {
    pub command: String,
    pub profile: String,
    pub working_dir: Option<PathBuf>,
    /// Must be > 0.
    pub timeout_seconds: i64,
}

impl ExecutionRequest {
    fn timeout(&self) -> SandboxResult<Duration> {
        if self.timeout_seconds <= 0 {
            return Err(SandboxError::InvalidRequest(format!(
                "timeout_seconds must be > 0, got {}",
                self.timeout_seconds
            )));
        }
        Ok(Duration::from_secs(self.timeout_seconds as u64))
    }
}

/// Runs requests end to end. Cheap to clone; clones share the executor.
#[derive(Clone)]
pub struct SandboxRunner {
    executor: Arc<dyn Executor>,
    scratch_root: Option<PathBuf>,
}

impl SandboxRunner {
    /// `scratch_root` is where per-execution directories are created; the
    /// system temp dir when `None`.
    pub fn new(executor: Arc<dyn Executor>, scratch_root: Option<PathBuf>) -> Self {
        Self {
            executor,
            scratch_root,
        }
    }

    /// Executes one request.
    ///
    /// Returns `Err` only for request-level failures (unsupported platform,
    /// unknown profile, invalid timeout, staging failure). Everything that
    /// happens after launch is reported through the outcome.
    ///
    /// The scratch directory is removed on every path, including when the
    /// returned future is dropped before completion.
    pub async fn execute(&self, request: &ExecutionRequest) -> SandboxResult<ExecutionOutcome> {
        self.executor.check_platform()?;
        let profile = profiles::resolve(&request.profile)?;
        let timeout = request.timeout()?;

        let staged = StagedPolicy::stage(profile, self.scratch_root.as_deref())?;

        info!(
            "Running command under profile '{}' (timeout {}s)",
            profile.name,
            timeout.as_secs()
        );
        debug!(
            "Command: {} (policy in {})",
            request.command,
            staged.scratch_dir().display()
        );

        let started = Instant::now();
        let raw = self
            .executor
            .run(&Invocation {
                command: &request.command,
                policy_path: staged.path(),
                working_dir: request.working_dir.as_deref(),
                timeout,
            })
            .await;
        staged.release();

        let outcome = normalize(raw);
        info!(
            "Command finished with exit code {} in {}ms",
            outcome.exit_code,
            started.elapsed().as_millis()
        );
        Ok(outcome)
    }
}

impl std::fmt::Debug for SandboxRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SandboxRunner")
            .field("scratch_root", &self.scratch_root)
            .finish_non_exhaustive()
    }
}

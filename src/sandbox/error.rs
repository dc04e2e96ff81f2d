//! Error types for the sandbox pipeline.

/// Request-level failures of the sandbox pipeline.
///
/// Launch failures and abnormal terminations are not errors here: they are
/// folded into [`ExecutionOutcome`](super::outcome::ExecutionOutcome) by the
/// normalizer so that the caller always learns what happened to the process.
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    #[error("this tool only works on macOS with {executable} available (host: {host_os})")]
    UnsupportedPlatform { host_os: String, executable: String },

    #[error("profile '{0}' not found")]
    ProfileNotFound(String),

    #[error("failed to stage sandbox profile: {0}")]
    StagingFailure(#[source] std::io::Error),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Result type for sandbox operations.
pub type SandboxResult<T> = std::result::Result<T, SandboxError>;

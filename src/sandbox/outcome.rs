//! Normalization of raw process results into a single outcome shape.

use serde::{Deserialize, Serialize};

use super::executor::RawProcessResult;

/// Exit code reported when the failure is not a process exit.
pub const SENTINEL_EXIT_CODE: i32 = 1;

/// What the caller gets back for every execution that reached launch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// Folds every raw result into an [`ExecutionOutcome`].
///
/// Launch failures and terminations are not distinguished from application
/// failures except through `exit_code` and `stderr`.
pub fn normalize(raw: RawProcessResult) -> ExecutionOutcome {
    match raw {
        RawProcessResult::Completed {
            stdout,
            stderr,
            exit_code,
        } => ExecutionOutcome {
            stdout: lossy(stdout),
            stderr: lossy(stderr),
            exit_code,
        },
        RawProcessResult::Terminated {
            stdout,
            stderr,
            cause,
        } => {
            let mut stderr = lossy(stderr);
            if !stderr.is_empty() && !stderr.ends_with('\n') {
                stderr.push('\n');
            }
            stderr.push_str(&cause.to_string());
            ExecutionOutcome {
                stdout: lossy(stdout),
                stderr,
                exit_code: SENTINEL_EXIT_CODE,
            }
        }
        RawProcessResult::LaunchFailed(error) => ExecutionOutcome {
            stdout: String::new(),
            stderr: error,
            exit_code: SENTINEL_EXIT_CODE,
        },
    }
}

fn lossy(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::executor::Termination;
    use std::time::Duration;

    #[test]
    fn test_completed_is_verbatim() {
        let outcome = normalize(RawProcessResult::Completed {
            stdout: b"hello\n".to_vec(),
            stderr: b"warn\n".to_vec(),
            exit_code: 0,
        });
        assert_eq!(
            outcome,
            ExecutionOutcome {
                stdout: "hello\n".into(),
                stderr: "warn\n".into(),
                exit_code: 0,
            }
        );
    }

    #[test]
    fn test_completed_non_zero_keeps_code() {
        let outcome = normalize(RawProcessResult::Completed {
            stdout: vec![],
            stderr: vec![],
            exit_code: 7,
        });
        assert_eq!(outcome.exit_code, 7);
        assert!(outcome.stdout.is_empty());
        assert!(outcome.stderr.is_empty());
    }

    #[test]
    fn test_timeout_preserves_output_and_is_non_zero() {
        let outcome = normalize(RawProcessResult::Terminated {
            stdout: b"partial".to_vec(),
            stderr: b"halfway".to_vec(),
            cause: Termination::TimedOut(Duration::from_secs(1)),
        });
        assert_eq!(outcome.stdout, "partial");
        assert_eq!(outcome.stderr, "halfway\ncommand timed out after 1s");
        assert_eq!(outcome.exit_code, SENTINEL_EXIT_CODE);
    }

    #[test]
    fn test_signal_uses_sentinel_code() {
        let outcome = normalize(RawProcessResult::Terminated {
            stdout: vec![],
            stderr: vec![],
            cause: Termination::Signal(Some(9)),
        });
        assert_eq!(outcome.exit_code, SENTINEL_EXIT_CODE);
        assert_eq!(outcome.stderr, "command terminated by signal 9");
    }

    #[test]
    fn test_stderr_gets_newline_before_cause() {
        let outcome = normalize(RawProcessResult::Terminated {
            stdout: vec![],
            stderr: b"line\n".to_vec(),
            cause: Termination::Signal(None),
        });
        assert_eq!(outcome.stderr, "line\ncommand terminated abnormally");
        assert_ne!(outcome.exit_code, 0);
    }

    #[test]
    fn test_launch_failure() {
        let outcome = normalize(RawProcessResult::LaunchFailed(
            "failed to launch /usr/bin/sandbox-exec: No such file or directory".into(),
        ));
        assert_eq!(outcome.stdout, "");
        assert!(outcome.stderr.contains("failed to launch"));
        assert_eq!(outcome.exit_code, 1);
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let outcome = normalize(RawProcessResult::Completed {
            stdout: vec![b'o', b'k', 0xff],
            stderr: vec![],
            exit_code: 0,
        });
        assert_eq!(outcome.stdout, "ok\u{fffd}");
    }

    #[test]
    fn test_outcome_json_field_names() {
        let outcome = ExecutionOutcome {
            stdout: "a".into(),
            stderr: "b".into(),
            exit_code: 3,
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json, serde_json::json!({"stdout": "a", "stderr": "b", "exit_code": 3}));
    }
}

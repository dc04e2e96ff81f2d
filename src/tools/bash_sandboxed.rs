//! Builtin tool: run a shell command under a macOS sandbox profile.
//!
//! Argument decoding and defaults live here; everything else is delegated
//! to [`SandboxRunner`].

use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use crate::config::SandboxConfig;
use crate::sandbox::{profiles, ExecutionRequest, SandboxRunner};
use crate::tools::{Tool, ToolError};

#[derive(Debug, Deserialize)]
struct BashSandboxedArgs {
    command: String,
    #[serde(default)]
    profile: Option<String>,
    #[serde(default)]
    working_dir: Option<PathBuf>,
    #[serde(default)]
    timeout_seconds: Option<i64>,
}

pub struct BashSandboxedTool {
    runner: SandboxRunner,
    default_profile: String,
    default_timeout_secs: i64,
}

impl BashSandboxedTool {
    pub fn new(runner: SandboxRunner, config: &SandboxConfig) -> Self {
        Self {
            runner,
            default_profile: config.default_profile.clone(),
            default_timeout_secs: config.default_timeout_secs,
        }
    }

    fn request(&self, args: BashSandboxedArgs) -> ExecutionRequest {
        ExecutionRequest {
            command: args.command,
            profile: args.profile.unwrap_or_else(|| self.default_profile.clone()),
            working_dir: args.working_dir,
            timeout_seconds: args.timeout_seconds.unwrap_or(self.default_timeout_secs),
        }
    }
}

#[async_trait]
impl Tool for BashSandboxedTool {
    fn name(&self) -> &str {
        "bash_sandboxed"
    }

    fn description(&self) -> &str {
        "Run a command in a MacOS sandbox"
    }

    fn input_schema(&self) -> Value {
        let profile_names: Vec<&str> = profiles::names().collect();
        json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "Shell command to run"
                },
                "profile": {
                    "type": "string",
                    "description": "Preset name",
                    "enum": profile_names,
                    "default": self.default_profile
                },
                "working_dir": {
                    "type": "string",
                    "description": "Working directory for the command"
                },
                "timeout_seconds": {
                    "type": "integer",
                    "description": "Timeout in seconds",
                    "default": self.default_timeout_secs,
                    "exclusiveMinimum": 0
                }
            },
            "required": ["command"]
        })
    }

    fn output_schema(&self) -> Option<Value> {
        Some(json!({
            "type": "object",
            "properties": {
                "stdout": {
                    "type": "string",
                    "description": "Standard output from the command"
                },
                "stderr": {
                    "type": "string",
                    "description": "Standard error from the command"
                },
                "exit_code": {
                    "type": "integer",
                    "description": "Exit code of the command"
                }
            },
            "required": ["stdout", "stderr", "exit_code"]
        }))
    }

    async fn call(&self, arguments: Value) -> Result<Value, ToolError> {
        let args: BashSandboxedArgs = serde_json::from_value(arguments)
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;
        let request = self.request(args);

        let outcome = self.runner.execute(&request).await.map_err(|e| {
            warn!("bash_sandboxed rejected: {e}");
            ToolError::Execution(e.to_string())
        })?;

        serde_json::to_value(outcome).map_err(|e| ToolError::Execution(e.to_string()))
    }
}

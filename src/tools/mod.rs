pub mod bash_sandboxed;
pub mod registry;

use async_trait::async_trait;
use serde_json::Value;

/// Why a tool call produced no structured result.
///
/// Both variants are reported to the client as a tool result with
/// `isError: true`, not as a JSON-RPC error.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("failed to bind arguments: {0}")]
    InvalidArguments(String),

    #[error("tool execution failed: {0}")]
    Execution(String),
}

/// A tool exposed to MCP clients via `tools/list` and `tools/call`.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique identifier, lowercase alphanumeric + underscores.
    fn name(&self) -> &str;

    /// Human-readable description shown to the model.
    fn description(&self) -> &str;

    /// JSON Schema of the `arguments` object.
    fn input_schema(&self) -> Value;

    /// JSON Schema of the structured result, if the tool declares one.
    fn output_schema(&self) -> Option<Value> {
        None
    }

    /// Runs the tool and returns its structured result.
    async fn call(&self, arguments: Value) -> Result<Value, ToolError>;
}

pub use bash_sandboxed::BashSandboxedTool;
pub use registry::ToolRegistry;

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use rmcp::handler::server::ServerHandler;
use rmcp::model::{
    CallToolRequestParam, CallToolResult, Content, JsonObject, ListToolsResult,
    PaginatedRequestParam, ServerCapabilities, ServerInfo,
};
use rmcp::service::{RequestContext, RoleServer};
use rmcp::ErrorData;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::tools::{Tool, ToolRegistry};

/// MCP server handler exposing a [`ToolRegistry`].
///
/// rmcp runs each `tools/call` in its own task and cancels the request
/// context when the client sends `notifications/cancelled` or the session
/// ends. The tool future is dropped at that point, which kills the
/// subprocess and removes its staged profile.
#[derive(Clone)]
pub struct SandboxServer {
    name: String,
    version: String,
    tools: Arc<ToolRegistry>,
}

impl SandboxServer {
    pub fn new(name: impl Into<String>, version: impl Into<String>, tools: ToolRegistry) -> Self {
        if tools.is_empty() {
            warn!("No tools registered; tools/list will be empty");
        }
        Self {
            name: name.into(),
            version: version.into(),
            tools: Arc::new(tools),
        }
    }

    /// Runs the named tool until it finishes or `cancelled` resolves.
    ///
    /// Tool failures become `isError` results. An unknown tool is an
    /// invalid-params error and a panicking tool an internal error, so the
    /// client always gets a response.
    async fn dispatch<C>(
        &self,
        name: &str,
        arguments: Value,
        cancelled: C,
    ) -> Result<CallToolResult, ErrorData>
    where
        C: Future<Output = ()>,
    {
        let Some(tool) = self.tools.get(name) else {
            return Err(ErrorData::invalid_params(
                format!("Unknown tool: {name}"),
                None,
            ));
        };

        info!("Calling tool {name}");
        let call = AssertUnwindSafe(tool.call(arguments)).catch_unwind();
        tokio::select! {
            result = call => match result {
                Ok(Ok(structured)) => Ok(CallToolResult::structured(structured)),
                Ok(Err(e)) => {
                    warn!("Tool {name} failed: {e}");
                    Ok(CallToolResult::error(vec![Content::text(e.to_string())]))
                }
                Err(panic) => {
                    let reason = panic_message(panic.as_ref());
                    error!("Tool {name} panicked: {reason}");
                    Err(ErrorData::internal_error(
                        format!("tool {name} panicked: {reason}"),
                        None,
                    ))
                }
            },
            _ = cancelled => {
                info!("Call to {name} cancelled");
                Err(ErrorData::internal_error("request cancelled", None))
            }
        }
    }
}

impl ServerHandler for SandboxServer {
    fn get_info(&self) -> ServerInfo {
        let mut info = ServerInfo::default();
        info.capabilities = ServerCapabilities::builder().enable_tools().build();
        info.server_info.name = self.name.clone();
        info.server_info.version = self.version.clone();
        info
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        let tools = self.tools.iter().map(|tool| describe_tool(tool.as_ref())).collect();
        Ok(ListToolsResult::with_all_items(tools))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        let arguments = Value::Object(request.arguments.unwrap_or_default());
        debug!("tools/call {} {arguments}", request.name);
        self.dispatch(&request.name, arguments, context.ct.cancelled())
            .await
    }
}

fn describe_tool(tool: &dyn Tool) -> rmcp::model::Tool {
    let mut described = rmcp::model::Tool::new(
        tool.name().to_string(),
        tool.description().to_string(),
        Arc::new(schema_object(tool.input_schema())),
    );
    described.output_schema = tool.output_schema().map(|s| Arc::new(schema_object(s)));
    described
}

fn schema_object(schema: Value) -> JsonObject {
    match schema {
        Value::Object(map) => map,
        other => {
            warn!("Tool schema is not an object: {other}");
            JsonObject::new()
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

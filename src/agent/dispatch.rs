//! Concurrent tool-call dispatch.
//!
//! Every call in a batch runs on its own tokio task and the batch is joined
//! before returning. A call that fails (unknown tool, bad arguments, tool error,
//! even a panic) yields an error result for its own `call_id` only.

use std::sync::Arc;

use futures::future::join_all;
use serde_json::Value;

use crate::llm::ToolCall;
use crate::tools::{ToolError, ToolRegistry};

/// Outcome of one tool call, addressed by the id of the call that requested it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolResult {
    pub call_id: String,
    pub tool_name: String,
    pub content: String,
    pub is_error: bool,
}

impl ToolResult {
    fn ok(call: &ToolCall, content: String) -> Self {
        Self {
            call_id: call.id.clone(),
            tool_name: call.function.name.clone(),
            content,
            is_error: false,
        }
    }

    fn error(call: &ToolCall, message: impl std::fmt::Display) -> Self {
        Self {
            call_id: call.id.clone(),
            tool_name: call.function.name.clone(),
            content: format!("Error: {}", message),
            is_error: true,
        }
    }
}

/// Resolves tool calls against a registry and runs them concurrently.
#[derive(Clone)]
pub struct ToolDispatcher {
    registry: Arc<ToolRegistry>,
}

impl ToolDispatcher {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Run a batch of calls, one task per call, and return one result per call
    /// in request order.
    pub async fn dispatch(&self, calls: &[ToolCall]) -> Vec<ToolResult> {
        if calls.is_empty() {
            return Vec::new();
        }

        tracing::debug!("Dispatching {} tool call(s)", calls.len());

        let handles: Vec<_> = calls
            .iter()
            .cloned()
            .map(|call| {
                let registry = Arc::clone(&self.registry);
                tokio::spawn(async move { execute_call(&registry, &call).await })
            })
            .collect();

        calls
            .iter()
            .zip(join_all(handles).await)
            .map(|(call, joined)| match joined {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!(
                        "Tool task for {} ({}) failed: {}",
                        call.function.name,
                        call.id,
                        e
                    );
                    ToolResult::error(call, format!("tool task failed: {}", e))
                }
            })
            .collect()
    }
}

async fn execute_call(registry: &ToolRegistry, call: &ToolCall) -> ToolResult {
    tracing::info!(
        "Calling tool: {} ({}) with args: {}",
        call.function.name,
        call.id,
        call.function.arguments
    );

    // Unknown names win over malformed arguments.
    if registry.get(&call.function.name).is_none() {
        let err = ToolError::UnknownTool(call.function.name.clone());
        tracing::warn!("{} ({})", err, call.id);
        return ToolResult::error(call, err);
    }

    let args = match decode_arguments(&call.function.name, &call.function.arguments) {
        Ok(args) => args,
        Err(e) => return ToolResult::error(call, e),
    };

    match registry.execute(&call.function.name, args).await {
        Ok(output) => ToolResult::ok(call, output),
        Err(e) => {
            tracing::warn!("Tool {} ({}) failed: {}", call.function.name, call.id, e);
            ToolResult::error(call, e)
        }
    }
}

/// Decode the serialized arguments object. Blank input means no arguments.
fn decode_arguments(tool: &str, raw: &str) -> Result<Value, ToolError> {
    if raw.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_str(raw).map_err(|e| ToolError::InvalidArguments {
        tool: tool.to_string(),
        reason: e.to_string(),
    })
}

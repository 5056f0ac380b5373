//! Function-calling turn loop.

use async_trait::async_trait;

use super::prompt::build_function_prompt;
use super::{AgentError, AgentRuntime, Conversation, TurnEvent, TurnReporter, TurnRunner};

/// Agent that lets the model call tools through native function calling.
pub struct FunctionAgent {
    runtime: AgentRuntime,
}

impl FunctionAgent {
    pub fn new(runtime: AgentRuntime) -> Self {
        Self { runtime }
    }
}

#[async_trait]
impl TurnRunner for FunctionAgent {
    fn new_conversation(&self) -> Conversation {
        Conversation::with_system_prompt(build_function_prompt(self.runtime.tools()))
    }

    async fn run_turn(
        &self,
        conversation: &mut Conversation,
        input: &str,
        reporter: &dyn TurnReporter,
    ) -> Result<String, AgentError> {
        conversation.push_user(input);

        let tool_schemas = self.runtime.tools().get_tool_schemas();
        let max_iterations = self.runtime.max_iterations();

        for iteration in 0..max_iterations {
            tracing::debug!("Agent iteration {}", iteration + 1);

            let response = self
                .runtime
                .complete(conversation.messages(), Some(tool_schemas.as_slice()), None)
                .await?;

            if !response.tool_calls.is_empty() {
                if let Some(text) = response.final_text() {
                    reporter.report(TurnEvent::Plan(text));
                }
                for call in &response.tool_calls {
                    reporter.report(TurnEvent::ToolCall(call));
                }

                let calls = response.tool_calls;
                conversation.push_tool_calls(response.content, calls.clone());

                // Every call id gets its result before the next model call.
                for result in self.runtime.dispatcher().dispatch(&calls).await {
                    reporter.report(TurnEvent::Observation(&result));
                    conversation.push_tool_result(result.call_id, result.content);
                }
                continue;
            }

            // No tool calls - this is the final response
            return match response.final_text() {
                Some(text) => {
                    conversation.push_assistant(text);
                    Ok(text.to_string())
                }
                None => Err(AgentError::EmptyResponse),
            };
        }

        Err(AgentError::MaxIterations(max_iterations))
    }
}

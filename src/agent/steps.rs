//! Structured-step turn loop.
//!
//! The model is constrained to answer with one JSON [`StepOutput`] per call.
//! START and PLAN steps are reported and the loop continues, a TOOL step is
//! dispatched and answered with an OBSERVE entry, and OUTPUT ends the turn.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::llm::{ResponseSchema, ToolCall};
use crate::tools::ToolRegistry;

use super::prompt::build_step_prompt;
use super::{AgentError, AgentRuntime, Conversation, TurnEvent, TurnReporter, TurnRunner};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StepKind {
    Start,
    Plan,
    Tool,
    Observe,
    Output,
}

/// One reasoning step produced by the model (or an OBSERVE produced by us).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepOutput {
    pub step: StepKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

impl StepOutput {
    pub fn parse(raw: &str) -> Result<Self, AgentError> {
        serde_json::from_str(strip_code_fence(raw))
            .map_err(|e| AgentError::InvalidStep(format!("{}: {}", e, raw)))
    }

    pub fn observe(tool: Option<String>, input: Option<String>, output: String) -> Self {
        Self {
            step: StepKind::Observe,
            content: None,
            tool,
            input,
            output: Some(output),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Text carried by the step, preferring `content` over `output`.
    pub fn text(&self) -> &str {
        self.content
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .or(self.output.as_deref())
            .unwrap_or("")
    }
}

/// Schema the model's JSON answer must match.
pub fn step_response_schema() -> ResponseSchema {
    ResponseSchema {
        name: "agent_step".to_string(),
        schema: json!({
            "type": "object",
            "properties": {
                "step": {
                    "type": "string",
                    "enum": ["START", "PLAN", "TOOL", "OBSERVE", "OUTPUT"]
                },
                "content": {"type": "string"},
                "tool": {"type": "string"},
                "input": {"type": "string"},
                "output": {"type": "string"}
            },
            "required": ["step"]
        }),
    }
}

/// Some models wrap JSON in a markdown fence even in JSON mode.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|s| s.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed)
}

/// Turn a TOOL step's `input` into a serialized arguments object.
///
/// A JSON object is passed through. Any other value is bound to the tool's
/// single required parameter when it has exactly one, so `"Paris"` becomes
/// `{"location": "Paris"}` for `get_weather`.
fn tool_arguments(tools: &ToolRegistry, tool: &str, input: Option<&str>) -> String {
    let raw = input.unwrap_or("").trim();
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(raw) {
        return Value::Object(map).to_string();
    }

    let sole_required = tools.get(tool).and_then(|t| {
        let schema = t.parameters_schema();
        match schema["required"].as_array().map(Vec::as_slice) {
            Some([Value::String(name)]) => Some(name.clone()),
            _ => None,
        }
    });

    match sole_required {
        Some(param) if !raw.is_empty() => {
            let value = serde_json::from_str::<Value>(raw)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_else(|| raw.to_string());
            json!({ param: value }).to_string()
        }
        _ => raw.to_string(),
    }
}

/// Agent that reasons in explicit JSON steps.
pub struct StepAgent {
    runtime: AgentRuntime,
}

impl StepAgent {
    pub fn new(runtime: AgentRuntime) -> Self {
        Self { runtime }
    }

    /// Dispatch a TOOL step and build the OBSERVE entry answering it.
    async fn run_tool_step(&self, step: &StepOutput, reporter: &dyn TurnReporter) -> StepOutput {
        let name = step.tool.clone().unwrap_or_default();
        let arguments = tool_arguments(self.runtime.tools(), &name, step.input.as_deref());
        let call = ToolCall::new(uuid::Uuid::new_v4().to_string(), name, arguments);
        reporter.report(TurnEvent::ToolCall(&call));

        let output = match self
            .runtime
            .dispatcher()
            .dispatch(std::slice::from_ref(&call))
            .await
            .pop()
        {
            Some(result) => {
                reporter.report(TurnEvent::Observation(&result));
                result.content
            }
            None => "Error: tool produced no result".to_string(),
        };

        StepOutput::observe(step.tool.clone(), step.input.clone(), output)
    }
}

#[async_trait]
impl TurnRunner for StepAgent {
    fn new_conversation(&self) -> Conversation {
        Conversation::with_system_prompt(build_step_prompt(self.runtime.tools()))
    }

    async fn run_turn(
        &self,
        conversation: &mut Conversation,
        input: &str,
        reporter: &dyn TurnReporter,
    ) -> Result<String, AgentError> {
        conversation.push_user(input);

        let schema = step_response_schema();
        let max_iterations = self.runtime.max_iterations();

        for iteration in 0..max_iterations {
            tracing::debug!("Step iteration {}", iteration + 1);

            let response = self
                .runtime
                .complete(conversation.messages(), None, Some(&schema))
                .await?;
            let raw = response.final_text().ok_or(AgentError::EmptyResponse)?;
            let step = StepOutput::parse(raw)?;

            // Each step is its own assistant entry; nothing is coalesced.
            conversation.push_assistant(step.to_json());

            match step.step {
                StepKind::Start => reporter.report(TurnEvent::Start(step.text())),
                StepKind::Plan => reporter.report(TurnEvent::Plan(step.text())),
                StepKind::Observe => {
                    tracing::debug!("Ignoring model-authored OBSERVE step");
                }
                StepKind::Tool => {
                    let observation = self.run_tool_step(&step, reporter).await;
                    conversation.push_user(observation.to_json());
                }
                StepKind::Output => {
                    let text = step.text().trim();
                    if text.is_empty() {
                        return Err(AgentError::EmptyResponse);
                    }
                    return Ok(text.to_string());
                }
            }
        }

        Err(AgentError::MaxIterations(max_iterations))
    }
}

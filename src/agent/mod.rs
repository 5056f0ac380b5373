//! Agent module - the conversational turn loop.
//!
//! The agent follows a "tools in a loop" pattern:
//! 1. Append the user input to the conversation
//! 2. Call the LLM with the conversation and available tools
//! 3. If the LLM requests tool calls, run them concurrently and feed the results back
//! 4. Repeat until the LLM produces a final answer
//!
//! Two loops implement [`TurnRunner`]: [`FunctionAgent`] uses native function
//! calling, [`StepAgent`] drives schema-constrained START/PLAN/TOOL/OUTPUT steps.

mod agent_loop;
mod conversation;
mod dispatch;
mod prompt;
mod retry;
mod runtime;
mod steps;

pub use agent_loop::FunctionAgent;
pub use conversation::Conversation;
pub use dispatch::{ToolDispatcher, ToolResult};
pub use prompt::{build_function_prompt, build_step_prompt};
pub use retry::{RetryPolicy, Sleeper, TokioSleeper};
pub use runtime::AgentRuntime;
pub use steps::{StepAgent, StepKind, StepOutput};

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{AgentMode, Config};
use crate::llm::{LlmError, ToolCall};

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("LLM returned empty response")]
    EmptyResponse,

    #[error("LLM returned an invalid step: {0}")]
    InvalidStep(String),

    #[error("Max iterations ({0}) reached without completion")]
    MaxIterations(usize),
}

/// Progress notifications emitted while a turn runs.
#[derive(Debug, Clone, Copy)]
pub enum TurnEvent<'a> {
    Start(&'a str),
    Plan(&'a str),
    ToolCall(&'a ToolCall),
    Observation(&'a ToolResult),
}

/// Receives [`TurnEvent`]s, e.g. to print them.
pub trait TurnReporter: Send + Sync {
    fn report(&self, event: TurnEvent<'_>);
}

/// One turn: user input in, final answer out.
#[async_trait]
pub trait TurnRunner: Send + Sync {
    /// A fresh conversation seeded with this loop's system prompt.
    fn new_conversation(&self) -> Conversation;

    async fn run_turn(
        &self,
        conversation: &mut Conversation,
        input: &str,
        reporter: &dyn TurnReporter,
    ) -> Result<String, AgentError>;
}

/// Build the turn loop selected by `config.mode`.
pub fn build_agent(config: &Config) -> Box<dyn TurnRunner> {
    let runtime = AgentRuntime::from_config(config);
    match config.mode {
        AgentMode::Functions => Box::new(FunctionAgent::new(runtime)),
        AgentMode::Steps => Box::new(StepAgent::new(runtime)),
    }
}

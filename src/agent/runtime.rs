//! Shared plumbing for both turn loops: model client, tools, retry policy.

use std::sync::Arc;

use crate::config::Config;
use crate::llm::{
    ChatMessage, ChatRequest, ChatResponse, LlmClient, LlmError, OpenAiCompatibleClient,
    ResponseSchema, ToolDefinition,
};
use crate::tools::ToolRegistry;

use super::dispatch::ToolDispatcher;
use super::retry::{RetryPolicy, Sleeper, TokioSleeper};

/// Everything a turn loop needs to talk to the model and run tools.
#[derive(Clone)]
pub struct AgentRuntime {
    llm: Arc<dyn LlmClient>,
    dispatcher: ToolDispatcher,
    model: String,
    temperature: Option<f32>,
    max_iterations: usize,
    retry: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl AgentRuntime {
    pub fn new(llm: Arc<dyn LlmClient>, tools: ToolRegistry, model: impl Into<String>) -> Self {
        Self {
            llm,
            dispatcher: ToolDispatcher::new(Arc::new(tools)),
            model: model.into(),
            temperature: None,
            max_iterations: crate::config::DEFAULT_MAX_ITERATIONS,
            retry: RetryPolicy::default(),
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Runtime wired to the configured OpenAI-compatible backend and the weather tool.
    pub fn from_config(config: &Config) -> Self {
        let llm = Arc::new(OpenAiCompatibleClient::new(
            config.api_key.clone(),
            config.base_url.clone(),
        ));
        let tools = ToolRegistry::with_defaults(config.weather.clone());

        Self::new(llm, tools, config.default_model.clone())
            .with_temperature(config.temperature)
            .with_max_iterations(config.max_iterations)
            .with_retry(RetryPolicy::fixed(config.rate_limit_delay))
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn dispatcher(&self) -> &ToolDispatcher {
        &self.dispatcher
    }

    pub fn tools(&self) -> &ToolRegistry {
        self.dispatcher.registry()
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// One model call, retried in place while the provider rate-limits us.
    pub async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[ToolDefinition]>,
        response_schema: Option<&ResponseSchema>,
    ) -> Result<ChatResponse, LlmError> {
        let llm = self.llm.as_ref();
        let model = self.model.as_str();
        let temperature = self.temperature;

        self.retry
            .run(self.sleeper.as_ref(), move || {
                llm.chat_completion(ChatRequest {
                    model,
                    messages,
                    tools,
                    response_schema,
                    temperature,
                })
            })
            .await
    }
}

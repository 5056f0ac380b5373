//! OpenAI-compatible chat completions client.
//!
//! Works against any backend that speaks `POST {base}/chat/completions`
//! (OpenAI, Gemini's compatibility endpoint, OpenRouter, local proxies).

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{ChatMessage, ChatRequest, ChatResponse, LlmClient, LlmError, ToolCall, ToolDefinition};

/// Client for an OpenAI-compatible chat completions endpoint.
pub struct OpenAiCompatibleClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAiCompatibleClient {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[derive(Debug, Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [ToolDefinition]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCall>>,
}

#[async_trait]
impl LlmClient for OpenAiCompatibleClient {
    async fn chat_completion(&self, request: ChatRequest<'_>) -> Result<ChatResponse, LlmError> {
        let body = CompletionBody {
            model: request.model,
            messages: request.messages,
            tools: request.tools.filter(|t| !t.is_empty()),
            response_format: request.response_schema.map(|s| {
                json!({
                    "type": "json_schema",
                    "json_schema": {
                        "name": s.name,
                        "schema": s.schema,
                    }
                })
            }),
            temperature: request.temperature,
        };

        tracing::debug!(
            "POST {} model={} messages={}",
            self.endpoint(),
            request.model,
            request.messages.len()
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(LlmError::RateLimited { retry_after });
        }

        let text = response.text().await?;
        if !status.is_success() {
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: extract_error_message(&text),
            });
        }

        let parsed: CompletionResponse =
            serde_json::from_str(&text).map_err(|e| LlmError::Decode(e.to_string()))?;
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or(LlmError::EmptyChoices)?;

        Ok(ChatResponse {
            content: choice.message.content,
            tool_calls: choice.message.tool_calls.unwrap_or_default(),
        })
    }
}

/// Pull `error.message` out of a provider error body, falling back to the raw text.
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            // Gemini wraps errors in a one-element array.
            let v = match v {
                Value::Array(mut items) if !items.is_empty() => items.remove(0),
                other => other,
            };
            v["error"]["message"].as_str().map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}

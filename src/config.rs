//! Configuration management for the weather agent.
//!
//! Configuration can be set via environment variables:
//! - `LLM_API_KEY` - Required. API key for the model backend (falls back to `GEMINI_API_KEY`).
//! - `LLM_BASE_URL` - Required. OpenAI-compatible base URL (falls back to `GEMINI_BASE_URL`).
//! - `DEFAULT_MODEL` - Optional. Model identifier. Defaults to `gemini-2.5-flash`.
//! - `AGENT_MODE` - Optional. `functions` or `steps`. Defaults to `functions`.
//! - `MAX_ITERATIONS` - Optional. Maximum model calls per turn. Defaults to `50`.
//! - `RATE_LIMIT_DELAY_SECS` - Optional. Wait before retrying a rate-limited call.
//!   Defaults to `60`.
//! - `WEATHER_BASE_URL` - Optional. Weather provider root. Defaults to `https://wttr.in`.
//! - `WEATHER_TIMEOUT_SECS` - Optional. Weather request timeout. Defaults to `11`.
//! - `TEMPERATURE` - Optional. Sampling temperature passed to the model.

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_WEATHER_BASE_URL: &str = "https://wttr.in";
pub const DEFAULT_WEATHER_TIMEOUT_SECS: u64 = 11;
pub const DEFAULT_RATE_LIMIT_DELAY_SECS: u64 = 60;
pub const DEFAULT_MAX_ITERATIONS: usize = 50;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Which turn loop drives the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentMode {
    /// Native function calling: the model returns `tool_calls` with call ids.
    Functions,
    /// Schema-constrained JSON steps (START / PLAN / TOOL / OBSERVE / OUTPUT).
    Steps,
}

impl FromStr for AgentMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "functions" | "function" | "tools" => Ok(Self::Functions),
            "steps" | "step" | "cot" => Ok(Self::Steps),
            other => Err(format!("expected `functions` or `steps`, got: {}", other)),
        }
    }
}

/// Weather tool configuration.
#[derive(Debug, Clone)]
pub struct WeatherConfig {
    /// Provider root, without trailing slash
    pub base_url: String,

    /// Value of the `format` query parameter
    pub format: String,

    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_WEATHER_BASE_URL.to_string(),
            format: "%C+%t".to_string(),
            timeout: Duration::from_secs(DEFAULT_WEATHER_TIMEOUT_SECS),
        }
    }
}

/// Agent configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Model backend API key
    pub api_key: String,

    /// OpenAI-compatible base URL of the model backend
    pub base_url: String,

    /// Model identifier sent with every request
    pub default_model: String,

    /// Sampling temperature (provider default when unset)
    pub temperature: Option<f32>,

    /// Turn loop variant
    pub mode: AgentMode,

    /// Maximum model calls within one turn
    pub max_iterations: usize,

    /// Fixed delay before retrying a rate-limited model call
    pub rate_limit_delay: Duration,

    /// Weather tool configuration
    pub weather: WeatherConfig,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if the API key or base URL is not set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = env_with_fallback("LLM_API_KEY", "GEMINI_API_KEY")?;
        let base_url = env_with_fallback("LLM_BASE_URL", "GEMINI_BASE_URL")?;

        let default_model =
            std::env::var("DEFAULT_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let mode = std::env::var("AGENT_MODE")
            .ok()
            .map(|v| {
                v.parse::<AgentMode>()
                    .map_err(|e| ConfigError::InvalidValue("AGENT_MODE".to_string(), e))
            })
            .transpose()?
            .unwrap_or(AgentMode::Functions);

        let max_iterations = parse_env("MAX_ITERATIONS", DEFAULT_MAX_ITERATIONS)?;
        let rate_limit_delay = Duration::from_secs(parse_env(
            "RATE_LIMIT_DELAY_SECS",
            DEFAULT_RATE_LIMIT_DELAY_SECS,
        )?);

        let temperature = std::env::var("TEMPERATURE")
            .ok()
            .map(|v| {
                v.parse::<f32>().map_err(|e| {
                    ConfigError::InvalidValue("TEMPERATURE".to_string(), format!("{}", e))
                })
            })
            .transpose()?;

        let weather = WeatherConfig {
            base_url: std::env::var("WEATHER_BASE_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| DEFAULT_WEATHER_BASE_URL.to_string()),
            timeout: Duration::from_secs(parse_env(
                "WEATHER_TIMEOUT_SECS",
                DEFAULT_WEATHER_TIMEOUT_SECS,
            )?),
            ..WeatherConfig::default()
        };

        Ok(Self {
            api_key,
            base_url,
            default_model,
            temperature,
            mode,
            max_iterations,
            rate_limit_delay,
            weather,
        })
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(api_key: String, base_url: String) -> Self {
        Self {
            api_key,
            base_url,
            default_model: DEFAULT_MODEL.to_string(),
            temperature: None,
            mode: AgentMode::Functions,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            rate_limit_delay: Duration::from_secs(DEFAULT_RATE_LIMIT_DELAY_SECS),
            weather: WeatherConfig::default(),
        }
    }
}

fn env_with_fallback(primary: &str, fallback: &str) -> Result<String, ConfigError> {
    std::env::var(primary)
        .or_else(|_| std::env::var(fallback))
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(primary.to_string()))
}

fn parse_env<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(v) => v
            .trim()
            .parse()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), format!("{}", e))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_mode_parses_case_insensitively() {
        assert_eq!("Steps".parse::<AgentMode>(), Ok(AgentMode::Steps));
        assert_eq!(" FUNCTIONS ".parse::<AgentMode>(), Ok(AgentMode::Functions));
        assert!("chat".parse::<AgentMode>().is_err());
    }

    #[test]
    fn new_config_uses_defaults() {
        let config = Config::new("key".to_string(), "http://localhost".to_string());
        assert_eq!(config.default_model, DEFAULT_MODEL);
        assert_eq!(config.mode, AgentMode::Functions);
        assert_eq!(config.rate_limit_delay, Duration::from_secs(60));
        assert_eq!(config.weather.timeout, Duration::from_secs(11));
        assert_eq!(config.weather.format, "%C+%t");
    }

    #[test]
    fn parse_env_reports_variable_name() {
        std::env::set_var("WEATHER_AGENT_TEST_BAD_NUMBER", "many");
        let err = parse_env::<usize>("WEATHER_AGENT_TEST_BAD_NUMBER", 1).unwrap_err();
        assert!(err.to_string().contains("WEATHER_AGENT_TEST_BAD_NUMBER"));
        std::env::remove_var("WEATHER_AGENT_TEST_BAD_NUMBER");
    }
}

//! Weather lookup tool backed by a plain-text weather service (wttr.in).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{parse_args, Tool, ToolError};
use crate::config::WeatherConfig;

/// Arguments of `get_weather`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherInput {
    /// City name, kept exactly as the model sent it.
    pub location: String,
}

impl WeatherInput {
    pub fn new(location: impl Into<String>) -> Result<Self, ToolError> {
        Self {
            location: location.into(),
        }
        .validated()
    }

    /// Decode and validate raw tool arguments.
    pub fn from_args(args: Value) -> Result<Self, ToolError> {
        parse_args::<Self>(GetWeather::NAME, args)?.validated()
    }

    fn validated(self) -> Result<Self, ToolError> {
        if self.location.trim().is_empty() {
            return Err(ToolError::InvalidArguments {
                tool: GetWeather::NAME.to_string(),
                reason: "field `location` must not be empty".to_string(),
            });
        }
        Ok(self)
    }
}

/// Look up the current weather for a location.
pub struct GetWeather {
    client: reqwest::Client,
    config: WeatherConfig,
}

impl GetWeather {
    pub const NAME: &'static str = "get_weather";

    pub fn new(config: WeatherConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Provider URL for a location. The lookup key is the lower-cased location.
    pub fn url_for(&self, location: &str) -> String {
        format!(
            "{}/{}?format={}",
            self.config.base_url.trim_end_matches('/'),
            urlencoding::encode(&location.to_lowercase()),
            self.config.format
        )
    }

    /// Fetch the weather. Every failure is folded into the returned text.
    pub async fn fetch(&self, input: &WeatherInput) -> String {
        let display = title_case(&input.location);
        let url = self.url_for(&input.location);

        tracing::info!("Fetching weather: {}", url);

        let response = match self
            .client
            .get(&url)
            .timeout(self.config.timeout)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) if e.is_timeout() => {
                return format!(
                    "Exception occurred: request timed out after {:?} ({})",
                    self.config.timeout,
                    error_chain(&e)
                )
            }
            Err(e) => return format!("Exception occurred: {}", error_chain(&e)),
        };

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return format!(
                "Failed to fetch weather for {}. Status Code: {}",
                display,
                status.as_u16()
            );
        }

        match response.text().await {
            Ok(body) => format!("The weather in {} is: {}", display, body),
            Err(e) => format!("Exception occurred: {}", error_chain(&e)),
        }
    }
}

#[async_trait]
impl Tool for GetWeather {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Get the current weather for a city. \
         Returns a short text with the sky condition and temperature."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "location": {
                    "type": "string",
                    "description": "The city name for which the weather is to be retrieved."
                }
            },
            "required": ["location"]
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<String> {
        let input = WeatherInput::from_args(args)?;
        Ok(self.fetch(&input).await)
    }
}

/// Upper-case the first letter of every word and lower-case the rest.
///
/// A word starts at any letter that does not follow another letter, so
/// `"o'neil"` becomes `"O'Neil"` and `"InvalidCity"` becomes `"Invalidcity"`.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_is_letter = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            out.push(c);
            prev_is_letter = false;
        }
    }
    out
}

/// Render an error with its sources, e.g. "error sending request: operation timed out".
fn error_chain(e: &dyn std::error::Error) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(inner) = source {
        let text = inner.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = inner.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn tool_for(server: &MockServer) -> GetWeather {
        GetWeather::new(WeatherConfig {
            base_url: server.uri(),
            ..WeatherConfig::default()
        })
    }

    #[test]
    fn input_preserves_location_exactly() {
        let locations = [
            "New Delhi",
            "San Francisco",
            "São Paulo",
            "NeW dElHi",
            "90210",
            "東京",
        ];
        for location in locations {
            let input = WeatherInput::from_args(json!({ "location": location })).unwrap();
            assert_eq!(input.location, location);
        }
    }

    #[test]
    fn missing_location_names_the_field() {
        let err = WeatherInput::from_args(json!({})).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
        assert!(err.to_string().contains("location"), "{err}");
    }

    #[test]
    fn non_string_location_is_rejected() {
        assert!(WeatherInput::from_args(json!({ "location": 12345 })).is_err());
    }

    #[test]
    fn empty_location_is_rejected() {
        let err = WeatherInput::new("   ").unwrap_err();
        assert!(err.to_string().contains("location"));
    }

    #[test]
    fn input_serializes_to_location_only() {
        let input = WeatherInput::new("London").unwrap();
        assert_eq!(serde_json::to_value(&input).unwrap(), json!({"location": "London"}));
    }

    #[test]
    fn schema_has_single_required_string_location() {
        let schema = GetWeather::new(WeatherConfig::default()).parameters_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"], json!(["location"]));
        let properties = schema["properties"].as_object().unwrap();
        assert_eq!(properties.len(), 1);
        assert_eq!(properties["location"]["type"], "string");
        assert!(properties["location"]["description"].is_string());
    }

    #[test]
    fn title_case_matches_word_boundaries() {
        assert_eq!(title_case("new york"), "New York");
        assert_eq!(title_case("InvalidCity"), "Invalidcity");
        assert_eq!(title_case("são paulo"), "São Paulo");
        assert_eq!(title_case("90210"), "90210");
        assert_eq!(title_case("o'neil"), "O'Neil");
    }

    #[test]
    fn url_uses_lowercase_encoded_location() {
        let tool = GetWeather::new(WeatherConfig::default());
        assert_eq!(
            tool.url_for("San Francisco"),
            "https://wttr.in/san%20francisco?format=%C+%t"
        );
    }

    #[tokio::test]
    async fn ok_response_includes_title_cased_location_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/new%20york"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Rainy +10°C"))
            .expect(1)
            .mount(&server)
            .await;

        let out = tool_for(&server)
            .fetch(&WeatherInput::new("new york").unwrap())
            .await;

        assert_eq!(out, "The weather in New York is: Rainy +10°C");
        assert!(!out.contains("new york"));

        let requests = server.received_requests().await.unwrap();
        assert!(requests[0].url.query().unwrap_or("").starts_with("format="));
    }

    #[tokio::test]
    async fn non_200_reports_status_code() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let out = tool_for(&server)
            .fetch(&WeatherInput::new("InvalidCity").unwrap())
            .await;

        assert!(out.contains("Failed to fetch weather"));
        assert!(out.contains("Invalidcity"));
        assert!(out.contains("404"));
    }

    #[tokio::test]
    async fn timeout_is_returned_as_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("late")
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let tool = GetWeather::new(WeatherConfig {
            base_url: server.uri(),
            timeout: Duration::from_millis(100),
            ..WeatherConfig::default()
        });
        let out = tool.fetch(&WeatherInput::new("London").unwrap()).await;

        assert!(out.starts_with("Exception occurred: "), "{out}");
        assert!(out.to_lowercase().contains("timed out"), "{out}");
    }

    #[tokio::test]
    async fn connection_error_is_returned_as_text() {
        // Nothing listens on port 1.
        let tool = GetWeather::new(WeatherConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            timeout: Duration::from_secs(2),
            ..WeatherConfig::default()
        });
        let out = tool.fetch(&WeatherInput::new("Paris").unwrap()).await;
        assert!(out.starts_with("Exception occurred: "), "{out}");
    }

    #[tokio::test]
    async fn execute_rejects_bad_arguments() {
        let tool = GetWeather::new(WeatherConfig::default());
        let err = tool.execute(json!({"city": "Tokyo"})).await.unwrap_err();
        assert!(err.to_string().contains("location"));
    }

    #[tokio::test]
    async fn execute_returns_weather_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/mumbai"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Clear +25°C"))
            .mount(&server)
            .await;

        let out = tool_for(&server)
            .execute(json!({"location": "Mumbai"}))
            .await
            .unwrap();
        assert_eq!(out, "The weather in Mumbai is: Clear +25°C");
    }
}

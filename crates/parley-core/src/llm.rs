//! LLM provider abstraction
//!
//! A provider turns one fully assembled prompt into one completion. Request
//! shaping (temperature, endpoint, auth) belongs to the provider; callers
//! only pass the prompt and a model identifier.

use crate::ChatConfig;
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};

/// Errors from a generation call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LlmError {
    #[error("API request failed: {0}")]
    Request(String),

    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Prompt was blocked: {0}")]
    Blocked(String),

    #[error("Failed to parse API response: {0}")]
    Parse(String),

    #[error("Model returned no text")]
    EmptyResponse,
}

/// Trait for LLM providers
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send a prompt and get the completion text
    async fn generate(&self, prompt: &str, model: &str) -> Result<String, LlmError>;

    /// Get the provider name
    fn name(&self) -> &str;
}

/// Google Gemini `generateContent` provider
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: SecretString,
    api_base: String,
    temperature: f32,
}

impl GeminiProvider {
    pub fn new(api_key: SecretString) -> Self {
        let defaults = ChatConfig::default();
        Self {
            client: reqwest::Client::new(),
            api_key,
            api_base: defaults.api_base,
            temperature: defaults.temperature,
        }
    }

    /// Build from configuration; fails when no API key is configured
    pub fn from_config(config: &ChatConfig) -> crate::Result<Self> {
        let api_key = config.require_api_key()?;
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| crate::CoreError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            api_base: config.api_base.clone(),
            temperature: config.temperature,
        })
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.api_base, model)
    }

    /// Request payload for a single-prompt generation
    pub fn request_body(prompt: &str, temperature: f32) -> Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": prompt }]
            }],
            "generationConfig": { "temperature": temperature }
        })
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    async fn generate(&self, prompt: &str, model: &str) -> Result<String, LlmError> {
        tracing::debug!(model, prompt_chars = prompt.len(), "Sending generateContent request");

        let resp = self
            .client
            .post(self.endpoint(model))
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&Self::request_body(prompt, self.temperature))
            .send()
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?;

        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?;

        parse_generate_response(status, &body)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

/// Extract the completion text from a `generateContent` response
pub fn parse_generate_response(status: u16, body: &str) -> Result<String, LlmError> {
    let json: Value = match serde_json::from_str(body) {
        Ok(json) => json,
        Err(e) if (200..300).contains(&status) => return Err(LlmError::Parse(e.to_string())),
        Err(_) => {
            return Err(LlmError::Api {
                status,
                message: body.trim().to_string(),
            })
        }
    };

    if let Some(err) = json.get("error") {
        let message = err["message"]
            .as_str()
            .unwrap_or("Unknown API error")
            .to_string();
        return Err(LlmError::Api { status, message });
    }
    if !(200..300).contains(&status) {
        return Err(LlmError::Api {
            status,
            message: body.trim().to_string(),
        });
    }
    if let Some(reason) = json["promptFeedback"]["blockReason"].as_str() {
        return Err(LlmError::Blocked(reason.to_string()));
    }

    let text: String = json["candidates"][0]["content"]["parts"]
        .as_array()
        .map(|parts| parts.iter().filter_map(|p| p["text"].as_str()).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(LlmError::EmptyResponse);
    }
    Ok(text)
}

/// Offline provider that answers without any network call.
///
/// Replies with the user's message from the final `User:` section, which is
/// handy for trying the interface and for tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoProvider;

impl EchoProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl LlmProvider for EchoProvider {
    async fn generate(&self, prompt: &str, model: &str) -> Result<String, LlmError> {
        let message = prompt
            .rsplit_once("\n\nUser: ")
            .map(|(_, tail)| tail)
            .or_else(|| prompt.strip_prefix("User: "))
            .unwrap_or(prompt)
            .trim();
        Ok(format!("[echo:{}] {}", model, message))
    }

    fn name(&self) -> &str {
        "echo"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let body = GeminiProvider::request_body("Hello", 0.5);
        assert_eq!(body["contents"][0]["parts"][0]["text"], "Hello");
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["generationConfig"]["temperature"], 0.5);
    }

    #[test]
    fn test_endpoint() {
        let provider = GeminiProvider::new(SecretString::new("k".to_string()))
            .with_api_base("http://localhost:9000/v1beta");
        assert_eq!(
            provider.endpoint("gemini-2.5-flash-lite"),
            "http://localhost:9000/v1beta/models/gemini-2.5-flash-lite:generateContent"
        );
    }

    #[test]
    fn test_parse_success_joins_parts() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"Hello, "},{"text":"world"}],"role":"model"}}]}"#;
        assert_eq!(parse_generate_response(200, body).unwrap(), "Hello, world");
    }

    #[test]
    fn test_parse_api_error() {
        let body = r#"{"error":{"code":400,"message":"API key not valid","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(
            parse_generate_response(400, body).unwrap_err(),
            LlmError::Api {
                status: 400,
                message: "API key not valid".to_string()
            }
        );
    }

    #[test]
    fn test_parse_non_json_failure() {
        let err = parse_generate_response(502, "Bad Gateway").unwrap_err();
        assert_eq!(
            err,
            LlmError::Api {
                status: 502,
                message: "Bad Gateway".to_string()
            }
        );
        assert!(matches!(
            parse_generate_response(200, "not json"),
            Err(LlmError::Parse(_))
        ));
    }

    #[test]
    fn test_parse_blocked_and_empty() {
        let blocked = r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#;
        assert_eq!(
            parse_generate_response(200, blocked).unwrap_err(),
            LlmError::Blocked("SAFETY".to_string())
        );

        let empty = r#"{"candidates":[{"content":{"parts":[]}}]}"#;
        assert_eq!(
            parse_generate_response(200, empty).unwrap_err(),
            LlmError::EmptyResponse
        );
    }

    #[tokio::test]
    async fn test_echo_provider_answers_last_user_line() {
        let echo = EchoProvider::new();
        let reply = echo
            .generate("System.\n\nUser: earlier\n\nUser: what is this?", "test-model")
            .await
            .unwrap();
        assert_eq!(reply, "[echo:test-model] what is this?");
        assert_eq!(echo.name(), "echo");
    }

    #[tokio::test]
    async fn test_echo_provider_keeps_user_label_inside_message() {
        let echo = EchoProvider::new();
        let prompt = crate::PromptBuilder::new("SYS").build("what does 'User: admin' mean?");
        let reply = echo.generate(&prompt, "m").await.unwrap();
        assert_eq!(reply, "[echo:m] what does 'User: admin' mean?");

        let bare = echo.generate("User: just this", "m").await.unwrap();
        assert_eq!(bare, "[echo:m] just this");
    }
}

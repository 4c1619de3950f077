//! Model client for chat completions using an OpenAI-compatible API.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;

use super::message::{ChatMessage, ChatRequest};
use super::stream::{collect_response, event_fragments, FragmentStream};

/// Default number of retry attempts for failed requests.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default delay between retry attempts in seconds.
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 2;

/// Default OpenAI endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Model client errors.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("Failed to parse response: {0}")]
    ParseError(String),
    #[error("API error: {0}")]
    ApiError(String),
    #[error("Max retries exceeded after {0} attempts: {1}")]
    MaxRetriesExceeded(u32, String),
}

/// Configuration for the language model.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub base_url: String,
    pub api_key: String,
    pub model_name: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Maximum number of retry attempts for failed connections.
    pub max_retries: u32,
    /// Delay between retry attempts in seconds.
    pub retry_delay_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: String::new(),
            model_name: "gpt-4".to_string(),
            max_tokens: 256,
            temperature: 0.0,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay_secs: DEFAULT_RETRY_DELAY_SECS,
        }
    }
}

impl ModelConfig {
    /// Create a new ModelConfig with custom base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Create a new ModelConfig with custom API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    /// Create a new ModelConfig with custom model name.
    pub fn with_model_name(mut self, model_name: impl Into<String>) -> Self {
        self.model_name = model_name.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the maximum number of retry attempts for failed connections.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the delay between retry attempts in seconds.
    pub fn with_retry_delay(mut self, delay_secs: u64) -> Self {
        self.retry_delay_secs = delay_secs;
        self
    }

    /// Build the request for a conversation using this configuration.
    pub fn request(&self, messages: Vec<ChatMessage>) -> ChatRequest {
        ChatRequest {
            model: self.model_name.clone(),
            messages,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }
}

/// A chat model that answers with an ordered stream of text fragments.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Start a streamed completion for the request.
    async fn stream(&self, request: &ChatRequest) -> Result<FragmentStream, ModelError>;

    /// Stream a completion and concatenate it.
    async fn complete(&self, request: &ChatRequest) -> Result<String, ModelError> {
        let fragments = self.stream(request).await?;
        collect_response(fragments).await
    }
}

/// Client for OpenAI-compatible chat completion endpoints.
pub struct ModelClient {
    config: ModelConfig,
    client: Client,
}

impl ModelClient {
    /// Create a new ModelClient with the given configuration.
    pub fn new(config: ModelConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    /// Open the event stream, retrying connection failures.
    async fn connect(&self, body: &Value) -> Result<reqwest::Response, ModelError> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let mut last_error: Option<ModelError> = None;
        let max_attempts = self.config.max_retries + 1; // +1 for the initial attempt

        for attempt in 1..=max_attempts {
            match self.send_request(&url, body).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    let is_retryable = Self::is_retryable_error(&e);

                    if attempt < max_attempts && is_retryable {
                        tracing::warn!(
                            attempt,
                            max_attempts,
                            error = %e,
                            "Model request failed, retrying in {}s",
                            self.config.retry_delay_secs
                        );
                        sleep(Duration::from_secs(self.config.retry_delay_secs)).await;
                        last_error = Some(e);
                    } else if !is_retryable {
                        return Err(e);
                    } else {
                        last_error = Some(e);
                    }
                }
            }
        }

        Err(ModelError::MaxRetriesExceeded(
            self.config.max_retries,
            last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "Unknown error".to_string()),
        ))
    }

    /// Check if an error is retryable (network errors, timeouts, etc.)
    fn is_retryable_error(error: &ModelError) -> bool {
        match error {
            ModelError::RequestFailed(_) => true,
            ModelError::ApiError(msg) => {
                // Server errors (5xx) and rate limits (429)
                msg.contains("500")
                    || msg.contains("502")
                    || msg.contains("503")
                    || msg.contains("504")
                    || msg.contains("429")
                    || msg.to_lowercase().contains("timeout")
                    || msg.to_lowercase().contains("rate limit")
            }
            ModelError::ParseError(_) => false,
            ModelError::MaxRetriesExceeded(_, _) => false,
        }
    }

    async fn send_request(&self, url: &str, body: &Value) -> Result<reqwest::Response, ModelError> {
        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .header("Accept", "text/event-stream")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ModelError::ApiError(format!("{}: {}", status, error_text)));
        }
        Ok(response)
    }
}

/// Wire body for a request; streaming is a transport detail.
fn streaming_body(request: &ChatRequest) -> Result<Value, ModelError> {
    let mut body =
        serde_json::to_value(request).map_err(|e| ModelError::ParseError(e.to_string()))?;
    if let Value::Object(ref mut map) = body {
        map.insert("stream".to_string(), Value::Bool(true));
    }
    Ok(body)
}

#[async_trait]
impl ChatModel for ModelClient {
    async fn stream(&self, request: &ChatRequest) -> Result<FragmentStream, ModelError> {
        let body = streaming_body(request)?;
        tracing::debug!(
            model = %request.model,
            messages = request.messages.len(),
            "Requesting completion"
        );
        let response = self.connect(&body).await?;
        Ok(event_fragments(response.bytes_stream()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_config_default() {
        let config = ModelConfig::default();
        assert_eq!(config.base_url, "https://api.openai.com/v1");
        assert_eq!(config.model_name, "gpt-4");
        assert_eq!(config.max_tokens, 256);
        assert_eq!(config.temperature, 0.0);
    }

    #[test]
    fn test_config_builds_request() {
        let config = ModelConfig::default()
            .with_model_name("gpt-4o")
            .with_max_tokens(128);
        let request = config.request(vec![ChatMessage::user("hi")]);
        assert_eq!(request.model, "gpt-4o");
        assert_eq!(request.max_tokens, 128);
        assert_eq!(request.messages.len(), 1);
    }

    #[test]
    fn test_streaming_body_adds_stream_flag() {
        let request = ModelConfig::default().request(vec![ChatMessage::system("s")]);
        let body = streaming_body(&request).unwrap();
        assert_eq!(body["stream"], true);
        assert_eq!(body["model"], "gpt-4");
        // The request itself stays free of transport fields.
        assert!(serde_json::to_value(&request).unwrap().get("stream").is_none());
    }

    #[test]
    fn test_is_retryable_error() {
        assert!(ModelClient::is_retryable_error(&ModelError::ApiError(
            "503 Service Unavailable: overloaded".to_string()
        )));
        assert!(ModelClient::is_retryable_error(&ModelError::ApiError(
            "Rate limit reached".to_string()
        )));
        assert!(!ModelClient::is_retryable_error(&ModelError::ApiError(
            "401 Unauthorized".to_string()
        )));
        assert!(!ModelClient::is_retryable_error(&ModelError::ParseError(
            "bad".to_string()
        )));
    }
}

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::error::{AppError, AppResult};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_OUTPUT_TOKENS: u32 = 2048;
const CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Boundary to the chat model used for candidate generation
///
/// One call per invocation; the call is never retried. Transport failures
/// and non-2xx responses surface as `AppError::ModelOutput`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Send one system + user message pair and return the raw completion text
    async fn complete(&self, system: &str, user: &str) -> AppResult<String>;
}

/// Anthropic Messages API client
#[derive(Clone)]
pub struct AnthropicClient {
    http_client: reqwest::Client,
    api_key: String,
    api_url: String,
    model: String,
}

impl AnthropicClient {
    pub fn new(api_key: String, api_url: String, model: String) -> Self {
        Self {
            http_client: reqwest::Client::builder()
                .timeout(CALL_TIMEOUT)
                .build()
                .expect("failed to build HTTP client"),
            api_key,
            api_url,
            model,
        }
    }
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

#[async_trait]
impl ChatModel for AnthropicClient {
    async fn complete(&self, system: &str, user: &str) -> AppResult<String> {
        if self.api_key.is_empty() {
            return Err(AppError::Config(
                "Anthropic API key is not set".to_string(),
            ));
        }

        let url = format!("{}/v1/messages", self.api_url);
        let body = json!({
            "model": self.model,
            "max_tokens": MAX_OUTPUT_TOKENS,
            "system": system,
            "messages": [{"role": "user", "content": user}],
        });

        let response = self
            .http_client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::ModelOutput(format!("model request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ModelOutput(format!(
                "model API returned status {}: {}",
                status, body
            )));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| AppError::ModelOutput(format!("unreadable model response: {e}")))?;

        let text: String = parsed.content.into_iter().map(|block| block.text).collect();
        if text.trim().is_empty() {
            return Err(AppError::ModelOutput(
                "model returned an empty response".to_string(),
            ));
        }

        tracing::debug!(model = %self.model, chars = text.len(), "Model completion received");

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        // api_url is unroutable; an attempted call would error differently
        let client = AnthropicClient::new(
            String::new(),
            "http://invalid.localdomain".to_string(),
            "test-model".to_string(),
        );
        let err = client.complete("system", "user").await.unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn messages_response_concatenates_blocks() {
        let json = r#"{"content": [{"type": "text", "text": "{\"name\""}, {"type": "text", "text": ": \"x\"}"}]}"#;
        let parsed: MessagesResponse = serde_json::from_str(json).unwrap();
        let text: String = parsed.content.into_iter().map(|b| b.text).collect();
        assert_eq!(text, r#"{"name": "x"}"#);
    }
}

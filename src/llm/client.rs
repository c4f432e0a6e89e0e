//! The LLM transport contract (§6: "LLM wire interface") and one concrete
//! HTTP-backed implementation.
//!
//! Grounded in the teacher's `AnthropicProvider` (`providers/anthropic/provider.rs`):
//! a `reqwest::Client` wrapped by a `RetryExecutor`/`CircuitBreaker` pair,
//! POSTing a single-message request and reading back the first text block.
//! Unlike the teacher, this crate exposes one concrete provider behind the
//! trait rather than a provider enum — multi-provider dispatch is an
//! explicit Non-goal (§1).

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::{EngineError, EngineResult};
use crate::internals::retry::{RetryExecutor, RetryPolicy};
use crate::logging::{log_debug, log_warn};

/// Its only core-visible contract: produce raw text given a prompt and a
/// model name. Best-effort JSON extraction is the Decision Parser's job,
/// not the client's.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn generate(&self, prompt: &str, model: &str) -> EngineResult<String>;
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContentBlock>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContentBlock {
    #[serde(default)]
    text: String,
}

/// A single-endpoint HTTP client. The base URL and API key are supplied at
/// construction so tests can point it at a `wiremock` server.
pub struct HttpLlmClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    retry_executor: Mutex<RetryExecutor>,
    max_tokens: u32,
}

impl HttpLlmClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::with_retry_policy(base_url, api_key, RetryPolicy::default())
    }

    pub fn with_retry_policy(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            retry_executor: Mutex::new(RetryExecutor::new(policy)),
            max_tokens: 4096,
        }
    }

    async fn send_request(&self, url: &str, headers: &HeaderMap, body: &AnthropicRequest<'_>) -> EngineResult<String> {
        let response = self
            .client
            .post(url)
            .headers(headers.clone())
            .json(body)
            .send()
            .await
            .map_err(|err| EngineError::llm_unreachable(format!("request failed: {err}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body_text = response.text().await.unwrap_or_default();
            log_warn!(status = %status, body = %body_text, "LLM endpoint returned an error status");
            return Err(EngineError::llm_unreachable(format!(
                "LLM endpoint returned {status}: {body_text}"
            )));
        }

        let parsed: AnthropicResponse = response
            .json()
            .await
            .map_err(|err| EngineError::llm_unreachable(format!("could not decode response body: {err}")))?;

        let text = parsed
            .content
            .into_iter()
            .map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");

        Ok(text)
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn generate(&self, prompt: &str, model: &str) -> EngineResult<String> {
        let url = format!("{}/v1/messages", self.base_url);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(&self.api_key)
                .map_err(|err| EngineError::config_invalid(format!("invalid API key format: {err}")))?,
        );
        headers.insert("anthropic-version", HeaderValue::from_static("2023-06-01"));

        let body = AnthropicRequest {
            model,
            max_tokens: self.max_tokens,
            messages: vec![AnthropicMessage {
                role: "user",
                content: prompt,
            }],
        };

        log_debug!(model = %model, prompt_len = prompt.len(), "calling LLM endpoint");

        let mut executor = self.retry_executor.lock().await;
        executor.execute(|| self.send_request(&url, &headers, &body)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn generate_returns_concatenated_text_blocks() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": [{ "type": "text", "text": "{\"done\":true}" }]
            })))
            .mount(&server)
            .await;

        let client = HttpLlmClient::new(server.uri(), "test-key");
        let reply = client.generate("hello", "claude-test").await.unwrap();
        assert_eq!(reply, "{\"done\":true}");
    }

    #[tokio::test]
    async fn generate_surfaces_transport_errors_as_llm_unreachable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = HttpLlmClient::with_retry_policy(
            server.uri(),
            "test-key",
            RetryPolicy {
                max_attempts: 1,
                ..RetryPolicy::default()
            },
        );
        let result = client.generate("hello", "claude-test").await;
        assert!(matches!(result, Err(EngineError::LlmUnreachable { .. })));
    }
}

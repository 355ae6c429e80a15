//! Chat-completion transport

use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::core::config::AppConfig;
use crate::core::errors::{Result, TranslationError};
use crate::core::models::{ChatMessage, ChatRequest, ChatResponse};

/// A backend that answers one chat-completion request with the first
/// choice's message content.
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    async fn complete(&self, model: &str, messages: &[ChatMessage]) -> Result<String>;
}

/// OpenRouter (OpenAI-compatible) chat-completion client
#[derive(Debug, Clone)]
pub struct OpenRouterClient {
    client: reqwest::Client,
    config: Arc<AppConfig>,
}

impl OpenRouterClient {
    /// Create a new client. The configuration must carry an API key.
    pub fn new(config: Arc<AppConfig>) -> Result<Self> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .pool_idle_timeout(Some(Duration::from_secs(30)))
            .pool_max_idle_per_host(10)
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

#[async_trait]
impl ChatCompletion for OpenRouterClient {
    async fn complete(&self, model: &str, messages: &[ChatMessage]) -> Result<String> {
        let body = ChatRequest { model, messages };

        let mut request = self
            .client
            .post(&self.config.api_endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&body);

        if let Some(app_url) = &self.config.app_url {
            request = request.header("HTTP-Referer", app_url);
        }
        if let Some(app_title) = &self.config.app_title {
            request = request.header("X-Title", app_title);
        }

        debug!("Sending completion request to {}", self.config.api_endpoint);
        let start = Instant::now();

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                TranslationError::TimeoutError
            } else {
                TranslationError::NetworkError {
                    message: e.to_string(),
                }
            }
        })?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(
                status = status.as_u16(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Completion request failed"
            );
            return Err(TranslationError::ApiError {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let parsed: ChatResponse =
            response
                .json()
                .await
                .map_err(|e| TranslationError::InvalidResponseError {
                    message: e.to_string(),
                })?;

        let choice = parsed.choices.into_iter().next().ok_or_else(|| {
            TranslationError::InvalidResponseError {
                message: "No choices in response".to_string(),
            }
        })?;
        let content = choice
            .message
            .content
            .ok_or_else(|| TranslationError::InvalidResponseError {
                message: "Empty message content".to_string(),
            })?;

        info!(
            model,
            elapsed_ms = start.elapsed().as_millis() as u64,
            response_len = content.len(),
            "Completion received"
        );

        Ok(content)
    }
}

//! OpenAI-compatible chat-completions provider
//!
//! Talks to any endpoint that implements `POST {api_base}/chat/completions`
//! with bearer authentication. Requests are non-streaming; the full reply is
//! returned at once.

use crate::config::ProviderConfig;
use crate::error::{BeeChatError, Result};
use crate::providers::{CompletionRequest, CompletionResponse, Provider, TokenUsage};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// OpenAI chat-completions provider
///
/// # Examples
///
/// ```no_run
/// use beechat::chat::{Message, TurnConfig};
/// use beechat::config::ProviderConfig;
/// use beechat::providers::{CompletionRequest, OpenAiProvider, Provider};
///
/// # async fn example() -> beechat::error::Result<()> {
/// let provider = OpenAiProvider::new(&ProviderConfig::default(), "sk-...")?;
/// let request = CompletionRequest::new(&TurnConfig::default(), vec![Message::user("Hello!")]);
/// let reply = provider.complete(&request).await?;
/// println!("{}", reply.content);
/// # Ok(())
/// # }
/// ```
pub struct OpenAiProvider {
    client: Client,
    api_base: String,
    api_key: String,
    timeout_seconds: u64,
}

/// Request structure for the chat-completions API
#[derive(Debug, Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAiMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    stream: bool,
}

/// Outbound message in wire format
#[derive(Debug, Serialize)]
struct OpenAiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// Response structure from the chat-completions API
#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
    #[serde(default)]
    usage: Option<OpenAiUsage>,
}

/// Choice in a completion response
#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

/// Reply message; `content` is null for refusals and tool calls
#[derive(Debug, Deserialize)]
struct OpenAiResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Token usage information
#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    #[serde(default)]
    prompt_tokens: usize,
    #[serde(default)]
    completion_tokens: usize,
}

/// Error envelope returned with non-success statuses
#[derive(Debug, Deserialize)]
struct OpenAiErrorBody {
    error: OpenAiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorDetail {
    message: String,
}

fn format_api_error(status: reqwest::StatusCode, body: &str) -> BeeChatError {
    let message = serde_json::from_str::<OpenAiErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| body.to_string());

    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        BeeChatError::Authentication(format!(
            "Completion endpoint rejected credentials ({}): {}",
            status, message
        ))
    } else {
        BeeChatError::Server {
            status: status.as_u16(),
            message,
        }
    }
}

impl OpenAiProvider {
    /// Create a new provider instance
    ///
    /// # Arguments
    ///
    /// * `config` - Provider configuration (base URL and timeout)
    /// * `api_key` - Bearer token
    ///
    /// # Errors
    ///
    /// Returns error if the key is blank or HTTP client initialization fails
    ///
    /// # Examples
    ///
    /// ```
    /// use beechat::config::ProviderConfig;
    /// use beechat::providers::OpenAiProvider;
    ///
    /// let provider = OpenAiProvider::new(&ProviderConfig::default(), "sk-test");
    /// assert!(provider.is_ok());
    /// ```
    pub fn new(config: &ProviderConfig, api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(BeeChatError::MissingCredentials("API key is empty".to_string()).into());
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("beechat/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BeeChatError::Provider(format!("Failed to create HTTP client: {}", e)))?;

        tracing::info!("Initialized OpenAI provider: api_base={}", config.api_base);

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key,
            timeout_seconds: config.timeout_seconds,
        })
    }

    /// Base URL requests are sent to
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.api_base)
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        let body = OpenAiRequest {
            model: request.model.as_str(),
            messages: request
                .messages
                .iter()
                .map(|m| OpenAiMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            top_p: request.top_p,
            stream: false,
        };

        tracing::debug!(
            model = body.model,
            messages = body.messages.len(),
            max_tokens = body.max_tokens,
            "Sending completion request"
        );

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Completion request failed: {}", e);
                if e.is_timeout() {
                    BeeChatError::Timeout {
                        seconds: self.timeout_seconds,
                    }
                } else {
                    BeeChatError::Http(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Completion endpoint returned error {}: {}", status, error_text);
            return Err(format_api_error(status, &error_text).into());
        }

        let parsed: OpenAiResponse = response.json().await.map_err(|e| {
            tracing::error!("Failed to parse completion response: {}", e);
            BeeChatError::Provider(format!("Failed to parse completion response: {}", e))
        })?;

        let choice = parsed.choices.into_iter().next().ok_or_else(|| {
            BeeChatError::Provider("No choices in completion response".to_string())
        })?;

        let content = choice.message.content.ok_or_else(|| {
            BeeChatError::Provider(format!(
                "Completion response has no text content (finish_reason={})",
                choice.finish_reason.as_deref().unwrap_or("unknown")
            ))
        })?;

        tracing::debug!(
            finish_reason = choice.finish_reason.as_deref().unwrap_or("unknown"),
            "Completion response received"
        );

        let response = match parsed.usage {
            Some(u) => CompletionResponse::with_usage(
                content,
                TokenUsage::new(u.prompt_tokens, u.completion_tokens),
            ),
            None => CompletionResponse::new(content),
        };
        Ok(response)
    }

    fn name(&self) -> &str {
        "openai"
    }
}

//! Base provider trait and common types for BeeChat
//!
//! This module defines the Provider trait that every completion backend
//! implements, along with the request and response shapes the conversation
//! core depends on. Nothing here is vendor specific.

use crate::chat::{Message, ModelId, TurnConfig};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Token usage information from a completion
///
/// Tracks the number of tokens used in prompts and completions,
/// as reported by the AI provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Number of tokens in the prompt
    pub prompt_tokens: usize,
    /// Number of tokens in the completion
    pub completion_tokens: usize,
    /// Total tokens used (prompt + completion)
    pub total_tokens: usize,
}

impl TokenUsage {
    /// Create a new TokenUsage instance
    ///
    /// # Examples
    ///
    /// ```
    /// use beechat::providers::TokenUsage;
    ///
    /// let usage = TokenUsage::new(100, 50);
    /// assert_eq!(usage.total_tokens, 150);
    /// ```
    pub fn new(prompt_tokens: usize, completion_tokens: usize) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// A single request to the completion service
///
/// `messages` is the complete outbound sequence, system message first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    /// Model to address
    pub model: ModelId,
    /// Ordered message sequence
    pub messages: Vec<Message>,
    /// Maximum tokens in the reply
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
    /// Nucleus sampling mass
    pub top_p: f32,
}

impl CompletionRequest {
    /// Builds a request from turn settings and an assembled message sequence
    pub fn new(config: &TurnConfig, messages: Vec<Message>) -> Self {
        Self {
            model: config.model,
            messages,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            top_p: config.top_p,
        }
    }

    /// Exact identity of this request, ignoring message timestamps
    ///
    /// Two requests share a key only if model, parameters and every
    /// `(role, content)` pair match in order.
    pub fn cache_key(&self) -> String {
        let messages: Vec<(&str, &str)> = self
            .messages
            .iter()
            .map(|m| (m.role.as_str(), m.content.as_str()))
            .collect();
        serde_json::json!({
            "model": self.model.as_str(),
            "messages": messages,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "top_p": self.top_p,
        })
        .to_string()
    }
}

/// Completion reply text with optional token usage
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionResponse {
    /// Reply text
    pub content: String,
    /// Optional token usage information
    pub usage: Option<TokenUsage>,
}

impl CompletionResponse {
    /// Create a new CompletionResponse
    ///
    /// # Examples
    ///
    /// ```
    /// use beechat::providers::CompletionResponse;
    ///
    /// let response = CompletionResponse::new("Hello!");
    /// assert_eq!(response.content, "Hello!");
    /// assert!(response.usage.is_none());
    /// ```
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            usage: None,
        }
    }

    /// Create a new CompletionResponse with token usage
    pub fn with_usage(content: impl Into<String>, usage: TokenUsage) -> Self {
        Self {
            content: content.into(),
            usage: Some(usage),
        }
    }
}

/// Provider trait for completion services
///
/// Rate limiting, credentials and connection management belong to the
/// implementation; callers only see request in, reply or error out.
///
/// # Examples
///
/// ```no_run
/// use beechat::providers::{CompletionRequest, CompletionResponse, Provider};
/// use beechat::error::Result;
/// use async_trait::async_trait;
///
/// struct EchoProvider;
///
/// #[async_trait]
/// impl Provider for EchoProvider {
///     async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
///         let last = request.messages.last().map(|m| m.content.clone()).unwrap_or_default();
///         Ok(CompletionResponse::new(last))
///     }
/// }
/// ```
#[async_trait]
pub trait Provider: Send + Sync {
    /// Completes one request
    ///
    /// # Errors
    ///
    /// Returns error if the API call fails or the response is unusable
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse>;

    /// Short provider name for logs
    fn name(&self) -> &str {
        "provider"
    }
}

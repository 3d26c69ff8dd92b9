//! Error types for BeeChat
//!
//! This module defines all error types used throughout the application,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for BeeChat operations
///
/// Every variant maps onto one [`ErrorKind`], which is what callers should
/// branch on when deciding whether to retry, re-prompt, or abort.
#[derive(Error, Debug)]
pub enum BeeChatError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// User text or turn settings outside their allowed domain
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Provider-related errors (malformed responses, empty choices, etc.)
    #[error("Provider error: {0}")]
    Provider(String),

    /// Non-success HTTP status returned by the completion endpoint
    #[error("Completion endpoint returned {status}: {message}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Response body or reason
        message: String,
    },

    /// Authentication errors (e.g., 401 Unauthorized)
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// The completion call did not finish within the configured budget
    #[error("Completion request timed out after {seconds}s")]
    Timeout {
        /// The timeout that expired
        seconds: u64,
    },

    /// A second turn was submitted while one was still in flight
    #[error("A turn is already in progress for this session")]
    TurnInProgress,

    /// Missing credentials for provider
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    /// Conversation storage errors (database operations)
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Coarse error classification used at the UI boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected before any network call; nothing changed
    InvalidInput,
    /// The completion service failed or timed out
    ServiceFailure,
    /// Required startup configuration is absent or invalid
    ConfigurationMissing,
    /// The session is already running a turn
    Busy,
    /// The durable message log failed
    Storage,
    /// Local IO or (de)serialization failure
    Internal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput => write!(f, "invalid input"),
            Self::ServiceFailure => write!(f, "service failure"),
            Self::ConfigurationMissing => write!(f, "configuration missing"),
            Self::Busy => write!(f, "busy"),
            Self::Storage => write!(f, "storage"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

impl BeeChatError {
    /// Classify this error
    ///
    /// # Examples
    ///
    /// ```
    /// use beechat::error::{BeeChatError, ErrorKind};
    ///
    /// let err = BeeChatError::Timeout { seconds: 30 };
    /// assert_eq!(err.kind(), ErrorKind::ServiceFailure);
    /// ```
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::Provider(_)
            | Self::Server { .. }
            | Self::Authentication(_)
            | Self::Timeout { .. }
            | Self::Http(_) => ErrorKind::ServiceFailure,
            Self::Config(_) | Self::MissingCredentials(_) => ErrorKind::ConfigurationMissing,
            Self::TurnInProgress => ErrorKind::Busy,
            Self::Storage(_) => ErrorKind::Storage,
            Self::Io(_) | Self::Serialization(_) | Self::Yaml(_) => ErrorKind::Internal,
        }
    }

    /// Whether resubmitting the same turn may succeed
    ///
    /// Transport errors, timeouts, rate limits and 5xx responses are
    /// retryable. Authentication and validation failures are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Http(_) | Self::TurnInProgress => true,
            Self::Server { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Classify an `anyhow::Error`, looking through to a wrapped `BeeChatError`
    ///
    /// Errors that did not originate as a `BeeChatError` are `Internal`.
    pub fn classify(err: &anyhow::Error) -> ErrorKind {
        err.downcast_ref::<BeeChatError>()
            .map(BeeChatError::kind)
            .unwrap_or(ErrorKind::Internal)
    }

    /// Convert any error raised by a completion call into a service failure
    ///
    /// Errors that are already service failures pass through untouched so the
    /// caller can still inspect status codes and retryability.
    pub fn into_service_failure(err: anyhow::Error) -> BeeChatError {
        match err.downcast::<BeeChatError>() {
            Ok(e) if e.kind() == ErrorKind::ServiceFailure => e,
            Ok(e) => BeeChatError::Provider(e.to_string()),
            Err(other) => BeeChatError::Provider(format!("{:#}", other)),
        }
    }
}

/// Result type alias for BeeChat operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;

use crate::chat::{Message, Role};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of the durable message log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    /// Session the message belongs to
    pub session_id: String,
    /// Author role
    pub role: Role,
    /// Message text
    pub content: String,
    /// Creation time, stored as fractional epoch seconds
    pub timestamp: DateTime<Utc>,
}

impl StoredMessage {
    /// Record for `message` in `session_id`
    ///
    /// Messages without a timestamp are stamped with the current time.
    pub fn from_message(session_id: impl Into<String>, message: &Message) -> Self {
        Self {
            session_id: session_id.into(),
            role: message.role,
            content: message.content.clone(),
            timestamp: message.timestamp.unwrap_or_else(Utc::now),
        }
    }

    /// Converts back into a conversation message
    pub fn into_message(self) -> Message {
        Message {
            role: self.role,
            content: self.content,
            timestamp: Some(self.timestamp),
        }
    }
}

/// Aggregate view of one stored session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Session identifier
    pub session_id: String,
    /// Number of stored messages
    pub message_count: usize,
    /// Timestamp of the first message
    pub started_at: DateTime<Utc>,
    /// Timestamp of the most recent message
    pub updated_at: DateTime<Utc>,
    /// First user message, if any
    pub first_prompt: Option<String>,
}

//! Session-scoped conversation log and context selection
//!
//! The log is an append-only sequence of user and assistant messages. System
//! context is synthesized per request and is never stored here, which the
//! log enforces by only exposing typed append operations.

use crate::chat::message::{Message, Role};

/// Ordered, append-only sequence of user and assistant messages
///
/// # Examples
///
/// ```
/// use beechat::chat::ConversationLog;
///
/// let mut log = ConversationLog::new();
/// log.push_user("Hello");
/// log.push_assistant("Hi there");
/// assert_eq!(log.len(), 2);
///
/// log.clear();
/// assert!(log.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationLog {
    messages: Vec<Message>,
}

impl ConversationLog {
    /// Creates an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a log from previously stored messages
    ///
    /// System messages are dropped; they are not part of a conversation log.
    pub fn from_messages(messages: impl IntoIterator<Item = Message>) -> Self {
        let messages = messages
            .into_iter()
            .filter(|m| {
                if m.role == Role::System {
                    tracing::debug!("Dropping system message while rebuilding log");
                    false
                } else {
                    true
                }
            })
            .collect();
        Self { messages }
    }

    /// Appends a user message
    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(Message::user(content));
    }

    /// Appends an assistant message
    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(Message::assistant(content));
    }

    /// All messages in chronological order
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of messages in the log
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the log has no messages
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Most recent message, if any
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Removes every message. Idempotent.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Consumes the log, returning its messages
    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }
}

/// Which prior messages accompany a new user message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContextPolicy {
    /// Send the entire prior log
    #[default]
    Full,
    /// Send only the most recent `n` prior messages
    Recent(usize),
}

impl ContextPolicy {
    /// Selects the prior messages to send, preserving chronological order
    ///
    /// The new user message is not part of `prior`; callers append it once
    /// after the selected window.
    ///
    /// # Examples
    ///
    /// ```
    /// use beechat::chat::{ContextPolicy, Message};
    ///
    /// let prior = vec![Message::user("a"), Message::assistant("b"), Message::user("c")];
    /// assert_eq!(ContextPolicy::Full.select(&prior).len(), 3);
    /// assert_eq!(ContextPolicy::Recent(2).select(&prior)[0].content, "b");
    /// ```
    pub fn select<'a>(&self, prior: &'a [Message]) -> &'a [Message] {
        match self {
            Self::Full => prior,
            Self::Recent(n) => &prior[prior.len().saturating_sub(*n)..],
        }
    }
}

impl std::fmt::Display for ContextPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Full => write!(f, "full"),
            Self::Recent(n) => write!(f, "recent({})", n),
        }
    }
}

//! Chat session: owner of one conversation
//!
//! A session holds the conversation log, the persona table and the context
//! policy, and runs at most one turn at a time. Successful turns are mirrored
//! to an optional message sink.

use crate::chat::conversation::{ContextPolicy, ConversationLog};
use crate::chat::message::Message;
use crate::chat::settings::TurnConfig;
use crate::chat::turn::{submit_turn, TurnReply};
use crate::error::{BeeChatError, Result};
use crate::persona::PersonaTable;
use crate::providers::{CompletionRequest, CompletionResponse, Provider, TokenUsage};
use crate::storage::{MessageSink, StoredMessage};

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Default wall-clock budget for one completion call
pub const DEFAULT_TURN_TIMEOUT: Duration = Duration::from_secs(60);

/// What a session turn produced
#[derive(Debug)]
pub struct TurnReport {
    /// Reply text or failure
    pub reply: TurnReply,
    /// Token usage, when reported
    pub usage: Option<TokenUsage>,
    /// Number of messages in the log after the turn
    pub history_len: usize,
    /// Whether the turn was written to the message sink
    pub persisted: bool,
}

/// Sub-second budgets report as one second rather than zero
fn whole_seconds_rounded_up(timeout: Duration) -> u64 {
    timeout.as_secs() + u64::from(timeout.subsec_nanos() > 0)
}

/// Applies the session timeout to every completion call
struct DeadlineProvider {
    inner: Arc<dyn Provider>,
    timeout: Duration,
}

#[async_trait]
impl Provider for DeadlineProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        match tokio::time::timeout(self.timeout, self.inner.complete(request)).await {
            Ok(result) => result,
            Err(_) => Err(BeeChatError::Timeout {
                seconds: whole_seconds_rounded_up(self.timeout),
            }
            .into()),
        }
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

/// One conversation with a completion service
///
/// # Examples
///
/// ```no_run
/// use beechat::chat::{ChatSession, TurnConfig};
/// use beechat::config::Config;
/// use beechat::persona::PersonaTable;
/// use beechat::providers::create_provider;
///
/// # async fn example() -> beechat::error::Result<()> {
/// let config = Config::default();
/// let provider = create_provider(&config)?;
/// let session = ChatSession::new(provider, PersonaTable::builtin());
///
/// let report = session.submit("Hello", &TurnConfig::default()).await?;
/// println!("{}", report.reply.display_text());
/// # Ok(())
/// # }
/// ```
pub struct ChatSession {
    id: String,
    provider: DeadlineProvider,
    personas: PersonaTable,
    policy: ContextPolicy,
    sink: Option<Arc<dyn MessageSink>>,
    log: Mutex<ConversationLog>,
}

impl ChatSession {
    /// Creates a session with an empty log, a fresh id, the full context
    /// policy and no sink
    pub fn new(provider: Arc<dyn Provider>, personas: PersonaTable) -> Self {
        let id = uuid::Uuid::new_v4().to_string();
        tracing::info!(session_id = %id, provider = provider.name(), "Starting chat session");
        Self {
            id,
            provider: DeadlineProvider {
                inner: provider,
                timeout: DEFAULT_TURN_TIMEOUT,
            },
            personas,
            policy: ContextPolicy::default(),
            sink: None,
            log: Mutex::new(ConversationLog::new()),
        }
    }

    /// Sets the context policy
    pub fn with_policy(mut self, policy: ContextPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the per-turn timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.provider.timeout = timeout;
        self
    }

    /// Mirrors successful turns into `sink`
    pub fn with_sink(mut self, sink: Arc<dyn MessageSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Continues an earlier conversation under its original id
    pub fn resume(mut self, session_id: impl Into<String>, log: ConversationLog) -> Self {
        self.id = session_id.into();
        tracing::info!(session_id = %self.id, messages = log.len(), "Resuming chat session");
        self.log = Mutex::new(log);
        self
    }

    /// Session identifier used for stored messages
    pub fn session_id(&self) -> &str {
        &self.id
    }

    /// Persona table used to resolve persona keys
    pub fn personas(&self) -> &PersonaTable {
        &self.personas
    }

    /// Active context policy
    pub fn policy(&self) -> ContextPolicy {
        self.policy
    }

    /// Runs one turn
    ///
    /// The log is replaced with the updated one whatever the reply; a failed
    /// completion leaves the user message as the last entry. Only successful
    /// turns are written to the sink, and a sink failure is logged without
    /// failing the turn.
    ///
    /// # Errors
    ///
    /// Returns `TurnInProgress` if another turn is running on this session,
    /// or `InvalidInput` if the text or settings are rejected. Neither changes
    /// the log.
    pub async fn submit(&self, text: &str, config: &TurnConfig) -> Result<TurnReport> {
        let mut log = self.log.try_lock().map_err(|_| {
            tracing::warn!(session_id = %self.id, "Rejected turn: another turn is in progress");
            BeeChatError::TurnInProgress
        })?;

        let outcome = submit_turn(
            &self.provider,
            text,
            config,
            &self.personas,
            &log,
            self.policy,
        )
        .await?;

        let records: Vec<StoredMessage> = if outcome.reply.is_success() {
            let messages = outcome.log.messages();
            messages[messages.len().saturating_sub(2)..]
                .iter()
                .map(|m| StoredMessage::from_message(self.id.as_str(), m))
                .collect()
        } else {
            Vec::new()
        };

        *log = outcome.log;
        let history_len = log.len();

        let persisted = if records.is_empty() {
            false
        } else {
            self.persist(records).await
        };

        Ok(TurnReport {
            reply: outcome.reply,
            usage: outcome.usage,
            history_len,
            persisted,
        })
    }

    async fn persist(&self, records: Vec<StoredMessage>) -> bool {
        let Some(sink) = self.sink.clone() else {
            return false;
        };

        let result = tokio::task::spawn_blocking(move || sink.append_all(&records)).await;
        match result {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                tracing::warn!(session_id = %self.id, "Failed to persist turn: {:#}", e);
                false
            }
            Err(e) => {
                tracing::warn!(session_id = %self.id, "Persistence task failed: {}", e);
                false
            }
        }
    }

    /// Empties the conversation log
    ///
    /// Waits for an in-flight turn to finish first. Clearing an empty log is
    /// a no-op. Stored messages are not touched.
    pub async fn clear_history(&self) {
        let mut log = self.log.lock().await;
        if !log.is_empty() {
            tracing::info!(session_id = %self.id, cleared = log.len(), "Cleared conversation");
        }
        log.clear();
    }

    /// Snapshot of the conversation log
    pub async fn history(&self) -> Vec<Message> {
        self.log.lock().await.messages().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::message::Role;
    use crate::error::ErrorKind;
    use std::sync::Mutex as StdMutex;
    use tokio::sync::Notify;

    struct EchoProvider {
        fail: bool,
    }

    #[async_trait]
    impl Provider for EchoProvider {
        async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
            if self.fail {
                return Err(BeeChatError::Authentication("bad key".to_string()).into());
            }
            let last = request
                .messages
                .last()
                .map(|m| m.content.clone())
                .unwrap_or_default();
            Ok(CompletionResponse::new(format!("echo: {}", last)))
        }
    }

    /// Echoes like `EchoProvider` and keeps every request
    #[derive(Clone, Default)]
    struct RecordingProvider {
        requests: Arc<StdMutex<Vec<CompletionRequest>>>,
    }

    #[async_trait]
    impl Provider for RecordingProvider {
        async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
            self.requests.lock().unwrap().push(request.clone());
            let echo = EchoProvider { fail: false };
            echo.complete(request).await
        }
    }

    /// Blocks inside `complete` until released
    struct GatedProvider {
        started: Notify,
        release: Notify,
    }

    #[async_trait]
    impl Provider for GatedProvider {
        async fn complete(&self, _request: &CompletionRequest) -> Result<CompletionResponse> {
            self.started.notify_one();
            self.release.notified().await;
            Ok(CompletionResponse::new("done"))
        }
    }

    struct SlowProvider;

    #[async_trait]
    impl Provider for SlowProvider {
        async fn complete(&self, _request: &CompletionRequest) -> Result<CompletionResponse> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(CompletionResponse::new("too late"))
        }
    }

    #[derive(Default)]
    struct MemorySink {
        records: StdMutex<Vec<StoredMessage>>,
    }

    impl MessageSink for MemorySink {
        fn append(&self, message: &StoredMessage) -> Result<()> {
            self.records.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    struct BrokenSink;

    impl MessageSink for BrokenSink {
        fn append(&self, _message: &StoredMessage) -> Result<()> {
            Err(BeeChatError::Storage("disk full".to_string()).into())
        }
    }

    fn session(provider: impl Provider + 'static) -> ChatSession {
        ChatSession::new(Arc::new(provider), PersonaTable::builtin())
    }

    #[tokio::test]
    async fn test_submit_success_updates_history_and_sink() {
        let sink = Arc::new(MemorySink::default());
        let session = session(EchoProvider { fail: false }).with_sink(sink.clone());

        let report = session
            .submit("Hello", &TurnConfig::default())
            .await
            .unwrap();

        assert_eq!(report.reply.display_text(), "echo: Hello");
        assert_eq!(report.history_len, 2);
        assert!(report.persisted);

        let history = session.history().await;
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[1].role, Role::Assistant);

        let records = sink.records.lock().unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.session_id == session.session_id()));
        assert_eq!(records[0].content, "Hello");
        assert_eq!(records[1].content, "echo: Hello");
    }

    #[tokio::test]
    async fn test_submit_failure_keeps_user_and_skips_sink() {
        let sink = Arc::new(MemorySink::default());
        let session = session(EchoProvider { fail: true }).with_sink(sink.clone());

        let report = session
            .submit("Hello", &TurnConfig::default())
            .await
            .unwrap();

        assert!(!report.reply.is_success());
        assert!(!report.persisted);
        let history = session.history().await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].content, "Hello");
        assert!(sink.records.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_input_leaves_history_unchanged() {
        let session = session(EchoProvider { fail: false });
        session
            .submit("first", &TurnConfig::default())
            .await
            .unwrap();

        let err = session
            .submit("   ", &TurnConfig::default())
            .await
            .unwrap_err();
        assert_eq!(BeeChatError::classify(&err), ErrorKind::InvalidInput);
        assert_eq!(session.history().await.len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_submit_is_rejected() {
        let provider = Arc::new(GatedProvider {
            started: Notify::new(),
            release: Notify::new(),
        });
        let session = Arc::new(ChatSession::new(provider.clone(), PersonaTable::builtin()));

        let first = {
            let session = session.clone();
            tokio::spawn(async move { session.submit("first", &TurnConfig::default()).await })
        };
        provider.started.notified().await;

        let err = session
            .submit("second", &TurnConfig::default())
            .await
            .unwrap_err();
        assert_eq!(BeeChatError::classify(&err), ErrorKind::Busy);

        provider.release.notify_one();
        let report = first.await.unwrap().unwrap();
        assert!(report.reply.is_success());

        let history = session.history().await;
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|m| m.content != "second"));
    }

    #[tokio::test]
    async fn test_timeout_is_retryable_service_failure() {
        let session = session(SlowProvider).with_timeout(Duration::from_millis(50));

        let report = session
            .submit("Hello", &TurnConfig::default())
            .await
            .unwrap();

        let error = report.reply.error().unwrap();
        assert!(matches!(error, BeeChatError::Timeout { seconds: 1 }));
        assert_eq!(error.kind(), ErrorKind::ServiceFailure);
        assert!(error.is_retryable());
        assert_eq!(session.history().await.len(), 1);
    }

    #[tokio::test]
    async fn test_sink_failure_does_not_fail_turn() {
        let session = session(EchoProvider { fail: false }).with_sink(Arc::new(BrokenSink));

        let report = session
            .submit("Hello", &TurnConfig::default())
            .await
            .unwrap();

        assert!(report.reply.is_success());
        assert!(!report.persisted);
        assert_eq!(session.history().await.len(), 2);
    }

    #[tokio::test]
    async fn test_clear_history_is_idempotent() {
        let session = session(EchoProvider { fail: false });
        session
            .submit("Hello", &TurnConfig::default())
            .await
            .unwrap();

        session.clear_history().await;
        assert!(session.history().await.is_empty());
        session.clear_history().await;
        assert!(session.history().await.is_empty());
    }

    #[test]
    fn test_timeout_seconds_round_up() {
        assert_eq!(whole_seconds_rounded_up(Duration::from_millis(50)), 1);
        assert_eq!(whole_seconds_rounded_up(Duration::from_secs(60)), 60);
        assert_eq!(whole_seconds_rounded_up(Duration::from_millis(1500)), 2);
        assert_eq!(whole_seconds_rounded_up(Duration::ZERO), 0);
    }

    #[tokio::test]
    async fn test_recent_policy_limits_context() {
        let provider = RecordingProvider::default();
        let session = ChatSession::new(Arc::new(provider.clone()), PersonaTable::builtin())
            .with_policy(ContextPolicy::Recent(1));
        for text in ["one", "two", "three"] {
            session.submit(text, &TurnConfig::default()).await.unwrap();
        }

        assert_eq!(session.history().await.len(), 6);
        assert_eq!(session.policy(), ContextPolicy::Recent(1));

        let requests = provider.requests.lock().unwrap();
        assert_eq!(requests.len(), 3);
        let last: Vec<(Role, &str)> = requests[2]
            .messages
            .iter()
            .map(|m| (m.role, m.content.as_str()))
            .collect();
        assert_eq!(last.len(), 3);
        assert_eq!(last[0].0, Role::System);
        assert_eq!(
            &last[1..],
            &[(Role::Assistant, "echo: two"), (Role::User, "three")]
        );
    }

    #[tokio::test]
    async fn test_resume_keeps_id_and_log() {
        let log = ConversationLog::from_messages(vec![
            Message::user("earlier"),
            Message::assistant("reply"),
        ]);
        let session = session(EchoProvider { fail: false }).resume("abc-123", log);

        assert_eq!(session.session_id(), "abc-123");
        assert_eq!(session.history().await.len(), 2);
    }
}

//! Conversation assembly and response retrieval
//!
//! One turn takes the prior log and new user text, builds the outbound
//! message sequence, makes exactly one completion call and returns the updated
//! log. The prior log is never mutated.
//!
//! The outbound sequence always has the shape
//! `[system] ++ context window ++ [new user message]`, where the system
//! message is synthesized from the tone and persona and never stored.

use crate::chat::conversation::{ContextPolicy, ConversationLog};
use crate::chat::message::Message;
use crate::chat::settings::{Tone, TurnConfig};
use crate::error::{BeeChatError, Result};
use crate::persona::PersonaTable;
use crate::providers::{CompletionRequest, Provider, TokenUsage};

/// Text shown in place of a reply when the completion call fails
pub const PLACEHOLDER_REPLY: &str = "Sorry, I encountered an error while generating a response.";

/// Result of the completion call within a turn
#[derive(Debug)]
pub enum TurnReply {
    /// The service replied; the text was appended to the log
    Assistant(String),
    /// The service failed; nothing was appended after the user message
    Failed(BeeChatError),
}

impl TurnReply {
    /// Stand-in apology for display after a failure
    ///
    /// Never written to the conversation log.
    pub fn placeholder() -> &'static str {
        PLACEHOLDER_REPLY
    }

    /// Whether the service produced a reply
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Assistant(_))
    }

    /// Text to show the user: the reply, or the placeholder on failure
    pub fn display_text(&self) -> &str {
        match self {
            Self::Assistant(text) => text,
            Self::Failed(_) => Self::placeholder(),
        }
    }

    /// The failure, if any
    pub fn error(&self) -> Option<&BeeChatError> {
        match self {
            Self::Assistant(_) => None,
            Self::Failed(e) => Some(e),
        }
    }
}

/// Everything a turn produced
#[derive(Debug)]
pub struct TurnOutcome {
    /// Prior log plus the user message, plus the reply on success
    pub log: ConversationLog,
    /// Reply or failure
    pub reply: TurnReply,
    /// Token usage reported by the service, when available
    pub usage: Option<TokenUsage>,
}

/// Builds the per-request system message
///
/// # Examples
///
/// ```
/// use beechat::chat::{build_system_message, Role, Tone};
///
/// let message = build_system_message(Tone::Friendly, "Act as a helpful assistant.");
/// assert_eq!(message.role, Role::System);
/// assert_eq!(
///     message.content,
///     "Respond in a Friendly tone. Act as a helpful assistant."
/// );
/// ```
pub fn build_system_message(tone: Tone, persona_text: &str) -> Message {
    Message::system(format!("Respond in a {} tone. {}", tone.label(), persona_text))
}

/// Checks the user text and settings, returning the persona instruction
fn validate_turn<'p>(
    user_text: &str,
    config: &TurnConfig,
    personas: &'p PersonaTable,
) -> std::result::Result<&'p str, BeeChatError> {
    if user_text.trim().is_empty() {
        return Err(BeeChatError::InvalidInput(
            "message cannot be empty".to_string(),
        ));
    }
    config.validate()?;
    personas.require(&config.persona)
}

fn assemble(
    system: Message,
    prior: &[Message],
    user: Message,
    policy: ContextPolicy,
) -> Vec<Message> {
    let window = policy.select(prior);
    let mut outbound = Vec::with_capacity(window.len() + 2);
    outbound.push(system);
    outbound.extend_from_slice(window);
    outbound.push(user);
    outbound
}

/// Builds the outbound message sequence for `user_text` without calling a
/// provider
///
/// # Errors
///
/// Returns `InvalidInput` if the text is blank, a parameter is out of range
/// or the persona is unknown
///
/// # Examples
///
/// ```
/// use beechat::chat::{build_outbound_messages, ContextPolicy, Role, TurnConfig};
/// use beechat::persona::PersonaTable;
///
/// let messages = build_outbound_messages(
///     &TurnConfig::default(),
///     &PersonaTable::builtin(),
///     &[],
///     "Hello",
///     ContextPolicy::Full,
/// )
/// .unwrap();
/// assert_eq!(messages.len(), 2);
/// assert_eq!(messages[0].role, Role::System);
/// assert_eq!(messages[1].content, "Hello");
/// ```
pub fn build_outbound_messages(
    config: &TurnConfig,
    personas: &PersonaTable,
    prior: &[Message],
    user_text: &str,
    policy: ContextPolicy,
) -> std::result::Result<Vec<Message>, BeeChatError> {
    let persona_text = validate_turn(user_text, config, personas)?;
    Ok(assemble(
        build_system_message(config.tone, persona_text),
        prior,
        Message::user(user_text),
        policy,
    ))
}

/// Runs one conversational turn
///
/// Validation failures are returned as `Err` before any network call. A
/// failing completion call is not an `Err`: it yields
/// [`TurnReply::Failed`] and a log that ends with the user message.
///
/// # Arguments
///
/// * `provider` - Completion service
/// * `user_text` - New user input
/// * `config` - Settings for this turn
/// * `personas` - Persona table to resolve `config.persona` against
/// * `prior` - Conversation so far; borrowed, never mutated
/// * `policy` - How much of `prior` accompanies the request
///
/// # Errors
///
/// Returns `InvalidInput` for blank text, out-of-range parameters or an
/// unknown persona
pub async fn submit_turn(
    provider: &dyn Provider,
    user_text: &str,
    config: &TurnConfig,
    personas: &PersonaTable,
    prior: &ConversationLog,
    policy: ContextPolicy,
) -> Result<TurnOutcome> {
    let persona_text = validate_turn(user_text, config, personas)?;

    let mut log = prior.clone();
    log.push_user(user_text);
    let user = match log.last() {
        Some(message) => message.clone(),
        None => Message::user(user_text),
    };

    let outbound = assemble(
        build_system_message(config.tone, persona_text),
        prior.messages(),
        user,
        policy,
    );

    tracing::debug!(
        provider = provider.name(),
        model = %config.model,
        persona = %config.persona,
        tone = %config.tone,
        policy = %policy,
        outbound = outbound.len(),
        "Submitting turn"
    );

    let request = CompletionRequest::new(config, outbound);
    match provider.complete(&request).await {
        Ok(response) => {
            if let Some(usage) = &response.usage {
                tracing::debug!(
                    prompt_tokens = usage.prompt_tokens,
                    completion_tokens = usage.completion_tokens,
                    "Turn completed"
                );
            }
            log.push_assistant(response.content.clone());
            Ok(TurnOutcome {
                log,
                reply: TurnReply::Assistant(response.content),
                usage: response.usage,
            })
        }
        Err(e) => {
            let error = BeeChatError::into_service_failure(e);
            tracing::error!(retryable = error.is_retryable(), "Turn failed: {}", error);
            Ok(TurnOutcome {
                log,
                reply: TurnReply::Failed(error),
                usage: None,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::message::Role;
    use crate::error::ErrorKind;
    use crate::providers::CompletionResponse;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    /// Records every request and replies with a fixed text or error
    struct RecordingProvider {
        reply: Option<String>,
        requests: Arc<Mutex<Vec<CompletionRequest>>>,
    }

    impl RecordingProvider {
        fn replying(text: &str) -> Self {
            Self {
                reply: Some(text.to_string()),
                requests: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn failing() -> Self {
            Self {
                reply: None,
                requests: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn call_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        fn last_request(&self) -> CompletionRequest {
            self.requests.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl Provider for RecordingProvider {
        async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
            self.requests.lock().unwrap().push(request.clone());
            match &self.reply {
                Some(text) => Ok(CompletionResponse::with_usage(
                    text.clone(),
                    TokenUsage::new(10, 5),
                )),
                None => Err(BeeChatError::Server {
                    status: 503,
                    message: "unavailable".to_string(),
                }
                .into()),
            }
        }
    }

    fn prior_log() -> ConversationLog {
        let mut log = ConversationLog::new();
        log.push_user("first question");
        log.push_assistant("first answer");
        log.push_user("second question");
        log.push_assistant("second answer");
        log
    }

    #[test]
    fn test_default_persona_hello_outbound() {
        let messages = build_outbound_messages(
            &TurnConfig::default(),
            &PersonaTable::builtin(),
            &[],
            "Hello",
            ContextPolicy::Full,
        )
        .unwrap();

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(
            messages[0].content,
            "Respond in a Friendly tone. Act as a helpful assistant."
        );
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(messages[1].content, "Hello");
    }

    #[test]
    fn test_system_message_contains_tone_and_persona_verbatim() {
        let config = TurnConfig {
            persona: "Code_Reviewer".to_string(),
            tone: Tone::Professional,
            ..Default::default()
        };
        let personas = PersonaTable::builtin();
        let messages =
            build_outbound_messages(&config, &personas, &[], "review", ContextPolicy::Full)
                .unwrap();

        let system = &messages[0].content;
        assert!(system.contains("Professional"));
        assert!(system.contains(personas.get("Code_Reviewer").unwrap()));
        assert_eq!(
            messages.iter().filter(|m| m.role == Role::System).count(),
            1
        );
    }

    #[test]
    fn test_full_policy_sends_whole_log_in_order() {
        let prior = prior_log();
        let messages = build_outbound_messages(
            &TurnConfig::default(),
            &PersonaTable::builtin(),
            prior.messages(),
            "third question",
            ContextPolicy::Full,
        )
        .unwrap();

        let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(
            &contents[1..],
            &[
                "first question",
                "first answer",
                "second question",
                "second answer",
                "third question"
            ]
        );
    }

    #[test]
    fn test_recent_policy_sends_user_message_once() {
        let prior = prior_log();
        let messages = build_outbound_messages(
            &TurnConfig::default(),
            &PersonaTable::builtin(),
            prior.messages(),
            "third question",
            ContextPolicy::Recent(2),
        )
        .unwrap();

        let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(
            &contents[1..],
            &["second question", "second answer", "third question"]
        );
        assert_eq!(
            contents.iter().filter(|c| **c == "third question").count(),
            1
        );
    }

    #[test]
    fn test_unknown_persona_is_invalid_input() {
        let config = TurnConfig {
            persona: "Pirate".to_string(),
            ..Default::default()
        };
        let err = build_outbound_messages(
            &config,
            &PersonaTable::builtin(),
            &[],
            "Hello",
            ContextPolicy::Full,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_submit_success_appends_user_and_assistant() {
        let provider = RecordingProvider::replying("Hi!");
        let prior = prior_log();

        let outcome = submit_turn(
            &provider,
            "third question",
            &TurnConfig::default(),
            &PersonaTable::builtin(),
            &prior,
            ContextPolicy::Full,
        )
        .await
        .unwrap();

        assert_eq!(prior.len(), 4);
        assert_eq!(outcome.log.len(), 6);
        assert_eq!(&outcome.log.messages()[..4], prior.messages());
        assert_eq!(outcome.log.messages()[4].role, Role::User);
        assert_eq!(outcome.log.messages()[4].content, "third question");
        assert_eq!(outcome.log.messages()[5].role, Role::Assistant);
        assert_eq!(outcome.log.messages()[5].content, "Hi!");
        assert!(outcome.reply.is_success());
        assert_eq!(outcome.reply.display_text(), "Hi!");
        assert_eq!(outcome.usage.map(|u| u.total_tokens), Some(15));
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_submit_forwards_turn_parameters() {
        let provider = RecordingProvider::replying("ok");
        let config = TurnConfig {
            model: crate::chat::ModelId::Gpt4o,
            max_tokens: 64,
            temperature: 0.3,
            top_p: 0.8,
            ..Default::default()
        };

        submit_turn(
            &provider,
            "Hello",
            &config,
            &PersonaTable::builtin(),
            &ConversationLog::new(),
            ContextPolicy::Full,
        )
        .await
        .unwrap();

        let request = provider.last_request();
        assert_eq!(request.model, crate::chat::ModelId::Gpt4o);
        assert_eq!(request.max_tokens, 64);
        assert!((request.temperature - 0.3).abs() < f32::EPSILON);
        assert!((request.top_p - 0.8).abs() < f32::EPSILON);
        assert_eq!(request.messages.len(), 2);
    }

    #[tokio::test]
    async fn test_submit_failure_keeps_user_message_only() {
        let provider = RecordingProvider::failing();
        let prior = prior_log();

        let outcome = submit_turn(
            &provider,
            "third question",
            &TurnConfig::default(),
            &PersonaTable::builtin(),
            &prior,
            ContextPolicy::Full,
        )
        .await
        .unwrap();

        assert_eq!(outcome.log.len(), 5);
        assert_eq!(outcome.log.last().unwrap().role, Role::User);
        assert!(!outcome.reply.is_success());
        let error = outcome.reply.error().unwrap();
        assert_eq!(error.kind(), ErrorKind::ServiceFailure);
        assert!(error.is_retryable());
        assert_eq!(outcome.reply.display_text(), PLACEHOLDER_REPLY);
        assert!(outcome
            .log
            .messages()
            .iter()
            .all(|m| m.content != PLACEHOLDER_REPLY));
    }

    #[tokio::test]
    async fn test_submit_blank_text_makes_no_call() {
        let provider = RecordingProvider::replying("unused");
        let prior = prior_log();

        for text in ["", "   ", "\n\t"] {
            let err = submit_turn(
                &provider,
                text,
                &TurnConfig::default(),
                &PersonaTable::builtin(),
                &prior,
                ContextPolicy::Full,
            )
            .await
            .unwrap_err();
            assert_eq!(BeeChatError::classify(&err), ErrorKind::InvalidInput);
        }

        assert_eq!(provider.call_count(), 0);
        assert_eq!(prior.len(), 4);
    }

    #[tokio::test]
    async fn test_submit_invalid_parameters_make_no_call() {
        let provider = RecordingProvider::replying("unused");
        let config = TurnConfig {
            temperature: 5.0,
            ..Default::default()
        };

        let err = submit_turn(
            &provider,
            "Hello",
            &config,
            &PersonaTable::builtin(),
            &ConversationLog::new(),
            ContextPolicy::Full,
        )
        .await
        .unwrap_err();

        assert_eq!(BeeChatError::classify(&err), ErrorKind::InvalidInput);
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_outbound_user_message_matches_logged_message() {
        let provider = RecordingProvider::replying("ok");
        let outcome = submit_turn(
            &provider,
            "Hello",
            &TurnConfig::default(),
            &PersonaTable::builtin(),
            &ConversationLog::new(),
            ContextPolicy::Recent(3),
        )
        .await
        .unwrap();

        let request = provider.last_request();
        assert_eq!(
            request.messages.last().unwrap(),
            &outcome.log.messages()[0]
        );
    }
}

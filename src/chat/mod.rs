//! Conversation core
//!
//! Message types, the per-session log, turn settings, turn assembly and the
//! session that serializes turns.

pub mod conversation;
pub mod message;
pub mod session;
pub mod settings;
pub mod turn;

pub use conversation::{ContextPolicy, ConversationLog};
pub use message::{Message, Role};
pub use session::{ChatSession, TurnReport, DEFAULT_TURN_TIMEOUT};
pub use settings::{ModelId, Tone, TurnConfig, DEFAULT_PERSONA};
pub use turn::{
    build_outbound_messages, build_system_message, submit_turn, TurnOutcome, TurnReply,
    PLACEHOLDER_REPLY,
};

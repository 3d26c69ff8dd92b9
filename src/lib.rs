//! BeeChat - terminal chat client library
//!
//! This library assembles conversations for an OpenAI-compatible
//! chat-completion service: it builds the outbound message sequence for each
//! turn, calls the service once, and keeps the per-session conversation log.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `chat`: Messages, conversation log, turn settings, turn assembly and sessions
//! - `persona`: Built-in and configured persona instructions
//! - `providers`: Completion service abstraction, OpenAI client and replay cache
//! - `storage`: SQLite message log
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli` / `commands`: Command-line interface and handlers
//!
//! # Example
//!
//! ```no_run
//! use beechat::chat::ChatSession;
//! use beechat::providers::create_provider;
//! use beechat::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/config.yaml")?;
//!     config.validate()?;
//!
//!     let session = ChatSession::new(create_provider(&config)?, config.persona_table()?)
//!         .with_policy(config.chat.context.policy());
//!     let report = session.submit("Hello", &config.chat.turn).await?;
//!     println!("{}", report.reply.display_text());
//!     Ok(())
//! }
//! ```

pub mod chat;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod persona;
pub mod providers;
pub mod storage;

// Re-export commonly used types
pub use chat::{ChatSession, ContextPolicy, ConversationLog, Message, Role, TurnConfig};
pub use config::Config;
pub use error::{BeeChatError, ErrorKind, Result};
pub use persona::PersonaTable;

//! Command-line interface definition for BeeChat
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for interactive chat, one-shot prompts, persona
//! listing and stored history.

use crate::config::TurnOverrides;
use clap::{Args, Parser, Subcommand};

/// BeeChat - terminal chat client for OpenAI-compatible completion services
#[derive(Parser, Debug, Clone)]
#[command(name = "beechat")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for BeeChat
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start an interactive chat session
    Chat {
        /// Turn settings for this session
        #[command(flatten)]
        turn: TurnArgs,

        /// Continue a stored session (full id or 8-char prefix)
        #[arg(short, long)]
        resume: Option<String>,

        /// Do not write this session to the message log
        #[arg(long)]
        no_history: bool,
    },

    /// Send a single prompt and print the reply
    Ask {
        /// Prompt text
        prompt: String,

        /// Turn settings for this prompt
        #[command(flatten)]
        turn: TurnArgs,

        /// Do not write this exchange to the message log
        #[arg(long)]
        no_history: bool,
    },

    /// List personas, tones and models
    Personas,

    /// Inspect or clear stored conversations
    History {
        /// History subcommand
        #[command(subcommand)]
        command: HistoryCommand,
    },
}

/// Per-invocation turn settings
#[derive(Args, Debug, Clone, Default)]
pub struct TurnArgs {
    /// Model identifier (e.g. gpt-4o-mini)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Persona key (e.g. Default, Chef)
    #[arg(short, long)]
    pub persona: Option<String>,

    /// Tone label (e.g. Friendly, Formal)
    #[arg(short, long)]
    pub tone: Option<String>,

    /// Maximum tokens in each reply
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Sampling temperature (0.0 - 2.0)
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Nucleus sampling mass (0.0 - 1.0)
    #[arg(long)]
    pub top_p: Option<f32>,
}

impl From<TurnArgs> for TurnOverrides {
    fn from(args: TurnArgs) -> Self {
        Self {
            model: args.model,
            persona: args.persona,
            tone: args.tone,
            max_tokens: args.max_tokens,
            temperature: args.temperature,
            top_p: args.top_p,
        }
    }
}

/// History management subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum HistoryCommand {
    /// List stored sessions
    List,

    /// Print the messages of one session
    Show {
        /// Session id (full id or 8-char prefix)
        session: String,
    },

    /// Delete stored messages
    Clear {
        /// Only delete this session (full id or 8-char prefix)
        #[arg(short, long)]
        session: Option<String>,
    },
}

impl Cli {
    /// Parse command line arguments
    ///
    /// # Returns
    ///
    /// Returns the parsed CLI structure
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

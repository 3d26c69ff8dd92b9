//! Special commands parser for interactive chat mode
//!
//! This module parses special commands that can be entered during an
//! interactive chat session. Special commands allow users to:
//! - Change the model, persona or tone used for the next turn
//! - Clear the conversation
//! - Inspect the current settings, personas and conversation
//! - Exit the session
//!
//! Commands are prefixed with `/`; command names are case-insensitive while
//! arguments keep their original spelling.

use thiserror::Error;

/// Errors that can occur when parsing special commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown command was entered
    #[error("Unknown command: {0}\n\nType '/help' to see available commands")]
    UnknownCommand(String),

    /// Command was given an argument it does not take
    #[error("Unsupported argument for {command}: {arg}\n\nType '/help' to see valid usage")]
    UnsupportedArgument { command: String, arg: String },

    /// Command requires an argument but none was provided
    #[error("Command {command} requires an argument\n\nUsage: {usage}")]
    MissingArgument { command: String, usage: String },
}

/// Special commands that can be executed during interactive chat
///
/// These commands modify the session settings or show information, rather
/// than being sent to the completion service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialCommand {
    /// Empty the conversation log
    Clear,

    /// Use a different model from the next turn on
    SwitchModel(String),

    /// Use a different persona from the next turn on
    SwitchPersona(String),

    /// Use a different tone from the next turn on
    SwitchTone(String),

    /// Show the current turn settings
    ShowSettings,

    /// List personas with their instructions
    ListPersonas,

    /// Print the conversation so far
    ShowHistory,

    /// Display help information
    Help,

    /// Exit the interactive session
    Exit,

    /// Not a special command
    ///
    /// The input should be sent as a regular chat message.
    None,
}

/// Parse a user input string into a special command
///
/// # Arguments
///
/// * `input` - The user input string to parse
///
/// # Returns
///
/// Returns Ok(SpecialCommand) for valid commands or SpecialCommand::None for
/// regular messages.
///
/// # Errors
///
/// Returns CommandError::UnknownCommand if input starts with "/" but is not a valid command.
/// Returns CommandError::UnsupportedArgument if a command that takes no argument receives one.
/// Returns CommandError::MissingArgument if a command requires an argument but none was provided.
///
/// # Examples
///
/// ```
/// use beechat::commands::special_commands::{parse_special_command, SpecialCommand};
///
/// let cmd = parse_special_command("/persona Code_Reviewer").unwrap();
/// assert_eq!(cmd, SpecialCommand::SwitchPersona("Code_Reviewer".to_string()));
///
/// let cmd = parse_special_command("/CLEAR").unwrap();
/// assert_eq!(cmd, SpecialCommand::Clear);
///
/// let cmd = parse_special_command("hello there").unwrap();
/// assert_eq!(cmd, SpecialCommand::None);
///
/// assert!(parse_special_command("/foo").is_err());
/// ```
pub fn parse_special_command(input: &str) -> Result<SpecialCommand, CommandError> {
    let trimmed = input.trim();
    let lower = trimmed.to_lowercase();

    // Plain text is a message, except the bare exit words
    if !trimmed.starts_with('/') {
        return Ok(match lower.as_str() {
            "exit" | "quit" => SpecialCommand::Exit,
            _ => SpecialCommand::None,
        });
    }

    let (name, arg) = match trimmed.split_once(char::is_whitespace) {
        Some((name, rest)) => (name.to_lowercase(), rest.trim()),
        None => (lower.clone(), ""),
    };

    let with_arg = |usage: &str, build: fn(String) -> SpecialCommand| {
        if arg.is_empty() {
            Err(CommandError::MissingArgument {
                command: name.clone(),
                usage: usage.to_string(),
            })
        } else {
            Ok(build(arg.to_string()))
        }
    };

    let no_arg = |command: SpecialCommand| {
        if arg.is_empty() {
            Ok(command)
        } else {
            Err(CommandError::UnsupportedArgument {
                command: name.clone(),
                arg: arg.to_string(),
            })
        }
    };

    match name.as_str() {
        "/clear" | "/reset" => no_arg(SpecialCommand::Clear),
        "/model" => with_arg("/model <model_id>", SpecialCommand::SwitchModel),
        "/persona" => with_arg("/persona <persona>", SpecialCommand::SwitchPersona),
        "/tone" => with_arg("/tone <tone>", SpecialCommand::SwitchTone),
        "/settings" | "/status" => no_arg(SpecialCommand::ShowSettings),
        "/personas" => no_arg(SpecialCommand::ListPersonas),
        "/history" => no_arg(SpecialCommand::ShowHistory),
        "/help" | "/?" => no_arg(SpecialCommand::Help),
        "/exit" | "/quit" => no_arg(SpecialCommand::Exit),
        _ => Err(CommandError::UnknownCommand(name.clone())),
    }
}

/// Display help text for special commands
pub fn print_help() {
    println!(
        r#"
Special Commands for Interactive Chat Mode
===========================================

SETTINGS (apply from the next message on):
  /model <id>       - Switch model (gpt-4o-mini, gpt-4o, gpt-4, gpt-3.5-turbo)
  /persona <name>   - Switch persona (see /personas)
  /tone <tone>      - Switch tone (Friendly, Professional, Casual, Formal,
                      Humorous, Empathetic)
  /settings         - Show the current model, persona, tone and sampling
  /status           - Same as /settings

CONVERSATION:
  /clear            - Start a fresh conversation
  /reset            - Same as /clear
  /history          - Print the conversation so far
  /personas         - List personas and their instructions

SESSION CONTROL:
  /help             - Show this help message
  /?                - Same as /help
  /exit             - Exit interactive mode
  exit, quit        - Same as /exit

NOTES:
  - Command names are case-insensitive
  - Regular text (not starting with /) is sent to the model
  - /clear does not delete stored history; use `beechat history clear`
"#
    );
}

/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

- `chat`     - Interactive chat session
- `ask`      - One-shot prompt
- `personas` - List personas, tones and models
- `history`  - Stored conversation management

These handlers are intentionally small and use the library components:
providers, the chat session and storage.
*/

use crate::chat::{ChatSession, ConversationLog, TurnConfig};
use crate::config::Config;
use crate::error::{BeeChatError, Result};
use crate::persona::PersonaTable;
use crate::providers::create_provider;
use crate::storage::{SqliteStorage, StoredMessage};
use colored::Colorize;
use std::sync::Arc;
use std::time::Duration;

// Special commands parser for the chat loop
pub mod special_commands;

// Stored history commands
pub mod history;

/// Build a chat session from configuration
///
/// Attaches the SQLite message log unless `no_history` is set or storage is
/// disabled. When `resume` names a stored session its messages become the
/// starting log and the session keeps the stored id.
///
/// # Errors
///
/// Returns `MissingCredentials` if the API key is not set, or `InvalidInput`
/// if `resume` is empty, ambiguous or matches no stored session
pub fn build_session(config: &Config, no_history: bool, resume: Option<&str>) -> Result<ChatSession> {
    let provider = create_provider(config)?;
    let personas = config.persona_table()?;

    let mut session = ChatSession::new(provider, personas)
        .with_policy(config.chat.context.policy())
        .with_timeout(Duration::from_secs(config.provider.timeout_seconds));

    let wants_storage = (config.storage.enabled && !no_history) || resume.is_some();
    let storage = if wants_storage {
        Some(Arc::new(SqliteStorage::from_config(&config.storage)?))
    } else {
        None
    };

    if let (Some(id), Some(storage)) = (resume, &storage) {
        let stored = storage.load_session(id)?;
        let Some(first) = stored.first() else {
            return Err(BeeChatError::InvalidInput(format!(
                "No stored session matches '{}'",
                id
            ))
            .into());
        };
        let session_id = first.session_id.clone();
        let log = ConversationLog::from_messages(stored.into_iter().map(StoredMessage::into_message));
        session = session.resume(session_id, log);
    }

    if config.storage.enabled && !no_history {
        if let Some(storage) = storage {
            session = session.with_sink(storage);
        }
    } else {
        tracing::info!("Message log disabled for this session");
    }

    Ok(session)
}

/// Prints the model, persona, tone and sampling settings
pub fn print_settings(settings: &TurnConfig, session: &ChatSession) {
    println!("\n{}", "Current Settings".bold());
    println!("  Session:     {}", session.session_id().cyan());
    println!("  Model:       {}", settings.model.to_string().cyan());
    println!("  Persona:     {}", settings.persona.cyan());
    println!("  Tone:        {}", settings.tone.to_string().cyan());
    println!("  Max tokens:  {}", settings.max_tokens);
    println!("  Temperature: {:.2}", settings.temperature);
    println!("  Top P:       {:.2}", settings.top_p);
    println!("  Context:     {}\n", session.policy());
}

// Chat command handler
pub mod chat {
    //! Interactive chat mode handler.
    //!
    //! Builds a session and runs a readline loop that submits user input and
    //! prints the replies. `/`-commands adjust the settings for later turns.

    use super::*;
    use crate::chat::{Message, ModelId, Role, Tone};
    use crate::commands::special_commands::{parse_special_command, print_help, SpecialCommand};
    use crate::error::ErrorKind;
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;

    /// Start interactive chat mode
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration with CLI overrides applied
    /// * `resume` - Optional stored session to continue
    /// * `no_history` - If true, do not write turns to the message log
    pub async fn run_chat(config: Config, resume: Option<String>, no_history: bool) -> Result<()> {
        tracing::info!("Starting interactive chat mode");

        let session = build_session(&config, no_history, resume.as_deref())?;
        let mut settings = config.chat.turn.clone();

        let mut rl = DefaultEditor::new()?;

        print_welcome_banner(&settings, &session).await;

        loop {
            let prompt = format!("{} ", "beechat>".green().bold());
            match rl.readline(&prompt) {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }

                    rl.add_history_entry(trimmed)?;

                    let command = match parse_special_command(trimmed) {
                        Ok(command) => command,
                        Err(e) => {
                            println!("{}", e.to_string().red());
                            continue;
                        }
                    };

                    match command {
                        SpecialCommand::Clear => {
                            session.clear_history().await;
                            println!("{}\n", "Conversation cleared.".green());
                        }
                        SpecialCommand::SwitchModel(name) => match name.parse::<ModelId>() {
                            Ok(model) => {
                                settings.model = model;
                                println!("Switched to model: {}\n", model.to_string().cyan());
                            }
                            Err(e) => println!("{}\n", e.to_string().red()),
                        },
                        SpecialCommand::SwitchPersona(name) => {
                            match resolve_persona(session.personas(), &name) {
                                Some(key) => {
                                    settings.persona = key.to_string();
                                    println!("Switched to persona: {}\n", key.cyan());
                                }
                                None => println!(
                                    "{}\n",
                                    format!(
                                        "Unknown persona: {}. Available: {}",
                                        name,
                                        session.personas().keys().collect::<Vec<_>>().join(", ")
                                    )
                                    .red()
                                ),
                            }
                        }
                        SpecialCommand::SwitchTone(name) => match name.parse::<Tone>() {
                            Ok(tone) => {
                                settings.tone = tone;
                                println!("Switched to tone: {}\n", tone.to_string().cyan());
                            }
                            Err(e) => println!("{}\n", e.to_string().red()),
                        },
                        SpecialCommand::ShowSettings => print_settings(&settings, &session),
                        SpecialCommand::ListPersonas => {
                            super::personas::print_personas(session.personas())
                        }
                        SpecialCommand::ShowHistory => print_conversation(&session.history().await),
                        SpecialCommand::Help => print_help(),
                        SpecialCommand::Exit => break,
                        SpecialCommand::None => submit_and_print(&session, trimmed, &settings).await?,
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("{}", "Interrupted. Type /exit to leave.".yellow());
                }
                Err(ReadlineError::Eof) => break,
                Err(e) => return Err(e.into()),
            }
        }

        println!("Goodbye!");
        Ok(())
    }

    async fn submit_and_print(session: &ChatSession, text: &str, settings: &TurnConfig) -> Result<()> {
        match session.submit(text, settings).await {
            Ok(report) => {
                match report.reply.error() {
                    None => println!("\n{}\n", report.reply.display_text()),
                    Some(error) => {
                        println!("\n{}", report.reply.display_text().yellow());
                        let hint = if error.is_retryable() {
                            " (try again)"
                        } else {
                            ""
                        };
                        println!("{}\n", format!("{}{}", error, hint).red());
                    }
                }
                if let Some(usage) = report.usage {
                    tracing::debug!(
                        prompt_tokens = usage.prompt_tokens,
                        completion_tokens = usage.completion_tokens,
                        total_tokens = usage.total_tokens,
                        "Token usage"
                    );
                }
                Ok(())
            }
            Err(e) => match BeeChatError::classify(&e) {
                ErrorKind::InvalidInput | ErrorKind::Busy => {
                    println!("{}\n", e.to_string().red());
                    Ok(())
                }
                _ => Err(e),
            },
        }
    }

    /// Case-insensitive persona lookup returning the canonical key
    pub(crate) fn resolve_persona<'a>(personas: &'a PersonaTable, name: &str) -> Option<&'a str> {
        personas.keys().find(|key| key.eq_ignore_ascii_case(name.trim()))
    }

    fn print_conversation(messages: &[Message]) {
        if messages.is_empty() {
            println!("{}\n", "The conversation is empty.".yellow());
            return;
        }
        println!();
        for message in messages {
            let label = match message.role {
                Role::User => "You:".green().bold(),
                Role::Assistant => "Assistant:".cyan().bold(),
                Role::System => "System:".yellow().bold(),
            };
            println!("{} {}\n", label, message.content);
        }
    }

    async fn print_welcome_banner(settings: &TurnConfig, session: &ChatSession) {
        println!("\n{}", "BeeChat".bold().yellow());
        println!(
            "Model {} | Persona {} | Tone {}",
            settings.model.to_string().cyan(),
            settings.persona.cyan(),
            settings.tone.to_string().cyan()
        );
        let resumed = session.history().await.len();
        if resumed > 0 {
            println!("Resumed {} message(s) from session {}", resumed, session.session_id());
        }
        println!("Type {} for commands, {} to leave.\n", "/help".cyan(), "/exit".cyan());
    }

}

// One-shot prompt handler
pub mod ask {
    //! Sends one prompt and prints the reply.

    use super::*;

    /// Send a single prompt
    ///
    /// # Errors
    ///
    /// Returns the service failure if the completion call fails, so the
    /// process exits non-zero
    pub async fn run_ask(config: Config, prompt: String, no_history: bool) -> Result<()> {
        let session = build_session(&config, no_history, None)?;
        let report = session.submit(&prompt, &config.chat.turn).await?;

        match report.reply {
            crate::chat::TurnReply::Assistant(text) => {
                println!("{}", text);
                Ok(())
            }
            crate::chat::TurnReply::Failed(error) => Err(error.into()),
        }
    }
}

// Persona listing
pub mod personas {
    //! Lists personas with their instructions, plus tones and models.

    use super::*;
    use crate::chat::{ModelId, Tone, DEFAULT_PERSONA};
    use prettytable::{format, Table};

    /// Table of persona keys and instruction text
    pub fn personas_table(personas: &PersonaTable) -> Table {
        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
        table.add_row(prettytable::row!["Persona".bold(), "Instruction".bold()]);
        for (key, instruction) in personas.iter() {
            let name = if key == DEFAULT_PERSONA {
                format!("{} (default)", key).cyan()
            } else {
                key.cyan()
            };
            table.add_row(prettytable::row![name, instruction]);
        }
        table
    }

    /// Print personas
    pub fn print_personas(personas: &PersonaTable) {
        println!("\nPersonas:");
        personas_table(personas).printstd();
        println!();
    }

    /// Print personas, tones and models
    pub fn run_personas(config: &Config) -> Result<()> {
        let personas = config.persona_table()?;
        print_personas(&personas);

        println!(
            "Tones:  {}",
            Tone::ALL.map(|t| t.label()).join(", ")
        );
        println!(
            "Models: {}\n",
            ModelId::ALL.map(|m| m.as_str()).join(", ")
        );
        Ok(())
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_personas_table_lists_every_persona() {
            let personas = PersonaTable::builtin();
            let table = personas_table(&personas);
            assert_eq!(table.len(), personas.len() + 1);
        }
    }
}

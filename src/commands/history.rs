use crate::chat::Role;
use crate::cli::HistoryCommand;
use crate::error::Result;
use crate::storage::{SessionSummary, SqliteStorage, StoredMessage};
use colored::Colorize;
use prettytable::{format, Table};

const PREVIEW_CHARS: usize = 40;

fn preview(text: &str) -> String {
    let single_line = text.replace('\n', " ");
    if single_line.chars().count() > PREVIEW_CHARS {
        let cut: String = single_line.chars().take(PREVIEW_CHARS - 3).collect();
        format!("{}...", cut)
    } else {
        single_line
    }
}

fn short_id(session_id: &str) -> &str {
    session_id.get(..8).unwrap_or(session_id)
}

/// Table of stored sessions
pub fn sessions_table(sessions: &[SessionSummary]) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);

    table.add_row(prettytable::row![
        "ID".bold(),
        "First Prompt".bold(),
        "Messages".bold(),
        "Started".bold(),
        "Last Updated".bold()
    ]);

    for session in sessions {
        let prompt = session
            .first_prompt
            .as_deref()
            .map(preview)
            .unwrap_or_else(|| "-".to_string());

        table.add_row(prettytable::row![
            short_id(&session.session_id).cyan(),
            prompt,
            session.message_count,
            session.started_at.format("%Y-%m-%d %H:%M").to_string(),
            session.updated_at.format("%Y-%m-%d %H:%M").to_string()
        ]);
    }

    table
}

/// Prints stored messages with role labels
pub fn print_messages(messages: &[StoredMessage]) {
    for message in messages {
        let label = match message.role {
            Role::User => "You".green().bold(),
            Role::Assistant => "Assistant".cyan().bold(),
            Role::System => "System".yellow().bold(),
        };
        println!(
            "{} {}",
            label,
            message
                .timestamp
                .format("(%Y-%m-%d %H:%M:%S)")
                .to_string()
                .dimmed()
        );
        println!("{}\n", message.content);
    }
}

/// Handle history commands
pub fn handle_history(storage: &SqliteStorage, command: HistoryCommand) -> Result<()> {
    match command {
        HistoryCommand::List => {
            let sessions = storage.list_sessions()?;

            if sessions.is_empty() {
                println!("{}", "No conversation history found.".yellow());
                return Ok(());
            }

            println!("\nConversation History:");
            sessions_table(&sessions).printstd();
            println!();
            println!(
                "Use {} to continue a session.",
                "beechat chat --resume <ID>".cyan()
            );
            println!();
        }
        HistoryCommand::Show { session } => {
            let messages = storage.load_session(&session)?;
            if messages.is_empty() {
                println!("{}", format!("No messages found for session {}", session).yellow());
                return Ok(());
            }
            print_messages(&messages);
        }
        HistoryCommand::Clear { session } => {
            let removed = match &session {
                Some(id) => storage.delete_session(id)?,
                None => storage.clear()?,
            };
            let scope = session
                .map(|id| format!("session {}", id))
                .unwrap_or_else(|| "all sessions".to_string());
            println!(
                "{}",
                format!("Deleted {} message(s) from {}", removed, scope).green()
            );
        }
    }

    Ok(())
}

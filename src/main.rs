//! BeeChat - terminal chat client
//!
//! Main entry point for the BeeChat application.

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use beechat::cli::{Cli, Commands};
use beechat::commands;
use beechat::config::{Config, TurnOverrides};
use beechat::storage::SqliteStorage;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    init_tracing(cli.verbose);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let mut config = Config::load(config_path)?;

    // Execute command
    match cli.command {
        Commands::Chat {
            turn,
            resume,
            no_history,
        } => {
            config.apply_overrides(&TurnOverrides::from(turn))?;
            config.validate()?;
            // Missing credentials abort before any turn
            config.api_key()?;

            if let Some(r) = &resume {
                tracing::debug!("Resuming conversation: {}", r);
            }
            commands::chat::run_chat(config, resume, no_history).await?;
            Ok(())
        }
        Commands::Ask {
            prompt,
            turn,
            no_history,
        } => {
            config.apply_overrides(&TurnOverrides::from(turn))?;
            config.validate()?;
            config.api_key()?;

            tracing::info!("Sending one-shot prompt");
            commands::ask::run_ask(config, prompt, no_history).await?;
            Ok(())
        }
        Commands::Personas => {
            config.validate()?;
            commands::personas::run_personas(&config)?;
            Ok(())
        }
        Commands::History { command } => {
            tracing::info!("Starting history command");
            let storage = SqliteStorage::from_config(&config.storage)?;
            commands::history::handle_history(&storage, command)?;
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
///
/// Logs go to stderr so they do not interleave with chat output.
fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "beechat=debug" } else { "beechat=info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

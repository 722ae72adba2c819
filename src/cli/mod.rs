use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::core::AppConfig;

pub mod chat;
pub mod models;
pub mod sessions;
pub mod start;
pub mod ui;

#[derive(Subcommand)]
enum Command {
    /// Start Ollama if it isn't running and begin chatting
    Start {},
    /// Chat with an already running Ollama
    Chat {},
    /// List all chat sessions
    List {},
    /// Create a chat session and switch to it
    New { name: String },
    /// Switch to another chat session
    Switch { name: String },
    /// Delete a chat session
    Delete { name: String },
    /// Clear the current chat's history
    Reset {},
    /// List downloaded models
    Models {},
    /// Switch to a different model
    Model { name: String },
    /// Show the current configuration
    Config {},
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

fn init_tracing() {
    // Logs go to stderr so they never land in the middle of a
    // streamed reply
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=warn", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

pub async fn run() -> Result<()> {
    let args = Cli::parse();
    init_tracing();

    let config = AppConfig::default();

    // Handle each sub command
    match args.command {
        Some(Command::Start {}) | None => {
            start::run(&config).await?;
        }
        Some(Command::Chat {}) => {
            chat::run(&config).await?;
        }
        Some(Command::List {}) => {
            sessions::list(&config)?;
        }
        Some(Command::New { name }) => {
            sessions::create(&config, &name)?;
        }
        Some(Command::Switch { name }) => {
            sessions::switch(&config, &name)?;
        }
        Some(Command::Delete { name }) => {
            sessions::delete(&config, &name)?;
        }
        Some(Command::Reset {}) => {
            sessions::reset(&config)?;
        }
        Some(Command::Models {}) => {
            models::list(&config).await?;
        }
        Some(Command::Model { name }) => {
            models::switch(&config, &name).await?;
        }
        Some(Command::Config {}) => {
            sessions::show_config(&config)?;
        }
    }

    Ok(())
}

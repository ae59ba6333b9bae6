//! chatmem CLI — the main entry point.
//!
//! Commands:
//! - `chat`     — Interactive chat with session memory
//! - `ask`      — Send a single message
//! - `replay`   — Load a long conversation fixture and consolidate it
//! - `memory`   — Show or clear a session's stored memory
//! - `onboard`  — Write the default config file
//! - `doctor`   — Diagnose configuration and endpoint health

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "chatmem",
    about = "chatmem — chat assistant with session memory and query clarification",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat interactively
    Chat {
        /// Session id (a new one is generated when omitted)
        #[arg(short, long)]
        session: Option<String>,

        /// Override the consolidation threshold in tokens
        #[arg(short, long)]
        threshold: Option<usize>,
    },

    /// Send a single message and print the reply
    Ask {
        #[arg(short, long)]
        message: String,

        #[arg(short, long)]
        session: Option<String>,
    },

    /// Load a conversation fixture and run consolidation on it
    Replay {
        /// JSON-lines fixture (defaults to long_conversation.jsonl in the fixtures dir)
        #[arg(short, long)]
        fixture: Option<PathBuf>,

        #[arg(short, long)]
        session: Option<String>,

        #[arg(short, long)]
        threshold: Option<usize>,
    },

    /// Inspect stored session memory
    Memory {
        #[command(subcommand)]
        action: MemoryAction,
    },

    /// Initialize configuration
    Onboard,

    /// Diagnose configuration and endpoint health
    Doctor,
}

#[derive(Subcommand)]
enum MemoryAction {
    /// Print the stored memory of a session
    Show {
        #[arg(short, long)]
        session: String,
    },

    /// Delete the stored memory of a session
    Clear {
        #[arg(short, long)]
        session: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so replies on stdout stay clean
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Chat { session, threshold } => commands::chat::run(session, threshold).await?,
        Commands::Ask { message, session } => commands::ask::run(&message, session).await?,
        Commands::Replay { fixture, session, threshold } => {
            commands::replay::run(fixture, session, threshold).await?
        }
        Commands::Memory { action } => match action {
            MemoryAction::Show { session } => commands::memory::show(&session).await?,
            MemoryAction::Clear { session } => commands::memory::clear(&session).await?,
        },
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Doctor => commands::doctor::run().await?,
    }

    Ok(())
}

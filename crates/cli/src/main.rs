//! Inkflow CLI — the main entry point.
//!
//! Commands:
//! - `run`    — Run a single content agent for one instruction
//! - `chat`   — Interactive concierge session
//! - `config` — Print the default configuration TOML

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "inkflow",
    about = "Inkflow — content-agent orchestration runtime",
    version,
    author
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
    /// Run one content agent for a single instruction
    Run {
        /// Agent kind (e.g. hitpoint, xhs_post, orchestrator)
        #[arg(short, long)]
        kind: String,

        /// The instruction to run
        instruction: String,

        /// Session ID (counters and notes are scoped to it)
        #[arg(short, long, default_value = "local")]
        session: String,
    },

    /// Chat with the concierge interactively
    Chat {
        /// Session ID
        #[arg(short, long, default_value = "local")]
        session: String,
    },

    /// Print the default configuration TOML
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Run {
            kind,
            instruction,
            session,
        } => commands::run::run(&kind, &instruction, &session).await?,
        Commands::Chat { session } => commands::chat::run(&session).await?,
        Commands::Config => {
            println!("{}", inkflow_config::AppConfig::default_toml());
        }
    }

    Ok(())
}

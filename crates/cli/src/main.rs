//! relaybot CLI — the main entry point.
//!
//! Commands:
//! - `run`         — Serve the assistant on Telegram
//! - `chat`        — Interactive or single-message terminal chat
//! - `history`     — Print a user's logged turns
//! - `doctor`      — Diagnose configuration and connectivity
//! - `onboard`     — Write a starter config file
//! - `completions` — Print shell completions

use clap::{CommandFactory, Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "relaybot",
    about = "relaybot — a Telegram and terminal assistant backed by hosted LLMs",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "RELAYBOT_LOG_JSON")]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the assistant on Telegram until Ctrl+C
    Run,

    /// Chat from the terminal
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Conversation owner; history is kept per user
        #[arg(short, long, default_value = "local_user")]
        user: String,
    },

    /// Print the most recent logged turns for a user
    History {
        #[arg(short, long, default_value = "local_user")]
        user: String,

        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },

    /// Diagnose configuration and connectivity
    Doctor,

    /// Initialize configuration
    Onboard,

    /// Print shell completions
    Completions {
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    match cli.command {
        Commands::Run => commands::run::run().await?,
        Commands::Chat { message, user } => commands::chat::run(message, user).await?,
        Commands::History { user, limit } => commands::history::run(&user, limit).await?,
        Commands::Doctor => commands::doctor::run().await?,
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "relaybot", &mut std::io::stdout());
        }
    }

    Ok(())
}

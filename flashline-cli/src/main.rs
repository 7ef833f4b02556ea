//! Flashline CLI - study flashcards written in Notion from your terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{demo, login, logs, pages, refresh, status, study, Identity};

/// Flashline - active-recall flashcards from your Notion pages
#[derive(Parser)]
#[command(name = "fl", version, about, long_about = None)]
struct Cli {
    /// Chat identity to act as
    #[arg(long, global = true, env = "FLASHLINE_CHAT_ID", default_value_t = 1)]
    chat_id: i64,

    /// First name used when the identity is registered
    #[arg(long, global = true, env = "FLASHLINE_NAME", default_value = "Learner")]
    name: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect a Notion workspace
    Login {
        /// Internal integration token (skips the browser flow)
        #[arg(long)]
        token: Option<String>,
        /// Authorization code returned to the redirect URI
        #[arg(long, conflicts_with = "token")]
        code: Option<String>,
    },

    /// Forget the stored Notion credential
    Logout,

    /// Show pages, cards and study progress
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage subscribed Notion pages
    Pages {
        #[command(subcommand)]
        command: pages::PagesCommands,
    },

    /// Study the active set
    Study {
        #[command(subcommand)]
        command: study::StudyCommands,
    },

    /// Reload every page that is due for a refresh
    Refresh {
        /// Keep running and refresh on an interval
        #[arg(long)]
        watch: bool,
        /// Minutes between refresh cycles in watch mode
        #[arg(long, default_value = "15")]
        every_minutes: u64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage demo mode
    Demo {
        #[command(subcommand)]
        command: Option<demo::DemoCommands>,
    },

    /// View and manage the event log
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("FLASHLINE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let identity = Identity {
        chat_id: cli.chat_id,
        first_name: cli.name,
    };

    match cli.command {
        Commands::Login { token, code } => login::run(&identity, token, code),
        Commands::Logout => login::run_logout(&identity),
        Commands::Status { json } => status::run(&identity, json),
        Commands::Pages { command } => pages::run(&identity, command),
        Commands::Study { command } => study::run(&identity, command),
        Commands::Refresh {
            watch,
            every_minutes,
            json,
        } => refresh::run(watch, every_minutes, json),
        Commands::Demo { command } => demo::run(&identity, command),
        Commands::Logs { command } => logs::run(command),
    }
}

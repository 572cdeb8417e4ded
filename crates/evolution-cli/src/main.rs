//! Evolution Engine CLI - a thin binary wrapping the engine's §6 verbs.
//!
//! This is a single-binary control loop, not a client talking to a
//! separate daemon over a network: every subcommand builds its own
//! in-process `EvolutionEngine` rooted at a workspace directory.

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod error;
mod output;

use error::CliResult;
use output::OutputFormat;
use std::path::PathBuf;

/// Evolution Engine CLI.
#[derive(Parser)]
#[command(name = "evolution")]
#[command(about = "Control loop for the self-improvement Evolution Engine", long_about = None)]
#[command(version)]
struct Cli {
    /// Workspace directory containing (or about to contain) `.evolution/`.
    #[arg(short, long, env = "EVOLUTION_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Output format.
    #[arg(short, long, default_value = "table")]
    output: OutputFormat,

    /// Enable verbose (debug) logging.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the Scheduler and block until stopped.
    Start,

    /// Stop a Scheduler started by a sibling `evolution start`.
    Stop,

    /// Show scheduler state, counters, and next-run time.
    Status,

    /// Force a single-proposal run, equivalent to one Executor entry.
    Apply {
        /// Proposal id, e.g. `proposal-<uuid>`.
        proposal_id: String,
    },

    /// Request a rollback through the Self-Healing Monitor.
    Rollback {
        /// Application id, e.g. `application-<uuid>`.
        application_id: String,

        /// Bypass the daily automatic-rollback cap and the degradation
        /// check; requires operator confirmation unless `--yes` is given.
        #[arg(long, conflicts_with = "auto")]
        manual: bool,

        /// Evaluate through the detector and honor the daily cap (default).
        #[arg(long)]
        auto: bool,

        /// Free-text reason, written to the rollback audit log.
        #[arg(long)]
        reason: Option<String>,

        /// Skip the confirmation prompt for `--manual`.
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Report paths to the latest application-event record, rollback-log
    /// entry, and backup directory.
    Open,
}

fn resolve_workspace(explicit: Option<PathBuf>) -> PathBuf {
    if let Some(w) = explicit {
        return w;
    }
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    if cwd.join(".evolution").exists() {
        return cwd;
    }
    dirs::home_dir().map(|home| home.join(".evolution-engine")).unwrap_or(cwd)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();

    let workspace = resolve_workspace(cli.workspace);

    let result = run(workspace, cli.output, cli.command).await;
    if let Err(e) = result {
        output::print_error(&e.to_string());
        std::process::exit(e.exit_code());
    }
}

async fn run(workspace: PathBuf, output: OutputFormat, command: Commands) -> CliResult<()> {
    match command {
        Commands::Start => commands::start::execute(&workspace).await,
        Commands::Stop => commands::stop::execute(&workspace),
        Commands::Status => commands::status::execute(&workspace, output).await,
        Commands::Apply { proposal_id } => commands::apply::execute(&workspace, &proposal_id).await,
        Commands::Rollback { application_id, manual, auto: _, reason, yes } => {
            commands::rollback::execute(&workspace, &application_id, manual, reason.as_deref(), yes).await
        }
        Commands::Open => commands::open::execute(&workspace, output).await,
    }
}

//! Inkcast CLI: create, inspect, edit and replay recorded sessions.
//!
//! Usage:
//!   inkcast init <NAME>                 Create an empty session
//!   inkcast info <PATH>                 Show session information
//!   inkcast validate <PATH>             Check a session against the log invariants
//!   inkcast ingest <PATH> <JOURNAL>     Record a journal of input into a session
//!   inkcast replay <PATH> --at <MS>     Print what is visible at a time
//!   inkcast edit <PATH> <OPERATION>     Delete, move, scale or duplicate a time window
//!   inkcast play <PATH>                 Play a session back in real time

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use inkcast_common::clock::TimeMs;
use inkcast_common::config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "inkcast",
    about = "Record, replay and edit timestamped annotation sessions",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new empty session
    Init {
        /// Session name
        name: String,

        /// Output directory (defaults to the configured sessions directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show session information
    Info {
        /// Path to the session directory
        path: PathBuf,
    },

    /// Validate a session directory
    Validate {
        /// Path to the session directory
        path: PathBuf,
    },

    /// Record an input journal into a session, after its recorded time
    Ingest {
        /// Path to the session directory
        path: PathBuf,

        /// JSONL input journal
        journal: PathBuf,
    },

    /// Replay a session up to a time and print the draw requests
    Replay {
        /// Path to the session directory
        path: PathBuf,

        /// Cursor time in milliseconds
        #[arg(long)]
        at: TimeMs,

        /// Print draw requests as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Edit a time window of a session
    Edit {
        /// Path to the session directory
        path: PathBuf,

        /// Window start (ms)
        #[arg(long)]
        from: TimeMs,

        /// Window end (ms, exclusive)
        #[arg(long)]
        to: TimeMs,

        /// Use the window as given instead of snapping it to the events
        #[arg(long)]
        exact: bool,

        #[command(subcommand)]
        operation: EditOperation,
    },

    /// Play a session back in real time
    Play {
        /// Path to the session directory
        path: PathBuf,

        /// Start position (ms)
        #[arg(long, default_value = "0")]
        from: TimeMs,
    },
}

#[derive(Subcommand, Clone, Copy, Debug)]
pub enum EditOperation {
    /// Delete the window
    Delete,

    /// Move the window by an offset, optionally stretching it
    Move {
        /// Offset in milliseconds
        #[arg(long, allow_hyphen_values = true)]
        by: TimeMs,

        /// Stretch factor
        #[arg(long, default_value = "1.0")]
        scale: f64,
    },

    /// Copy the window, stretch it and paste it at a time
    Scale {
        /// Stretch factor
        #[arg(long)]
        scale: f64,

        /// Paste position (ms)
        #[arg(long)]
        at: TimeMs,
    },

    /// Copy the window and paste it at a time
    Duplicate {
        /// Paste position (ms)
        #[arg(long)]
        at: TimeMs,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::load();

    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    if cli.json_logs {
        config.logging.json = true;
    }
    inkcast_common::logging::init_logging(&config.logging);

    match cli.command {
        Commands::Init { name, output } => commands::init::run(&config, name, output),
        Commands::Info { path } => commands::info::run(path),
        Commands::Validate { path } => commands::validate::run(path),
        Commands::Ingest { path, journal } => commands::ingest::run(&config, path, journal).await,
        Commands::Replay { path, at, json } => commands::replay::run(&config, path, at, json),
        Commands::Edit {
            path,
            from,
            to,
            exact,
            operation,
        } => commands::edit::run(&config, path, from, to, exact, operation),
        Commands::Play { path, from } => commands::play::run(&config, path, from).await,
    }
}

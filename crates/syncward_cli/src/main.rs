//! Syncward CLI
//!
//! Command-line tools for exploring how the sync engine reacts to server
//! protocol errors.
//!
//! # Commands
//!
//! - `simulate` - Replay a script of server responses through an engine
//! - `classify` - Show how a single protocol error is classified

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Syncward command-line tools.
#[derive(Parser)]
#[command(name = "syncward")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a script of server responses through a fresh engine
    Simulate {
        /// Script file, one response per line (`ok`, `reenable`, `TYPE[:ACTION[:DESCRIPTION]]`)
        #[arg(short, long, conflicts_with = "responses")]
        script: Option<PathBuf>,

        /// Comma-separated responses, as an alternative to --script
        #[arg(short, long)]
        responses: Option<String>,

        /// Consecutive transient errors before sync is disabled
        #[arg(short, long, default_value = "5")]
        threshold: u32,

        /// Window for the transient streak, in seconds
        #[arg(short, long, default_value = "600")]
        window: u64,

        /// Number of protocol events to show
        #[arg(short, long, default_value = "20")]
        events: usize,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Classify a single protocol error
    Classify {
        /// Error type (e.g. TRANSIENT_ERROR)
        #[arg(short = 't', long = "type")]
        error_type: String,

        /// Client action (e.g. UPGRADE_CLIENT)
        #[arg(short, long, default_value = "UNKNOWN_ACTION")]
        action: String,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Simulate {
            script,
            responses,
            threshold,
            window,
            events,
            format,
        } => {
            commands::simulate::run(
                script.as_deref(),
                responses.as_deref(),
                threshold,
                window,
                events,
                &format,
            )?;
        }
        Commands::Classify {
            error_type,
            action,
            format,
        } => {
            commands::classify::run(&error_type, &action, &format)?;
        }
        Commands::Version => {
            println!("Syncward CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

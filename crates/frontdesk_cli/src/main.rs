//! Frontdesk CLI
//!
//! Command-line tools for the Frontdesk live update feed.
//!
//! # Commands
//!
//! - `watch` - Connect to the live feed and print updates as they arrive
//! - `decode` - Decode captured frames and report what each would do

mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Frontdesk live feed tools.
#[derive(Parser)]
#[command(name = "frontdesk")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Delay growth between attempts.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum BackoffKind {
    /// Same delay before every retry
    Fixed,
    /// Doubling delay, capped at ten times the base delay
    Exponential,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to the live feed and print updates
    Watch {
        /// Backend base address
        #[arg(short, long, env = "FRONTDESK_URL", default_value = "http://localhost:8000")]
        url: String,

        /// Bearer token for the live socket
        #[arg(short, long, env = "FRONTDESK_TOKEN", hide_env_values = true)]
        token: String,

        /// Total connection attempts per failure episode
        #[arg(long, default_value = "3")]
        max_attempts: u32,

        /// Base delay between attempts in milliseconds
        #[arg(long, default_value = "3000")]
        retry_delay_ms: u64,

        /// Delay growth between attempts
        #[arg(long, value_enum, default_value = "fixed")]
        backoff: BackoffKind,

        /// Replace records on repeated "new" events instead of inserting twice
        #[arg(long)]
        upsert_new: bool,
    },

    /// Decode frames (one JSON object per line)
    Decode {
        /// File to read; standard input if omitted
        file: Option<PathBuf>,

        /// Apply decoded frames to an empty store and print its counts
        #[arg(short, long)]
        apply: bool,

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
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Watch {
            url,
            token,
            max_attempts,
            retry_delay_ms,
            backoff,
            upsert_new,
        } => {
            let options = commands::watch::WatchOptions {
                url,
                token,
                max_attempts,
                retry_delay_ms,
                backoff,
                upsert_new,
            };
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(commands::watch::run(options))?;
        }
        Commands::Decode {
            file,
            apply,
            format,
        } => {
            commands::decode::run(file.as_deref(), apply, &format)?;
        }
        Commands::Version => {
            println!("Frontdesk CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

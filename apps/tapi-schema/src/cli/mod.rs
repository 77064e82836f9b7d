//! # tapi-schema CLI Module
//!
//! ## Available Commands
//!
//! - `resolve` - Resolve a saved context snapshot into the schema
//! - `fetch` - Fetch a snapshot from a device and resolve it
//! - `check` - Summarize the diagnostics a snapshot produces
//! - `checksum` - Checksum the schema a snapshot resolves to

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tapi_schema::AppError;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// tapi-schema - TAPI connectivity schema resolution
///
/// Turns a flat TAPI context snapshot into the per-node service tree:
/// cards, endpoints and the flattened lower-connection realization.
#[derive(Parser, Debug)]
#[command(name = "tapi-schema")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output (logs every diagnostic)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Also write JSON logs to hourly rotated files in this directory
    #[arg(long, global = true, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve a saved TAPI context snapshot
    Resolve {
        /// Path to the snapshot (RESTCONF-wrapped or bare context)
        #[arg(short, long)]
        input: PathBuf,

        /// Write the schema here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Fetch a snapshot from a device and resolve it
    Fetch {
        /// Path to the TOML configuration
        #[arg(short, long, default_value = "tapi-schema.toml")]
        config: PathBuf,

        /// Write the schema here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also save the fetched snapshot
        #[arg(long)]
        save_context: Option<PathBuf>,

        /// Read the whole context in one request instead of per node
        #[arg(long)]
        single_request: bool,
    },

    /// Summarize the diagnostics of a snapshot
    Check {
        /// Path to the snapshot
        #[arg(short, long)]
        input: PathBuf,

        /// Fail when any diagnostic is reported
        #[arg(long)]
        strict: bool,
    },

    /// Compute the checksum and BLAKE3 hash of the resolved schema
    Checksum {
        /// Path to the snapshot
        #[arg(short, long)]
        input: PathBuf,

        /// Fail unless the BLAKE3 hash matches
        #[arg(long)]
        verify: Option<String>,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), AppError> {
    let json_mode = cli.json_mode;

    match cli.command {
        Commands::Resolve { input, output } => cmd_resolve(&input, output.as_deref()),
        Commands::Fetch {
            config,
            output,
            save_context,
            single_request,
        } => {
            cmd_fetch(
                &config,
                output.as_deref(),
                save_context.as_deref(),
                single_request,
            )
            .await
        }
        Commands::Check { input, strict } => cmd_check(&input, json_mode, strict),
        Commands::Checksum { input, verify } => {
            cmd_checksum(&input, json_mode, verify.as_deref())
        }
    }
}

//! # tapi-schema
//!
//! Resolves a TAPI context snapshot into the per-node service schema.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                apps/tapi-schema (THE BINARY)                │
//! │                                                             │
//! │  ┌─────────────┐    ┌──────────────┐    ┌───────────────┐   │
//! │  │    CLI      │    │   Config     │    │ Snapshot Fetch│   │
//! │  │   (clap)    │    │   (toml)     │    │ (reqwest)     │   │
//! │  └──────┬──────┘    └──────┬───────┘    └───────┬───────┘   │
//! │         └──────────────────┼────────────────────┘           │
//! │                            ▼                                │
//! │                  ┌──────────────────┐                       │
//! │                  │ tapi-schema-core │                       │
//! │                  │   (THE ENGINE)   │                       │
//! │                  └──────────────────┘                       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Resolve a saved snapshot
//! tapi-schema resolve -i context.json -o schema.json
//!
//! # Fetch from a device and resolve
//! tapi-schema fetch -c tapi-schema.toml -o schema.json
//!
//! # Summarize diagnostics
//! tapi-schema check -i context.json
//!
//! # Keep hourly rotated JSON logs under ./logs
//! tapi-schema --log-dir logs fetch -c tapi-schema.toml
//! ```

mod cli;

use clap::Parser;
use std::path::Path;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Prefix of the rotated log files, e.g. `tapi-schema.2026-01-01-09.log`.
const LOG_FILE_PREFIX: &str = "tapi-schema";

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();

    // TAPI_SCHEMA_LOG_FORMAT=json enables machine-parseable output.
    let log_format =
        std::env::var("TAPI_SCHEMA_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let default_filter = if cli.verbose {
        "tapi_schema=debug"
    } else if cli.quiet {
        "tapi_schema=warn"
    } else {
        "tapi_schema=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    // The guard flushes the file writer when dropped and must outlive every log call.
    let (file_writer, log_guard) = match cli.log_dir.as_deref().map(open_log_file) {
        Some(Ok((writer, guard))) => (Some(writer), Some(guard)),
        Some(Err(e)) => {
            eprintln!("Error: cannot open log directory: {}", e);
            std::process::exit(1);
        }
        None => (None, None),
    };
    let file_layer = file_writer.map(|writer| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_ansi(false)
            .with_writer(writer)
    });

    // Logs go to stderr; stdout carries the schema.
    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(file_layer)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(file_layer)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        drop(log_guard);
        std::process::exit(1);
    }
}

/// Open an hourly rotated log file under `dir`, creating the directory.
fn open_log_file(dir: &Path) -> Result<(NonBlocking, WorkerGuard), InitError> {
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::HOURLY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .build(dir)?;
    Ok(tracing_appender::non_blocking(appender))
}

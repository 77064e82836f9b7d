//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use std::io::Write;
use std::path::{Path, PathBuf};
use tapi_schema::{AppConfig, AppError, DeviceClient, FetchedSnapshot, SnapshotFetcher};
use tapi_schema_core::{
    SchemaError, ServiceSchema, Severity, build_schema_with_unavailable, canonical_checksum,
    canonical_crypto_hash, schema_to_json,
};
use tracing::{debug, info, warn};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum snapshot file size (256 MB).
///
/// Large production snapshots run to tens of megabytes.
const MAX_SNAPSHOT_FILE_SIZE: u64 = 256 * 1024 * 1024;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), AppError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| AppError::Io(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(AppError::Io(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Validate an input path.
///
/// Canonicalizes the path to resolve symlinks and "..", then ensures it
/// names an existing regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, AppError> {
    let canonical = path
        .canonicalize()
        .map_err(|e| AppError::Io(format!("Invalid file path '{}': {}", path.display(), e)))?;

    if !canonical.is_file() {
        return Err(AppError::Io(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Validate an output path: its parent directory must exist.
fn validate_output_path(path: &Path) -> Result<PathBuf, AppError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        AppError::Io(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(AppError::Io(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| AppError::Io("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

// =============================================================================
// SHARED HELPERS
// =============================================================================

/// Read and parse a snapshot file, including any unavailable nodes saved
/// by `fetch --save-context`.
fn load_snapshot(input: &Path) -> Result<FetchedSnapshot, AppError> {
    let validated = validate_file_path(input)?;
    validate_file_size(&validated, MAX_SNAPSHOT_FILE_SIZE)?;

    let bytes = std::fs::read(&validated)
        .map_err(|e| AppError::Io(format!("Read file: {}", e)))?;
    let document: serde_json::Value = serde_json::from_slice(&bytes)
        .map_err(|e| SchemaError::InvalidContext(e.to_string()))?;
    let snapshot = FetchedSnapshot::from_document(document)?;

    debug!(
        path = %validated.display(),
        bytes = bytes.len(),
        unavailable = snapshot.unavailable.len(),
        "snapshot loaded"
    );
    Ok(snapshot)
}

/// Resolve a loaded snapshot.
fn resolve_snapshot(snapshot: &FetchedSnapshot) -> Result<ServiceSchema, AppError> {
    Ok(build_schema_with_unavailable(
        &snapshot.context,
        &snapshot.unavailable,
    )?)
}

/// Write bytes to a file, or to stdout when no path is given.
fn write_output(data: &[u8], output: Option<&Path>) -> Result<(), AppError> {
    match output {
        Some(path) => {
            let validated = validate_output_path(path)?;
            std::fs::write(&validated, data)
                .map_err(|e| AppError::Io(format!("Write file: {}", e)))?;
            info!(path = %validated.display(), bytes = data.len(), "schema written");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(data)
                .and_then(|()| stdout.write_all(b"\n"))
                .map_err(|e| AppError::Io(format!("Write stdout: {}", e)))?;
        }
    }
    Ok(())
}

/// Log every diagnostic at debug level and a one-line summary.
fn log_diagnostics(schema: &ServiceSchema) {
    for (node, record) in schema.diagnostics() {
        let node = node.map(ToString::to_string).unwrap_or_default();
        debug!(
            node = %node,
            severity = ?record.severity,
            kind = record.diagnostic.kind(),
            "{}",
            record.diagnostic
        );
    }

    let summary = schema.summary();
    if summary.is_clean() {
        info!(
            services = summary.services,
            cards = summary.cards,
            "schema resolved cleanly"
        );
    } else {
        warn!(
            services = summary.services,
            cards = summary.cards,
            warnings = summary.warnings,
            errors = summary.errors,
            "schema resolved with diagnostics"
        );
    }
}

// =============================================================================
// RESOLVE COMMAND
// =============================================================================

/// Resolve a saved snapshot and emit the schema.
pub fn cmd_resolve(input: &Path, output: Option<&Path>) -> Result<(), AppError> {
    let schema = resolve_snapshot(&load_snapshot(input)?)?;
    log_diagnostics(&schema);

    write_output(&schema_to_json(&schema)?, output)
}

// =============================================================================
// FETCH COMMAND
// =============================================================================

/// Fetch a snapshot from the configured device, resolve and emit it.
///
/// Ctrl-C aborts every request in flight.
pub async fn cmd_fetch(
    config_path: &Path,
    output: Option<&Path>,
    save_context: Option<&Path>,
    single_request: bool,
) -> Result<(), AppError> {
    let config = AppConfig::load(config_path)?;
    info!(
        host = %config.device.host,
        auth = config.device.auth.method(),
        max_in_flight = config.fetch.max_in_flight,
        "configuration loaded"
    );

    let client = DeviceClient::new(&config.device, config.fetch.timeout())?;
    let fetcher = SnapshotFetcher::new(client, config.fetch);

    let fetched = tokio::select! {
        result = fetch_snapshot(&fetcher, single_request) => result?,
        _ = tokio::signal::ctrl_c() => {
            warn!("interrupted, aborting in-flight requests");
            return Err(AppError::Interrupted);
        }
    };

    if let Some(path) = save_context {
        let document = fetched.to_document()?;
        let bytes = serde_json::to_vec_pretty(&document)
            .map_err(|e| AppError::Io(format!("Encode snapshot: {}", e)))?;
        let validated = validate_output_path(path)?;
        std::fs::write(&validated, &bytes)
            .map_err(|e| AppError::Io(format!("Write file: {}", e)))?;
        info!(path = %validated.display(), "snapshot saved");
    }

    let schema = resolve_snapshot(&fetched)?;
    log_diagnostics(&schema);

    write_output(&schema_to_json(&schema)?, output)
}

async fn fetch_snapshot(
    fetcher: &SnapshotFetcher,
    single_request: bool,
) -> Result<FetchedSnapshot, AppError> {
    let fetched = if single_request {
        fetcher.fetch_whole().await?
    } else {
        fetcher.fetch().await?
    };
    Ok(fetched)
}

// =============================================================================
// CHECK COMMAND
// =============================================================================

/// Summarize the diagnostics a snapshot produces.
pub fn cmd_check(input: &Path, json_mode: bool, strict: bool) -> Result<(), AppError> {
    let schema = resolve_snapshot(&load_snapshot(input)?)?;
    log_diagnostics(&schema);
    let summary = schema.summary();

    if json_mode {
        let diagnostics: Vec<serde_json::Value> = schema
            .diagnostics()
            .map(|(node, record)| {
                serde_json::json!({
                    "node_id": node,
                    "record": record,
                    "message": record.diagnostic.to_string(),
                })
            })
            .collect();
        let output = serde_json::json!({
            "input": input.to_string_lossy(),
            "summary": summary,
            "diagnostics": diagnostics,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
    } else {
        println!("TAPI Schema Check");
        println!("=================");
        println!("Input: {:?}", input);
        println!();
        println!("Services:          {}", summary.services);
        println!("Cards:             {}", summary.cards);
        println!("End Points:        {}", summary.end_points);
        println!("Lower Connections: {}", summary.lower_connections);
        println!("Unavailable Nodes: {}", summary.unavailable_nodes);
        println!("Warnings:          {}", summary.warnings);
        println!("Errors:            {}", summary.errors);

        if !summary.by_kind.is_empty() {
            println!();
            println!("By kind:");
            for (kind, count) in &summary.by_kind {
                println!("  {:<28} {}", kind, count);
            }
        }

        if !summary.by_node.is_empty() {
            println!();
            println!("By node:");
            for (node, count) in &summary.by_node {
                println!("  {:<28} {}", node, count);
            }
        }

        if !summary.is_clean() {
            println!();
            println!("Diagnostics:");
            for (node, record) in schema.diagnostics() {
                let marker = match record.severity {
                    Severity::Warning => "warn ",
                    Severity::Error => "error",
                };
                match node {
                    Some(node) => println!("  [{}] {}: {}", marker, node, record.diagnostic),
                    None => println!("  [{}] {}", marker, record.diagnostic),
                }
            }
        }
    }

    if strict && !summary.is_clean() {
        return Err(AppError::Unclean(summary.warnings + summary.errors));
    }
    Ok(())
}

// =============================================================================
// CHECKSUM COMMAND
// =============================================================================

/// Print the FNV-1a checksum and BLAKE3 hash of the resolved schema.
pub fn cmd_checksum(input: &Path, json_mode: bool, verify: Option<&str>) -> Result<(), AppError> {
    let schema = resolve_snapshot(&load_snapshot(input)?)?;

    let checksum = canonical_checksum(&schema)?;
    let hash = canonical_crypto_hash(&schema)?;

    if json_mode {
        let output = serde_json::json!({
            "input": input.to_string_lossy(),
            "checksum": format!("{:016x}", checksum),
            "blake3": hash,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
    } else {
        println!("Checksum: {:016x}", checksum);
        println!("BLAKE3:   {}", hash);
    }

    if let Some(expected) = verify {
        if !tapi_schema_core::verify_crypto_hash(&schema, expected)? {
            return Err(AppError::HashMismatch {
                expected: expected.to_string(),
                actual: hash,
            });
        }
        info!("hash verified");
    }
    Ok(())
}

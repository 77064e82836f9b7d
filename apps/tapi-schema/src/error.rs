//! # Application Errors
//!
//! Everything that can stop a command. Contained engine diagnostics are not
//! errors; they travel inside the schema.

use crate::device::FetchError;
use tapi_schema_core::SchemaError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// The engine refused the snapshot.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// The configuration file is missing, malformed or inconsistent.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The device could not be queried.
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("I/O error: {0}")]
    Io(String),

    /// `check --strict` found diagnostics.
    #[error("{0} diagnostics reported")]
    Unclean(usize),

    /// `checksum --verify` did not match.
    #[error("Hash mismatch: expected {expected}, computed {actual}")]
    HashMismatch { expected: String, actual: String },

    /// Ctrl-C arrived before the fetch finished.
    #[error("Interrupted")]
    Interrupted,
}

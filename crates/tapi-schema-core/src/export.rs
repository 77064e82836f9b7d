//! # Schema Export
//!
//! Deterministic JSON emission of a [`ServiceSchema`] and checksums over it.
//!
//! Every collection in the schema is a `Vec` in input order and the JSON
//! object keys follow struct field order, so the same snapshot always emits
//! the same bytes.

use crate::SchemaError;
use crate::schema::ServiceSchema;

// =============================================================================
// EXPORT FUNCTIONS
// =============================================================================

/// Serialize a schema to pretty-printed JSON bytes.
pub fn schema_to_json(schema: &ServiceSchema) -> Result<Vec<u8>, SchemaError> {
    serde_json::to_vec_pretty(schema).map_err(|e| SchemaError::SerializationError(e.to_string()))
}

/// Serialize a schema to compact JSON bytes, the form checksums are taken
/// over.
pub fn schema_to_canonical_json(schema: &ServiceSchema) -> Result<Vec<u8>, SchemaError> {
    serde_json::to_vec(schema).map_err(|e| SchemaError::SerializationError(e.to_string()))
}

/// Parse a schema previously written by [`schema_to_json`].
pub fn schema_from_json(data: &[u8]) -> Result<ServiceSchema, SchemaError> {
    serde_json::from_slice(data).map_err(|e| SchemaError::SerializationError(e.to_string()))
}

// =============================================================================
// CHECKSUMS
// =============================================================================

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Compute a deterministic checksum of the canonical schema bytes.
///
/// FNV-1a over the compact JSON encoding. This is **NOT** a cryptographic
/// hash; it detects accidental change between two runs. Enable the
/// `crypto-hash` feature for [`canonical_crypto_hash`].
pub fn canonical_checksum(schema: &ServiceSchema) -> Result<u64, SchemaError> {
    let data = schema_to_canonical_json(schema)?;
    Ok(data.iter().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(FNV_PRIME)
    }))
}

/// Compute a BLAKE3 hash of the canonical schema bytes as 64 hex characters.
///
/// Only available with the `crypto-hash` feature.
#[cfg(feature = "crypto-hash")]
pub fn canonical_crypto_hash(schema: &ServiceSchema) -> Result<String, SchemaError> {
    let data = schema_to_canonical_json(schema)?;
    Ok(blake3::hash(&data).to_hex().to_string())
}

/// Verify a schema against a BLAKE3 hash.
#[cfg(feature = "crypto-hash")]
pub fn verify_crypto_hash(schema: &ServiceSchema, expected_hash: &str) -> Result<bool, SchemaError> {
    Ok(canonical_crypto_hash(schema)? == expected_hash)
}

// =============================================================================
// TESTS
// =============================================================================

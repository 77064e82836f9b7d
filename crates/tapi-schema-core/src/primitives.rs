//! # Engine Primitives
//!
//! Hardcoded limits and wire constants for the resolution engine.
//!
//! These are compiled into the binary and are immutable at runtime.

/// Maximum depth of a lower-connection realization tree.
///
/// Cycle detection is path based; this ceiling only bounds pathological but
/// acyclic chains so that resolution always terminates in bounded stack.
pub const MAX_LOWER_CONNECTION_DEPTH: usize = 64;

/// Maximum number of indexed objects (of all kinds) in one snapshot.
///
/// Snapshots larger than this are rejected before indexing.
pub const MAX_CONTEXT_OBJECTS: usize = 1_000_000;

/// Maximum number of entries in one resolved connection tree.
///
/// A connection reached a second time in the same tree is listed without
/// its lower connections, so a tree stays within the snapshot's edge count.
/// This ceiling caps it outright.
pub const MAX_TREE_ENTRIES: usize = MAX_CONTEXT_OBJECTS;

/// Maximum length for any UUID string.
///
/// Longer identifiers are rejected as malformed input.
pub const MAX_UUID_LENGTH: usize = 256;

/// Wrapper member used by RESTCONF when returning the whole context.
pub const TAPI_CONTEXT_KEY: &str = "tapi-common:context";

/// `value-name` of the NEP name entry carrying the legacy inventory path.
pub const INVENTORY_ID_NAME: &str = "INVENTORY_ID";

// =============================================================================
// INPUT VALIDATION
// =============================================================================

/// Check that a UUID string is usable as an index key.
#[must_use]
pub fn is_valid_uuid(uuid: &str) -> bool {
    !uuid.is_empty() && uuid.len() <= MAX_UUID_LENGTH
}

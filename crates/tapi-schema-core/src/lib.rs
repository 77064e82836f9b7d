//! # tapi-schema-core
//!
//! The deterministic Connectivity Schema Resolution Engine.
//!
//! This crate turns one flat, UUID cross-referenced TAPI context snapshot
//! into the nested per-node service tree: physical card, endpoints, and the
//! flattened lower-connection realization of every connection on the card.
//!
//! ## Pipeline
//!
//! ```text
//! TapiContext -> ReferenceIndex -> { EndpointMaterializer, ConnectionTreeResolver }
//!             -> NodeSchemaAssembler -> ServiceSchema
//! ```
//!
//! ## Architectural Constraints
//!
//! - Read-only: the snapshot is borrowed, never mutated
//! - Deterministic: output order is input order, never hash order
//! - Partial success: only snapshot-wide integrity problems abort a build;
//!   everything else becomes a [`Diagnostic`] next to the data it concerns
//! - No async, no network, no logging (pure Rust)

// =============================================================================
// MODULES
// =============================================================================

pub mod assembler;
pub mod context;
pub mod diagnostics;
pub mod export;
pub mod index;
pub mod materialize;
pub mod primitives;
pub mod resolver;
pub mod schema;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    CepUuid, ConnectionUuid, InventoryId, LinkUuid, NepUuid, NodeUuid, ObjectKind, SchemaError,
    ServiceUuid, SipUuid,
};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use assembler::{NodeSchemaAssembler, build_schema, build_schema_with_unavailable};
pub use context::{TapiContext, UnavailableNode};
pub use diagnostics::{Diagnostic, DiagnosticRecord, Severity};
pub use index::ReferenceIndex;
pub use materialize::{EndpointMaterializer, MaterializedNep};
pub use resolver::{ClientLink, ConnectionNode, ConnectionTreeResolver, NodeOutcome};
pub use schema::{
    ConnectivityServiceView, Endpoint, FlatConnection, LinkSummary, NodeView, SchemaSummary,
    ServiceSchema,
};

// =============================================================================
// RE-EXPORTS: Export
// =============================================================================

pub use export::{canonical_checksum, schema_from_json, schema_to_json};

#[cfg(feature = "crypto-hash")]
pub use export::{canonical_crypto_hash, verify_crypto_hash};

//! # Core Type Definitions
//!
//! This module contains the identifier and error types shared by every
//! stage of the engine:
//! - Typed UUID wrappers (`NodeUuid`, `NepUuid`, `CepUuid`, ...)
//! - The physical card identifier (`InventoryId`)
//! - Object kinds used in error reporting (`ObjectKind`)
//! - Build-level errors (`SchemaError`)
//!
//! ## Identity
//!
//! TAPI devices report UUIDs as strings, and not every device emits RFC 4122
//! values (test fixtures commonly use `node-1`, `endpoint-1-1`). Identifiers
//! are therefore kept as opaque strings, one wrapper type per object kind so
//! a CEP UUID can never be looked up in the NEP table.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// TYPED IDENTIFIERS
// =============================================================================

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Create a new identifier from a string.
            #[must_use]
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            /// Get the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

string_id!(
    /// UUID of a topology node.
    NodeUuid
);
string_id!(
    /// UUID of a node-edge-point (NEP).
    NepUuid
);
string_id!(
    /// UUID of a connection-end-point (CEP).
    CepUuid
);
string_id!(
    /// UUID of a service-interface-point (SIP).
    SipUuid
);
string_id!(
    /// UUID of a connection.
    ConnectionUuid
);
string_id!(
    /// UUID of a topology link.
    LinkUuid
);
string_id!(
    /// UUID of a connectivity service.
    ServiceUuid
);
string_id!(
    /// Legacy hierarchical hardware path of a physical card,
    /// e.g. `/ne=Barcelona/r=1/sh=3/sl=7/s_sl=2/p=2`.
    InventoryId
);

// =============================================================================
// OBJECT KINDS
// =============================================================================

/// The kinds of object held in the reference index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Node,
    NodeEdgePoint,
    ConnectionEndPoint,
    ServiceInterfacePoint,
    Connection,
    Link,
    ConnectivityService,
}

impl ObjectKind {
    /// TAPI name of the object kind.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::NodeEdgePoint => "node-edge-point",
            Self::ConnectionEndPoint => "connection-end-point",
            Self::ServiceInterfacePoint => "service-interface-point",
            Self::Connection => "connection",
            Self::Link => "link",
            Self::ConnectivityService => "connectivity-service",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Build-level errors that abort a whole schema build.
///
/// Anything local to one NEP, one connection subtree or one node is NOT a
/// `SchemaError`; it is reported as a [`crate::Diagnostic`] next to the data
/// that did resolve.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Two objects of the same kind share a UUID. Identity is ambiguous, so
    /// no partial output is produced.
    #[error("Duplicate {kind} uuid: {uuid}")]
    DuplicateUuid { kind: ObjectKind, uuid: String },

    /// The snapshot could not be parsed or carries an unusable identifier.
    #[error("Invalid context: {0}")]
    InvalidContext(String),

    /// The snapshot holds more objects than the engine accepts.
    #[error("Context too large: {count} objects exceeds maximum {max}")]
    ContextTooLarge { count: usize, max: usize },

    /// A serialization error occurred while emitting the schema.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

// =============================================================================
// TESTS
// =============================================================================

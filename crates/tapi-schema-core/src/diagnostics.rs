//! # Diagnostics
//!
//! Contained, per-entity findings raised while materializing endpoints and
//! resolving connection trees.
//!
//! A diagnostic never aborts a build. It is carried next to the node entry it
//! concerns so callers can tell a fully resolved tree from one with gaps
//! without losing the data that did resolve.

use crate::{CepUuid, ConnectionUuid, LinkUuid, NepUuid, NodeUuid, SipUuid};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Data is present but incomplete or ambiguous.
    Warning,
    /// A subtree or node could not be resolved at all.
    Error,
}

/// A contained finding about one NEP, connection subtree or node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A NEP maps a SIP that is absent from the snapshot.
    DanglingReference {
        node_edge_point_uuid: NepUuid,
        service_interface_point_uuid: SipUuid,
    },

    /// A NEP maps more than one SIP; the first one was used.
    AmbiguousSipMapping {
        node_edge_point_uuid: NepUuid,
        service_interface_point_uuids: Vec<SipUuid>,
    },

    /// Following `parent-node-edge-point` from a NEP revisits a NEP.
    ParentCycle {
        node_edge_point_uuid: NepUuid,
        path: Vec<NepUuid>,
    },

    /// A connection's `supported-client-link` names an unknown link.
    DanglingLink {
        connection_uuid: ConnectionUuid,
        link_uuid: LinkUuid,
    },

    /// A connection (root or lower) is absent from the snapshot.
    DanglingConnection {
        #[serde(skip_serializing_if = "Option::is_none", default)]
        parent_connection_uuid: Option<ConnectionUuid>,
        connection_uuid: ConnectionUuid,
    },

    /// A lower connection is already on the current resolution path.
    CycleDetected {
        connection_uuid: ConnectionUuid,
        path: Vec<ConnectionUuid>,
    },

    /// A lower-connection chain is deeper than the engine supports.
    DepthExceeded {
        connection_uuid: ConnectionUuid,
        depth: usize,
    },

    /// The tree grew past its entry budget; this connection was not expanded.
    ExpansionLimitExceeded {
        connection_uuid: ConnectionUuid,
        limit: usize,
    },

    /// A connection end-point reference cannot be placed on a known CEP.
    DanglingEndPoint {
        connection_uuid: ConnectionUuid,
        connection_end_point_uuid: CepUuid,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        node_edge_point_uuid: Option<NepUuid>,
    },

    /// The node could not be retrieved from the device.
    NodeUnavailable { node_uuid: NodeUuid, reason: String },
}

impl Diagnostic {
    /// Severity of this diagnostic.
    #[must_use]
    pub const fn severity(&self) -> Severity {
        match self {
            Self::DanglingReference { .. }
            | Self::AmbiguousSipMapping { .. }
            | Self::ParentCycle { .. }
            | Self::DanglingLink { .. } => Severity::Warning,
            Self::DanglingConnection { .. }
            | Self::CycleDetected { .. }
            | Self::DepthExceeded { .. }
            | Self::ExpansionLimitExceeded { .. }
            | Self::DanglingEndPoint { .. }
            | Self::NodeUnavailable { .. } => Severity::Error,
        }
    }

    /// Stable snake_case name of the diagnostic kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::DanglingReference { .. } => "dangling_reference",
            Self::AmbiguousSipMapping { .. } => "ambiguous_sip_mapping",
            Self::ParentCycle { .. } => "parent_cycle",
            Self::DanglingLink { .. } => "dangling_link",
            Self::DanglingConnection { .. } => "dangling_connection",
            Self::CycleDetected { .. } => "cycle_detected",
            Self::DepthExceeded { .. } => "depth_exceeded",
            Self::ExpansionLimitExceeded { .. } => "expansion_limit_exceeded",
            Self::DanglingEndPoint { .. } => "dangling_end_point",
            Self::NodeUnavailable { .. } => "node_unavailable",
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DanglingReference {
                node_edge_point_uuid,
                service_interface_point_uuid,
            } => write!(
                f,
                "NEP {} maps unknown SIP {}",
                node_edge_point_uuid, service_interface_point_uuid
            ),
            Self::AmbiguousSipMapping {
                node_edge_point_uuid,
                service_interface_point_uuids,
            } => write!(
                f,
                "NEP {} maps {} SIPs, using the first",
                node_edge_point_uuid,
                service_interface_point_uuids.len()
            ),
            Self::ParentCycle {
                node_edge_point_uuid,
                ..
            } => write!(f, "NEP {} is its own ancestor", node_edge_point_uuid),
            Self::DanglingLink {
                connection_uuid,
                link_uuid,
            } => write!(
                f,
                "connection {} supports unknown link {}",
                connection_uuid, link_uuid
            ),
            Self::DanglingConnection {
                parent_connection_uuid: Some(parent),
                connection_uuid,
            } => write!(
                f,
                "connection {} lists unknown lower connection {}",
                parent, connection_uuid
            ),
            Self::DanglingConnection {
                parent_connection_uuid: None,
                connection_uuid,
            } => write!(f, "unknown connection {}", connection_uuid),
            Self::CycleDetected {
                connection_uuid,
                path,
            } => {
                let path: Vec<&str> = path.iter().map(ConnectionUuid::as_str).collect();
                write!(
                    f,
                    "cycle through connection {} ({})",
                    connection_uuid,
                    path.join(" -> ")
                )
            }
            Self::DepthExceeded {
                connection_uuid,
                depth,
            } => write!(
                f,
                "connection {} nested deeper than {}",
                connection_uuid, depth
            ),
            Self::ExpansionLimitExceeded {
                connection_uuid,
                limit,
            } => write!(
                f,
                "connection {} not expanded, tree exceeds {} entries",
                connection_uuid, limit
            ),
            Self::DanglingEndPoint {
                connection_uuid,
                connection_end_point_uuid,
                ..
            } => write!(
                f,
                "connection {} terminates on unknown CEP {}",
                connection_uuid, connection_end_point_uuid
            ),
            Self::NodeUnavailable { node_uuid, reason } => {
                write!(f, "node {} unavailable: {}", node_uuid, reason)
            }
        }
    }
}

/// A diagnostic as it appears in the output schema, with its severity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticRecord {
    pub severity: Severity,
    #[serde(flatten)]
    pub diagnostic: Diagnostic,
}

impl From<Diagnostic> for DiagnosticRecord {
    fn from(diagnostic: Diagnostic) -> Self {
        Self {
            severity: diagnostic.severity(),
            diagnostic,
        }
    }
}

/// Append a diagnostic unless an equal one is already present.
///
/// Keeps first-appearance order.
pub fn push_unique(diagnostics: &mut Vec<Diagnostic>, diagnostic: Diagnostic) {
    if !diagnostics.contains(&diagnostic) {
        diagnostics.push(diagnostic);
    }
}

// =============================================================================
// TESTS
// =============================================================================

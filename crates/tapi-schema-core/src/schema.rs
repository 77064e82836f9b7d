//! # Output Schema
//!
//! The resolved, per-node service tree handed to consumers.
//!
//! Absent upstream values are omitted from the JSON, never emitted as empty
//! strings. `inventory_id` is the one exception: a card without an inventory
//! path is a real grouping and is emitted as `null`.

use crate::diagnostics::{DiagnosticRecord, Severity};
use crate::{CepUuid, ConnectionUuid, LinkUuid, NepUuid, NodeUuid, ServiceUuid, SipUuid};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// ENDPOINTS AND CONNECTIONS
// =============================================================================

/// One CEP joined with its owning NEP and that NEP's mapped SIP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub connection_end_point_uuid: CepUuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer_protocol_qualifier: Option<String>,
    pub node_edge_point_uuid: NepUuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_interface_point_uuid: Option<SipUuid>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub client_node_edge_point_uuid: Vec<NepUuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_node_edge_point: Option<NepUuid>,
}

/// A topology link carried by a connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkSummary {
    pub link_uuid: LinkUuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer_protocol_qualifier: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub node_edge_point_uuids: Vec<NepUuid>,
}

/// One entry of a flattened connection tree.
///
/// `depth` is 0 for the top connection. Entries appear in depth-first
/// pre-order, so hierarchy can be rebuilt from `depth` alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatConnection {
    pub connection_uuid: ConnectionUuid,
    pub depth: usize,
    pub top_connection_uuid: ConnectionUuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_connection_uuid: Option<ConnectionUuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer_protocol_qualifier: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub supported_client_links: Vec<LinkSummary>,
    /// Diagnostic kind when this connection could not be expanded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Already expanded earlier in the same tree. Its lower connections are
    /// listed under that first entry and are not repeated here.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub repeated: bool,
}

// =============================================================================
// NODES AND SERVICES
// =============================================================================

/// One physical card of a node, with everything the service puts on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeView {
    pub node_id: NodeUuid,
    pub inventory_id: Option<String>,
    pub end_points: Vec<Endpoint>,
    pub lower_connections: Vec<FlatConnection>,
    /// Always present, empty for a fully resolved card.
    pub diagnostics: Vec<DiagnosticRecord>,
}

/// One connectivity service and the cards it touches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectivityServiceView {
    /// `None` for the implicit service built when the snapshot lists none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<ServiceUuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub nodes: Vec<NodeView>,
    /// Findings that cannot be placed on any card.
    pub diagnostics: Vec<DiagnosticRecord>,
}

/// The complete resolved schema of one snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSchema {
    pub connectivity_services: Vec<ConnectivityServiceView>,
    /// Nodes the fetch layer could not retrieve.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unavailable_nodes: Vec<NodeView>,
    /// Endpoint findings on cards that no service shows.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<DiagnosticRecord>,
}

impl ServiceSchema {
    /// Every diagnostic record in output order, with the node it sits on.
    ///
    /// Service-level and snapshot-level records carry `None`.
    pub fn diagnostics(&self) -> impl Iterator<Item = (Option<&NodeUuid>, &DiagnosticRecord)> {
        let services = self.connectivity_services.iter().flat_map(|service| {
            let on_nodes = service
                .nodes
                .iter()
                .flat_map(|node| node.diagnostics.iter().map(move |d| (Some(&node.node_id), d)));
            on_nodes.chain(service.diagnostics.iter().map(|d| (None, d)))
        });
        let unavailable = self
            .unavailable_nodes
            .iter()
            .flat_map(|node| node.diagnostics.iter().map(move |d| (Some(&node.node_id), d)));
        services
            .chain(unavailable)
            .chain(self.diagnostics.iter().map(|d| (None, d)))
    }

    /// Count what the schema holds.
    #[must_use]
    pub fn summary(&self) -> SchemaSummary {
        let mut summary = SchemaSummary {
            services: self.connectivity_services.len(),
            unavailable_nodes: self.unavailable_nodes.len(),
            ..SchemaSummary::default()
        };

        for service in &self.connectivity_services {
            summary.cards += service.nodes.len();
            for node in &service.nodes {
                summary.end_points += node.end_points.len();
                summary.lower_connections += node.lower_connections.len();
            }
        }

        for (node, record) in self.diagnostics() {
            match record.severity {
                Severity::Warning => summary.warnings += 1,
                Severity::Error => summary.errors += 1,
            }
            *summary
                .by_kind
                .entry(record.diagnostic.kind().to_string())
                .or_insert(0) += 1;
            if let Some(node) = node {
                *summary.by_node.entry(node.to_string()).or_insert(0) += 1;
            }
        }

        summary
    }
}

/// Counts over a [`ServiceSchema`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaSummary {
    pub services: usize,
    /// Node/card entries across all services.
    pub cards: usize,
    pub end_points: usize,
    pub lower_connections: usize,
    pub unavailable_nodes: usize,
    pub warnings: usize,
    pub errors: usize,
    pub by_kind: BTreeMap<String, usize>,
    pub by_node: BTreeMap<String, usize>,
}

impl SchemaSummary {
    /// Whether the schema resolved without a single diagnostic.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.warnings == 0 && self.errors == 0
    }
}

// =============================================================================
// TESTS
// =============================================================================

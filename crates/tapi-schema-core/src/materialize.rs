//! # Endpoint Materializer
//!
//! Joins each CEP with its owning NEP and that NEP's mapped SIP into flat
//! [`Endpoint`] records.
//!
//! Gaps never abort materialization: a dangling SIP reference nulls the SIP
//! field and records a warning, because a partial endpoint is still useful
//! for display.

use crate::diagnostics::{Diagnostic, push_unique};
use crate::index::{NepEntry, ReferenceIndex};
use crate::schema::Endpoint;
use crate::NepUuid;
use std::collections::BTreeSet;

/// Endpoints of one NEP plus the diagnostics raised while building them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaterializedNep {
    /// One endpoint per CEP, in `cep-list` order.
    pub endpoints: Vec<Endpoint>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Builds endpoint records from the reference index.
pub struct EndpointMaterializer<'i, 'c> {
    index: &'i ReferenceIndex<'c>,
}

impl<'i, 'c> EndpointMaterializer<'i, 'c> {
    /// Create a materializer over an index.
    #[must_use]
    pub fn new(index: &'i ReferenceIndex<'c>) -> Self {
        Self { index }
    }

    /// Materialize every NEP in iteration order.
    ///
    /// Position `i` of the result belongs to NEP arena position `i`.
    pub fn materialize_all(&self) -> Vec<MaterializedNep> {
        self.index
            .neps()
            .iter()
            .map(|entry| self.materialize(entry))
            .collect()
    }

    /// Materialize the endpoints of one NEP.
    ///
    /// A NEP with an empty CEP list yields no endpoints and is not an error.
    pub fn materialize(&self, entry: &NepEntry<'c>) -> MaterializedNep {
        let nep = entry.nep;
        let mut diagnostics = Vec::new();

        let service_interface_point_uuid = match nep.mapped_service_interface_point.as_slice() {
            [] => None,
            [first, rest @ ..] => {
                if !rest.is_empty() {
                    push_unique(
                        &mut diagnostics,
                        Diagnostic::AmbiguousSipMapping {
                            node_edge_point_uuid: nep.uuid.clone(),
                            service_interface_point_uuids: nep
                                .mapped_service_interface_point
                                .iter()
                                .map(|s| s.service_interface_point_uuid.clone())
                                .collect(),
                        },
                    );
                }
                let uuid = &first.service_interface_point_uuid;
                if self.index.sip(uuid).is_some() {
                    Some(uuid.clone())
                } else {
                    push_unique(
                        &mut diagnostics,
                        Diagnostic::DanglingReference {
                            node_edge_point_uuid: nep.uuid.clone(),
                            service_interface_point_uuid: uuid.clone(),
                        },
                    );
                    None
                }
            }
        };

        if let Some(diagnostic) = self.parent_cycle(&nep.uuid) {
            push_unique(&mut diagnostics, diagnostic);
        }

        let nep_parent = nep
            .parent_node_edge_point
            .as_ref()
            .map(|p| p.node_edge_point_uuid.clone());
        let nep_clients: Vec<NepUuid> = nep
            .client_node_edge_point
            .iter()
            .map(|c| c.node_edge_point_uuid.clone())
            .collect();

        let endpoints = nep
            .connection_end_points()
            .iter()
            .map(|cep| {
                // NEP-level relations first, CEP-level ones when the device
                // reports them only on the CEP.
                let parent_node_edge_point = nep_parent.clone().or_else(|| {
                    cep.parent_node_edge_point
                        .as_ref()
                        .map(|p| p.node_edge_point_uuid.clone())
                });
                let client_node_edge_point_uuid = if nep_clients.is_empty() {
                    cep.client_node_edge_point
                        .iter()
                        .map(|c| c.node_edge_point_uuid.clone())
                        .collect()
                } else {
                    nep_clients.clone()
                };

                Endpoint {
                    connection_end_point_uuid: cep.uuid.clone(),
                    layer_protocol_qualifier: nep
                        .layer_protocol_qualifier
                        .clone()
                        .or_else(|| cep.layer_protocol_qualifier.clone()),
                    node_edge_point_uuid: nep.uuid.clone(),
                    service_interface_point_uuid: service_interface_point_uuid.clone(),
                    client_node_edge_point_uuid,
                    parent_node_edge_point,
                }
            })
            .collect();

        MaterializedNep {
            endpoints,
            diagnostics,
        }
    }

    /// Walk `parent-node-edge-point` upward from a NEP.
    ///
    /// Returns a `ParentCycle` diagnostic if the walk revisits a NEP.
    /// Parents outside the snapshot end the walk.
    fn parent_cycle(&self, start: &NepUuid) -> Option<Diagnostic> {
        let mut seen: BTreeSet<&NepUuid> = BTreeSet::new();
        let mut path: Vec<NepUuid> = Vec::new();
        let mut current = self.index.nep(start)?;
        seen.insert(&current.nep.uuid);
        path.push(current.nep.uuid.clone());

        while let Some(parent) = current.nep.parent_node_edge_point.as_ref() {
            let parent_uuid = &parent.node_edge_point_uuid;
            path.push(parent_uuid.clone());
            let next = self.index.nep(parent_uuid)?;
            if !seen.insert(&next.nep.uuid) {
                return Some(Diagnostic::ParentCycle {
                    node_edge_point_uuid: start.clone(),
                    path,
                });
            }
            current = next;
        }

        None
    }
}

// =============================================================================
// TESTS
// =============================================================================

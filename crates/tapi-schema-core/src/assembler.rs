//! # Node Schema Assembler
//!
//! Regroups materialized endpoints and resolved connection trees by node and
//! physical card, one view per connectivity service.
//!
//! The assembler does not re-validate references. It places every entry of a
//! flattened tree on the cards where that connection terminates, following
//! its `connection-end-point` list. An entry that terminates nowhere known
//! (a failed node, or a connection reporting no end points) inherits the
//! cards of its parent entry. Anything still unplaced is reported on the
//! service.
//!
//! A card shown by a service carries the findings of all its NEPs. Findings
//! on cards that no service shows go to the schema-level list.

use crate::context::{TapiContext, UnavailableNode};
use crate::diagnostics::{Diagnostic, DiagnosticRecord, push_unique};
use crate::index::{CardEntry, ReferenceIndex};
use crate::materialize::{EndpointMaterializer, MaterializedNep};
use crate::resolver::{ConnectionNode, ConnectionTreeResolver};
use crate::schema::{ConnectivityServiceView, FlatConnection, NodeView, ServiceSchema};
use crate::{CepUuid, ConnectionUuid, SchemaError, ServiceUuid};
use std::collections::HashSet;

/// Which endpoints of a card belong to a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EndpointScope {
    /// Only CEPs the service's connections terminate on.
    Referenced,
    /// Every endpoint of every card.
    All,
}

/// Per-service accumulator, one slot per card arena position.
struct ServiceAccumulator<'c> {
    connections: Vec<Vec<FlatConnection>>,
    diagnostics: Vec<Vec<Diagnostic>>,
    referenced_ceps: HashSet<&'c CepUuid>,
    service_diagnostics: Vec<Diagnostic>,
}

impl ServiceAccumulator<'_> {
    fn new(cards: usize) -> Self {
        Self {
            connections: vec![Vec::new(); cards],
            diagnostics: vec![Vec::new(); cards],
            referenced_ceps: HashSet::new(),
            service_diagnostics: Vec::new(),
        }
    }
}

/// Builds the per-service, per-card output schema.
pub struct NodeSchemaAssembler<'i, 'c> {
    index: &'i ReferenceIndex<'c>,
    resolver: ConnectionTreeResolver<'i, 'c>,
    /// Materialized endpoints, one slot per NEP arena position.
    endpoints: Vec<MaterializedNep>,
}

impl<'i, 'c> NodeSchemaAssembler<'i, 'c> {
    /// Materialize every NEP once and prepare a resolver.
    #[must_use]
    pub fn new(index: &'i ReferenceIndex<'c>) -> Self {
        Self {
            index,
            resolver: ConnectionTreeResolver::new(index),
            endpoints: EndpointMaterializer::new(index).materialize_all(),
        }
    }

    /// Assemble the schema.
    ///
    /// With no connectivity service in the snapshot, one implicit service is
    /// built from every root connection and every card.
    pub fn assemble(&self, unavailable: &[UnavailableNode]) -> ServiceSchema {
        let services: Vec<_> = self.index.services().collect();
        // Cards that made it into at least one service.
        let mut shown = vec![false; self.index.cards().len()];

        let connectivity_services = if services.is_empty() {
            let trees = self.resolver.resolve_all();
            vec![self.assemble_service(None, None, &trees, EndpointScope::All, &mut shown)]
        } else {
            services
                .into_iter()
                .map(|service| {
                    let trees: Vec<ConnectionNode> = service
                        .connection
                        .iter()
                        .map(|c| self.resolver.resolve(&c.connection_uuid))
                        .collect();
                    self.assemble_service(
                        Some(service.uuid.clone()),
                        service.display_name().map(str::to_string),
                        &trees,
                        EndpointScope::Referenced,
                        &mut shown,
                    )
                })
                .collect()
        };

        let unavailable_nodes = unavailable
            .iter()
            .map(|node| NodeView {
                node_id: node.node_uuid.clone(),
                inventory_id: None,
                end_points: Vec::new(),
                lower_connections: Vec::new(),
                diagnostics: vec![DiagnosticRecord::from(Diagnostic::NodeUnavailable {
                    node_uuid: node.node_uuid.clone(),
                    reason: node.reason.clone(),
                })],
            })
            .collect();

        let mut diagnostics = Vec::new();
        for (card, _) in self.index.cards().iter().zip(&shown).filter(|(_, flag)| !**flag) {
            self.endpoint_diagnostics(card, &mut diagnostics);
        }

        ServiceSchema {
            connectivity_services,
            unavailable_nodes,
            diagnostics: diagnostics.into_iter().map(DiagnosticRecord::from).collect(),
        }
    }

    /// Materializer findings of every NEP on a card.
    fn endpoint_diagnostics(&self, card: &CardEntry<'_>, out: &mut Vec<Diagnostic>) {
        for materialized in card.neps.iter().filter_map(|&nep| self.endpoints.get(nep)) {
            for diagnostic in &materialized.diagnostics {
                push_unique(out, diagnostic.clone());
            }
        }
    }

    fn assemble_service(
        &self,
        uuid: Option<ServiceUuid>,
        name: Option<String>,
        trees: &[ConnectionNode],
        scope: EndpointScope,
        shown: &mut [bool],
    ) -> ConnectivityServiceView {
        let cards = self.index.cards();
        let mut acc = ServiceAccumulator::new(cards.len());

        for tree in trees {
            self.place_tree(tree, &mut acc);
        }

        let mut nodes = Vec::new();
        for (position, card) in cards.iter().enumerate() {
            let end_points: Vec<_> = card
                .neps
                .iter()
                .filter_map(|&nep| self.endpoints.get(nep))
                .flat_map(|materialized| materialized.endpoints.iter())
                .filter(|e| {
                    scope == EndpointScope::All
                        || acc.referenced_ceps.contains(&e.connection_end_point_uuid)
                })
                .cloned()
                .collect();
            let lower_connections = std::mem::take(&mut acc.connections[position]);
            let placed = std::mem::take(&mut acc.diagnostics[position]);

            let in_scope = scope == EndpointScope::All
                || !end_points.is_empty()
                || !lower_connections.is_empty()
                || !placed.is_empty();
            if !in_scope {
                continue;
            }

            // Every NEP of a shown card reports, referenced or not.
            let mut diagnostics = Vec::new();
            self.endpoint_diagnostics(card, &mut diagnostics);
            for diagnostic in placed {
                push_unique(&mut diagnostics, diagnostic);
            }

            let Some(node) = self.index.node_at(card.node) else {
                continue;
            };
            if let Some(flag) = shown.get_mut(position) {
                *flag = true;
            }
            nodes.push(NodeView {
                node_id: node.uuid.clone(),
                inventory_id: card.inventory_id.map(str::to_string),
                end_points,
                lower_connections,
                diagnostics: diagnostics.into_iter().map(DiagnosticRecord::from).collect(),
            });
        }

        ConnectivityServiceView {
            uuid,
            name,
            nodes,
            diagnostics: acc
                .service_diagnostics
                .into_iter()
                .map(DiagnosticRecord::from)
                .collect(),
        }
    }

    /// Place every entry of one flattened tree on its cards.
    fn place_tree(&self, tree: &ConnectionNode, acc: &mut ServiceAccumulator<'c>) {
        // Cards of the most recent entry at each depth.
        let mut inherited: Vec<Vec<usize>> = Vec::new();

        for (node, entry) in tree.preorder().into_iter().zip(tree.flatten()) {
            let own = if node.is_known() {
                self.landing_cards(&entry.connection_uuid, acc)
            } else {
                Vec::new()
            };
            let cards = if own.is_empty() && entry.depth > 0 {
                inherited.get(entry.depth - 1).cloned().unwrap_or_default()
            } else {
                own
            };
            inherited.truncate(entry.depth);
            inherited.push(cards.clone());

            let diagnostics = node.own_diagnostics();
            if cards.is_empty() {
                for diagnostic in diagnostics {
                    push_unique(&mut acc.service_diagnostics, diagnostic);
                }
                continue;
            }
            for &card in &cards {
                acc.connections[card].push(entry.clone());
                for diagnostic in &diagnostics {
                    push_unique(&mut acc.diagnostics[card], diagnostic.clone());
                }
            }
        }
    }

    /// Cards a resolved connection terminates on, in end-point order.
    ///
    /// Known CEPs are marked as referenced. An unknown CEP whose NEP is known
    /// is reported on that NEP's card, otherwise on the service.
    fn landing_cards(
        &self,
        uuid: &ConnectionUuid,
        acc: &mut ServiceAccumulator<'c>,
    ) -> Vec<usize> {
        let Some(connection) = self.index.connection(uuid) else {
            return Vec::new();
        };

        let mut cards: Vec<usize> = Vec::new();
        for cep_ref in &connection.connection_end_point {
            let card = if let Some(cep) = self.index.cep(&cep_ref.connection_end_point_uuid) {
                let raw = cep.cep;
                acc.referenced_ceps.insert(&raw.uuid);
                self.index.nep_at(cep.nep).map(|nep| nep.card)
            } else {
                let diagnostic = Diagnostic::DanglingEndPoint {
                    connection_uuid: uuid.clone(),
                    connection_end_point_uuid: cep_ref.connection_end_point_uuid.clone(),
                    node_edge_point_uuid: cep_ref.node_edge_point_uuid.clone(),
                };
                match cep_ref
                    .node_edge_point_uuid
                    .as_ref()
                    .and_then(|nep| self.index.nep(nep))
                {
                    Some(nep) => {
                        push_unique(&mut acc.diagnostics[nep.card], diagnostic);
                        Some(nep.card)
                    }
                    None => {
                        push_unique(&mut acc.service_diagnostics, diagnostic);
                        None
                    }
                }
            };

            if let Some(card) = card
                && !cards.contains(&card)
            {
                cards.push(card);
            }
        }
        cards
    }
}

// =============================================================================
// ENTRY POINTS
// =============================================================================

/// Resolve a snapshot into its per-node service schema.
///
/// # Errors
/// Fails only on snapshot-wide integrity problems, such as two objects of
/// one kind sharing a UUID. No partial schema is returned in that case.
pub fn build_schema(context: &TapiContext) -> Result<ServiceSchema, SchemaError> {
    build_schema_with_unavailable(context, &[])
}

/// Resolve a snapshot, adding entries for nodes the fetch layer could not
/// retrieve.
pub fn build_schema_with_unavailable(
    context: &TapiContext,
    unavailable: &[UnavailableNode],
) -> Result<ServiceSchema, SchemaError> {
    let index = ReferenceIndex::build(context)?;
    Ok(NodeSchemaAssembler::new(&index).assemble(unavailable))
}

// =============================================================================
// TESTS
// =============================================================================

//! # Reference Index
//!
//! UUID lookup tables over one borrowed context snapshot.
//!
//! - Single linear pass over the snapshot
//! - Records kept in arenas in device-reported order
//! - Maps store arena positions, so every iteration is input order
//! - Duplicate identity within a kind aborts the build
//!
//! The index never copies or mutates the snapshot; it is shared by reference
//! with the materializer, the resolver and the assembler.

use crate::context::{
    RawConnection, RawConnectionEndPoint, RawConnectivityService, RawLink, RawNode,
    RawNodeEdgePoint, RawServiceInterfacePoint, TapiContext,
};
use crate::primitives::{MAX_CONTEXT_OBJECTS, is_valid_uuid};
use crate::{
    CepUuid, ConnectionUuid, LinkUuid, NepUuid, NodeUuid, ObjectKind, SchemaError, ServiceUuid,
    SipUuid,
};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt::Display;
use std::hash::Hash;

/// A NEP together with its owning node and physical card.
#[derive(Debug, Clone, Copy)]
pub struct NepEntry<'c> {
    /// Arena position of the owning node.
    pub node: usize,
    /// Arena position of the owning physical card.
    pub card: usize,
    pub nep: &'c RawNodeEdgePoint,
}

/// A CEP together with its owning NEP.
#[derive(Debug, Clone, Copy)]
pub struct CepEntry<'c> {
    /// Arena position of the owning NEP.
    pub nep: usize,
    pub cep: &'c RawConnectionEndPoint,
}

/// A physical card: the NEPs of one node sharing an inventory path.
///
/// NEPs that report no inventory path share one card per node with
/// `inventory_id == None`.
#[derive(Debug, Clone)]
pub struct CardEntry<'c> {
    /// Arena position of the owning node.
    pub node: usize,
    pub inventory_id: Option<&'c str>,
    /// Arena positions of the card's NEPs, in NEP iteration order.
    pub neps: Vec<usize>,
}

/// Read-only UUID index over one snapshot.
#[derive(Debug, Default)]
pub struct ReferenceIndex<'c> {
    nodes: Vec<&'c RawNode>,
    cards: Vec<CardEntry<'c>>,
    neps: Vec<NepEntry<'c>>,
    ceps: Vec<CepEntry<'c>>,
    sips: Vec<&'c RawServiceInterfacePoint>,
    connections: Vec<&'c RawConnection>,
    links: Vec<&'c RawLink>,
    services: Vec<&'c RawConnectivityService>,

    node_index: HashMap<&'c NodeUuid, usize>,
    nep_index: HashMap<&'c NepUuid, usize>,
    cep_index: HashMap<&'c CepUuid, usize>,
    sip_index: HashMap<&'c SipUuid, usize>,
    connection_index: HashMap<&'c ConnectionUuid, usize>,
    link_index: HashMap<&'c LinkUuid, usize>,
    service_index: HashMap<&'c ServiceUuid, usize>,
}

/// Insert `key -> position`, failing on a second object with the same key.
fn insert_unique<'c, K>(
    map: &mut HashMap<&'c K, usize>,
    key: &'c K,
    position: usize,
    kind: ObjectKind,
) -> Result<(), SchemaError>
where
    K: Eq + Hash + Display + AsRef<str>,
{
    if !is_valid_uuid(key.as_ref()) {
        return Err(SchemaError::InvalidContext(format!(
            "{} at position {} has an empty or oversized uuid",
            kind, position
        )));
    }
    match map.entry(key) {
        Entry::Occupied(_) => Err(SchemaError::DuplicateUuid {
            kind,
            uuid: key.to_string(),
        }),
        Entry::Vacant(slot) => {
            slot.insert(position);
            Ok(())
        }
    }
}

/// Count every object the index will hold, before allocating anything.
fn object_count(context: &TapiContext) -> usize {
    let mut count = context.service_interface_points.len();
    for topology in context.topologies() {
        count = count.saturating_add(topology.link.len());
        for node in &topology.node {
            count = count.saturating_add(1);
            for nep in &node.owned_node_edge_point {
                count = count
                    .saturating_add(1)
                    .saturating_add(nep.connection_end_points().len());
            }
        }
    }
    count
        .saturating_add(context.connections().count())
        .saturating_add(context.connectivity_services().count())
}

impl<'c> ReferenceIndex<'c> {
    /// Build the index in one pass over the snapshot.
    ///
    /// # Errors
    /// - `SchemaError::DuplicateUuid` if two objects of one kind share a UUID
    /// - `SchemaError::InvalidContext` for an empty or oversized UUID
    /// - `SchemaError::ContextTooLarge` beyond `MAX_CONTEXT_OBJECTS`
    pub fn build(context: &'c TapiContext) -> Result<Self, SchemaError> {
        let count = object_count(context);
        if count > MAX_CONTEXT_OBJECTS {
            return Err(SchemaError::ContextTooLarge {
                count,
                max: MAX_CONTEXT_OBJECTS,
            });
        }

        let mut index = Self::default();

        for sip in &context.service_interface_points {
            let position = index.sips.len();
            insert_unique(
                &mut index.sip_index,
                &sip.uuid,
                position,
                ObjectKind::ServiceInterfacePoint,
            )?;
            index.sips.push(sip);
        }

        for topology in context.topologies() {
            for node in &topology.node {
                index.insert_node(node)?;
            }
            for link in &topology.link {
                let position = index.links.len();
                insert_unique(&mut index.link_index, &link.uuid, position, ObjectKind::Link)?;
                index.links.push(link);
            }
        }

        for connection in context.connections() {
            let position = index.connections.len();
            insert_unique(
                &mut index.connection_index,
                &connection.uuid,
                position,
                ObjectKind::Connection,
            )?;
            index.connections.push(connection);
        }

        for service in context.connectivity_services() {
            let position = index.services.len();
            insert_unique(
                &mut index.service_index,
                &service.uuid,
                position,
                ObjectKind::ConnectivityService,
            )?;
            index.services.push(service);
        }

        Ok(index)
    }

    /// Index a node, its NEPs, their CEPs and the node's physical cards.
    fn insert_node(&mut self, node: &'c RawNode) -> Result<(), SchemaError> {
        let node_position = self.nodes.len();
        insert_unique(&mut self.node_index, &node.uuid, node_position, ObjectKind::Node)?;
        self.nodes.push(node);

        // Cards of this node, keyed by inventory path in first-appearance order.
        let first_card = self.cards.len();

        for nep in &node.owned_node_edge_point {
            let nep_position = self.neps.len();
            insert_unique(
                &mut self.nep_index,
                &nep.uuid,
                nep_position,
                ObjectKind::NodeEdgePoint,
            )?;

            let inventory_id = nep.inventory_id();
            let card = match self.cards[first_card..]
                .iter()
                .position(|c| c.inventory_id == inventory_id)
            {
                Some(offset) => first_card + offset,
                None => {
                    self.cards.push(CardEntry {
                        node: node_position,
                        inventory_id,
                        neps: Vec::new(),
                    });
                    self.cards.len() - 1
                }
            };
            self.cards[card].neps.push(nep_position);

            self.neps.push(NepEntry {
                node: node_position,
                card,
                nep,
            });

            for cep in nep.connection_end_points() {
                let cep_position = self.ceps.len();
                insert_unique(
                    &mut self.cep_index,
                    &cep.uuid,
                    cep_position,
                    ObjectKind::ConnectionEndPoint,
                )?;
                self.ceps.push(CepEntry {
                    nep: nep_position,
                    cep,
                });
            }
        }

        Ok(())
    }

    // -------------------------------------------------------------------------
    // Lookups
    // -------------------------------------------------------------------------

    /// Arena position of a node.
    pub fn node_position(&self, uuid: &NodeUuid) -> Option<usize> {
        self.node_index.get(uuid).copied()
    }

    /// Arena position of a NEP.
    pub fn nep_position(&self, uuid: &NepUuid) -> Option<usize> {
        self.nep_index.get(uuid).copied()
    }

    /// Lookup a NEP by UUID.
    pub fn nep(&self, uuid: &NepUuid) -> Option<&NepEntry<'c>> {
        self.nep_index.get(uuid).map(|&i| &self.neps[i])
    }

    /// Lookup a CEP by UUID.
    pub fn cep(&self, uuid: &CepUuid) -> Option<&CepEntry<'c>> {
        self.cep_index.get(uuid).map(|&i| &self.ceps[i])
    }

    /// Lookup a SIP by UUID.
    pub fn sip(&self, uuid: &SipUuid) -> Option<&'c RawServiceInterfacePoint> {
        self.sip_index.get(uuid).map(|&i| self.sips[i])
    }

    /// Lookup a connection by UUID.
    pub fn connection(&self, uuid: &ConnectionUuid) -> Option<&'c RawConnection> {
        self.connection_index
            .get(uuid)
            .map(|&i| self.connections[i])
    }

    /// Lookup a link by UUID.
    pub fn link(&self, uuid: &LinkUuid) -> Option<&'c RawLink> {
        self.link_index.get(uuid).map(|&i| self.links[i])
    }

    /// Lookup a connectivity service by UUID.
    pub fn service(&self, uuid: &ServiceUuid) -> Option<&'c RawConnectivityService> {
        self.service_index.get(uuid).map(|&i| self.services[i])
    }

    // -------------------------------------------------------------------------
    // Arena access (input order)
    // -------------------------------------------------------------------------

    /// Node at an arena position.
    pub fn node_at(&self, position: usize) -> Option<&'c RawNode> {
        self.nodes.get(position).copied()
    }

    /// NEP at an arena position.
    pub fn nep_at(&self, position: usize) -> Option<&NepEntry<'c>> {
        self.neps.get(position)
    }

    /// All nodes in device-reported order.
    pub fn nodes(&self) -> impl Iterator<Item = &'c RawNode> + '_ {
        self.nodes.iter().copied()
    }

    /// All physical cards, grouped by node, in first-appearance order.
    pub fn cards(&self) -> &[CardEntry<'c>] {
        &self.cards
    }

    /// All NEPs in iteration order (node order, then owned order).
    pub fn neps(&self) -> &[NepEntry<'c>] {
        &self.neps
    }

    /// All connections in device-reported order.
    pub fn connections(&self) -> impl Iterator<Item = &'c RawConnection> + '_ {
        self.connections.iter().copied()
    }

    /// All connectivity services in device-reported order.
    pub fn services(&self) -> impl Iterator<Item = &'c RawConnectivityService> + '_ {
        self.services.iter().copied()
    }

    /// Total number of indexed objects.
    pub fn len(&self) -> usize {
        self.nodes.len()
            + self.neps.len()
            + self.ceps.len()
            + self.sips.len()
            + self.connections.len()
            + self.links.len()
            + self.services.len()
    }

    /// Whether the snapshot held no objects at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn context(json: serde_json::Value) -> TapiContext {
        TapiContext::from_value(json).expect("parse")
    }

    fn two_card_node() -> TapiContext {
        context(serde_json::json!({
            "service-interface-point": [{"uuid": "sip-1"}],
            "tapi-topology:topology-context": {"topology": [{
                "uuid": "topo",
                "node": [{
                    "uuid": "node-1",
                    "owned-node-edge-point": [
                        {"uuid": "nep-a", "inventory-id": "/ne=A/sl=1",
                         "tapi-connectivity:cep-list": {"connection-end-point": [{"uuid": "cep-a1"}, {"uuid": "cep-a2"}]}},
                        {"uuid": "nep-b", "inventory-id": "/ne=A/sl=2"},
                        {"uuid": "nep-c", "inventory-id": "/ne=A/sl=1"},
                        {"uuid": "nep-d"}
                    ]
                }],
                "link": [{"uuid": "link-1", "node-edge-point": []}]
            }]},
            "tapi-connectivity:connectivity-context": {
                "connection": [{"uuid": "conn-1"}],
                "connectivity-service": [{"uuid": "svc-1", "connection": [{"connection-uuid": "conn-1"}]}]
            }
        }))
    }

    #[test]
    fn build_indexes_every_kind() {
        let ctx = two_card_node();
        let index = ReferenceIndex::build(&ctx).expect("build");

        assert!(index.node_position(&NodeUuid::from("node-1")).is_some());
        assert!(index.nep(&NepUuid::from("nep-c")).is_some());
        assert!(index.sip(&SipUuid::from("sip-1")).is_some());
        assert!(index.connection(&ConnectionUuid::from("conn-1")).is_some());
        assert!(index.link(&LinkUuid::from("link-1")).is_some());
        assert!(index.service(&ServiceUuid::from("svc-1")).is_some());
        // 1 node + 4 neps + 2 ceps + 1 sip + 1 connection + 1 link + 1 service
        assert_eq!(index.len(), 11);
    }

    #[test]
    fn cep_resolves_to_owning_nep() {
        let ctx = two_card_node();
        let index = ReferenceIndex::build(&ctx).expect("build");

        let cep = index.cep(&CepUuid::from("cep-a2")).expect("cep");
        let owner = index.nep_at(cep.nep).expect("nep");
        assert_eq!(owner.nep.uuid.as_str(), "nep-a");
    }

    #[test]
    fn cards_group_by_inventory_in_first_appearance_order() {
        let ctx = two_card_node();
        let index = ReferenceIndex::build(&ctx).expect("build");

        let cards: Vec<_> = index
            .cards()
            .iter()
            .map(|c| (c.inventory_id, c.neps.clone()))
            .collect();
        assert_eq!(
            cards,
            vec![
                (Some("/ne=A/sl=1"), vec![0, 2]),
                (Some("/ne=A/sl=2"), vec![1]),
                (None, vec![3]),
            ]
        );
    }

    #[test]
    fn duplicate_cep_across_neps_is_fatal() {
        let ctx = context(serde_json::json!({
            "tapi-topology:topology-context": {"topology": [{"node": [{
                "uuid": "node-1",
                "owned-node-edge-point": [
                    {"uuid": "nep-a", "cep-list": {"connection-end-point": [{"uuid": "cep-x"}]}},
                    {"uuid": "nep-b", "cep-list": {"connection-end-point": [{"uuid": "cep-x"}]}}
                ]
            }]}]}
        }));

        match ReferenceIndex::build(&ctx) {
            Err(SchemaError::DuplicateUuid { kind, uuid }) => {
                assert_eq!(kind, ObjectKind::ConnectionEndPoint);
                assert_eq!(uuid, "cep-x");
            }
            other => panic!("expected DuplicateUuid, got {:?}", other),
        }
    }

    #[test]
    fn same_uuid_across_kinds_is_allowed() {
        let ctx = context(serde_json::json!({
            "service-interface-point": [{"uuid": "shared"}],
            "connectivity-context": {"connection": [{"uuid": "shared"}]}
        }));
        assert!(ReferenceIndex::build(&ctx).is_ok());
    }

    #[test]
    fn empty_uuid_is_rejected() {
        let ctx = context(serde_json::json!({
            "connectivity-context": {"connection": [{"uuid": ""}]}
        }));
        assert!(matches!(
            ReferenceIndex::build(&ctx),
            Err(SchemaError::InvalidContext(_))
        ));
    }

    #[test]
    fn empty_context_builds_empty_index() {
        let ctx = TapiContext::default();
        let index = ReferenceIndex::build(&ctx).expect("build");
        assert!(index.is_empty());
    }
}

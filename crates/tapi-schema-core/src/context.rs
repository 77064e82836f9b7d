//! # TAPI Context Wire Types
//!
//! Serde models of the raw TAPI objects as delivered by a device's RESTCONF
//! interface. Only the members the engine reads are modelled; everything
//! else in the payload is ignored.
//!
//! Devices differ in whether they qualify member names with their YANG module
//! (`tapi-connectivity:cep-list` vs `cep-list`), so both spellings are
//! accepted wherever TAPI places a module boundary.

use crate::primitives::{INVENTORY_ID_NAME, TAPI_CONTEXT_KEY};
use crate::{
    CepUuid, ConnectionUuid, InventoryId, LinkUuid, NepUuid, NodeUuid, SchemaError, ServiceUuid,
    SipUuid,
};
use serde::{Deserialize, Serialize};

// =============================================================================
// CONTEXT
// =============================================================================

/// One snapshot of a device's `tapi-common:context`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TapiContext {
    #[serde(
        default,
        rename = "service-interface-point",
        alias = "tapi-common:service-interface-point"
    )]
    pub service_interface_points: Vec<RawServiceInterfacePoint>,

    #[serde(
        default,
        rename = "tapi-topology:topology-context",
        alias = "topology-context",
        skip_serializing_if = "Option::is_none"
    )]
    pub topology_context: Option<RawTopologyContext>,

    #[serde(
        default,
        rename = "tapi-connectivity:connectivity-context",
        alias = "connectivity-context",
        skip_serializing_if = "Option::is_none"
    )]
    pub connectivity_context: Option<RawConnectivityContext>,
}

impl TapiContext {
    /// Parse a context from JSON bytes.
    ///
    /// Accepts both the RESTCONF-wrapped form
    /// (`{"tapi-common:context": {...}}`) and a bare context object.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, SchemaError> {
        let value: serde_json::Value = serde_json::from_slice(bytes)
            .map_err(|e| SchemaError::InvalidContext(e.to_string()))?;
        Self::from_value(value)
    }

    /// Build a context from an already-parsed JSON value.
    pub fn from_value(value: serde_json::Value) -> Result<Self, SchemaError> {
        let inner = match value {
            serde_json::Value::Object(mut map) => match map.remove(TAPI_CONTEXT_KEY) {
                Some(inner) => inner,
                None => serde_json::Value::Object(map),
            },
            other => {
                return Err(SchemaError::InvalidContext(format!(
                    "expected a JSON object, found {}",
                    json_type_name(&other)
                )));
            }
        };

        serde_json::from_value(inner).map_err(|e| SchemaError::InvalidContext(e.to_string()))
    }

    /// All topologies in device-reported order.
    pub fn topologies(&self) -> impl Iterator<Item = &RawTopology> {
        self.topology_context
            .iter()
            .flat_map(|ctx| ctx.topology.iter())
    }

    /// All connections in device-reported order.
    pub fn connections(&self) -> impl Iterator<Item = &RawConnection> {
        self.connectivity_context
            .iter()
            .flat_map(|ctx| ctx.connection.iter())
    }

    /// All connectivity services in device-reported order.
    pub fn connectivity_services(&self) -> impl Iterator<Item = &RawConnectivityService> {
        self.connectivity_context
            .iter()
            .flat_map(|ctx| ctx.connectivity_service.iter())
    }
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// A node the fetch layer could not retrieve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnavailableNode {
    pub node_uuid: NodeUuid,
    pub reason: String,
}

// =============================================================================
// SHARED SHAPES
// =============================================================================

/// TAPI `name` list entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameValue {
    #[serde(rename = "value-name")]
    pub value_name: String,
    pub value: String,
}

fn find_name<'a>(names: &'a [NameValue], value_name: &str) -> Option<&'a str> {
    names
        .iter()
        .find(|n| n.value_name.eq_ignore_ascii_case(value_name))
        .map(|n| n.value.as_str())
}

/// Reference to a NEP (`node-edge-point-uuid` plus its locating keys).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NepRef {
    #[serde(rename = "node-edge-point-uuid")]
    pub node_edge_point_uuid: NepUuid,
    #[serde(rename = "node-uuid", default, skip_serializing_if = "Option::is_none")]
    pub node_uuid: Option<NodeUuid>,
    #[serde(
        rename = "topology-uuid",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub topology_uuid: Option<String>,
}

/// Reference to a SIP from a NEP's `mapped-service-interface-point`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SipRef {
    #[serde(rename = "service-interface-point-uuid")]
    pub service_interface_point_uuid: SipUuid,
}

/// Reference to a connection (`lower-connection`, service `connection`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRef {
    #[serde(rename = "connection-uuid")]
    pub connection_uuid: ConnectionUuid,
}

/// Reference to a link from a connection's `supported-client-link`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRef {
    #[serde(rename = "link-uuid")]
    pub link_uuid: LinkUuid,
    #[serde(
        rename = "topology-uuid",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub topology_uuid: Option<String>,
}

/// Reference to a CEP from a connection's `connection-end-point` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CepRef {
    #[serde(rename = "connection-end-point-uuid")]
    pub connection_end_point_uuid: CepUuid,
    #[serde(
        rename = "node-edge-point-uuid",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub node_edge_point_uuid: Option<NepUuid>,
    #[serde(rename = "node-uuid", default, skip_serializing_if = "Option::is_none")]
    pub node_uuid: Option<NodeUuid>,
}

// =============================================================================
// TOPOLOGY
// =============================================================================

/// `tapi-topology:topology-context`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTopologyContext {
    #[serde(default)]
    pub topology: Vec<RawTopology>,
}

/// One topology: its nodes and links.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTopology {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(default)]
    pub node: Vec<RawNode>,
    #[serde(default)]
    pub link: Vec<RawLink>,
}

/// A topology node and the NEPs it owns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawNode {
    pub uuid: NodeUuid,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub name: Vec<NameValue>,
    #[serde(rename = "owned-node-edge-point", default)]
    pub owned_node_edge_point: Vec<RawNodeEdgePoint>,
}

/// `owned-node-edge-point`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawNodeEdgePoint {
    pub uuid: NepUuid,
    #[serde(
        rename = "layer-protocol-qualifier",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub layer_protocol_qualifier: Option<String>,
    #[serde(
        rename = "mapped-service-interface-point",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub mapped_service_interface_point: Vec<SipRef>,
    #[serde(
        rename = "tapi-connectivity:cep-list",
        alias = "cep-list",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub cep_list: Option<RawCepList>,
    #[serde(
        rename = "parent-node-edge-point",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub parent_node_edge_point: Option<NepRef>,
    #[serde(
        rename = "client-node-edge-point",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub client_node_edge_point: Vec<NepRef>,
    #[serde(
        rename = "inventory-id",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub inventory_id: Option<InventoryId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub name: Vec<NameValue>,
}

impl RawNodeEdgePoint {
    /// CEPs of this NEP, in device-reported order.
    pub fn connection_end_points(&self) -> &[RawConnectionEndPoint] {
        self.cep_list
            .as_ref()
            .map(|list| list.connection_end_point.as_slice())
            .unwrap_or_default()
    }

    /// Physical card path: the explicit `inventory-id` member, otherwise the
    /// `INVENTORY_ID` name entry.
    pub fn inventory_id(&self) -> Option<&str> {
        self.inventory_id
            .as_ref()
            .map(InventoryId::as_str)
            .or_else(|| find_name(&self.name, INVENTORY_ID_NAME))
    }
}

/// `tapi-connectivity:cep-list`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCepList {
    #[serde(rename = "connection-end-point", default)]
    pub connection_end_point: Vec<RawConnectionEndPoint>,
}

/// A CEP inside a NEP's `cep-list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawConnectionEndPoint {
    pub uuid: CepUuid,
    #[serde(
        rename = "layer-protocol-qualifier",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub layer_protocol_qualifier: Option<String>,
    #[serde(
        rename = "parent-node-edge-point",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub parent_node_edge_point: Option<NepRef>,
    #[serde(
        rename = "client-node-edge-point",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub client_node_edge_point: Vec<NepRef>,
}

/// `service-interface-point`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawServiceInterfacePoint {
    pub uuid: SipUuid,
    #[serde(
        rename = "layer-protocol-name",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub layer_protocol_name: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub name: Vec<NameValue>,
}

/// `tapi-topology:link`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawLink {
    pub uuid: LinkUuid,
    #[serde(rename = "node-edge-point", default)]
    pub node_edge_point: Vec<NepRef>,
    #[serde(
        rename = "layer-protocol-name",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub layer_protocol_name: Vec<String>,
    #[serde(
        rename = "layer-protocol-qualifier",
        alias = "tapi-ciena-link-extensions:layer-protocol-qualifier",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub layer_protocol_qualifier: Option<String>,
}

// =============================================================================
// CONNECTIVITY
// =============================================================================

/// `tapi-connectivity:connectivity-context`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawConnectivityContext {
    #[serde(default)]
    pub connection: Vec<RawConnection>,
    #[serde(rename = "connectivity-service", default)]
    pub connectivity_service: Vec<RawConnectivityService>,
}

/// `connection`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawConnection {
    pub uuid: ConnectionUuid,
    #[serde(
        rename = "layer-protocol-qualifier",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub layer_protocol_qualifier: Option<String>,
    #[serde(
        rename = "connection-end-point",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub connection_end_point: Vec<CepRef>,
    #[serde(
        rename = "lower-connection",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub lower_connection: Vec<ConnectionRef>,
    #[serde(
        rename = "supported-client-link",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub supported_client_link: Vec<LinkRef>,
}

/// `connectivity-service`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawConnectivityService {
    pub uuid: ServiceUuid,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub name: Vec<NameValue>,
    #[serde(default)]
    pub connection: Vec<ConnectionRef>,
}

impl RawConnectivityService {
    /// First `name` value, if any.
    pub fn display_name(&self) -> Option<&str> {
        self.name.first().map(|n| n.value.as_str())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wrapped_context() {
        let json = br#"{
            "tapi-common:context": {
                "service-interface-point": [{"uuid": "sip-1"}],
                "tapi-topology:topology-context": {
                    "topology": [{"uuid": "topo", "node": [{"uuid": "node-1"}]}]
                }
            }
        }"#;
        let ctx = TapiContext::from_json_slice(json).expect("parse");
        assert_eq!(ctx.service_interface_points.len(), 1);
        assert_eq!(ctx.topologies().count(), 1);
    }

    #[test]
    fn parses_bare_context_with_plain_keys() {
        let json = br#"{
            "connectivity-context": {
                "connection": [{"uuid": "c1", "lower-connection": [{"connection-uuid": "c2"}]}]
            }
        }"#;
        let ctx = TapiContext::from_json_slice(json).expect("parse");
        let conns: Vec<_> = ctx.connections().collect();
        assert_eq!(conns.len(), 1);
        assert_eq!(conns[0].lower_connection[0].connection_uuid.as_str(), "c2");
    }

    #[test]
    fn rejects_non_object() {
        let result = TapiContext::from_json_slice(b"[1, 2]");
        assert!(matches!(result, Err(SchemaError::InvalidContext(_))));
    }

    #[test]
    fn rejects_malformed_json() {
        let result = TapiContext::from_json_slice(b"{\"service-interface-point\": ");
        assert!(matches!(result, Err(SchemaError::InvalidContext(_))));
    }

    #[test]
    fn link_accepts_vendor_qualifier_key() {
        let json = serde_json::json!({
            "uuid": "14219539-208b-35f5-b7cf-35a58e083490",
            "node-edge-point": [
                {
                    "node-edge-point-uuid": "65a39427-3055-3ba4-9e15-0ebed4974577",
                    "node-uuid": "62d11f13-db6c-3398-8a83-5fac0b2b7476",
                    "topology-uuid": "4e537278-79f8-39ad-804b-f0b553cb2ffb"
                }
            ],
            "layer-protocol-name": ["ETH"],
            "tapi-ciena-link-extensions:layer-protocol-qualifier": "tapi-ciena-protocol-extensions:ETHERNET"
        });
        let link: RawLink = serde_json::from_value(json).expect("parse");
        assert_eq!(
            link.layer_protocol_qualifier.as_deref(),
            Some("tapi-ciena-protocol-extensions:ETHERNET")
        );
        assert_eq!(
            link.node_edge_point[0].node_uuid.as_ref().map(NodeUuid::as_str),
            Some("62d11f13-db6c-3398-8a83-5fac0b2b7476")
        );
    }

    #[test]
    fn link_without_nep_uuid_is_rejected() {
        let json = serde_json::json!({
            "uuid": "l1",
            "node-edge-point": [{"node-uuid": "n1"}]
        });
        assert!(serde_json::from_value::<RawLink>(json).is_err());
    }

    #[test]
    fn inventory_id_falls_back_to_name_entry() {
        let json = serde_json::json!({
            "uuid": "nep-1",
            "name": [{"value-name": "INVENTORY_ID", "value": "/ne=Madrid/r=1/sh=1"}]
        });
        let nep: RawNodeEdgePoint = serde_json::from_value(json).expect("parse");
        assert_eq!(nep.inventory_id(), Some("/ne=Madrid/r=1/sh=1"));

        let json = serde_json::json!({
            "uuid": "nep-2",
            "inventory-id": "/ne=Barcelona/r=1/sh=1",
            "name": [{"value-name": "INVENTORY_ID", "value": "ignored"}]
        });
        let nep: RawNodeEdgePoint = serde_json::from_value(json).expect("parse");
        assert_eq!(nep.inventory_id(), Some("/ne=Barcelona/r=1/sh=1"));
    }

    #[test]
    fn nep_without_cep_list_has_no_ceps() {
        let json = serde_json::json!({"uuid": "nep-1"});
        let nep: RawNodeEdgePoint = serde_json::from_value(json).expect("parse");
        assert!(nep.connection_end_points().is_empty());
    }
}

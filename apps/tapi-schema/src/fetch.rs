//! # Snapshot Fetch
//!
//! Retrieves one TAPI context snapshot from a device over RESTCONF.
//!
//! SIPs, the connectivity context and a topology outline (node UUIDs and
//! links) are read first. Every node is then read on its own, in parallel,
//! with at most `max_in_flight` requests running and each bounded by the
//! configured timeout. A node that cannot be read becomes an
//! [`UnavailableNode`] instead of failing the fetch.
//!
//! Dropping the future returned by [`SnapshotFetcher::fetch`] aborts every
//! request still in flight.

use crate::config::FetchConfig;
use crate::device::{DeviceClient, FetchError};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tapi_schema_core::context::{
    RawConnectivityContext, RawNode, RawServiceInterfacePoint, RawTopologyContext,
};
use tapi_schema_core::primitives::TAPI_CONTEXT_KEY;
use tapi_schema_core::{NodeUuid, SchemaError, TapiContext, UnavailableNode};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

// =============================================================================
// RESTCONF PATHS
// =============================================================================

const CONTEXT_PATH: &str = "/restconf/data/tapi-common:context";
const SIP_PATH: &str = "/restconf/data/tapi-common:context/service-interface-point";
const TOPOLOGY_CONTEXT_PATH: &str = "/restconf/data/tapi-common:context/tapi-topology:topology-context";
const CONNECTIVITY_CONTEXT_PATH: &str =
    "/restconf/data/tapi-common:context/tapi-connectivity:connectivity-context";

/// Member of a saved snapshot listing the nodes the fetch could not read.
pub const UNAVAILABLE_NODES_KEY: &str = "tapi-schema:unavailable-node";

/// Topology outline: node UUIDs plus full links.
const TOPOLOGY_OUTLINE_FIELDS: &str = "topology(uuid;node(uuid);link)";
const TOPOLOGY_FIELDS: &str = "uuid;node(uuid);link";

fn topology_path(topology_uuid: &str) -> String {
    format!("{}/topology={}", TOPOLOGY_CONTEXT_PATH, topology_uuid)
}

fn node_path(topology_uuid: &str, node_uuid: &NodeUuid) -> String {
    format!("{}/node={}", topology_path(topology_uuid), node_uuid)
}

/// Pick the first member present, or the document itself.
///
/// RESTCONF wraps a resource in its module-qualified name, which some
/// devices omit.
fn unwrap_member(mut document: Value, names: &[&str]) -> Value {
    if let Value::Object(map) = &mut document {
        for name in names {
            if let Some(inner) = map.remove(*name) {
                return inner;
            }
        }
    }
    document
}

fn parse<T: DeserializeOwned>(value: Value, what: &str) -> Result<T, FetchError> {
    serde_json::from_value(value).map_err(|e| FetchError::Parse(format!("{what}: {e}")))
}

/// A node resource is a single-element list under `tapi-topology:node`.
fn parse_node(document: Value) -> Result<RawNode, FetchError> {
    match unwrap_member(document, &["tapi-topology:node", "node"]) {
        Value::Array(mut nodes) if !nodes.is_empty() => parse(nodes.swap_remove(0), "node"),
        Value::Array(_) => Err(FetchError::Parse("node: empty response".to_string())),
        other => parse(other, "node"),
    }
}

// =============================================================================
// FETCHER
// =============================================================================

/// A fetched snapshot and the nodes that could not be read.
#[derive(Debug, Clone)]
pub struct FetchedSnapshot {
    pub context: TapiContext,
    pub unavailable: Vec<UnavailableNode>,
}

impl FetchedSnapshot {
    /// The snapshot as a RESTCONF-wrapped document, readable by `resolve`.
    ///
    /// Unavailable nodes are kept next to the context under
    /// [`UNAVAILABLE_NODES_KEY`].
    pub fn to_document(&self) -> Result<Value, FetchError> {
        let context =
            serde_json::to_value(&self.context).map_err(|e| FetchError::Parse(e.to_string()))?;
        let mut document = serde_json::Map::new();
        document.insert(TAPI_CONTEXT_KEY.to_string(), context);
        if !self.unavailable.is_empty() {
            let unavailable = serde_json::to_value(&self.unavailable)
                .map_err(|e| FetchError::Parse(e.to_string()))?;
            document.insert(UNAVAILABLE_NODES_KEY.to_string(), unavailable);
        }
        Ok(Value::Object(document))
    }

    /// Read a saved snapshot, wrapped or bare, with its unavailable nodes.
    ///
    /// A device dump without [`UNAVAILABLE_NODES_KEY`] has none.
    pub fn from_document(mut document: Value) -> Result<Self, SchemaError> {
        let unavailable = match document
            .as_object_mut()
            .and_then(|map| map.remove(UNAVAILABLE_NODES_KEY))
        {
            Some(list) => serde_json::from_value(list).map_err(|e| {
                SchemaError::InvalidContext(format!("{}: {}", UNAVAILABLE_NODES_KEY, e))
            })?,
            None => Vec::new(),
        };
        Ok(Self {
            context: TapiContext::from_value(document)?,
            unavailable,
        })
    }
}

/// Reads snapshots from one device.
pub struct SnapshotFetcher {
    client: Arc<DeviceClient>,
    config: FetchConfig,
}

impl SnapshotFetcher {
    #[must_use]
    pub fn new(client: DeviceClient, config: FetchConfig) -> Self {
        Self {
            client: Arc::new(client),
            config,
        }
    }

    /// Fetch a complete snapshot.
    ///
    /// # Errors
    /// Fails if SIPs, the connectivity context or the topology outline
    /// cannot be read. Individual node failures do not fail the fetch.
    pub async fn fetch(&self) -> Result<FetchedSnapshot, FetchError> {
        info!(device = self.client.base_url(), "fetching TAPI context");

        let sips: Vec<RawServiceInterfacePoint> = parse(
            unwrap_member(
                self.client.get_json(SIP_PATH, &[]).await?,
                &["tapi-common:service-interface-point", "service-interface-point"],
            ),
            "service-interface-point",
        )?;

        let connectivity: RawConnectivityContext = parse(
            unwrap_member(
                self.client.get_json(CONNECTIVITY_CONTEXT_PATH, &[]).await?,
                &["tapi-connectivity:connectivity-context", "connectivity-context"],
            ),
            "connectivity-context",
        )?;

        let mut topology_context = self.fetch_outline().await?;
        let unavailable = self.fill_nodes(&mut topology_context).await;

        info!(
            sips = sips.len(),
            connections = connectivity.connection.len(),
            services = connectivity.connectivity_service.len(),
            unavailable = unavailable.len(),
            "snapshot fetched"
        );

        Ok(FetchedSnapshot {
            context: TapiContext {
                service_interface_points: sips,
                topology_context: Some(topology_context),
                connectivity_context: Some(connectivity),
            },
            unavailable,
        })
    }

    /// Read topologies with node UUIDs only.
    async fn fetch_outline(&self) -> Result<RawTopologyContext, FetchError> {
        match &self.config.topology_uuid {
            Some(uuid) => {
                let document = self
                    .client
                    .get_json(&topology_path(uuid), &[("fields", TOPOLOGY_FIELDS)])
                    .await?;
                let topology = unwrap_member(document, &["tapi-topology:topology", "topology"]);
                let topology = match topology {
                    Value::Array(list) => Value::Array(list),
                    single => Value::Array(vec![single]),
                };
                parse(serde_json::json!({ "topology": topology }), "topology")
            }
            None => {
                let document = self
                    .client
                    .get_json(TOPOLOGY_CONTEXT_PATH, &[("fields", TOPOLOGY_OUTLINE_FIELDS)])
                    .await?;
                parse(
                    unwrap_member(
                        document,
                        &["tapi-topology:topology-context", "topology-context"],
                    ),
                    "topology-context",
                )
            }
        }
    }

    /// Replace each node outline with the full node, in outline order.
    ///
    /// Returns the nodes that could not be read; they are removed from the
    /// topology.
    async fn fill_nodes(&self, topology_context: &mut RawTopologyContext) -> Vec<UnavailableNode> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_in_flight.max(1)));
        let timeout = self.config.timeout();
        let mut tasks = JoinSet::new();
        let mut targets: Vec<(usize, usize, NodeUuid)> = Vec::new();
        let mut results: Vec<Option<Result<RawNode, String>>> = Vec::new();

        for (t, topology) in topology_context.topology.iter().enumerate() {
            let Some(topology_uuid) = topology.uuid.clone() else {
                // Node paths are keyed by topology uuid.
                warn!(topology = t, nodes = topology.node.len(), "topology has no uuid");
                for (n, node) in topology.node.iter().enumerate() {
                    targets.push((t, n, node.uuid.clone()));
                    results.push(Some(Err("topology has no uuid".to_string())));
                }
                continue;
            };
            for (n, node) in topology.node.iter().enumerate() {
                let slot = targets.len();
                targets.push((t, n, node.uuid.clone()));
                results.push(None);

                let client = Arc::clone(&self.client);
                let semaphore = Arc::clone(&semaphore);
                let path = node_path(&topology_uuid, &node.uuid);
                tasks.spawn(async move {
                    let outcome = match semaphore.acquire_owned().await {
                        Ok(_permit) => {
                            match tokio::time::timeout(timeout, client.get_json(&path, &[])).await {
                                Ok(result) => result.and_then(parse_node),
                                Err(_) => Err(FetchError::Timeout),
                            }
                        }
                        Err(_) => Err(FetchError::ConnectionFailed("fetch cancelled".to_string())),
                    };
                    (slot, outcome)
                });
            }
        }

        info!(
            nodes = targets.len(),
            max_in_flight = self.config.max_in_flight,
            "fetching nodes"
        );

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((slot, outcome)) => {
                    if let Some(entry) = results.get_mut(slot) {
                        *entry = Some(outcome.map_err(|e| e.to_string()));
                    }
                }
                Err(e) => warn!(error = %e, "node fetch task failed"),
            }
        }

        let mut unavailable = Vec::new();
        let mut failed: Vec<(usize, usize)> = Vec::new();
        for ((t, n, node_uuid), result) in targets.into_iter().zip(results) {
            let reason = match result {
                Some(Ok(node)) => {
                    if let Some(slot) = topology_context
                        .topology
                        .get_mut(t)
                        .and_then(|topology| topology.node.get_mut(n))
                    {
                        *slot = node;
                    }
                    continue;
                }
                Some(Err(reason)) => reason,
                None => "fetch task aborted".to_string(),
            };
            warn!(node = %node_uuid, reason = %reason, "node unavailable");
            failed.push((t, n));
            unavailable.push(UnavailableNode { node_uuid, reason });
        }

        // Remove from the back so earlier positions stay valid.
        for (t, n) in failed.into_iter().rev() {
            if let Some(topology) = topology_context.topology.get_mut(t) {
                if n < topology.node.len() {
                    topology.node.remove(n);
                }
            }
        }

        unavailable
    }

    /// Fetch the whole context in one request.
    ///
    /// Suitable for small devices; no per-node degradation.
    pub async fn fetch_whole(&self) -> Result<FetchedSnapshot, FetchError> {
        let document = self.client.get_json(CONTEXT_PATH, &[]).await?;
        let context = TapiContext::from_value(document)
            .map_err(|e| FetchError::Parse(e.to_string()))?;
        Ok(FetchedSnapshot {
            context,
            unavailable: Vec::new(),
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_document_unwraps_single_element_list() {
        let node = parse_node(serde_json::json!({
            "tapi-topology:node": [{"uuid": "node-1"}]
        }))
        .expect("node");
        assert_eq!(node.uuid.as_str(), "node-1");
    }

    #[test]
    fn empty_node_list_is_a_parse_error() {
        let err = parse_node(serde_json::json!({"tapi-topology:node": []})).expect_err("empty");
        assert!(matches!(err, FetchError::Parse(_)));
    }

    #[test]
    fn node_path_is_keyed_by_topology_and_node() {
        assert_eq!(
            node_path("topo-1", &NodeUuid::from("node-1")),
            "/restconf/data/tapi-common:context/tapi-topology:topology-context/topology=topo-1/node=node-1"
        );
    }

    #[test]
    fn saved_document_reads_back() {
        let snapshot = FetchedSnapshot {
            context: TapiContext::default(),
            unavailable: Vec::new(),
        };
        let document = snapshot.to_document().expect("document");
        assert!(document.get(TAPI_CONTEXT_KEY).is_some());
        assert!(document.get(UNAVAILABLE_NODES_KEY).is_none());
        let back = FetchedSnapshot::from_document(document).expect("parse");
        assert_eq!(back.context, snapshot.context);
        assert!(back.unavailable.is_empty());
    }

    #[test]
    fn saved_document_keeps_unavailable_nodes() {
        let snapshot = FetchedSnapshot {
            context: TapiContext::default(),
            unavailable: vec![UnavailableNode {
                node_uuid: NodeUuid::from("node-2"),
                reason: "request timed out".to_string(),
            }],
        };
        let document = snapshot.to_document().expect("document");
        assert_eq!(document[UNAVAILABLE_NODES_KEY][0]["node_uuid"], "node-2");

        let back = FetchedSnapshot::from_document(document).expect("parse");
        assert_eq!(back.unavailable, snapshot.unavailable);
    }

    #[test]
    fn malformed_unavailable_list_is_rejected() {
        let document = serde_json::json!({
            TAPI_CONTEXT_KEY: {},
            UNAVAILABLE_NODES_KEY: "node-2"
        });
        let err = FetchedSnapshot::from_document(document).expect_err("string list");
        assert!(matches!(err, SchemaError::InvalidContext(_)));
    }
}

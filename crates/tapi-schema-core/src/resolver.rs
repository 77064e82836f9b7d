//! # Connection Tree Resolver
//!
//! Expands a connection's `lower-connection` references into a tree.
//!
//! Resolution is depth-first and keeps the set of connections on the current
//! path. A lower connection already on that path fails only its own node with
//! `CycleDetected`; siblings keep resolving. `MAX_LOWER_CONNECTION_DEPTH` is a
//! secondary bound for pathological but acyclic chains.
//!
//! A connection shared by several parents is expanded under the first one
//! only. Later occurrences become `Repeated` leaves, so a tree has at most
//! one entry per `lower-connection` reference in the snapshot plus the root.
//! `MAX_TREE_ENTRIES` caps it on top of that.
//!
//! `supported-client-link` references are resolved separately and carried as
//! an annotation on the node. They never become children.

use crate::diagnostics::Diagnostic;
use crate::index::ReferenceIndex;
use crate::primitives::{MAX_LOWER_CONNECTION_DEPTH, MAX_TREE_ENTRIES};
use crate::schema::{FlatConnection, LinkSummary};
use crate::{ConnectionUuid, LinkUuid};
use std::collections::HashSet;

// =============================================================================
// TREE TYPES
// =============================================================================

/// A `supported-client-link` reference after resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientLink {
    Resolved(LinkSummary),
    /// The link is not in the snapshot.
    Dangling(LinkUuid),
}

/// Result of resolving one connection in the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeOutcome {
    Resolved {
        layer_protocol_qualifier: Option<String>,
        /// Resolved `lower-connection` entries, in list order.
        lower: Vec<ConnectionNode>,
        client_links: Vec<ClientLink>,
    },
    /// Expanded earlier in the same tree. Carries no children.
    Repeated { layer_protocol_qualifier: Option<String> },
    /// The connection could not be expanded. The diagnostic says why.
    Failed(Diagnostic),
}

/// One connection in a resolved tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionNode {
    pub connection_uuid: ConnectionUuid,
    pub outcome: NodeOutcome,
}

impl ConnectionNode {
    /// Whether this node resolved.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        matches!(self.outcome, NodeOutcome::Resolved { .. })
    }

    /// Whether this node names a known connection, expanded here or earlier.
    #[must_use]
    pub fn is_known(&self) -> bool {
        !matches!(self.outcome, NodeOutcome::Failed(_))
    }

    /// Lower-connection children (empty for a failed or repeated node).
    #[must_use]
    pub fn children(&self) -> &[ConnectionNode] {
        match &self.outcome {
            NodeOutcome::Resolved { lower, .. } => lower,
            NodeOutcome::Repeated { .. } | NodeOutcome::Failed(_) => &[],
        }
    }

    /// Every diagnostic in the tree, in depth-first pre-order.
    #[must_use]
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        self.collect_diagnostics(&mut out);
        out
    }

    fn collect_diagnostics(&self, out: &mut Vec<Diagnostic>) {
        out.extend(self.own_diagnostics());
        for child in self.children() {
            child.collect_diagnostics(out);
        }
    }

    /// Diagnostics raised by this node alone, children excluded.
    #[must_use]
    pub fn own_diagnostics(&self) -> Vec<Diagnostic> {
        match &self.outcome {
            NodeOutcome::Failed(diagnostic) => vec![diagnostic.clone()],
            NodeOutcome::Repeated { .. } => Vec::new(),
            NodeOutcome::Resolved { client_links, .. } => client_links
                .iter()
                .filter_map(|link| match link {
                    ClientLink::Dangling(link_uuid) => Some(Diagnostic::DanglingLink {
                        connection_uuid: self.connection_uuid.clone(),
                        link_uuid: link_uuid.clone(),
                    }),
                    ClientLink::Resolved(_) => None,
                })
                .collect(),
        }
    }

    /// Tree nodes in depth-first pre-order, aligned with [`Self::flatten`].
    #[must_use]
    pub fn preorder(&self) -> Vec<&ConnectionNode> {
        let mut out = Vec::new();
        self.preorder_into(&mut out);
        out
    }

    fn preorder_into<'a>(&'a self, out: &mut Vec<&'a ConnectionNode>) {
        out.push(self);
        for child in self.children() {
            child.preorder_into(out);
        }
    }

    /// Flatten the tree into depth-first pre-order entries.
    ///
    /// For lower connections `[L1, L2]` where `L1` has `[L3]` the order is
    /// `[root, L1, L3, L2]`. Failed nodes are kept with their error kind.
    /// A connection met again after its first expansion appears once more,
    /// marked `repeated`, without its lower connections.
    #[must_use]
    pub fn flatten(&self) -> Vec<FlatConnection> {
        let mut out = Vec::new();
        self.flatten_into(&self.connection_uuid, None, 0, &mut out);
        out
    }

    fn flatten_into(
        &self,
        top: &ConnectionUuid,
        parent: Option<&ConnectionUuid>,
        depth: usize,
        out: &mut Vec<FlatConnection>,
    ) {
        let mut entry = FlatConnection {
            connection_uuid: self.connection_uuid.clone(),
            depth,
            top_connection_uuid: top.clone(),
            parent_connection_uuid: parent.cloned(),
            layer_protocol_qualifier: None,
            supported_client_links: Vec::new(),
            error: None,
            repeated: false,
        };

        match &self.outcome {
            NodeOutcome::Failed(diagnostic) => {
                entry.error = Some(diagnostic.kind().to_string());
                out.push(entry);
            }
            NodeOutcome::Repeated {
                layer_protocol_qualifier,
            } => {
                entry.layer_protocol_qualifier = layer_protocol_qualifier.clone();
                entry.repeated = true;
                out.push(entry);
            }
            NodeOutcome::Resolved {
                layer_protocol_qualifier,
                lower,
                client_links,
            } => {
                entry.layer_protocol_qualifier = layer_protocol_qualifier.clone();
                entry.supported_client_links = client_links
                    .iter()
                    .filter_map(|link| match link {
                        ClientLink::Resolved(summary) => Some(summary.clone()),
                        ClientLink::Dangling(_) => None,
                    })
                    .collect();
                out.push(entry);
                for child in lower {
                    child.flatten_into(top, Some(&self.connection_uuid), depth + 1, out);
                }
            }
        }
    }
}

// =============================================================================
// RESOLVER
// =============================================================================

/// Resolves connection trees against a reference index.
pub struct ConnectionTreeResolver<'i, 'c> {
    index: &'i ReferenceIndex<'c>,
    entry_limit: usize,
}

/// Traversal state of one `resolve` call.
#[derive(Default)]
struct Walk {
    path: Vec<ConnectionUuid>,
    on_path: HashSet<ConnectionUuid>,
    /// Connections whose lower connections were already expanded.
    expanded: HashSet<ConnectionUuid>,
    entries: usize,
}

impl<'i, 'c> ConnectionTreeResolver<'i, 'c> {
    /// Create a resolver over an index.
    #[must_use]
    pub fn new(index: &'i ReferenceIndex<'c>) -> Self {
        Self {
            index,
            entry_limit: MAX_TREE_ENTRIES,
        }
    }

    /// Cap the number of entries in one tree.
    ///
    /// Entries past the cap fail with `ExpansionLimitExceeded`.
    #[must_use]
    pub fn with_entry_limit(mut self, limit: usize) -> Self {
        self.entry_limit = limit;
        self
    }

    /// Resolve the tree rooted at `root`.
    ///
    /// An unknown root yields a failed node carrying `DanglingConnection`
    /// without a parent. Each connection is expanded at most once per tree.
    pub fn resolve(&self, root: &ConnectionUuid) -> ConnectionNode {
        self.descend(root, None, 0, &mut Walk::default())
    }

    fn descend(
        &self,
        uuid: &ConnectionUuid,
        parent: Option<&ConnectionUuid>,
        depth: usize,
        walk: &mut Walk,
    ) -> ConnectionNode {
        let failed = |diagnostic| ConnectionNode {
            connection_uuid: uuid.clone(),
            outcome: NodeOutcome::Failed(diagnostic),
        };

        walk.entries += 1;
        if walk.entries > self.entry_limit {
            return failed(Diagnostic::ExpansionLimitExceeded {
                connection_uuid: uuid.clone(),
                limit: self.entry_limit,
            });
        }

        if walk.on_path.contains(uuid) {
            let mut cycle = walk.path.clone();
            cycle.push(uuid.clone());
            return failed(Diagnostic::CycleDetected {
                connection_uuid: uuid.clone(),
                path: cycle,
            });
        }

        if depth > MAX_LOWER_CONNECTION_DEPTH {
            return failed(Diagnostic::DepthExceeded {
                connection_uuid: uuid.clone(),
                depth,
            });
        }

        let Some(connection) = self.index.connection(uuid) else {
            return failed(Diagnostic::DanglingConnection {
                parent_connection_uuid: parent.cloned(),
                connection_uuid: uuid.clone(),
            });
        };

        if !walk.expanded.insert(uuid.clone()) {
            return ConnectionNode {
                connection_uuid: uuid.clone(),
                outcome: NodeOutcome::Repeated {
                    layer_protocol_qualifier: connection.layer_protocol_qualifier.clone(),
                },
            };
        }

        let client_links = connection
            .supported_client_link
            .iter()
            .map(|link_ref| match self.index.link(&link_ref.link_uuid) {
                Some(link) => ClientLink::Resolved(LinkSummary {
                    link_uuid: link.uuid.clone(),
                    layer_protocol_qualifier: link.layer_protocol_qualifier.clone(),
                    node_edge_point_uuids: link
                        .node_edge_point
                        .iter()
                        .map(|nep| nep.node_edge_point_uuid.clone())
                        .collect(),
                }),
                None => ClientLink::Dangling(link_ref.link_uuid.clone()),
            })
            .collect();

        walk.path.push(uuid.clone());
        walk.on_path.insert(uuid.clone());

        let lower = connection
            .lower_connection
            .iter()
            .map(|lower_ref| self.descend(&lower_ref.connection_uuid, Some(uuid), depth + 1, walk))
            .collect();

        walk.on_path.remove(uuid);
        walk.path.pop();

        ConnectionNode {
            connection_uuid: uuid.clone(),
            outcome: NodeOutcome::Resolved {
                layer_protocol_qualifier: connection.layer_protocol_qualifier.clone(),
                lower,
                client_links,
            },
        }
    }

    /// Connections that no other connection lists as a lower connection,
    /// in input order.
    pub fn root_connections(&self) -> Vec<ConnectionUuid> {
        let lower: HashSet<&ConnectionUuid> = self
            .index
            .connections()
            .flat_map(|c| c.lower_connection.iter().map(|r| &r.connection_uuid))
            .collect();

        self.index
            .connections()
            .filter(|c| !lower.contains(&c.uuid))
            .map(|c| c.uuid.clone())
            .collect()
    }

    /// Resolve every connection of the snapshot, starting from the roots.
    ///
    /// Connections unreachable from any root (closed cycles) are resolved
    /// as extra trees in input order, so no connection is silently dropped.
    pub fn resolve_all(&self) -> Vec<ConnectionNode> {
        let mut trees: Vec<ConnectionNode> = self
            .root_connections()
            .iter()
            .map(|root| self.resolve(root))
            .collect();

        let mut covered: HashSet<ConnectionUuid> = HashSet::new();
        for tree in &trees {
            covered.extend(tree.preorder().into_iter().map(|n| n.connection_uuid.clone()));
        }

        for connection in self.index.connections() {
            if covered.contains(&connection.uuid) {
                continue;
            }
            let tree = self.resolve(&connection.uuid);
            covered.extend(tree.preorder().into_iter().map(|n| n.connection_uuid.clone()));
            trees.push(tree);
        }

        trees
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::context::TapiContext;

    fn connections(list: serde_json::Value) -> TapiContext {
        TapiContext::from_value(serde_json::json!({
            "tapi-topology:topology-context": {"topology": [{
                "link": [{
                    "uuid": "link-pm",
                    "layer-protocol-qualifier": "PHOTONIC_MEDIA",
                    "node-edge-point": [
                        {"node-edge-point-uuid": "nep-a", "node-uuid": "node-1"},
                        {"node-edge-point-uuid": "nep-b", "node-uuid": "node-2"}
                    ]
                }]
            }]},
            "tapi-connectivity:connectivity-context": {"connection": list}
        }))
        .expect("parse")
    }

    fn lowers(ids: &[&str]) -> serde_json::Value {
        serde_json::Value::Array(
            ids.iter()
                .map(|id| serde_json::json!({"connection-uuid": id}))
                .collect(),
        )
    }

    fn order(tree: &ConnectionNode) -> Vec<String> {
        tree.flatten()
            .into_iter()
            .map(|e| e.connection_uuid.0)
            .collect()
    }

    #[test]
    fn flatten_is_depth_first_preorder() {
        let ctx = connections(serde_json::json!([
            {"uuid": "root", "lower-connection": lowers(&["L1", "L2"])},
            {"uuid": "L1", "lower-connection": lowers(&["L3"])},
            {"uuid": "L2"},
            {"uuid": "L3"}
        ]));
        let index = ReferenceIndex::build(&ctx).expect("build");
        let tree = ConnectionTreeResolver::new(&index).resolve(&ConnectionUuid::from("root"));

        assert_eq!(order(&tree), vec!["root", "L1", "L3", "L2"]);
        let depths: Vec<usize> = tree.flatten().iter().map(|e| e.depth).collect();
        assert_eq!(depths, vec![0, 1, 2, 1]);
        assert!(
            tree.flatten()
                .iter()
                .all(|e| e.top_connection_uuid.as_str() == "root")
        );
        assert!(tree.diagnostics().is_empty());
    }

    #[test]
    fn cycle_fails_only_the_offending_node() {
        let ctx = connections(serde_json::json!([
            {"uuid": "A", "lower-connection": lowers(&["B", "C"])},
            {"uuid": "B", "lower-connection": lowers(&["A"])},
            {"uuid": "C"}
        ]));
        let index = ReferenceIndex::build(&ctx).expect("build");
        let tree = ConnectionTreeResolver::new(&index).resolve(&ConnectionUuid::from("A"));

        assert_eq!(order(&tree), vec!["A", "B", "A", "C"]);
        let flat = tree.flatten();
        assert_eq!(flat[2].error.as_deref(), Some("cycle_detected"));
        assert_eq!(flat[3].error, None);

        match tree.diagnostics().as_slice() {
            [Diagnostic::CycleDetected { connection_uuid, path }] => {
                assert_eq!(connection_uuid.as_str(), "A");
                let path: Vec<&str> = path.iter().map(ConnectionUuid::as_str).collect();
                assert_eq!(path, vec!["A", "B", "A"]);
            }
            other => panic!("expected one cycle, got {:?}", other),
        }
    }

    #[test]
    fn self_reference_is_a_cycle() {
        let ctx = connections(serde_json::json!([
            {"uuid": "A", "lower-connection": lowers(&["A"])}
        ]));
        let index = ReferenceIndex::build(&ctx).expect("build");
        let tree = ConnectionTreeResolver::new(&index).resolve(&ConnectionUuid::from("A"));
        assert!(tree.is_resolved());
        assert!(!tree.children()[0].is_resolved());
    }

    #[test]
    fn dangling_lower_connection_keeps_siblings() {
        let ctx = connections(serde_json::json!([
            {"uuid": "root", "lower-connection": lowers(&["missing", "L2"])},
            {"uuid": "L2"}
        ]));
        let index = ReferenceIndex::build(&ctx).expect("build");
        let tree = ConnectionTreeResolver::new(&index).resolve(&ConnectionUuid::from("root"));

        assert!(!tree.children()[0].is_resolved());
        assert!(tree.children()[1].is_resolved());
        assert_eq!(
            tree.diagnostics(),
            vec![Diagnostic::DanglingConnection {
                parent_connection_uuid: Some(ConnectionUuid::from("root")),
                connection_uuid: ConnectionUuid::from("missing"),
            }]
        );
    }

    #[test]
    fn shared_lower_connection_is_not_a_cycle() {
        let ctx = connections(serde_json::json!([
            {"uuid": "root", "lower-connection": lowers(&["L1", "L2"])},
            {"uuid": "L1", "lower-connection": lowers(&["S"])},
            {"uuid": "L2", "lower-connection": lowers(&["S"])},
            {"uuid": "S"}
        ]));
        let index = ReferenceIndex::build(&ctx).expect("build");
        let tree = ConnectionTreeResolver::new(&index).resolve(&ConnectionUuid::from("root"));
        assert_eq!(order(&tree), vec!["root", "L1", "S", "L2", "S"]);
        let repeated: Vec<bool> = tree.flatten().iter().map(|e| e.repeated).collect();
        assert_eq!(repeated, vec![false, false, false, false, true]);
        assert!(tree.diagnostics().is_empty());
    }

    /// `c{i}` is realized by `a{i}` and `b{i}`, both realized by `c{i+1}`.
    fn diamonds(levels: usize) -> serde_json::Value {
        let mut list = Vec::new();
        for i in 0..levels {
            let (a, b, next) = (format!("a{}", i), format!("b{}", i), format!("c{}", i + 1));
            list.push(serde_json::json!({
                "uuid": format!("c{}", i),
                "lower-connection": lowers(&[a.as_str(), b.as_str()])
            }));
            list.push(serde_json::json!({"uuid": a, "lower-connection": lowers(&[next.as_str()])}));
            list.push(serde_json::json!({"uuid": b, "lower-connection": lowers(&[next.as_str()])}));
        }
        list.push(serde_json::json!({"uuid": format!("c{}", levels)}));
        serde_json::Value::Array(list)
    }

    #[test]
    fn stacked_diamonds_expand_each_connection_once() {
        let levels = 30;
        let ctx = connections(diamonds(levels));
        let index = ReferenceIndex::build(&ctx).expect("build");
        let tree = ConnectionTreeResolver::new(&index).resolve(&ConnectionUuid::from("c0"));

        let flat = tree.flatten();
        // c0 plus, per level, a, b, the first c below and its repeat.
        assert_eq!(flat.len(), 1 + 4 * levels);
        assert_eq!(flat.iter().filter(|e| e.repeated).count(), levels);
        assert_eq!(tree.preorder().len(), flat.len());
        assert!(tree.diagnostics().is_empty());

        let expanded: HashSet<&str> = flat
            .iter()
            .filter(|e| !e.repeated)
            .map(|e| e.connection_uuid.as_str())
            .collect();
        assert_eq!(expanded.len(), 3 * levels + 1);
    }

    #[test]
    fn entry_limit_fails_the_overflow() {
        let ctx = connections(serde_json::json!([
            {"uuid": "root", "lower-connection": lowers(&["L1", "L2", "L3"])},
            {"uuid": "L1"},
            {"uuid": "L2"},
            {"uuid": "L3"}
        ]));
        let index = ReferenceIndex::build(&ctx).expect("build");
        let tree = ConnectionTreeResolver::new(&index)
            .with_entry_limit(3)
            .resolve(&ConnectionUuid::from("root"));

        assert_eq!(order(&tree), vec!["root", "L1", "L2", "L3"]);
        assert!(tree.children()[1].is_resolved());
        assert_eq!(
            tree.diagnostics(),
            vec![Diagnostic::ExpansionLimitExceeded {
                connection_uuid: ConnectionUuid::from("L3"),
                limit: 3,
            }]
        );
    }

    #[test]
    fn depth_bound_stops_long_chains() {
        let chain: Vec<serde_json::Value> = (0..=MAX_LOWER_CONNECTION_DEPTH + 1)
            .map(|i| {
                serde_json::json!({
                    "uuid": format!("c{}", i),
                    "lower-connection": lowers(&[format!("c{}", i + 1).as_str()])
                })
            })
            .collect();
        let ctx = connections(serde_json::Value::Array(chain));
        let index = ReferenceIndex::build(&ctx).expect("build");
        let tree = ConnectionTreeResolver::new(&index).resolve(&ConnectionUuid::from("c0"));

        let diagnostics = tree.diagnostics();
        assert!(matches!(
            diagnostics.as_slice(),
            [Diagnostic::DepthExceeded { depth, .. }] if *depth == MAX_LOWER_CONNECTION_DEPTH + 1
        ));
    }

    #[test]
    fn client_links_are_annotations_not_children() {
        let ctx = connections(serde_json::json!([
            {"uuid": "root",
             "supported-client-link": [{"link-uuid": "link-pm"}, {"link-uuid": "link-gone"}],
             "lower-connection": lowers(&["L1"])},
            {"uuid": "L1"}
        ]));
        let index = ReferenceIndex::build(&ctx).expect("build");
        let tree = ConnectionTreeResolver::new(&index).resolve(&ConnectionUuid::from("root"));

        assert_eq!(tree.children().len(), 1);
        let flat = tree.flatten();
        assert_eq!(flat[0].supported_client_links.len(), 1);
        let link = &flat[0].supported_client_links[0];
        assert_eq!(link.link_uuid.as_str(), "link-pm");
        assert_eq!(link.layer_protocol_qualifier.as_deref(), Some("PHOTONIC_MEDIA"));
        assert_eq!(link.node_edge_point_uuids.len(), 2);
        assert_eq!(
            tree.diagnostics(),
            vec![Diagnostic::DanglingLink {
                connection_uuid: ConnectionUuid::from("root"),
                link_uuid: LinkUuid::from("link-gone"),
            }]
        );
    }

    #[test]
    fn roots_exclude_lower_connections() {
        let ctx = connections(serde_json::json!([
            {"uuid": "L1"},
            {"uuid": "top", "lower-connection": lowers(&["L1"])},
            {"uuid": "solo"}
        ]));
        let index = ReferenceIndex::build(&ctx).expect("build");
        let resolver = ConnectionTreeResolver::new(&index);
        let roots: Vec<String> = resolver
            .root_connections()
            .into_iter()
            .map(|c| c.0)
            .collect();
        assert_eq!(roots, vec!["top", "solo"]);
    }

    #[test]
    fn closed_cycles_still_surface() {
        let ctx = connections(serde_json::json!([
            {"uuid": "A", "lower-connection": lowers(&["B"])},
            {"uuid": "B", "lower-connection": lowers(&["A"])},
            {"uuid": "free"}
        ]));
        let index = ReferenceIndex::build(&ctx).expect("build");
        let trees = ConnectionTreeResolver::new(&index).resolve_all();

        let tops: Vec<&str> = trees.iter().map(|t| t.connection_uuid.as_str()).collect();
        assert_eq!(tops, vec!["free", "A"]);
        assert!(matches!(
            trees[1].diagnostics().as_slice(),
            [Diagnostic::CycleDetected { .. }]
        ));
    }
}

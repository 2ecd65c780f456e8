//! Dependency Index
//!
//! Derives forward and backward adjacency between nodes from the graph's
//! current link set. The index is rebuilt wholesale whenever the graph is
//! structurally dirty - it is never patched incrementally, and never
//! outlives one structural version.
//!
//! # Edges
//!
//! Each active link (visible and valid, both endpoints present) contributes
//! one edge: the consumer depends on the producer. Named virtual links
//! contribute the same kind of edge, resolved through the graph's name
//! index instead of a wire.
//!
//! # Degrade-open
//!
//! If any named virtual link fails to resolve, the index for the *whole
//! graph* degrades to empty and a warning is emitted. Schedules derived
//! from an empty index are effectively unordered, but unrelated updates
//! keep flowing - one dangling reference must not freeze the editor.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::StructuralError;

use super::model::Graph;
use super::node::NodeId;

/// Which way edges are followed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Toward what a node depends on.
    Upstream,
    /// Toward what a node feeds into.
    Downstream,
}

/// Node → neighbor-set adjacency, insertion-ordered for reproducibility.
pub type AdjacencyMap = IndexMap<NodeId, IndexSet<NodeId>>;

/// Forward and backward dependency maps for one graph.
#[derive(Debug, Clone, Default)]
pub struct DependencyIndex {
    depends_on: AdjacencyMap,
    feeds_into: AdjacencyMap,
}

impl DependencyIndex {
    /// Build the index from the graph's current nodes and links.
    ///
    /// Returns the index plus the structural error, if any, that caused it
    /// to degrade. A degraded index is empty, not absent: callers keep
    /// working against it and simply see no ordering constraints.
    pub fn build(graph: &Graph) -> (Self, Option<StructuralError>) {
        // Producer → consumer pairs, in link creation order.
        let mut edges: Vec<(NodeId, NodeId)> = Vec::new();

        for link in graph.links() {
            if !link.is_active() {
                continue;
            }
            if !graph.contains(link.from_node) || !graph.contains(link.to_node) {
                continue;
            }
            edges.push((link.from_node, link.to_node));
        }

        for consumer in graph.node_ids() {
            let Some(name) = graph.virtual_input(consumer) else {
                continue;
            };
            match graph.lookup(name) {
                Some(producer) => edges.push((producer, consumer)),
                None => {
                    warn!(
                        graph = ?graph.id(),
                        node = ?consumer,
                        producer = %name,
                        "unresolved virtual link; dependency index degraded to empty"
                    );
                    let error = StructuralError::UnresolvedVirtualLink {
                        node: consumer,
                        name: name.to_string(),
                    };
                    return (Self::default(), Some(error));
                }
            }
        }

        let index = Self {
            depends_on: adjacency(&edges, Direction::Upstream),
            feeds_into: adjacency(&edges, Direction::Downstream),
        };
        debug!(
            graph = ?graph.id(),
            edges = edges.len(),
            nodes = index.depends_on.len(),
            "dependency index built"
        );
        (index, None)
    }

    /// The adjacency map whose edges point the given way.
    pub fn map(&self, direction: Direction) -> &AdjacencyMap {
        match direction {
            Direction::Upstream => &self.depends_on,
            Direction::Downstream => &self.feeds_into,
        }
    }

    /// Nodes `node` depends on, in edge insertion order.
    pub fn depends_on(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.depends_on.get(&node).into_iter().flatten().copied()
    }

    /// Nodes `node` feeds into, in edge insertion order.
    pub fn feeds_into(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.feeds_into.get(&node).into_iter().flatten().copied()
    }

    /// Neighbors of `node` ignoring direction (dependencies, then dependents).
    pub fn neighbors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.depends_on(node).chain(self.feeds_into(node))
    }

    /// Every node that participates in at least one edge.
    ///
    /// Both maps key every edge endpoint, so either map's key set works;
    /// isolated nodes never appear here.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.depends_on.keys().copied()
    }

    /// Whether the index holds no edges at all.
    pub fn is_empty(&self) -> bool {
        self.depends_on.is_empty()
    }
}

/// Build one adjacency map from the shared edge list.
///
/// Both directions come from the same builder so the key insertion order -
/// and therefore every derived iteration order - is identical across maps.
fn adjacency(edges: &[(NodeId, NodeId)], direction: Direction) -> AdjacencyMap {
    let mut map = AdjacencyMap::new();
    for &(producer, consumer) in edges {
        // Key both endpoints so lookups are uniform even for pure sources
        // and pure sinks.
        map.entry(producer).or_default();
        map.entry(consumer).or_default();
        match direction {
            Direction::Upstream => {
                map[&consumer].insert(producer);
            }
            Direction::Downstream => {
                map[&producer].insert(consumer);
            }
        }
    }
    map
}

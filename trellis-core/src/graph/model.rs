//! Graph Model
//!
//! The editor owns and mutates the graph - placing nodes, wiring links,
//! flipping link flags. The scheduler only reads topology, and invokes
//! `process()` through [`Graph::process_node`] during runs.
//!
//! # Identity
//!
//! Every node carries a name that is stable and unique within its graph.
//! Names are what users see, and what named virtual links resolve against.
//! Internally the engine addresses nodes by [`NodeId`], which stays valid
//! across renames.
//!
//! # Structural changes
//!
//! The graph does not notify anyone when it changes. The editor is expected
//! to call [`Engine::rebuild`](crate::Engine::rebuild) after any edit that
//! touches the node or link set, which is when cached schedules are
//! replaced wholesale.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::ProcessError;

use super::link::Link;
use super::node::{NodeAnnotation, NodeId, Processable};

/// Unique identifier for an open graph (one per node tree in the editor).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphId(u64);

impl GraphId {
    /// Generate a new unique graph ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for GraphId {
    fn default() -> Self {
        Self::new()
    }
}

/// One node's slot in the graph: identity, behavior, and editor state.
struct NodeEntry {
    name: String,
    behavior: Box<dyn Processable>,
    /// Named virtual link: the name of a producer this node reads without a
    /// physical wire. Resolved against the graph's name index at
    /// dependency-index build time.
    virtual_input: Option<String>,
    annotation: NodeAnnotation,
}

/// An editor-owned dataflow graph: nodes, a name index, and links.
///
/// Node iteration follows insertion order everywhere, which is what makes
/// the derived schedules reproducible across runs.
pub struct Graph {
    id: GraphId,
    nodes: IndexMap<NodeId, NodeEntry>,
    names: IndexMap<String, NodeId>,
    links: Vec<Link>,
}

impl Graph {
    /// Create a new empty graph with a fresh identity.
    pub fn new() -> Self {
        Self {
            id: GraphId::new(),
            nodes: IndexMap::new(),
            names: IndexMap::new(),
            links: Vec::new(),
        }
    }

    /// This graph's identity.
    pub fn id(&self) -> GraphId {
        self.id
    }

    /// Add a node and return its ID.
    ///
    /// Names must be unique within a graph; adding a node under an existing
    /// name rebinds that name to the new node.
    pub fn add_node(&mut self, name: impl Into<String>, behavior: Box<dyn Processable>) -> NodeId {
        let id = NodeId::new();
        let name = name.into();
        self.names.insert(name.clone(), id);
        self.nodes.insert(
            id,
            NodeEntry {
                name,
                behavior,
                virtual_input: None,
                annotation: NodeAnnotation::default(),
            },
        );
        id
    }

    /// Remove a node along with its name binding and every link touching it.
    pub fn remove_node(&mut self, node: NodeId) {
        if let Some(entry) = self.nodes.shift_remove(&node) {
            // Only unbind the name if it still points at this node.
            if self.names.get(&entry.name) == Some(&node) {
                self.names.shift_remove(&entry.name);
            }
            self.links
                .retain(|link| link.from_node != node && link.to_node != node);
        }
    }

    /// Declare that `node` reads from the producer named `producer` without
    /// a physical wire.
    pub fn set_virtual_input(&mut self, node: NodeId, producer: impl Into<String>) {
        if let Some(entry) = self.nodes.get_mut(&node) {
            entry.virtual_input = Some(producer.into());
        }
    }

    /// Remove a node's named virtual link, if any.
    pub fn clear_virtual_input(&mut self, node: NodeId) {
        if let Some(entry) = self.nodes.get_mut(&node) {
            entry.virtual_input = None;
        }
    }

    /// Add a link. Endpoint validity is the editor's concern; links whose
    /// endpoints are missing are simply ignored during dependency derivation.
    pub fn add_link(&mut self, link: Link) {
        self.links.push(link);
    }

    /// Remove every link between the given sockets.
    pub fn remove_link(&mut self, from: NodeId, from_socket: usize, to: NodeId, to_socket: usize) {
        self.links.retain(|link| {
            !(link.from_node == from
                && link.from_socket == from_socket
                && link.to_node == to
                && link.to_socket == to_socket)
        });
    }

    /// All links, in creation order.
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Mutable link access, for flag edits (`hidden`/`valid`).
    pub fn links_mut(&mut self) -> &mut [Link] {
        &mut self.links
    }

    /// Whether `node` exists in this graph.
    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    /// Resolve a node name to its ID.
    pub fn lookup(&self, name: &str) -> Option<NodeId> {
        self.names.get(name).copied()
    }

    /// The name of a node.
    pub fn name_of(&self, node: NodeId) -> Option<&str> {
        self.nodes.get(&node).map(|entry| entry.name.as_str())
    }

    /// A node's named virtual link target, if declared.
    pub fn virtual_input(&self, node: NodeId) -> Option<&str> {
        self.nodes
            .get(&node)
            .and_then(|entry| entry.virtual_input.as_deref())
    }

    /// All node IDs, in insertion order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// A node's annotation state.
    pub fn annotation(&self, node: NodeId) -> Option<&NodeAnnotation> {
        self.nodes.get(&node).map(|entry| &entry.annotation)
    }

    /// Mutable annotation access (scheduler and editor both write here).
    pub fn annotation_mut(&mut self, node: NodeId) -> Option<&mut NodeAnnotation> {
        self.nodes.get_mut(&node).map(|entry| &mut entry.annotation)
    }

    /// Invoke a node's `process()` body.
    ///
    /// Update lists never outlive the structural version they were built
    /// for, so a missing node here means the caller ran a stale list.
    pub fn process_node(&mut self, node: NodeId) -> Result<(), ProcessError> {
        match self.nodes.get_mut(&node) {
            Some(entry) => entry.behavior.process(),
            None => Err(ProcessError::Failed(format!(
                "node {node:?} no longer exists"
            ))),
        }
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("id", &self.id)
            .field("nodes", &self.nodes.len())
            .field("links", &self.links.len())
            .finish()
    }
}

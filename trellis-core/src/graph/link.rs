//! Links
//!
//! A link wires one node's output socket to another node's input socket.
//! The editor owns the flags: hidden links are collapsed in the UI and
//! invalid links failed socket validation - neither contributes a
//! dependency edge.

use serde::{Deserialize, Serialize};

use super::node::NodeId;

/// A directed connection between two node sockets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Producing node.
    pub from_node: NodeId,
    /// Output socket index on the producing node.
    pub from_socket: usize,
    /// Consuming node.
    pub to_node: NodeId,
    /// Input socket index on the consuming node.
    pub to_socket: usize,
    /// Collapsed in the editor; excluded from dependency derivation.
    pub hidden: bool,
    /// Cleared by the editor on socket mismatch; invalid links are excluded
    /// from dependency derivation.
    pub valid: bool,
}

impl Link {
    /// Create a visible, valid link between two sockets.
    pub fn new(from_node: NodeId, from_socket: usize, to_node: NodeId, to_socket: usize) -> Self {
        Self {
            from_node,
            from_socket,
            to_node,
            to_socket,
            hidden: false,
            valid: true,
        }
    }

    /// Whether this link contributes a dependency edge.
    pub fn is_active(&self) -> bool {
        !self.hidden && self.valid
    }
}

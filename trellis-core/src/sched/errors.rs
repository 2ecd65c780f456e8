//! Error State Tracking
//!
//! When a node fails, the engine replaces its annotation with an error
//! badge. The tracker's job is to remember what the annotation looked like
//! *before* the failure so it can be restored - on the node's next
//! successful run, or when the user clears errors for the whole graph.
//!
//! The snapshot is taken exactly once per flagged node: a node that fails
//! run after run keeps its original pre-error state, not a snapshot of the
//! previous error badge.

use indexmap::map::Entry;
use indexmap::IndexMap;

use crate::error::{ErrorKind, ProcessError};
use crate::graph::{Graph, NodeAnnotation, NodeId, NodeStatus};

/// A recorded failure for one node.
#[derive(Debug, Clone)]
pub struct ErrorRecord {
    /// Visual classification of the most recent failure.
    pub kind: ErrorKind,
    /// Message of the most recent failure.
    pub message: String,
    /// Annotation state before the first failure.
    previous: NodeAnnotation,
}

/// Tracks failed nodes and the annotation state to restore on recovery.
#[derive(Debug, Default)]
pub struct ErrorStateTracker {
    records: IndexMap<NodeId, ErrorRecord>,
}

impl ErrorStateTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure and badge the node.
    ///
    /// The pre-error annotation is snapshotted only on the node's first
    /// failure; repeated failures refresh the kind and message.
    pub fn record(&mut self, graph: &mut Graph, node: NodeId, error: &ProcessError) {
        let kind = error.kind();
        let message = error.to_string();

        match self.records.entry(node) {
            Entry::Occupied(mut occupied) => {
                let record = occupied.get_mut();
                record.kind = kind;
                record.message = message.clone();
            }
            Entry::Vacant(vacant) => {
                let previous = graph.annotation(node).cloned().unwrap_or_default();
                vacant.insert(ErrorRecord {
                    kind,
                    message: message.clone(),
                    previous,
                });
            }
        }

        if let Some(annotation) = graph.annotation_mut(node) {
            annotation.status = NodeStatus::Error(kind);
            annotation.message = Some(message);
        }
    }

    /// Restore a node's pre-error annotation after it processed successfully.
    ///
    /// Does nothing for nodes that were never flagged.
    pub fn clear(&mut self, graph: &mut Graph, node: NodeId) {
        if let Some(record) = self.records.shift_remove(&node) {
            if let Some(annotation) = graph.annotation_mut(node) {
                *annotation = record.previous;
            }
        }
    }

    /// Restore every snapshotted node and drop all records.
    ///
    /// Called when the user explicitly clears errors, or when a graph's
    /// scheduler state is discarded outright.
    pub fn reset(&mut self, graph: &mut Graph) {
        for (node, record) in std::mem::take(&mut self.records) {
            if let Some(annotation) = graph.annotation_mut(node) {
                *annotation = record.previous;
            }
        }
    }

    /// The record for a node, if it is currently flagged.
    pub fn record_for(&self, node: NodeId) -> Option<&ErrorRecord> {
        self.records.get(&node)
    }

    /// Whether a node is currently flagged.
    pub fn is_flagged(&self, node: NodeId) -> bool {
        self.records.contains_key(&node)
    }

    /// Flagged nodes with their error kinds, in flagging order.
    pub fn flagged(&self) -> impl Iterator<Item = (NodeId, ErrorKind)> + '_ {
        self.records.iter().map(|(&node, record)| (node, record.kind))
    }

    /// Number of flagged nodes.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing is flagged.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

//! Graph Nodes
//!
//! This module defines node identity and the capability every node kind
//! exposes to the scheduler.
//!
//! The engine never looks inside a node's computation. It sees three things:
//! a stable identity, a `process()` capability, and an annotation slot the
//! editor renders (status badge, message, last measured duration).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, ProcessError};

/// Unique identifier for a node in a dataflow graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(u64);

impl NodeId {
    /// Generate a new unique node ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<u64> for NodeId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// The capability a node kind implements to participate in updates.
///
/// The engine owns ordering, timing, and failure isolation; the node owns
/// its computation. Bodies read their input sockets and write their output
/// sockets, so two nodes of the same graph must never run concurrently -
/// the schedule is the only synchronization mechanism.
pub trait Processable: Send {
    /// Run the node's computation against its current socket values.
    fn process(&mut self) -> Result<(), ProcessError>;
}

/// Visual status the editor renders on a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeStatus {
    /// Nothing to report.
    Normal,
    /// Degraded but usable (e.g. the node sits in an unscheduled component).
    Warning,
    /// The node's last `process()` failed.
    Error(ErrorKind),
}

/// Editor-facing annotation state for one node.
///
/// The scheduler writes this (error badges, timings); the editor reads it.
/// The error tracker snapshots and restores whole annotations around
/// failures, so everything the editor displays lives here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeAnnotation {
    /// Current status badge.
    pub status: NodeStatus,
    /// Human-readable detail for the current status, if any.
    pub message: Option<String>,
    /// Duration of the node's last successful `process()`.
    pub last_duration: Option<Duration>,
}

impl Default for NodeAnnotation {
    fn default() -> Self {
        Self {
            status: NodeStatus::Normal,
            message: None,
            last_duration: None,
        }
    }
}

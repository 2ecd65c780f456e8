//! Error Types
//!
//! The engine distinguishes two failure families:
//!
//! - Structural errors: the graph itself is defective (a dependency cycle,
//!   or a named virtual link that resolves to nothing). The affected
//!   schedule degrades to empty and a warning surfaces; unrelated
//!   components keep updating.
//!
//! - Processing errors: a node's `process()` body failed. The current
//!   update list halts at that node; other lists are unaffected.
//!
//! Neither family propagates past a single `run_*` call. Callers only ever
//! observe "completed", "stopped early at node X, kind K", or "cancelled".

use serde::{Deserialize, Serialize};

use crate::graph::NodeId;

/// Classification of a node processing failure.
///
/// The two kinds share control flow (fail-fast within the current run) and
/// differ only in how the editor renders the failed node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// An upstream value the node needs was never produced.
    NoData,
    /// Any other failure inside the node's computation.
    Generic,
}

/// A failure raised by a node's [`process()`](crate::graph::Processable::process) body.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProcessError {
    /// An upstream socket held no data when the node tried to read it.
    #[error("no data on upstream socket: {0}")]
    NoData(String),

    /// The node's computation failed for any other reason.
    #[error("{0}")]
    Failed(String),
}

impl ProcessError {
    /// The visual classification of this failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoData(_) => ErrorKind::NoData,
            Self::Failed(_) => ErrorKind::Generic,
        }
    }
}

/// A defect in the graph's structure, detected while (re)building schedules.
///
/// Structural errors never abort a rebuild: the defective component or graph
/// degrades to an empty schedule and everything else proceeds.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StructuralError {
    /// A dependency cycle. `members` is the resolution path that exposed it.
    #[error("dependency cycle among {} nodes", .members.len())]
    Cycle {
        /// Nodes on the resolution stack when the cycle was declared.
        members: Vec<NodeId>,
    },

    /// A node's named virtual link references a producer that does not exist.
    #[error("node {node:?} references unknown producer \"{name}\"")]
    UnresolvedVirtualLink {
        /// The consumer carrying the dangling reference.
        node: NodeId,
        /// The producer name that failed to resolve.
        name: String,
    },
}

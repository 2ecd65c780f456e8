//! Trellis Core
//!
//! This crate is the incremental recomputation engine behind the Trellis
//! node editor. Users wire processing nodes into a directed graph; when the
//! topology or a single node's state changes, only the affected subset is
//! re-executed, in dependency order, with per-node failure isolation.
//!
//! # Architecture
//!
//! The crate is organized into three layers:
//!
//! - `graph`: the editor-owned graph model and the pure algorithms -
//!   dependency index, component partitioning, topological ordering,
//!   closure selection
//! - `sched`: per-graph state - the schedule cache with its structural
//!   version, update-list execution, and error state tracking
//! - `engine`: the trigger surface the editor calls
//!
//! # Control Flow
//!
//! A structural edit triggers `rebuild`: dependency index → component
//! partition → one topological schedule per component, stored in the cache
//! while every memoized per-node closure is dropped. A single-node trigger
//! fetches (or computes and memoizes) that node's closure schedule and
//! executes it. A full-tree trigger executes each cached component
//! schedule in turn.
//!
//! Failures stay contained: a cycle or dangling virtual link degrades the
//! affected schedule to empty with a warning, and a node failure halts only
//! the list it appeared in. Nothing propagates past a single `run_*` call.
//!
//! # Example
//!
//! ```rust,ignore
//! use trellis_core::{Engine, Graph, Link, RunOutcome};
//!
//! let engine = Engine::new();
//! let mut graph = Graph::new();
//! let source = graph.add_node("source", Box::new(LoadMesh::default()));
//! let smooth = graph.add_node("smooth", Box::new(Smooth::default()));
//! graph.add_link(Link::new(source, 0, smooth, 0));
//!
//! engine.rebuild(&graph);
//!
//! // The user tweaked a parameter on `source`:
//! match engine.run_from_node(&mut graph, source) {
//!     RunOutcome::Completed { trace } => render_timings(&trace),
//!     RunOutcome::Stopped { node, kind, .. } => badge(node, kind),
//!     RunOutcome::Cancelled { .. } => {}
//! }
//! ```

pub mod error;
pub mod graph;
pub mod sched;

mod engine;

pub use engine::Engine;
pub use error::{ErrorKind, ProcessError, StructuralError};
pub use graph::{
    Direction, Graph, GraphId, Link, NodeAnnotation, NodeId, NodeStatus, Processable, UpdateList,
};
pub use sched::{CancelToken, RunOutcome, RunReport, TraceEntry};

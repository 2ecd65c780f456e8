//! Dataflow Graph
//!
//! This module holds the editor-owned graph model and the pure algorithms
//! the scheduler derives schedules from.
//!
//! # Overview
//!
//! The graph is a directed graph of processing nodes:
//!
//! - Nodes expose a `process()` capability and carry editor annotations
//! - Links wire output sockets to input sockets; the consumer depends on
//!   the producer
//!
//! From the link set we derive, in order: a dependency index (both
//! adjacency directions), a partition into weakly-connected components,
//! and per-component topological schedules. Seed-based closures select the
//! subset affected by a single change.
//!
//! # Design Decisions
//!
//! 1. The algorithms here are pure functions over the index - all caching
//!    and invalidation lives in the scheduling layer, so one structural
//!    version never leaks into the next.
//!
//! 2. Every collection that feeds schedule output is insertion-ordered
//!    (`IndexMap`/`IndexSet`), making schedules reproducible across runs
//!    and platforms rather than subject to hash-iteration order.
//!
//! 3. Both adjacency directions are materialized, so downstream and
//!    upstream walks are equally cheap.

pub mod closure;
pub mod components;
pub mod deps;
pub mod topo;

mod link;
mod model;
mod node;

pub use deps::{AdjacencyMap, DependencyIndex, Direction};
pub use link::Link;
pub use model::{Graph, GraphId};
pub use node::{NodeAnnotation, NodeId, NodeStatus, Processable};
pub use topo::UpdateList;

//! Subgraph Selection
//!
//! Computes the transitive closure of a seed node set in one direction -
//! everything a change affects (downstream), or everything a preview needs
//! (upstream) - then hands the closed set to the topological scheduler.

use std::collections::VecDeque;

use indexmap::IndexSet;

use crate::error::StructuralError;

use super::deps::{DependencyIndex, Direction};
use super::node::NodeId;
use super::topo::{self, UpdateList};

/// Transitive closure of `seeds` following `direction`.
///
/// Seeds are always included - a closure is never empty unless the seed set
/// is. Downstream closures walk feeds-into edges; upstream closures walk
/// depends-on edges. Visit order is breadth-first from the seeds, which
/// keeps the derived schedules reproducible.
pub fn closure(
    index: &DependencyIndex,
    seeds: impl IntoIterator<Item = NodeId>,
    direction: Direction,
) -> IndexSet<NodeId> {
    let mut closed: IndexSet<NodeId> = IndexSet::new();
    let mut queue: VecDeque<NodeId> = seeds.into_iter().collect();

    while let Some(node) = queue.pop_front() {
        if !closed.insert(node) {
            continue;
        }
        for next in index.map(direction).get(&node).into_iter().flatten() {
            if !closed.contains(next) {
                queue.push_back(*next);
            }
        }
    }

    closed
}

/// Close over `seeds`, then order the closed set for execution.
///
/// Ordering always uses the depends-on map regardless of which direction
/// the closure walked: an upstream preview still runs sources first.
pub fn schedule(
    index: &DependencyIndex,
    seeds: impl IntoIterator<Item = NodeId>,
    direction: Direction,
) -> Result<UpdateList, StructuralError> {
    let closed = closure(index, seeds, direction);
    topo::order(&closed, index.map(Direction::Upstream))
}

//! Component Partitioning
//!
//! Splits the dependency index's node set into weakly-connected subgraphs:
//! maximal sets of nodes connected when link direction is ignored. Each
//! component gets its own schedule, so a defect in one (a cycle, say) never
//! blocks updates in another.
//!
//! Only nodes that participate in at least one edge are partitioned -
//! the index never contains isolated nodes, so a full-tree run never
//! executes them. This mirrors the editor's long-standing behavior: a node
//! with no wires has no observable effect on anything downstream.

use std::collections::VecDeque;

use indexmap::IndexSet;

use super::deps::DependencyIndex;
use super::node::NodeId;

/// Partition the index's node set into weakly-connected components.
///
/// Seeds are picked in index insertion order and each component is grown by
/// breadth-first search over the union of forward and backward edges, so
/// the result is deterministic for a given graph.
pub fn partition(index: &DependencyIndex) -> Vec<IndexSet<NodeId>> {
    let mut visited: IndexSet<NodeId> = IndexSet::new();
    let mut components = Vec::new();

    for seed in index.nodes() {
        if visited.contains(&seed) {
            continue;
        }

        let mut component: IndexSet<NodeId> = IndexSet::new();
        let mut queue: VecDeque<NodeId> = VecDeque::new();
        queue.push_back(seed);

        while let Some(node) = queue.pop_front() {
            if !component.insert(node) {
                continue;
            }
            visited.insert(node);
            for neighbor in index.neighbors(node) {
                if !component.contains(&neighbor) {
                    queue.push_back(neighbor);
                }
            }
        }

        components.push(component);
    }

    components
}

//! Topological Scheduling
//!
//! Orders a node subset so that every node appears after everything it
//! depends on. This is the ordering every update run walks.
//!
//! # Algorithm
//!
//! Explicit-stack depth-first resolution:
//!
//! 1. Take the next unplaced subset member (insertion order) as the stack
//!    base.
//! 2. Look at the stack top's first unplaced in-subset dependency. If one
//!    exists, push it and repeat from the top.
//! 3. If none exists, the top's dependencies are all placed: pop it and
//!    append it to the schedule.
//!
//! Dependencies that leave the subset are ignored - a partial schedule only
//! orders the nodes it will actually run.
//!
//! # Cycle detection
//!
//! A resolution stack can never legitimately hold more nodes than the
//! subset contains; growing past that bound means some node was pushed
//! twice, which only happens on a cycle. The check doubles as the
//! visited-node cap that bounds worst-case time on pathological graphs.
//! A cyclic subset yields a structural error and no schedule - never a
//! partial ordering.
//!
//! # Determinism
//!
//! Ties between resolvable nodes are broken by insertion order (subset
//! order for stack bases, edge order for dependencies), so the same graph
//! always produces the same schedule, on every platform.

use indexmap::IndexSet;
use smallvec::SmallVec;
use tracing::warn;

use crate::error::StructuralError;

use super::deps::AdjacencyMap;
use super::node::NodeId;

/// An ordered schedule: each member of its source node set exactly once,
/// dependencies before dependents.
pub type UpdateList = Vec<NodeId>;

/// Order `subset` against `depends_on`, which need not be restricted to the
/// subset.
///
/// On a cycle the whole subset is declared unschedulable: the error carries
/// the resolution path that exposed it, and the caller substitutes an empty
/// list for this subset without touching any other.
pub fn order(
    subset: &IndexSet<NodeId>,
    depends_on: &AdjacencyMap,
) -> Result<UpdateList, StructuralError> {
    let mut placed: IndexSet<NodeId> = IndexSet::with_capacity(subset.len());
    let mut list: UpdateList = Vec::with_capacity(subset.len());

    for &start in subset {
        if placed.contains(&start) {
            continue;
        }

        let mut stack: SmallVec<[NodeId; 8]> = SmallVec::new();
        stack.push(start);

        while let Some(&top) = stack.last() {
            // First unplaced dependency that stays inside the subset.
            let pending = depends_on
                .get(&top)
                .into_iter()
                .flatten()
                .copied()
                .find(|dep| subset.contains(dep) && !placed.contains(dep));

            match pending {
                Some(dep) => {
                    if stack.len() >= subset.len() {
                        warn!(
                            depth = stack.len(),
                            subset = subset.len(),
                            "dependency cycle detected; subset left unscheduled"
                        );
                        return Err(StructuralError::Cycle {
                            members: stack.to_vec(),
                        });
                    }
                    stack.push(dep);
                }
                None => {
                    stack.pop();
                    if placed.insert(top) {
                        list.push(top);
                    }
                }
            }
        }
    }

    Ok(list)
}

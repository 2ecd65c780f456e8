//! Update Cache
//!
//! Single owner of one graph's schedules: the full per-component update
//! lists and the memoized per-node closure schedules. Nothing else in the
//! engine holds a schedule across calls.
//!
//! # Invalidation
//!
//! Invalidation is coarse: any structural edit rebuilds everything and
//! drops every partial entry, whichever node it belonged to. Simple and
//! safe, at the cost of discarding entries that would still be valid.
//!
//! # Versioning
//!
//! Every rebuild bumps a structural version; each partial entry carries the
//! version it was computed under. A read against a stale version recomputes
//! rather than serving the old schedule - the wholesale clear already
//! guarantees that today, and the tag keeps it guaranteed if the clearing
//! strategy ever gets finer-grained.

use indexmap::IndexMap;
use tracing::debug;

use crate::error::StructuralError;
use crate::graph::{closure, components, topo, DependencyIndex, Direction, Graph, NodeId, UpdateList};

/// A memoized closure schedule, tagged with the version it was built under.
#[derive(Debug, Clone)]
struct PartialEntry {
    version: u64,
    list: UpdateList,
}

/// Per-graph schedule owner.
#[derive(Debug, Default)]
pub struct UpdateCache {
    /// Structural version counter; zero means "never built".
    version: u64,
    index: DependencyIndex,
    /// One schedule per weakly-connected component (empty if cyclic).
    full: Vec<UpdateList>,
    /// Memoized closure schedules, keyed by seed node and direction.
    partial: IndexMap<(NodeId, Direction), PartialEntry>,
    /// Structural errors reported by the last rebuild and by cyclic closure
    /// requests since.
    errors: Vec<StructuralError>,
}

impl UpdateCache {
    /// Create an empty, never-built cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current structural version (zero until the first rebuild).
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Whether the cache has been built at least once.
    pub fn is_built(&self) -> bool {
        self.version > 0
    }

    /// The dependency index of the current structural version.
    pub fn index(&self) -> &DependencyIndex {
        &self.index
    }

    /// Recompute everything for the graph's current structure.
    ///
    /// Bumps the version, rebuilds the dependency index, re-partitions,
    /// re-orders every component, and drops all partial entries.
    pub fn rebuild(&mut self, graph: &Graph) {
        self.version += 1;
        self.partial.clear();
        self.errors.clear();
        self.full.clear();

        let (index, degraded) = DependencyIndex::build(graph);
        self.index = index;
        if let Some(error) = degraded {
            self.errors.push(error);
        }

        for component in components::partition(&self.index) {
            match topo::order(&component, self.index.map(Direction::Upstream)) {
                Ok(list) => self.full.push(list),
                Err(error) => {
                    // The cyclic component degrades to an empty schedule;
                    // the other components are unaffected.
                    self.errors.push(error);
                    self.full.push(UpdateList::new());
                }
            }
        }

        debug!(
            graph = ?graph.id(),
            version = self.version,
            components = self.full.len(),
            errors = self.errors.len(),
            "schedules rebuilt"
        );
    }

    /// The full schedule: one update list per component.
    pub fn full_schedules(&self) -> &[UpdateList] {
        &self.full
    }

    /// Structural errors collected since the last rebuild.
    pub fn structural_errors(&self) -> &[StructuralError] {
        &self.errors
    }

    /// Number of memoized closure schedules.
    pub fn cached_closure_count(&self) -> usize {
        self.partial.len()
    }

    /// Memoized closure schedule for one seed node.
    ///
    /// Computed and stored on miss (or on a stale version tag); served from
    /// the cache otherwise. A cyclic closure is recorded as a structural
    /// error and cached as an empty list so it is not re-derived per call.
    pub fn closure_schedule(&mut self, node: NodeId, direction: Direction) -> &UpdateList {
        let key = (node, direction);
        let stale = match self.partial.get(&key) {
            Some(entry) => entry.version != self.version,
            None => true,
        };

        if stale {
            let list = self.compute_schedule([node], direction);
            self.partial.insert(
                key,
                PartialEntry {
                    version: self.version,
                    list,
                },
            );
        }

        &self.partial[&key].list
    }

    /// Uncached closure schedule for an arbitrary seed set.
    ///
    /// Set triggers are not memoized - the partial cache is strictly
    /// per-node, as in the editor's original update path.
    pub fn seed_schedule(&mut self, seeds: &[NodeId], direction: Direction) -> UpdateList {
        self.compute_schedule(seeds.iter().copied(), direction)
    }

    fn compute_schedule(
        &mut self,
        seeds: impl IntoIterator<Item = NodeId>,
        direction: Direction,
    ) -> UpdateList {
        match closure::schedule(&self.index, seeds, direction) {
            Ok(list) => list,
            Err(error) => {
                self.errors.push(error);
                UpdateList::new()
            }
        }
    }
}

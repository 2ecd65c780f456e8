//! Engine
//!
//! The trigger surface the editor calls. One `Engine` serves the whole
//! process; it keeps scheduler state (cache, error tracker, cancel token)
//! per open graph, keyed by `GraphId`.
//!
//! # Concurrency
//!
//! Graphs are independent: each has its own state behind its own lock, so
//! two editor windows can schedule concurrently without one rebuild ever
//! invalidating the other's cache. Within one graph everything is
//! synchronous and runs to completion on the calling thread - node bodies
//! share sockets, and the schedule is their only synchronization.
//!
//! The cancel token lives *outside* the per-graph lock: a run holds the
//! lock for its whole duration, and cancellation has to reach it from
//! another thread mid-run.

use std::sync::Arc;

use dashmap::DashMap;
use indexmap::IndexSet;
use parking_lot::Mutex;
use tracing::debug;

use crate::error::{ErrorKind, StructuralError};
use crate::graph::{Direction, Graph, GraphId, NodeId};
use crate::sched::{
    run_update_list, CancelToken, ErrorStateTracker, RunOutcome, RunReport, UpdateCache,
};

/// Lock-protected scheduler state for one graph.
#[derive(Debug, Default)]
struct GraphState {
    cache: UpdateCache,
    errors: ErrorStateTracker,
}

/// One graph's slot in the registry. The token sits beside the lock, not
/// behind it, so `cancel` never has to wait for a run to finish.
#[derive(Debug, Default)]
struct GraphSlot {
    cancel: CancelToken,
    state: Mutex<GraphState>,
}

/// The recompute engine: schedules, runs, and annotates dataflow graphs.
///
/// # Example
///
/// ```rust,ignore
/// let engine = Engine::new();
/// let mut graph = Graph::new();
/// // ... editor adds nodes and links ...
///
/// engine.rebuild(&graph);
/// match engine.run_from_node(&mut graph, changed) {
///     RunOutcome::Completed { trace } => show_timings(trace),
///     RunOutcome::Stopped { node, kind, .. } => flag(node, kind),
///     RunOutcome::Cancelled { .. } => {}
/// }
/// ```
#[derive(Debug, Default)]
pub struct Engine {
    graphs: DashMap<GraphId, Arc<GraphSlot>>,
}

impl Engine {
    /// Create an engine with no registered graphs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the graph's schedules after a structural edit.
    ///
    /// Replaces the full schedule, drops every memoized closure, and bumps
    /// the structural version. Caches of other graphs are untouched.
    pub fn rebuild(&self, graph: &Graph) {
        let slot = self.slot(graph.id());
        let mut state = slot.state.lock();
        state.cache.rebuild(graph);
    }

    /// Run every component schedule of the graph, in order.
    ///
    /// A failure inside one component stops that component's walk only; the
    /// remaining components still run. The skip set is shared across the
    /// chained walks, so no node executes twice in one call.
    pub fn run_full(&self, graph: &mut Graph) -> RunReport {
        let slot = self.slot(graph.id());
        let mut guard = slot.state.lock();
        let state = &mut *guard;
        slot.cancel.reset();
        ensure_built(&mut state.cache, graph);

        let schedules = state.cache.full_schedules().to_vec();
        let mut skip: IndexSet<NodeId> = IndexSet::new();
        let mut components = Vec::with_capacity(schedules.len());
        for list in &schedules {
            components.push(run_update_list(
                graph,
                list,
                &mut skip,
                &mut state.errors,
                &slot.cancel,
            ));
        }

        RunReport { components }
    }

    /// Re-run everything affected by a change to `node` (the node itself
    /// plus its downstream closure), in dependency order.
    pub fn run_from_node(&self, graph: &mut Graph, node: NodeId) -> RunOutcome {
        self.run_closure(graph, node, Direction::Downstream)
    }

    /// Run everything `node` needs for a preview (its upstream closure,
    /// sources first, the node itself last).
    pub fn run_to_node(&self, graph: &mut Graph, node: NodeId) -> RunOutcome {
        self.run_closure(graph, node, Direction::Upstream)
    }

    /// Re-run the downstream closure of a set of changed nodes.
    ///
    /// The closure of the set is computed directly - the memoized partial
    /// cache is strictly per single node.
    pub fn run_from_nodes(&self, graph: &mut Graph, nodes: &[NodeId]) -> RunOutcome {
        let slot = self.slot(graph.id());
        let mut guard = slot.state.lock();
        let state = &mut *guard;
        slot.cancel.reset();
        ensure_built(&mut state.cache, graph);

        let list = state.cache.seed_schedule(nodes, Direction::Downstream);
        let mut skip: IndexSet<NodeId> = IndexSet::new();
        run_update_list(graph, &list, &mut skip, &mut state.errors, &slot.cancel)
    }

    fn run_closure(&self, graph: &mut Graph, node: NodeId, direction: Direction) -> RunOutcome {
        let slot = self.slot(graph.id());
        let mut guard = slot.state.lock();
        let state = &mut *guard;
        slot.cancel.reset();
        ensure_built(&mut state.cache, graph);

        let list = state.cache.closure_schedule(node, direction).clone();
        let mut skip: IndexSet<NodeId> = IndexSet::new();
        run_update_list(graph, &list, &mut skip, &mut state.errors, &slot.cancel)
    }

    /// Structural errors reported by the graph's last rebuild (plus any
    /// cyclic closure requests since).
    pub fn structural_errors(&self, graph: GraphId) -> Vec<StructuralError> {
        match self.graphs.get(&graph) {
            Some(slot) => slot.state.lock().cache.structural_errors().to_vec(),
            None => Vec::new(),
        }
    }

    /// Number of memoized closure schedules currently held for a graph.
    pub fn cached_closures(&self, graph: GraphId) -> usize {
        match self.graphs.get(&graph) {
            Some(slot) => slot.state.lock().cache.cached_closure_count(),
            None => 0,
        }
    }

    /// Currently error-flagged nodes of a graph, with their kinds.
    pub fn flagged_nodes(&self, graph: GraphId) -> Vec<(NodeId, ErrorKind)> {
        match self.graphs.get(&graph) {
            Some(slot) => slot.state.lock().errors.flagged().collect(),
            None => Vec::new(),
        }
    }

    /// Restore every error-flagged node to its pre-error annotation and
    /// drop all error records (the user's "clear errors" action).
    pub fn clear_errors(&self, graph: &mut Graph) {
        let slot = self.slot(graph.id());
        let mut state = slot.state.lock();
        state.errors.reset(graph);
    }

    /// Request cancellation of the run currently in progress on `graph`.
    ///
    /// Takes effect at the next between-node check; a no-op if nothing is
    /// running. Tokens are reset at the start of every run.
    pub fn cancel(&self, graph: GraphId) {
        if let Some(slot) = self.graphs.get(&graph) {
            slot.cancel.cancel();
        }
    }

    /// Discard all scheduler state for a graph (the editor closed it).
    ///
    /// Returns whether any state existed. The next `run_*` on the same id
    /// starts from a fresh rebuild.
    pub fn forget(&self, graph: GraphId) -> bool {
        let removed = self.graphs.remove(&graph).is_some();
        if removed {
            debug!(graph = ?graph, "scheduler state discarded");
        }
        removed
    }

    fn slot(&self, graph: GraphId) -> Arc<GraphSlot> {
        self.graphs.entry(graph).or_default().value().clone()
    }
}

/// Lazy first build: a trigger on a graph whose cache was never built
/// rebuilds before running, so the editor does not have to special-case
/// its first edit.
fn ensure_built(cache: &mut UpdateCache, graph: &Graph) {
    if !cache.is_built() {
        cache.rebuild(graph);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    use crate::error::ProcessError;
    use crate::graph::{Link, Processable};

    /// Probe node: appends its name to a shared log, optionally failing.
    struct Probe {
        name: &'static str,
        log: Arc<StdMutex<Vec<&'static str>>>,
        fail_with: Option<ProcessError>,
    }

    impl Processable for Probe {
        fn process(&mut self) -> Result<(), ProcessError> {
            self.log.lock().unwrap().push(self.name);
            match &self.fail_with {
                Some(error) => Err(error.clone()),
                None => Ok(()),
            }
        }
    }

    struct Fixture {
        engine: Engine,
        graph: Graph,
        log: Arc<StdMutex<Vec<&'static str>>>,
        nodes: Vec<NodeId>,
    }

    impl Fixture {
        /// The diamond: a → b, a → c, b → d, c → d.
        fn diamond(failing: &[&'static str]) -> Self {
            let log: Arc<StdMutex<Vec<&'static str>>> = Arc::default();
            let mut graph = Graph::new();
            let mut nodes = Vec::new();
            for name in ["a", "b", "c", "d"] {
                let fail_with = failing
                    .contains(&name)
                    .then(|| ProcessError::Failed(format!("{name} broke")));
                nodes.push(graph.add_node(
                    name,
                    Box::new(Probe {
                        name,
                        log: log.clone(),
                        fail_with,
                    }),
                ));
            }
            for (from, to) in [(0, 1), (0, 2), (1, 3), (2, 3)] {
                graph.add_link(Link::new(nodes[from], 0, nodes[to], 0));
            }
            Self {
                engine: Engine::new(),
                graph,
                log,
                nodes,
            }
        }

        fn executed(&self) -> Vec<&'static str> {
            self.log.lock().unwrap().clone()
        }
    }

    #[test]
    fn run_full_respects_dependency_order() {
        let mut fx = Fixture::diamond(&[]);
        fx.engine.rebuild(&fx.graph);

        let report = fx.engine.run_full(&mut fx.graph);
        assert!(report.is_complete());

        let order = fx.executed();
        assert_eq!(order.len(), 4);
        let pos = |name| order.iter().position(|&n| n == name).unwrap();
        assert!(pos("a") < pos("b"));
        assert!(pos("a") < pos("c"));
        assert!(pos("b") < pos("d"));
        assert!(pos("c") < pos("d"));
    }

    #[test]
    fn run_from_node_visits_exactly_the_downstream_closure() {
        let mut fx = Fixture::diamond(&[]);
        fx.engine.rebuild(&fx.graph);

        let outcome = fx.engine.run_from_node(&mut fx.graph, fx.nodes[1]);
        assert!(outcome.is_complete());
        assert_eq!(fx.executed(), vec!["b", "d"]);
    }

    #[test]
    fn run_to_node_runs_sources_first() {
        let mut fx = Fixture::diamond(&[]);
        fx.engine.rebuild(&fx.graph);

        let outcome = fx.engine.run_to_node(&mut fx.graph, fx.nodes[3]);
        assert!(outcome.is_complete());

        let order = fx.executed();
        assert_eq!(order.len(), 4);
        assert_eq!(order[0], "a");
        assert_eq!(order[3], "d");
    }

    #[test]
    fn run_from_nodes_unions_the_closures() {
        let mut fx = Fixture::diamond(&[]);
        fx.engine.rebuild(&fx.graph);

        let seeds = [fx.nodes[1], fx.nodes[2]];
        let outcome = fx.engine.run_from_nodes(&mut fx.graph, &seeds);
        assert!(outcome.is_complete());

        let order = fx.executed();
        assert_eq!(order.len(), 3);
        assert!(!order.contains(&"a"));
        assert_eq!(order[2], "d");
    }

    #[test]
    fn failure_halts_the_run_and_spares_unrelated_state() {
        let mut fx = Fixture::diamond(&["b"]);
        fx.engine.rebuild(&fx.graph);

        let report = fx.engine.run_full(&mut fx.graph);
        assert_eq!(
            report.first_failure(),
            Some((fx.nodes[1], ErrorKind::Generic))
        );

        // a ran, b was attempted, c and d never ran.
        assert_eq!(fx.executed(), vec!["a", "b"]);

        // Only b is flagged; c and d keep their prior annotations.
        let flagged = fx.engine.flagged_nodes(fx.graph.id());
        assert_eq!(flagged, vec![(fx.nodes[1], ErrorKind::Generic)]);
    }

    #[test]
    fn cycle_reports_structural_error_and_runs_nothing() {
        let mut fx = Fixture::diamond(&[]);
        // d → a closes the loop.
        fx.graph
            .add_link(Link::new(fx.nodes[3], 0, fx.nodes[0], 0));
        fx.engine.rebuild(&fx.graph);

        let errors = fx.engine.structural_errors(fx.graph.id());
        assert!(matches!(errors.as_slice(), [StructuralError::Cycle { .. }]));

        let report = fx.engine.run_full(&mut fx.graph);
        assert!(report.is_complete());
        assert!(fx.executed().is_empty());
    }

    #[test]
    fn repeated_single_node_runs_reuse_the_cached_closure() {
        let mut fx = Fixture::diamond(&[]);
        fx.engine.rebuild(&fx.graph);

        fx.engine.run_from_node(&mut fx.graph, fx.nodes[0]);
        fx.engine.run_from_node(&mut fx.graph, fx.nodes[0]);
        assert_eq!(fx.engine.cached_closures(fx.graph.id()), 1);

        // A rebuild discards the entry.
        fx.engine.rebuild(&fx.graph);
        assert_eq!(fx.engine.cached_closures(fx.graph.id()), 0);
    }

    #[test]
    fn first_run_without_rebuild_builds_lazily() {
        let mut fx = Fixture::diamond(&[]);
        let outcome = fx.engine.run_from_node(&mut fx.graph, fx.nodes[0]);
        assert!(outcome.is_complete());
        assert_eq!(fx.executed().len(), 4);
    }

    #[test]
    fn clear_errors_restores_annotations() {
        let mut fx = Fixture::diamond(&["b"]);
        fx.engine.rebuild(&fx.graph);
        fx.engine.run_full(&mut fx.graph);
        assert_eq!(fx.engine.flagged_nodes(fx.graph.id()).len(), 1);

        fx.engine.clear_errors(&mut fx.graph);
        assert!(fx.engine.flagged_nodes(fx.graph.id()).is_empty());
        assert_eq!(
            fx.graph.annotation(fx.nodes[1]).unwrap().status,
            crate::graph::NodeStatus::Normal
        );
    }

    #[test]
    fn forget_drops_state_and_next_run_rebuilds() {
        let mut fx = Fixture::diamond(&[]);
        fx.engine.rebuild(&fx.graph);
        assert!(fx.engine.forget(fx.graph.id()));
        assert!(!fx.engine.forget(fx.graph.id()));

        let outcome = fx.engine.run_from_node(&mut fx.graph, fx.nodes[0]);
        assert!(outcome.is_complete());
    }

    #[test]
    fn graphs_are_isolated_from_each_other() {
        let mut fx = Fixture::diamond(&[]);
        fx.engine.rebuild(&fx.graph);
        fx.engine.run_from_node(&mut fx.graph, fx.nodes[0]);

        // Rebuilding a second graph must not touch the first one's cache.
        let other = Graph::new();
        fx.engine.rebuild(&other);
        assert_eq!(fx.engine.cached_closures(fx.graph.id()), 1);
    }

    #[test]
    fn isolated_node_is_skipped_by_full_runs_but_runnable_directly() {
        let log: Arc<StdMutex<Vec<&'static str>>> = Arc::default();
        let mut graph = Graph::new();
        let lonely = graph.add_node(
            "lonely",
            Box::new(Probe {
                name: "lonely",
                log: log.clone(),
                fail_with: None,
            }),
        );

        let engine = Engine::new();
        engine.rebuild(&graph);

        // No links: full-tree runs have nothing scheduled.
        let report = engine.run_full(&mut graph);
        assert!(report.components.is_empty());
        assert!(log.lock().unwrap().is_empty());

        // But a direct trigger still executes the node itself.
        let outcome = engine.run_from_node(&mut graph, lonely);
        assert!(outcome.is_complete());
        assert_eq!(log.lock().unwrap().as_slice(), ["lonely"]);
    }
}

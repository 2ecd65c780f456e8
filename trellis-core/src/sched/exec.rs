//! Update Execution
//!
//! Walks an ordered update list, invoking and timing each node's
//! `process()`. Execution is synchronous and single-threaded within a
//! graph: the schedule is the only synchronization node bodies get.
//!
//! # Failure
//!
//! The first failing node stops the walk immediately - nothing after it in
//! the list runs. The failure is classified, recorded with the error
//! tracker, and reported in the outcome; it never propagates as an `Err`
//! out of the scheduler.
//!
//! # Cancellation
//!
//! Node bodies are opaque and uninterruptible, so cancellation is
//! cooperative: the token is checked between node executions.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ErrorKind;
use crate::graph::{Graph, NodeId};

use super::errors::ErrorStateTracker;

/// Timing record for one executed node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEntry {
    /// The node that ran.
    pub node: NodeId,
    /// Wall-clock duration of its `process()` call.
    pub elapsed: Duration,
}

/// How a single update-list walk ended.
///
/// The trace covers every node that was invoked, including a node that
/// failed - the editor still gets timing for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunOutcome {
    /// Every node in the list processed successfully.
    Completed {
        /// Per-node timings, in execution order.
        trace: Vec<TraceEntry>,
    },
    /// A node failed; the remainder of the list was not executed.
    Stopped {
        /// The failing node.
        node: NodeId,
        /// Visual classification of the failure.
        kind: ErrorKind,
        /// Timings up to and including the failing node.
        trace: Vec<TraceEntry>,
    },
    /// The cancel token was set between node executions.
    Cancelled {
        /// Timings of the nodes that ran before cancellation.
        trace: Vec<TraceEntry>,
    },
}

impl RunOutcome {
    /// Whether the walk covered the whole list.
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    /// The per-node timings, whatever the outcome.
    pub fn trace(&self) -> &[TraceEntry] {
        match self {
            Self::Completed { trace } | Self::Stopped { trace, .. } | Self::Cancelled { trace } => {
                trace
            }
        }
    }

    /// The failing node and kind, if the walk stopped on a failure.
    pub fn failure(&self) -> Option<(NodeId, ErrorKind)> {
        match self {
            Self::Stopped { node, kind, .. } => Some((*node, *kind)),
            _ => None,
        }
    }
}

/// Aggregate outcome of a full-tree run: one walk per component schedule.
///
/// A failure inside one component stops that component's walk only;
/// the remaining components still run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Per-component outcomes, in schedule order.
    pub components: Vec<RunOutcome>,
}

impl RunReport {
    /// Whether every component walk completed.
    pub fn is_complete(&self) -> bool {
        self.components.iter().all(RunOutcome::is_complete)
    }

    /// The first failure across all components, if any.
    pub fn first_failure(&self) -> Option<(NodeId, ErrorKind)> {
        self.components.iter().find_map(RunOutcome::failure)
    }

    /// All timings across all components, in execution order.
    pub fn trace(&self) -> impl Iterator<Item = &TraceEntry> + '_ {
        self.components.iter().flat_map(|outcome| outcome.trace())
    }
}

/// Cooperative cancellation flag, checked between node executions.
///
/// Clones share the flag, so the editor can hold one end while a run holds
/// the other.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create an unset token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of the run holding this token.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Unset the flag; called at the start of every run.
    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

/// Walk `list` in order, invoking `process()` on every node not in `skip`.
///
/// Successful nodes are added to `skip`, which is how chained component
/// walks within one full-tree run avoid re-executing shared work. Each
/// success also clears the node's error record and stamps its measured
/// duration into the annotation the editor displays.
pub fn run_update_list(
    graph: &mut Graph,
    list: &[NodeId],
    skip: &mut IndexSet<NodeId>,
    errors: &mut ErrorStateTracker,
    cancel: &CancelToken,
) -> RunOutcome {
    let mut trace: Vec<TraceEntry> = Vec::new();

    for &node in list {
        if skip.contains(&node) {
            continue;
        }
        if cancel.is_cancelled() {
            debug!(node = ?node, "run cancelled before node");
            return RunOutcome::Cancelled { trace };
        }

        let started = Instant::now();
        let result = graph.process_node(node);
        let elapsed = started.elapsed();
        trace.push(TraceEntry { node, elapsed });

        match result {
            Ok(()) => {
                skip.insert(node);
                errors.clear(graph, node);
                if let Some(annotation) = graph.annotation_mut(node) {
                    annotation.last_duration = Some(elapsed);
                }
                debug!(node = ?node, elapsed = ?elapsed, "node processed");
            }
            Err(error) => {
                let kind = error.kind();
                warn!(node = ?node, error = %error, "node failed; halting update list");
                errors.record(graph, node, &error);
                return RunOutcome::Stopped { node, kind, trace };
            }
        }
    }

    RunOutcome::Completed { trace }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    use crate::error::ProcessError;
    use crate::graph::Processable;

    /// Probe node: counts runs, optionally failing each time.
    struct Probe {
        runs: Arc<AtomicUsize>,
        fail_with: Option<ProcessError>,
    }

    impl Probe {
        fn ok(runs: &Arc<AtomicUsize>) -> Box<Self> {
            Box::new(Self {
                runs: runs.clone(),
                fail_with: None,
            })
        }

        fn failing(runs: &Arc<AtomicUsize>, error: ProcessError) -> Box<Self> {
            Box::new(Self {
                runs: runs.clone(),
                fail_with: Some(error),
            })
        }
    }

    impl Processable for Probe {
        fn process(&mut self) -> Result<(), ProcessError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            match &self.fail_with {
                Some(error) => Err(error.clone()),
                None => Ok(()),
            }
        }
    }

    #[test]
    fn walk_runs_every_node_in_order() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut graph = Graph::new();
        let a = graph.add_node("a", Probe::ok(&runs));
        let b = graph.add_node("b", Probe::ok(&runs));

        let mut skip = IndexSet::new();
        let mut errors = ErrorStateTracker::new();
        let outcome =
            run_update_list(&mut graph, &[a, b], &mut skip, &mut errors, &CancelToken::new());

        assert!(outcome.is_complete());
        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert_eq!(
            outcome.trace().iter().map(|t| t.node).collect::<Vec<_>>(),
            vec![a, b]
        );
        // Successful nodes land in the skip set for chained walks.
        assert!(skip.contains(&a) && skip.contains(&b));
    }

    #[test]
    fn failure_stops_the_walk_and_flags_the_node() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut graph = Graph::new();
        let a = graph.add_node("a", Probe::ok(&runs));
        let b = graph.add_node(
            "b",
            Probe::failing(&runs, ProcessError::Failed("boom".into())),
        );
        let c = graph.add_node("c", Probe::ok(&runs));

        let mut skip = IndexSet::new();
        let mut errors = ErrorStateTracker::new();
        let outcome =
            run_update_list(&mut graph, &[a, b, c], &mut skip, &mut errors, &CancelToken::new());

        assert_eq!(outcome.failure(), Some((b, ErrorKind::Generic)));
        // a ran, b was attempted, c never ran.
        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert!(errors.is_flagged(b));
        assert!(!skip.contains(&b));
        // The failing node's timing is still in the trace.
        assert_eq!(outcome.trace().last().unwrap().node, b);
    }

    #[test]
    fn skip_set_suppresses_execution() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut graph = Graph::new();
        let a = graph.add_node("a", Probe::ok(&runs));
        let b = graph.add_node("b", Probe::ok(&runs));

        let mut skip: IndexSet<NodeId> = [a].into_iter().collect();
        let mut errors = ErrorStateTracker::new();
        let outcome =
            run_update_list(&mut graph, &[a, b], &mut skip, &mut errors, &CancelToken::new());

        assert!(outcome.is_complete());
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(outcome.trace().len(), 1);
    }

    #[test]
    fn cancellation_stops_between_nodes() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut graph = Graph::new();
        let a = graph.add_node("a", Probe::ok(&runs));
        let b = graph.add_node("b", Probe::ok(&runs));

        let cancel = CancelToken::new();
        cancel.cancel();

        let mut skip = IndexSet::new();
        let mut errors = ErrorStateTracker::new();
        let outcome = run_update_list(&mut graph, &[a, b], &mut skip, &mut errors, &cancel);

        assert!(matches!(outcome, RunOutcome::Cancelled { .. }));
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn success_restores_error_badge_and_stamps_duration() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut graph = Graph::new();
        let a = graph.add_node("a", Probe::ok(&runs));

        let mut errors = ErrorStateTracker::new();
        errors.record(&mut graph, a, &ProcessError::Failed("stale".into()));

        let mut skip = IndexSet::new();
        let outcome =
            run_update_list(&mut graph, &[a], &mut skip, &mut errors, &CancelToken::new());

        assert!(outcome.is_complete());
        assert!(!errors.is_flagged(a));
        let annotation = graph.annotation(a).unwrap();
        assert!(annotation.last_duration.is_some());
    }
}

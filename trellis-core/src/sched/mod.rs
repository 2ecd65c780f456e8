//! Scheduling Layer
//!
//! Everything stateful about updates lives here, one instance per graph:
//!
//! - `UpdateCache` owns the schedules and their structural version
//! - execution walks an update list with timing, fail-fast, and
//!   cooperative cancellation
//! - `ErrorStateTracker` remembers what failed and how to restore it
//!
//! The graph algorithms these build on are pure functions in
//! [`crate::graph`]; this layer decides when they run and what survives
//! between calls.

mod cache;
mod errors;
mod exec;

pub use cache::UpdateCache;
pub use errors::{ErrorRecord, ErrorStateTracker};
pub use exec::{run_update_list, CancelToken, RunOutcome, RunReport, TraceEntry};

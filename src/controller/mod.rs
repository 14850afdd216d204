//! Health reconciliation
//!
//! - `verdict`: collapses health checks into a single node verdict
//! - `state`: edge-triggered tracking of the published verdict
//! - `reconcile`: the polling control loop

pub mod reconcile;
pub mod state;
pub mod verdict;

pub use reconcile::{CycleOutcome, QueryFailurePolicy, Reconciler};
pub use state::{NodeState, StateTracker, Transition};
pub use verdict::{evaluate, TagFilter, Verdict};

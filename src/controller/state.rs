//! Edge-triggered tracking of the last published verdict

use super::Verdict;

/// Bookkeeping for what was last sent to the fleet API
///
/// `last_published` stays `None` until the first publish attempt, so the
/// first poll always establishes a baseline with the remote system.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeState {
    pub last_published: Option<Verdict>,
}

/// Result of comparing a new verdict to the published one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub should_publish: bool,
    pub previous: Option<Verdict>,
}

/// Owns the [`NodeState`] and decides when a publish is due
#[derive(Debug, Default)]
pub struct StateTracker {
    state: NodeState,
}

impl StateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &NodeState {
        &self.state
    }

    /// Compare `verdict` to the last published verdict
    ///
    /// Does not mutate state; call [`StateTracker::record_dispatched`] once the
    /// publish attempt has been made.
    pub fn reconcile(&self, verdict: Verdict) -> Transition {
        let previous = self.state.last_published;
        Transition {
            should_publish: previous != Some(verdict),
            previous,
        }
    }

    /// Advance bookkeeping after a publish attempt, successful or not
    pub fn record_dispatched(&mut self, verdict: Verdict) {
        self.state.last_published = Some(verdict);
    }
}

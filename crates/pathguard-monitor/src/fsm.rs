//! Hysteresis counters and the path state machine.
//!
//! Each monitored path owns three counters (`good`, `warn`, `fail`);
//! exactly one is incremented per tick from the tick's classification.
//! The next-state decision is a pure function of the current state and
//! the counters, compared against the configured bounds with **exact
//! equality**. A counter that skips over its bound (only possible if
//! mutated outside the single-increment tick path) never fires the
//! transition; `>=` would change observable behavior.

use tracing::{debug, info, warn};

use pathguard_state::{Action, Classification, PathSpec, PathState, Transition};

/// Per-path hysteresis state: counters plus the state machine.
///
/// Created once at supervisor start and mutated every tick. Whether
/// `Failed` can be left again is decided by `auto_recover`, not by the
/// machine itself.
#[derive(Debug)]
pub struct PathMonitor {
    spec: PathSpec,
    auto_recover: bool,
    state: PathState,
    good_count: u32,
    warn_count: u32,
    fail_count: u32,
}

impl PathMonitor {
    pub fn new(spec: PathSpec, auto_recover: bool) -> Self {
        Self {
            spec,
            auto_recover,
            state: PathState::Startup,
            good_count: 0,
            warn_count: 0,
            fail_count: 0,
        }
    }

    pub fn spec(&self) -> &PathSpec {
        &self.spec
    }

    pub fn state(&self) -> PathState {
        self.state
    }

    pub fn good_count(&self) -> u32 {
        self.good_count
    }

    pub fn warn_count(&self) -> u32 {
        self.warn_count
    }

    pub fn fail_count(&self) -> u32 {
        self.fail_count
    }

    /// Advance one tick: increment the counter matching the
    /// classification, then evaluate the transition table.
    ///
    /// Returns the edge taken this tick, if any. The action on the
    /// edge fires exactly once per transition: subsequent ticks in the
    /// new state return `None` until another bound is reached.
    pub fn observe(&mut self, classification: Classification) -> Option<Transition> {
        match classification {
            Classification::Good => self.good_count += 1,
            Classification::Warn => {
                self.warn_count += 1;
                warn!(
                    path = %self.spec.name,
                    count = self.warn_count,
                    "path check degraded"
                );
            }
            Classification::Fail => {
                self.fail_count += 1;
                warn!(
                    path = %self.spec.name,
                    count = self.fail_count,
                    threshold = self.spec.max_fail_count,
                    "path check failed"
                );
            }
        }
        self.advance()
    }

    /// Evaluate the transition table against the current counters and
    /// apply the edge's counter resets. Pure in its decision; the only
    /// mutation is taking the edge.
    fn advance(&mut self) -> Option<Transition> {
        let from = self.state;
        let (to, action) = match self.state {
            PathState::Startup => {
                if self.good_count == self.spec.min_good_count {
                    (PathState::Up, Action::OnUp)
                } else {
                    return None;
                }
            }
            PathState::Up => {
                if self.fail_count == self.spec.max_fail_count {
                    self.good_count = 0;
                    (PathState::Failed, Action::OnFail)
                } else if self.warn_count == self.spec.max_warn_count {
                    self.good_count = 0;
                    (PathState::Warn, Action::OnWarn)
                } else {
                    return None;
                }
            }
            PathState::Warn => {
                if self.fail_count == self.spec.max_fail_count {
                    self.good_count = 0;
                    (PathState::Failed, Action::OnFail)
                } else if self.good_count == self.spec.min_good_count {
                    self.warn_count = 0;
                    (PathState::Up, Action::OnUp)
                } else {
                    return None;
                }
            }
            PathState::Failed => {
                if self.auto_recover && self.good_count == self.spec.min_good_count {
                    self.fail_count = 0;
                    self.warn_count = 0;
                    (PathState::Up, Action::OnUp)
                } else {
                    return None;
                }
            }
        };

        self.state = to;
        match to {
            PathState::Failed => warn!(path = %self.spec.name, ?from, "path failed"),
            PathState::Warn => warn!(path = %self.spec.name, ?from, "path degraded"),
            _ => info!(path = %self.spec.name, ?from, to = ?to, "path state changed"),
        }
        debug!(
            path = %self.spec.name,
            good = self.good_count,
            warn = self.warn_count,
            fail = self.fail_count,
            "counters after transition"
        );

        Some(Transition { from, to, action })
    }
}

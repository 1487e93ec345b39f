//! pathguard-monitor — the health-evaluation core.
//!
//! One tick flows one way through this crate:
//!
//! ```text
//! Supervisor
//!   ├── ProbeFn → ProbeOutcome
//!   ├── classify() → Classification
//!   ├── PathMonitor (hysteresis counters + state machine) → Transition?
//!   └── RemedyFn / NotifyFn on each transition edge
//! ```
//!
//! The counters and the transition table are the only real state in the
//! repository; everything around them is plumbing. Transitions compare
//! counters to their bounds with exact equality, so a judgment changes
//! on the tick a counter reaches its bound and never re-fires while the
//! path stays in a state.

pub mod classify;
pub mod fsm;
pub mod supervisor;

pub use classify::classify;
pub use fsm::PathMonitor;
pub use supervisor::{NotifyFn, ProbeFn, RemedyFn, Supervisor};

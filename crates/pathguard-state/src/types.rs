//! Domain types shared across the pathguard crates.
//!
//! These are the values that flow through one tick of the supervisor:
//! a probe outcome is classified, the classification advances the
//! hysteresis counters, and a transition (if any) names the remediation
//! action to fire.

use serde::{Deserialize, Serialize};

/// Identifier for a monitored path, taken from its config `name`.
pub type PathId = String;

/// Health state of a monitored path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathState {
    /// Initial state: waiting for the first run of good probes.
    Startup,
    /// Path is healthy and carrying traffic.
    Up,
    /// Path is degraded (latency above the warn threshold).
    Warn,
    /// Path is down; remediation has been applied.
    Failed,
}

/// Classification of a single probe outcome against a path's thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Good,
    Warn,
    Fail,
}

/// Symbolic remediation action fired on a state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    OnUp,
    OnWarn,
    OnFail,
    OnShutdown,
}

/// Round-trip statistics from a single echo probe, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatencyStats {
    pub min_ms: f64,
    pub avg_ms: f64,
    pub max_ms: f64,
    pub mdev_ms: f64,
}

/// Result of one liveness probe. Produced and consumed within a tick.
///
/// `latency` is `None` only when `succeeded` is false.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeOutcome {
    pub succeeded: bool,
    pub latency: Option<LatencyStats>,
}

impl ProbeOutcome {
    /// A failed probe: unreachable, timed out, or unparseable.
    pub fn failed() -> Self {
        Self {
            succeeded: false,
            latency: None,
        }
    }

    pub fn ok(stats: LatencyStats) -> Self {
        Self {
            succeeded: true,
            latency: Some(stats),
        }
    }
}

/// A state-machine edge taken on a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: PathState,
    pub to: PathState,
    /// The remediation action this edge fires, exactly once.
    pub action: Action,
}

/// Event surfaced by the supervisor to its host.
///
/// The supervisor never exits the process itself; terminal conditions
/// are reported here and the host decides the policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathEvent {
    /// A path took a state-machine edge this tick.
    Transitioned {
        path: PathId,
        transition: Transition,
    },
    /// A path entered `Failed` without auto-recovery and will no
    /// longer be ticked.
    Halted { path: PathId },
}

/// Why the supervisor loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorExit {
    /// The shutdown channel fired.
    ShutdownRequested,
    /// Every monitored path has halted in `Failed`.
    AllPathsHalted,
}

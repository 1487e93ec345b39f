//! Probe result classification.

use pathguard_state::{Classification, ProbeOutcome};

/// Classify a probe outcome against a path's latency thresholds.
///
/// Pure and total: a probe without latency stats is only ever produced
/// with `succeeded = false` and classifies as `Fail`. Average RTT is
/// compared against the thresholds, fail bound first.
pub fn classify(outcome: &ProbeOutcome, warn_threshold_ms: f64, fail_threshold_ms: f64) -> Classification {
    let stats = match (outcome.succeeded, outcome.latency) {
        (true, Some(stats)) => stats,
        _ => return Classification::Fail,
    };

    if stats.avg_ms > fail_threshold_ms {
        Classification::Fail
    } else if stats.avg_ms > warn_threshold_ms {
        Classification::Warn
    } else {
        Classification::Good
    }
}

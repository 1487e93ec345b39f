//! pathguard-probe — ICMP liveness probe via the system `ping` binary.
//!
//! One echo request per tick, run under a bounded timeout. Every
//! failure mode — spawn error, nonzero exit, timeout, unparseable
//! output — maps to a failed [`ProbeOutcome`]; nothing here raises
//! into the supervisor.

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use tokio::process::Command;
use tracing::debug;

use pathguard_state::{LatencyStats, ProbeOutcome};

/// Sends a single echo request and parses the RTT summary.
#[derive(Debug, Clone)]
pub struct PingProbe {
    timeout: Duration,
}

impl PingProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Probe a target once. Never errors; unreachable targets come
    /// back as `succeeded = false`.
    pub async fn probe(&self, target: &str) -> ProbeOutcome {
        match tokio::time::timeout(self.timeout, run_ping(target)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                debug!(%target, "probe timed out");
                ProbeOutcome::failed()
            }
        }
    }
}

async fn run_ping(target: &str) -> ProbeOutcome {
    let output = match Command::new("ping")
        .args(["-c", "1", target])
        .kill_on_drop(true)
        .output()
        .await
    {
        Ok(output) => output,
        Err(e) => {
            debug!(%target, error = %e, "failed to spawn ping");
            return ProbeOutcome::failed();
        }
    };

    if !output.status.success() {
        debug!(%target, status = ?output.status.code(), "ping returned nonzero");
        return ProbeOutcome::failed();
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    match parse_rtt(&stdout) {
        Some(stats) => ProbeOutcome::ok(stats),
        None => {
            debug!(%target, "ping output had no rtt summary");
            ProbeOutcome::failed()
        }
    }
}

/// Extract `min/avg/max/mdev` from a ping summary line.
///
/// Matches both the Linux (`rtt min/avg/max/mdev = ... ms`) and BSD
/// (`round-trip min/avg/max/stddev = ... ms`) forms.
pub fn parse_rtt(output: &str) -> Option<LatencyStats> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"=\s*([\d.]+)/([\d.]+)/([\d.]+)/([\d.]+)\s*ms").expect("static regex")
    });

    let caps = re.captures(output)?;
    Some(LatencyStats {
        min_ms: caps[1].parse().ok()?,
        avg_ms: caps[2].parse().ok()?,
        max_ms: caps[3].parse().ok()?,
        mdev_ms: caps[4].parse().ok()?,
    })
}

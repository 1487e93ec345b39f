//! Supervisor loop — owns the tick cadence for all monitored paths.
//!
//! Every `interval`, each non-halted path is evaluated strictly
//! sequentially: probe → classify → advance the state machine →
//! dispatch the remediation action and operator notification for any
//! transition taken. Collaborators are injected as boxed async
//! closures so the loop never knows about ping binaries or command
//! APIs.
//!
//! Terminal behavior: a path entering `Failed` without auto-recovery
//! is halted (no longer ticked) and reported via [`PathEvent::Halted`];
//! the loop itself never exits the process. With a non-zero holddown a
//! repeating-alert task is spawned per failed path and cancelled when
//! the path recovers or the supervisor stops, so a failed path cannot
//! starve its sibling.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use pathguard_state::{
    Action, Config, PathEvent, PathSpec, PathState, ProbeOutcome, SupervisorExit, Transition,
};

use crate::classify::classify;
use crate::fsm::PathMonitor;

type BoxFuture<T> = std::pin::Pin<Box<dyn std::future::Future<Output = T> + Send>>;

/// Probe collaborator: target address → outcome. Must embed its own
/// timeout; any internal error surfaces as a failed outcome.
pub type ProbeFn = Arc<dyn Fn(String) -> BoxFuture<ProbeOutcome> + Send + Sync>;

/// Remediation collaborator: (path, action) → result. Failures are
/// logged by the supervisor and never alter the next transition.
pub type RemedyFn = Arc<dyn Fn(String, Action) -> BoxFuture<anyhow::Result<()>> + Send + Sync>;

/// Notification collaborator: (subject, message). Best-effort.
pub type NotifyFn = Arc<dyn Fn(String, String) -> BoxFuture<()> + Send + Sync>;

/// Observer for path events, mostly for the host's exit policy.
pub type EventFn = Arc<dyn Fn(&PathEvent) + Send + Sync>;

/// Handle to a spawned repeating-alert task.
struct HolddownTask {
    cancel_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// One monitored path inside the loop.
struct PathSlot {
    monitor: PathMonitor,
    /// Set when the path entered `Failed` terminally; halted paths are
    /// skipped by subsequent ticks.
    halted: bool,
    holddown: Option<HolddownTask>,
}

/// Drives all monitored paths at a fixed cadence.
pub struct Supervisor {
    interval: Duration,
    holddown: Duration,
    auto_recover: bool,
    slots: Vec<PathSlot>,
    probe: ProbeFn,
    remedy: RemedyFn,
    notify: NotifyFn,
    on_event: Option<EventFn>,
}

impl Supervisor {
    pub fn new(config: &Config, probe: ProbeFn, remedy: RemedyFn, notify: NotifyFn) -> Self {
        let slots = config
            .paths
            .iter()
            .cloned()
            .map(|spec| PathSlot {
                monitor: PathMonitor::new(spec, config.auto_recover),
                halted: false,
                holddown: None,
            })
            .collect();

        Self {
            interval: Duration::from_secs(config.interval_seconds),
            holddown: Duration::from_secs(config.holddown_seconds),
            auto_recover: config.auto_recover,
            slots,
            probe,
            remedy,
            notify,
            on_event: None,
        }
    }

    /// Set an observer for path events.
    pub fn with_event_callback(mut self, callback: EventFn) -> Self {
        self.on_event = Some(callback);
        self
    }

    /// Run until the shutdown channel fires, or until every path has
    /// halted and no holddown alerting is configured.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> SupervisorExit {
        info!(
            interval_secs = self.interval.as_secs_f64(),
            paths = self.slots.len(),
            "supervisor started"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {
                    self.tick().await;

                    if self.slots.iter().all(|s| s.halted) && self.holddown.is_zero() {
                        warn!("all monitored paths have failed");
                        self.cancel_holddowns();
                        return SupervisorExit::AllPathsHalted;
                    }
                }
                _ = shutdown.changed() => {
                    info!("supervisor shutting down");
                    self.cancel_holddowns();
                    return SupervisorExit::ShutdownRequested;
                }
            }
        }
    }

    /// Evaluate every non-halted path once, in order.
    async fn tick(&mut self) {
        for i in 0..self.slots.len() {
            if self.slots[i].halted {
                continue;
            }

            let spec = self.slots[i].monitor.spec().clone();
            let outcome = (self.probe)(spec.target.clone()).await;
            if let Some(stats) = outcome.latency {
                debug!(
                    path = %spec.name,
                    min = stats.min_ms,
                    avg = stats.avg_ms,
                    max = stats.max_ms,
                    mdev = stats.mdev_ms,
                    "echo reply"
                );
            }

            let classification =
                classify(&outcome, spec.warn_threshold_ms, spec.fail_threshold_ms);

            if let Some(transition) = self.slots[i].monitor.observe(classification) {
                self.handle_transition(i, &spec, transition).await;
            }
        }
    }

    async fn handle_transition(&mut self, i: usize, spec: &PathSpec, transition: Transition) {
        if transition.from == PathState::Failed {
            self.slots[i].cancel_holddown();
        }

        self.emit(&PathEvent::Transitioned {
            path: spec.name.clone(),
            transition,
        });

        let (subject, message) = transition_notice(spec, &transition);
        (self.notify)(subject, message).await;

        if let Err(e) = (self.remedy)(spec.name.clone(), transition.action).await {
            error!(
                path = %spec.name,
                action = ?transition.action,
                error = %e,
                "remediation dispatch failed"
            );
        }

        if transition.to == PathState::Failed {
            if !self.holddown.is_zero() {
                self.slots[i].holddown =
                    Some(spawn_holddown(spec, self.holddown, self.notify.clone()));
            }
            if !self.auto_recover {
                self.slots[i].halted = true;
                warn!(path = %spec.name, "path halted; manual intervention required");
                self.emit(&PathEvent::Halted {
                    path: spec.name.clone(),
                });
            }
        }
    }

    fn emit(&self, event: &PathEvent) {
        if let Some(ref callback) = self.on_event {
            callback(event);
        }
    }

    fn cancel_holddowns(&mut self) {
        for slot in &mut self.slots {
            slot.cancel_holddown();
        }
    }
}

impl PathSlot {
    fn cancel_holddown(&mut self) {
        if let Some(task) = self.holddown.take() {
            let _ = task.cancel_tx.send(true);
            task.handle.abort();
        }
    }
}

/// Spawn the repeating-alert task for a path that stays failed.
fn spawn_holddown(spec: &PathSpec, period: Duration, notify: NotifyFn) -> HolddownTask {
    let (cancel_tx, mut cancel_rx) = watch::channel(false);
    let subject = "path still failed".to_string();
    let message = match &spec.interface {
        Some(intf) => format!(
            "Path {} on {} remains failed; remediation stays applied",
            spec.name, intf
        ),
        None => format!("Path {} remains failed; remediation stays applied", spec.name),
    };

    let handle = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(period) => {
                    notify(subject.clone(), message.clone()).await;
                }
                _ = cancel_rx.changed() => break,
            }
        }
    });

    HolddownTask { cancel_tx, handle }
}

/// Operator-facing subject and body for a transition.
fn transition_notice(spec: &PathSpec, transition: &Transition) -> (String, String) {
    let name = &spec.name;
    match transition.to {
        PathState::Up => (
            "path up".to_string(),
            format!("Path {name} came up ({:?} -> Up)", transition.from),
        ),
        PathState::Warn => (
            "path degraded".to_string(),
            format!("Path {name} reached max warn count; latency degraded"),
        ),
        PathState::Failed => {
            let body = match &spec.interface {
                Some(intf) => format!(
                    "Path {name} reached max fail count; disabling {intf}"
                ),
                None => format!("Path {name} reached max fail count; path disabled"),
            };
            ("path down".to_string(), body)
        }
        PathState::Startup => ("path starting".to_string(), format!("Path {name} starting")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use pathguard_state::LatencyStats;

    fn good() -> ProbeOutcome {
        ProbeOutcome::ok(LatencyStats {
            min_ms: 1.0,
            avg_ms: 1.0,
            max_ms: 1.0,
            mdev_ms: 0.0,
        })
    }

    fn spec(name: &str, target: &str) -> PathSpec {
        PathSpec {
            name: name.to_string(),
            target: target.to_string(),
            interface: None,
            warn_threshold_ms: 4.0,
            fail_threshold_ms: 8.0,
            min_good_count: 1,
            max_warn_count: 2,
            max_fail_count: 2,
        }
    }

    /// Probe that replays a script per target, repeating the final
    /// outcome once the script is exhausted.
    fn scripted_probe(scripts: Vec<(&str, Vec<ProbeOutcome>)>) -> (ProbeFn, Arc<Mutex<Vec<String>>>) {
        let scripts: Arc<Mutex<Vec<(String, VecDeque<ProbeOutcome>, ProbeOutcome)>>> =
            Arc::new(Mutex::new(
                scripts
                    .into_iter()
                    .map(|(t, s)| {
                        let last = *s.last().expect("script must not be empty");
                        (t.to_string(), s.into_iter().collect(), last)
                    })
                    .collect(),
            ));
        let calls = Arc::new(Mutex::new(Vec::new()));
        let calls_in = calls.clone();

        let probe: ProbeFn = Arc::new(move |target: String| {
            calls_in.lock().unwrap().push(target.clone());
            let mut scripts = scripts.lock().unwrap();
            let entry = scripts
                .iter_mut()
                .find(|(t, _, _)| *t == target)
                .expect("unknown probe target");
            let outcome = entry.1.pop_front().unwrap_or(entry.2);
            Box::pin(async move { outcome })
        });
        (probe, calls)
    }

    fn recording_remedy(fail: bool) -> (RemedyFn, Arc<Mutex<Vec<(String, Action)>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let calls_in = calls.clone();
        let remedy: RemedyFn = Arc::new(move |path: String, action: Action| {
            calls_in.lock().unwrap().push((path, action));
            Box::pin(async move {
                if fail {
                    Err(anyhow::anyhow!("command api unreachable"))
                } else {
                    Ok(())
                }
            })
        });
        (remedy, calls)
    }

    fn recording_notify() -> (NotifyFn, Arc<Mutex<Vec<String>>>) {
        let subjects = Arc::new(Mutex::new(Vec::new()));
        let subjects_in = subjects.clone();
        let notify: NotifyFn = Arc::new(move |subject: String, _message: String| {
            subjects_in.lock().unwrap().push(subject);
            Box::pin(async move {})
        });
        (notify, subjects)
    }

    fn supervisor(
        specs: Vec<PathSpec>,
        auto_recover: bool,
        holddown: Duration,
        probe: ProbeFn,
        remedy: RemedyFn,
        notify: NotifyFn,
    ) -> Supervisor {
        Supervisor {
            interval: Duration::from_millis(10),
            holddown,
            auto_recover,
            slots: specs
                .into_iter()
                .map(|s| PathSlot {
                    monitor: PathMonitor::new(s, auto_recover),
                    halted: false,
                    holddown: None,
                })
                .collect(),
            probe,
            remedy,
            notify,
            on_event: None,
        }
    }

    #[tokio::test]
    async fn failing_path_halts_and_loop_returns() {
        let (probe, _) = scripted_probe(vec![(
            "192.0.2.1",
            vec![good(), ProbeOutcome::failed(), ProbeOutcome::failed()],
        )]);
        let (remedy, actions) = recording_remedy(false);
        let (notify, subjects) = recording_notify();
        let (_tx, rx) = watch::channel(false);

        let s = supervisor(
            vec![spec("a-side", "192.0.2.1")],
            false,
            Duration::ZERO,
            probe,
            remedy,
            notify,
        );
        let exit = tokio::time::timeout(Duration::from_secs(5), s.run(rx))
            .await
            .expect("supervisor did not exit");
        assert_eq!(exit, SupervisorExit::AllPathsHalted);

        let actions = actions.lock().unwrap();
        assert_eq!(
            actions.as_slice(),
            &[
                ("a-side".to_string(), Action::OnUp),
                ("a-side".to_string(), Action::OnFail)
            ]
        );
        let subjects = subjects.lock().unwrap();
        assert_eq!(subjects.as_slice(), &["path up", "path down"]);
    }

    #[tokio::test]
    async fn remediation_failure_does_not_block_transitions() {
        let (probe, _) = scripted_probe(vec![(
            "192.0.2.1",
            vec![good(), ProbeOutcome::failed(), ProbeOutcome::failed()],
        )]);
        let (remedy, actions) = recording_remedy(true);
        let (notify, _) = recording_notify();
        let (_tx, rx) = watch::channel(false);

        let s = supervisor(
            vec![spec("a-side", "192.0.2.1")],
            false,
            Duration::ZERO,
            probe,
            remedy,
            notify,
        );
        let exit = tokio::time::timeout(Duration::from_secs(5), s.run(rx))
            .await
            .expect("supervisor did not exit");

        // Both transitions still happened despite every dispatch failing.
        assert_eq!(exit, SupervisorExit::AllPathsHalted);
        assert_eq!(actions.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn shutdown_signal_stops_loop() {
        let (probe, _) = scripted_probe(vec![("192.0.2.1", vec![good()])]);
        let (remedy, _) = recording_remedy(false);
        let (notify, _) = recording_notify();
        let (tx, rx) = watch::channel(false);

        let s = supervisor(
            vec![spec("a-side", "192.0.2.1")],
            false,
            Duration::ZERO,
            probe,
            remedy,
            notify,
        );
        let handle = tokio::spawn(s.run(rx));
        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(true).unwrap();

        let exit = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("supervisor did not exit")
            .unwrap();
        assert_eq!(exit, SupervisorExit::ShutdownRequested);
    }

    #[tokio::test]
    async fn halted_path_stops_ticking_sibling_continues() {
        let (probe, calls) = scripted_probe(vec![
            (
                "192.0.2.1",
                vec![good(), ProbeOutcome::failed(), ProbeOutcome::failed()],
            ),
            ("192.0.2.5", vec![good()]),
        ]);
        let (remedy, _) = recording_remedy(false);
        let (notify, _) = recording_notify();
        let (tx, rx) = watch::channel(false);

        let s = supervisor(
            vec![spec("a-side", "192.0.2.1"), spec("b-side", "192.0.2.5")],
            false,
            Duration::ZERO,
            probe,
            remedy,
            notify,
        );
        let handle = tokio::spawn(s.run(rx));
        tokio::time::sleep(Duration::from_millis(150)).await;

        let (a_after, b_after) = {
            let calls = calls.lock().unwrap();
            (
                calls.iter().filter(|t| *t == "192.0.2.1").count(),
                calls.iter().filter(|t| *t == "192.0.2.5").count(),
            )
        };
        // a-side halts after three ticks; b-side keeps being probed.
        assert_eq!(a_after, 3);
        assert!(b_after > a_after);

        tx.send(true).unwrap();
        let exit = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("supervisor did not exit")
            .unwrap();
        assert_eq!(exit, SupervisorExit::ShutdownRequested);
    }

    #[tokio::test]
    async fn holddown_repeats_alerts_until_shutdown() {
        let (probe, _) = scripted_probe(vec![(
            "192.0.2.1",
            vec![good(), ProbeOutcome::failed(), ProbeOutcome::failed()],
        )]);
        let (remedy, _) = recording_remedy(false);
        let (notify, subjects) = recording_notify();
        let (tx, rx) = watch::channel(false);

        let s = supervisor(
            vec![spec("a-side", "192.0.2.1")],
            false,
            Duration::from_millis(20),
            probe,
            remedy,
            notify,
        );
        // Holddown configured: the loop keeps running after the halt.
        let handle = tokio::spawn(s.run(rx));
        tokio::time::sleep(Duration::from_millis(200)).await;
        tx.send(true).unwrap();

        let exit = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("supervisor did not exit")
            .unwrap();
        assert_eq!(exit, SupervisorExit::ShutdownRequested);

        let subjects = subjects.lock().unwrap();
        let holddown_alerts = subjects.iter().filter(|s| *s == "path still failed").count();
        assert!(
            holddown_alerts >= 2,
            "expected repeated holddown alerts, got {holddown_alerts}"
        );
    }

    #[tokio::test]
    async fn auto_recover_brings_path_back_up() {
        let (probe, _) = scripted_probe(vec![(
            "192.0.2.1",
            vec![
                good(),
                ProbeOutcome::failed(),
                ProbeOutcome::failed(),
                good(),
            ],
        )]);
        let (remedy, actions) = recording_remedy(false);
        let (notify, _) = recording_notify();
        let (tx, rx) = watch::channel(false);

        let s = supervisor(
            vec![spec("a-side", "192.0.2.1")],
            true,
            Duration::ZERO,
            probe,
            remedy,
            notify,
        );
        let handle = tokio::spawn(s.run(rx));
        tokio::time::sleep(Duration::from_millis(150)).await;
        tx.send(true).unwrap();
        let exit = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("supervisor did not exit")
            .unwrap();
        assert_eq!(exit, SupervisorExit::ShutdownRequested);

        let actions: Vec<Action> = actions.lock().unwrap().iter().map(|(_, a)| *a).collect();
        assert_eq!(actions, vec![Action::OnUp, Action::OnFail, Action::OnUp]);
    }

    #[tokio::test]
    async fn events_surface_halt_to_host() {
        let (probe, _) = scripted_probe(vec![(
            "192.0.2.1",
            vec![good(), ProbeOutcome::failed(), ProbeOutcome::failed()],
        )]);
        let (remedy, _) = recording_remedy(false);
        let (notify, _) = recording_notify();
        let (_tx, rx) = watch::channel(false);

        let events = Arc::new(Mutex::new(Vec::new()));
        let events_in = events.clone();
        let s = supervisor(
            vec![spec("a-side", "192.0.2.1")],
            false,
            Duration::ZERO,
            probe,
            remedy,
            notify,
        )
        .with_event_callback(Arc::new(move |e: &PathEvent| {
            events_in.lock().unwrap().push(e.clone());
        }));

        tokio::time::timeout(Duration::from_secs(5), s.run(rx))
            .await
            .expect("supervisor did not exit");

        let events = events.lock().unwrap();
        assert!(events.iter().any(|e| matches!(
            e,
            PathEvent::Halted { path } if path == "a-side"
        )));
    }
}

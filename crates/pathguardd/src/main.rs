//! pathguardd — the pathguard daemon.
//!
//! Single binary that assembles the monitor around its collaborators:
//! - Ping probe (pathguard-probe)
//! - Hysteresis state machine + supervisor loop (pathguard-monitor)
//! - Remediation dispatcher (pathguard-remedy)
//! - Operator notifications (pathguard-notify)
//!
//! # Usage
//!
//! ```text
//! pathguardd run --config /etc/pathguard.toml
//! pathguardd check --config /etc/pathguard.toml
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::{error, info};

use pathguard_monitor::{NotifyFn, ProbeFn, RemedyFn, Supervisor};
use pathguard_notify::Notifier;
use pathguard_probe::PingProbe;
use pathguard_remedy::Dispatcher;
use pathguard_state::{Action, Config, SupervisorExit};

#[derive(Parser)]
#[command(name = "pathguardd", about = "Redundant path liveness monitor")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the monitor daemon.
    Run {
        /// Path to the configuration file.
        #[arg(long, default_value = "/etc/pathguard.toml")]
        config: PathBuf,
    },
    /// Validate a configuration file and exit.
    Check {
        /// Path to the configuration file.
        #[arg(long, default_value = "/etc/pathguard.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,pathguard=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run { config } => run(&config).await,
        Command::Check { config } => check(&config),
    }
}

fn check(path: &Path) -> anyhow::Result<()> {
    let config = Config::load(path)
        .with_context(|| format!("configuration check failed for {}", path.display()))?;
    println!(
        "configuration OK: {} path(s), interval {}s, peer remediation {}",
        config.paths.len(),
        config.interval_seconds,
        if config.peer.is_some() {
            "configured"
        } else {
            "not configured"
        }
    );
    Ok(())
}

async fn run(config_path: &Path) -> anyhow::Result<()> {
    let config = Config::load(config_path)?;
    info!(
        path = %config_path.display(),
        paths = config.paths.len(),
        interval = config.interval_seconds,
        auto_recover = config.auto_recover,
        "pathguard daemon starting"
    );

    // ── Collaborators ──────────────────────────────────────────

    let notifier = pathguard_notify::from_config(&config.notify);

    let dispatcher = Arc::new(Dispatcher::new(&config.primary, config.peer.as_ref())?);
    info!(primary = %config.primary.url, "remediation dispatcher initialized");

    let probe = Arc::new(PingProbe::new(Duration::from_secs(config.timeout_seconds)));
    info!(timeout = config.timeout_seconds, "probe initialized");

    let probe_fn: ProbeFn = {
        let probe = probe.clone();
        Arc::new(move |target: String| {
            let probe = probe.clone();
            Box::pin(async move { probe.probe(&target).await })
        })
    };
    let remedy_fn: RemedyFn = {
        let dispatcher = dispatcher.clone();
        Arc::new(move |_path: String, action: Action| {
            let dispatcher = dispatcher.clone();
            Box::pin(async move { dispatcher.dispatch(action).await.map_err(Into::into) })
        })
    };
    let notify_fn: NotifyFn = {
        let notifier = notifier.clone();
        Arc::new(move |subject: String, message: String| {
            let notifier = notifier.clone();
            Box::pin(async move { notifier.notify(&subject, &message).await })
        })
    };

    let supervisor = Supervisor::new(&config, probe_fn, remedy_fn, notify_fn);

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        }
    });

    notifier
        .notify("starting", "Testing monitored paths on startup")
        .await;

    // ── Run ────────────────────────────────────────────────────

    let exit = supervisor.run(shutdown_rx).await;

    match exit {
        SupervisorExit::ShutdownRequested => {
            info!("dispatching shutdown remediation");
            if let Err(e) = dispatcher.dispatch(Action::OnShutdown).await {
                error!(error = %e, "shutdown remediation failed");
            }
            notifier
                .notify("cancelled", "Path monitor stopped by operator")
                .await;
            info!("pathguard daemon stopped");
            Ok(())
        }
        SupervisorExit::AllPathsHalted => {
            notifier
                .notify(
                    "monitor exiting",
                    "Every monitored path has failed; manual intervention required",
                )
                .await;
            anyhow::bail!("all monitored paths failed")
        }
    }
}

//! Per-action remediation dispatch.
//!
//! A transition names a symbolic action; the dispatcher resolves it to
//! the configured command sequences and runs them against the primary
//! device first, then the peer. An empty sequence is a no-op (the
//! default for `on_warn`). A failure on one target is logged and does
//! not stop dispatch to the next; the first failure is returned so the
//! caller can log it, and nothing is retried.

use std::sync::Arc;

use tracing::{debug, error, info};

use pathguard_state::{Action, EndpointConfig};

use crate::eapi::EapiClient;
use crate::error::RemedyError;

type BoxFuture<T> = std::pin::Pin<Box<dyn std::future::Future<Output = T> + Send>>;

/// Command channel for one target device.
type ChannelFn = Arc<dyn Fn(Vec<String>) -> BoxFuture<Result<(), RemedyError>> + Send + Sync>;

struct Target {
    label: &'static str,
    endpoint: EndpointConfig,
    channel: ChannelFn,
}

/// Routes actions to the configured targets, in order.
pub struct Dispatcher {
    targets: Vec<Target>,
}

impl Dispatcher {
    /// Build a dispatcher over the command API, primary plus optional
    /// peer.
    pub fn new(
        primary: &EndpointConfig,
        peer: Option<&EndpointConfig>,
    ) -> Result<Self, RemedyError> {
        let mut targets = vec![eapi_target("primary", primary)?];
        if let Some(peer) = peer {
            targets.push(eapi_target("peer", peer)?);
        }
        Ok(Self { targets })
    }

    /// Dispatch an action: run its command sequence on every target
    /// that has one configured.
    pub async fn dispatch(&self, action: Action) -> Result<(), RemedyError> {
        let mut first_err = None;

        for target in &self.targets {
            let commands = target.endpoint.commands(action);
            if commands.is_empty() {
                debug!(target = target.label, ?action, "no remediation configured");
                continue;
            }

            info!(
                target = target.label,
                ?action,
                count = commands.len(),
                "dispatching remediation"
            );
            if let Err(e) = (target.channel)(commands.to_vec()).await {
                error!(
                    target = target.label,
                    ?action,
                    error = %e,
                    "remediation command sequence failed"
                );
                if first_err.is_none() {
                    first_err = Some(e);
                }
            }
        }

        match first_err {
            None => Ok(()),
            Some(e) => Err(e),
        }
    }
}

fn eapi_target(label: &'static str, endpoint: &EndpointConfig) -> Result<Target, RemedyError> {
    let client = EapiClient::new(endpoint)?;
    let channel: ChannelFn = Arc::new(move |commands: Vec<String>| {
        let client = client.clone();
        Box::pin(async move { client.run_commands(&commands).await })
    });
    Ok(Target {
        label,
        endpoint: endpoint.clone(),
        channel,
    })
}

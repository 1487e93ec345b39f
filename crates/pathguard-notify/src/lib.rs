//! pathguard-notify — operator notifications for path transitions.
//!
//! Delivery is best-effort by contract: a notification that cannot be
//! delivered is logged at warn and swallowed, never raised into the
//! monitor core. Two implementations ship: a JSON webhook POST and a
//! log-only fallback.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{info, warn};

use pathguard_state::{NotifyConfig, NotifyMode};

type BoxFuture<T> = std::pin::Pin<Box<dyn std::future::Future<Output = T> + Send>>;

/// Notification collaborator contract. Infallible from the caller's
/// perspective; implementations handle their own failures.
pub trait Notifier: Send + Sync {
    fn notify(&self, subject: &str, message: &str) -> BoxFuture<()>;
}

/// Build the configured notifier.
pub fn from_config(config: &NotifyConfig) -> Arc<dyn Notifier> {
    match config.mode {
        NotifyMode::Log => Arc::new(LogNotifier {
            prefix: config.subject_prefix.clone(),
        }),
        NotifyMode::Webhook => Arc::new(WebhookNotifier {
            // Validated at config load: webhook mode requires a url.
            url: config.url.clone().unwrap_or_default(),
            prefix: config.subject_prefix.clone(),
        }),
    }
}

fn full_subject(prefix: &str, subject: &str) -> String {
    if subject.is_empty() {
        prefix.to_string()
    } else {
        format!("{prefix}: {subject}")
    }
}

/// Log-only delivery. The structured log stream is the operator channel.
pub struct LogNotifier {
    prefix: String,
}

impl Notifier for LogNotifier {
    fn notify(&self, subject: &str, message: &str) -> BoxFuture<()> {
        let subject = full_subject(&self.prefix, subject);
        let message = message.to_string();
        Box::pin(async move {
            info!(%subject, %message, "operator notification");
        })
    }
}

/// JSON POST to a webhook endpoint.
pub struct WebhookNotifier {
    url: String,
    prefix: String,
}

impl Notifier for WebhookNotifier {
    fn notify(&self, subject: &str, message: &str) -> BoxFuture<()> {
        let url = self.url.clone();
        let subject = full_subject(&self.prefix, subject);
        let message = message.to_string();
        Box::pin(async move {
            if let Err(e) = post_webhook(&url, &subject, &message).await {
                warn!(%url, error = %e, "unable to deliver notification");
            }
        })
    }
}

async fn post_webhook(url: &str, subject: &str, message: &str) -> Result<(), String> {
    let uri: http::Uri = url.parse().map_err(|e| format!("invalid url: {e}"))?;
    let authority = match uri.authority() {
        Some(a) => format!("{}:{}", a.host(), uri.port_u16().unwrap_or(80)),
        None => return Err("url missing host".to_string()),
    };
    let path = uri
        .path_and_query()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());

    let body = serde_json::json!({
        "subject": subject,
        "message": message,
    })
    .to_string();

    let stream = tokio::net::TcpStream::connect(&authority)
        .await
        .map_err(|e| format!("connect failed: {e}"))?;
    let io = hyper_util::rt::TokioIo::new(stream);
    let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
        .await
        .map_err(|e| format!("handshake failed: {e}"))?;
    tokio::spawn(async move {
        let _ = conn.await;
    });

    let req = http::Request::builder()
        .method("POST")
        .uri(path.as_str())
        .header("host", &authority)
        .header("content-type", "application/json")
        .header("user-agent", "pathguard/0.1")
        .body(http_body_util::Full::new(Bytes::from(body)))
        .map_err(|e| format!("failed to build request: {e}"))?;

    let resp = sender
        .send_request(req)
        .await
        .map_err(|e| format!("request failed: {e}"))?;
    if !resp.status().is_success() {
        return Err(format!("webhook returned status {}", resp.status()));
    }
    Ok(())
}

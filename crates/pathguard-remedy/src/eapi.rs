//! JSON-RPC command API client.
//!
//! Speaks the switch command API: a `runCmds` call carrying an ordered
//! list of CLI commands, POSTed over HTTP/1.1 with basic auth. One
//! connection per call; no retries — partial failure is reported, not
//! repaired.

use base64::Engine as _;
use bytes::Bytes;
use http_body_util::BodyExt;
use tracing::debug;

use pathguard_state::EndpointConfig;

use crate::error::RemedyError;

/// Client for one command API endpoint.
#[derive(Debug, Clone)]
pub struct EapiClient {
    authority: String,
    /// Origin-form request target, e.g. `/command-api`.
    path: String,
    authorization: Option<String>,
}

impl EapiClient {
    pub fn new(endpoint: &EndpointConfig) -> Result<Self, RemedyError> {
        let uri: http::Uri = endpoint.url.parse().map_err(|e| RemedyError::InvalidUrl {
            url: endpoint.url.clone(),
            reason: format!("{e}"),
        })?;
        let authority = match uri.authority() {
            Some(a) => {
                let host = a.host();
                let port = uri.port_u16().unwrap_or(80);
                format!("{host}:{port}")
            }
            None => {
                return Err(RemedyError::InvalidUrl {
                    url: endpoint.url.clone(),
                    reason: "missing host".to_string(),
                });
            }
        };
        let path = uri
            .path_and_query()
            .map(|p| p.as_str().to_string())
            .unwrap_or_else(|| "/".to_string());

        let authorization = match (&endpoint.username, &endpoint.password) {
            (Some(user), password) => Some(basic_auth(user, password.as_deref().unwrap_or(""))),
            (None, _) => None,
        };

        Ok(Self {
            authority,
            path,
            authorization,
        })
    }

    /// Execute an ordered command sequence. Order is preserved by
    /// sending the whole sequence in a single `runCmds` call.
    pub async fn run_commands(&self, commands: &[String]) -> Result<(), RemedyError> {
        debug!(authority = %self.authority, count = commands.len(), "executing commands");

        let body = rpc_request_body(commands).to_string();

        let stream = tokio::net::TcpStream::connect(&self.authority)
            .await
            .map_err(|source| RemedyError::Connect {
                authority: self.authority.clone(),
                source,
            })?;

        let io = hyper_util::rt::TokioIo::new(stream);
        let (mut sender, conn) = hyper::client::conn::http1::handshake(io).await?;

        // Drive the connection in the background.
        tokio::spawn(async move {
            let _ = conn.await;
        });

        let mut builder = http::Request::builder()
            .method("POST")
            .uri(self.path.as_str())
            .header("host", &self.authority)
            .header("content-type", "application/json")
            .header("user-agent", "pathguard/0.1");
        if let Some(ref auth) = self.authorization {
            builder = builder.header("authorization", auth);
        }
        let req = builder
            .body(http_body_util::Full::new(Bytes::from(body)))
            .map_err(|e| RemedyError::Api(format!("failed to build request: {e}")))?;

        let resp = sender.send_request(req).await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(RemedyError::Status(status));
        }

        let bytes = resp.collect().await?.to_bytes();
        check_rpc_response(&bytes)
    }
}

/// Build the JSON-RPC 2.0 `runCmds` request body.
fn rpc_request_body(commands: &[String]) -> serde_json::Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "method": "runCmds",
        "params": {
            "version": 1,
            "cmds": commands,
            "format": "json",
        },
        "id": "pathguard",
    })
}

/// A 2xx response can still carry a JSON-RPC error member.
fn check_rpc_response(bytes: &[u8]) -> Result<(), RemedyError> {
    let value: serde_json::Value = serde_json::from_slice(bytes)
        .map_err(|e| RemedyError::Api(format!("unparseable response: {e}")))?;

    if let Some(err) = value.get("error") {
        let message = err
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("unknown error");
        return Err(RemedyError::Api(message.to_string()));
    }
    Ok(())
}

fn basic_auth(username: &str, password: &str) -> String {
    let credentials = format!("{username}:{password}");
    format!(
        "Basic {}",
        base64::engine::general_purpose::STANDARD.encode(credentials)
    )
}

//! Remediation error types.

use thiserror::Error;

/// Errors from dispatching remediation commands.
#[derive(Debug, Error)]
pub enum RemedyError {
    #[error("invalid command api url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("connection to {authority} failed: {source}")]
    Connect {
        authority: String,
        #[source]
        source: std::io::Error,
    },

    #[error("http error: {0}")]
    Http(#[from] hyper::Error),

    #[error("command api returned status {0}")]
    Status(http::StatusCode),

    #[error("command api error: {0}")]
    Api(String),
}

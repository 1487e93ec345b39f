//! Error types for configuration loading.

use thiserror::Error;

/// Errors raised while loading or validating the daemon configuration.
///
/// These are fatal at startup only; nothing in the steady-state tick
/// path produces a `ConfigError`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

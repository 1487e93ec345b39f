//! pathguard-state — shared vocabulary for the pathguard daemon.
//!
//! Holds the domain types passed between the monitor, probe, remedy,
//! and notify crates, plus the TOML configuration loader. No I/O
//! beyond reading the config file; the interesting state lives in
//! `pathguard-monitor`.

pub mod config;
pub mod error;
pub mod types;

pub use config::{Config, EndpointConfig, NotifyConfig, NotifyMode, PathSpec};
pub use error::ConfigError;
pub use types::*;

//! pathguard.toml configuration parser.
//!
//! The raw file shape is Option-heavy (`FileConfig` and friends); the
//! loader merges per-path overrides over `[defaults]` and validates the
//! result into the resolved [`Config`] the daemon runs on. Validation
//! failures are fatal at startup and never occur during ticking.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::Action;

// ── Raw file shape ────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
struct FileConfig {
    general: Option<FileGeneral>,
    defaults: Option<FileThresholds>,
    #[serde(default)]
    path: Vec<FilePath>,
    remedy: FileRemedy,
    notify: Option<FileNotify>,
}

#[derive(Debug, Clone, Deserialize)]
struct FileGeneral {
    interval_seconds: Option<u64>,
    timeout_seconds: Option<u64>,
    holddown_seconds: Option<u64>,
    auto_recover: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct FileThresholds {
    warn_threshold_ms: Option<f64>,
    fail_threshold_ms: Option<f64>,
    min_good_count: Option<u32>,
    max_warn_count: Option<u32>,
    max_fail_count: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
struct FilePath {
    name: String,
    target: String,
    interface: Option<String>,
    #[serde(flatten)]
    thresholds: FileThresholds,
}

#[derive(Debug, Clone, Deserialize)]
struct FileRemedy {
    primary: FileEndpoint,
    peer: Option<FileEndpoint>,
}

#[derive(Debug, Clone, Deserialize)]
struct FileEndpoint {
    url: String,
    username: Option<String>,
    password: Option<String>,
    #[serde(default)]
    on_up: Vec<String>,
    #[serde(default)]
    on_warn: Vec<String>,
    #[serde(default)]
    on_fail: Vec<String>,
    #[serde(default)]
    on_shutdown: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct FileNotify {
    mode: Option<NotifyMode>,
    url: Option<String>,
    subject_prefix: Option<String>,
}

// ── Resolved config ───────────────────────────────────────────────

/// Fully resolved daemon configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Tick cadence in seconds.
    pub interval_seconds: u64,
    /// Per-probe timeout in seconds.
    pub timeout_seconds: u64,
    /// Repeating-alert interval while a path stays failed; 0 disables
    /// repeated alerting.
    pub holddown_seconds: u64,
    /// Whether `Failed` paths may recover via consecutive good probes.
    pub auto_recover: bool,
    pub paths: Vec<PathSpec>,
    pub primary: EndpointConfig,
    pub peer: Option<EndpointConfig>,
    pub notify: NotifyConfig,
}

/// One monitored path with its thresholds and transition bounds
/// resolved (defaults merged with per-path overrides).
#[derive(Debug, Clone, PartialEq)]
pub struct PathSpec {
    pub name: String,
    /// Probe destination address. Opaque to the monitor core.
    pub target: String,
    /// Switch interface this path rides on; used in alert text.
    pub interface: Option<String>,
    pub warn_threshold_ms: f64,
    pub fail_threshold_ms: f64,
    pub min_good_count: u32,
    pub max_warn_count: u32,
    pub max_fail_count: u32,
}

/// A command-API endpoint plus its per-action command sequences.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointConfig {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub on_up: Vec<String>,
    pub on_warn: Vec<String>,
    pub on_fail: Vec<String>,
    pub on_shutdown: Vec<String>,
}

impl EndpointConfig {
    /// Ordered command sequence for an action. Empty means no-op.
    pub fn commands(&self, action: Action) -> &[String] {
        match action {
            Action::OnUp => &self.on_up,
            Action::OnWarn => &self.on_warn,
            Action::OnFail => &self.on_fail,
            Action::OnShutdown => &self.on_shutdown,
        }
    }
}

/// How operator notifications are delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifyMode {
    /// Log-only; no external delivery.
    Log,
    /// JSON POST to a webhook URL.
    Webhook,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NotifyConfig {
    pub mode: NotifyMode,
    pub url: Option<String>,
    pub subject_prefix: String,
}

impl Config {
    /// Load and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let raw: FileConfig = toml::from_str(content)?;
        let config = Self::resolve(raw);
        config.validate()?;
        Ok(config)
    }

    fn resolve(raw: FileConfig) -> Self {
        let general = raw.general.unwrap_or(FileGeneral {
            interval_seconds: None,
            timeout_seconds: None,
            holddown_seconds: None,
            auto_recover: None,
        });
        let defaults = raw.defaults.unwrap_or_default();

        let paths = raw
            .path
            .into_iter()
            .map(|p| PathSpec {
                name: p.name,
                target: p.target,
                interface: p.interface,
                warn_threshold_ms: p
                    .thresholds
                    .warn_threshold_ms
                    .or(defaults.warn_threshold_ms)
                    .unwrap_or(4.0),
                fail_threshold_ms: p
                    .thresholds
                    .fail_threshold_ms
                    .or(defaults.fail_threshold_ms)
                    .unwrap_or(8.0),
                min_good_count: p
                    .thresholds
                    .min_good_count
                    .or(defaults.min_good_count)
                    .unwrap_or(3),
                max_warn_count: p
                    .thresholds
                    .max_warn_count
                    .or(defaults.max_warn_count)
                    .unwrap_or(3),
                max_fail_count: p
                    .thresholds
                    .max_fail_count
                    .or(defaults.max_fail_count)
                    .unwrap_or(3),
            })
            .collect();

        let notify = match raw.notify {
            Some(n) => NotifyConfig {
                mode: n.mode.unwrap_or(NotifyMode::Log),
                url: n.url,
                subject_prefix: n.subject_prefix.unwrap_or_else(|| "pathguard".to_string()),
            },
            None => NotifyConfig {
                mode: NotifyMode::Log,
                url: None,
                subject_prefix: "pathguard".to_string(),
            },
        };

        Config {
            interval_seconds: general.interval_seconds.unwrap_or(5),
            timeout_seconds: general.timeout_seconds.unwrap_or(5),
            holddown_seconds: general.holddown_seconds.unwrap_or(0),
            auto_recover: general.auto_recover.unwrap_or(false),
            paths,
            primary: resolve_endpoint(raw.remedy.primary),
            peer: raw.remedy.peer.map(resolve_endpoint),
            notify,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_seconds == 0 {
            return Err(ConfigError::Invalid(
                "general.interval_seconds must be non-zero".to_string(),
            ));
        }
        if self.paths.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one [[path]] must be configured".to_string(),
            ));
        }

        let mut seen = Vec::new();
        for p in &self.paths {
            if seen.contains(&&p.name) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate path name: {}",
                    p.name
                )));
            }
            seen.push(&p.name);

            if p.warn_threshold_ms >= p.fail_threshold_ms {
                return Err(ConfigError::Invalid(format!(
                    "path {}: warn_threshold_ms ({}) must be below fail_threshold_ms ({})",
                    p.name, p.warn_threshold_ms, p.fail_threshold_ms
                )));
            }
            if p.min_good_count == 0 || p.max_warn_count == 0 || p.max_fail_count == 0 {
                return Err(ConfigError::Invalid(format!(
                    "path {}: transition bounds must be non-zero",
                    p.name
                )));
            }
        }

        if self.notify.mode == NotifyMode::Webhook && self.notify.url.is_none() {
            return Err(ConfigError::Invalid(
                "notify.url is required when notify.mode is \"webhook\"".to_string(),
            ));
        }
        Ok(())
    }
}

fn resolve_endpoint(raw: FileEndpoint) -> EndpointConfig {
    EndpointConfig {
        url: raw.url,
        username: raw.username,
        password: raw.password,
        on_up: raw.on_up,
        on_warn: raw.on_warn,
        on_fail: raw.on_fail,
        on_shutdown: raw.on_shutdown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[[path]]
name = "a-side"
target = "192.0.2.1"

[remedy.primary]
url = "http://localhost:8080/command-api"
"#;

    #[test]
    fn parse_minimal_uses_defaults() {
        let config = Config::from_toml(MINIMAL).unwrap();
        assert_eq!(config.interval_seconds, 5);
        assert_eq!(config.holddown_seconds, 0);
        assert!(!config.auto_recover);
        assert_eq!(config.paths.len(), 1);
        assert_eq!(config.paths[0].warn_threshold_ms, 4.0);
        assert_eq!(config.paths[0].fail_threshold_ms, 8.0);
        assert_eq!(config.paths[0].min_good_count, 3);
        assert_eq!(config.notify.mode, NotifyMode::Log);
        assert!(config.peer.is_none());
    }

    #[test]
    fn per_path_override_wins_over_defaults() {
        let toml_str = r#"
[defaults]
warn_threshold_ms = 2.0
fail_threshold_ms = 6.0
max_fail_count = 5

[[path]]
name = "a-side"
target = "192.0.2.1"

[[path]]
name = "b-side"
target = "192.0.2.5"
fail_threshold_ms = 20.0
max_fail_count = 2

[remedy.primary]
url = "http://localhost:8080/command-api"
"#;
        let config = Config::from_toml(toml_str).unwrap();
        assert_eq!(config.paths[0].fail_threshold_ms, 6.0);
        assert_eq!(config.paths[0].max_fail_count, 5);
        assert_eq!(config.paths[1].fail_threshold_ms, 20.0);
        assert_eq!(config.paths[1].max_fail_count, 2);
        // Unoverridden fields still come from defaults.
        assert_eq!(config.paths[1].warn_threshold_ms, 2.0);
    }

    #[test]
    fn full_config_parses() {
        let toml_str = r#"
[general]
interval_seconds = 10
timeout_seconds = 2
holddown_seconds = 300
auto_recover = true

[[path]]
name = "a-side"
target = "192.0.2.1"
interface = "Ethernet52"

[remedy.primary]
url = "http://spine1:8080/command-api"
username = "ops"
password = "secret"
on_up = ["enable", "configure", "interface Ethernet52", "no shutdown"]
on_fail = ["enable", "configure", "interface Ethernet52", "shutdown"]
on_shutdown = ["enable", "configure", "interface Ethernet52", "shutdown"]

[remedy.peer]
url = "http://spine2:8080/command-api"
on_fail = ["enable", "configure", "interface Ethernet12", "shutdown"]

[notify]
mode = "webhook"
url = "http://alerts.example.net/hook"
subject_prefix = "hbm"
"#;
        let config = Config::from_toml(toml_str).unwrap();
        assert!(config.auto_recover);
        assert_eq!(config.holddown_seconds, 300);
        assert_eq!(config.paths[0].interface.as_deref(), Some("Ethernet52"));
        assert_eq!(config.primary.on_up.len(), 4);
        assert_eq!(config.primary.commands(Action::OnWarn), &[] as &[String]);
        let peer = config.peer.unwrap();
        assert_eq!(peer.commands(Action::OnFail).len(), 4);
        assert_eq!(config.notify.subject_prefix, "hbm");
    }

    #[test]
    fn rejects_warn_at_or_above_fail() {
        let toml_str = r#"
[[path]]
name = "a-side"
target = "192.0.2.1"
warn_threshold_ms = 8.0
fail_threshold_ms = 8.0

[remedy.primary]
url = "http://localhost:8080/command-api"
"#;
        let err = Config::from_toml(toml_str).unwrap_err();
        assert!(err.to_string().contains("warn_threshold_ms"));
    }

    #[test]
    fn rejects_zero_bounds() {
        let toml_str = r#"
[[path]]
name = "a-side"
target = "192.0.2.1"
min_good_count = 0

[remedy.primary]
url = "http://localhost:8080/command-api"
"#;
        let err = Config::from_toml(toml_str).unwrap_err();
        assert!(err.to_string().contains("non-zero"));
    }

    #[test]
    fn rejects_zero_interval() {
        let toml_str = r#"
[general]
interval_seconds = 0

[[path]]
name = "a-side"
target = "192.0.2.1"

[remedy.primary]
url = "http://localhost:8080/command-api"
"#;
        assert!(Config::from_toml(toml_str).is_err());
    }

    #[test]
    fn rejects_no_paths() {
        let toml_str = r#"
[remedy.primary]
url = "http://localhost:8080/command-api"
"#;
        let err = Config::from_toml(toml_str).unwrap_err();
        assert!(err.to_string().contains("[[path]]"));
    }

    #[test]
    fn rejects_duplicate_path_names() {
        let toml_str = r#"
[[path]]
name = "a-side"
target = "192.0.2.1"

[[path]]
name = "a-side"
target = "192.0.2.5"

[remedy.primary]
url = "http://localhost:8080/command-api"
"#;
        let err = Config::from_toml(toml_str).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn rejects_webhook_without_url() {
        let toml_str = r#"
[[path]]
name = "a-side"
target = "192.0.2.1"

[remedy.primary]
url = "http://localhost:8080/command-api"

[notify]
mode = "webhook"
"#;
        let err = Config::from_toml(toml_str).unwrap_err();
        assert!(err.to_string().contains("notify.url"));
    }
}

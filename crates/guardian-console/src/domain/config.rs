//! Console configuration, loaded from a TOML file.
//!
//! Every field has a serde default, so a missing file, an empty file and a
//! file written for an older console all load.  A complete file looks like:
//!
//! ```toml
//! [connection]
//! ws_url = "ws://127.0.0.1:8000/ws/dashboard"
//! max_reconnect_attempts = 5
//! retry_delay_ms = 3000
//!
//! [backend]
//! api_base = "http://127.0.0.1:8000/api"
//! request_timeout_ms = 5000
//!
//! [polling]
//! enabled = true
//! stats_interval_ms = 5000
//! agents_interval_ms = 10000
//! incidents_interval_ms = 10000
//! incident_window_hours = 24
//! incident_limit = 5
//!
//! [alerts]
//! standard_ttl_ms = 10000
//! toast_ttl_ms = 5000
//!
//! [console]
//! log_level = "info"
//! event_log_capacity = 50
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use guardian_core::session::PollingConfig;
use guardian_core::{AlertTtls, ReconnectPolicy, SessionConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level console configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConsoleConfig {
    #[serde(default)]
    pub connection: ConnectionSection,
    #[serde(default)]
    pub backend: BackendSection,
    #[serde(default)]
    pub polling: PollingSection,
    #[serde(default)]
    pub alerts: AlertSection,
    #[serde(default)]
    pub console: ConsoleSection,
}

/// Event-stream endpoint and reconnection policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectionSection {
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

/// Backend REST collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackendSection {
    /// Base URL; endpoint paths are appended to it.
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

/// Polling cadence for the backend collaborators.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PollingSection {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_stats_interval_ms")]
    pub stats_interval_ms: u64,
    #[serde(default = "default_list_interval_ms")]
    pub agents_interval_ms: u64,
    #[serde(default = "default_list_interval_ms")]
    pub incidents_interval_ms: u64,
    #[serde(default = "default_incident_window_hours")]
    pub incident_window_hours: u32,
    #[serde(default = "default_incident_limit")]
    pub incident_limit: u32,
}

/// Alert lifetimes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlertSection {
    #[serde(default = "default_standard_ttl_ms")]
    pub standard_ttl_ms: u64,
    #[serde(default = "default_toast_ttl_ms")]
    pub toast_ttl_ms: u64,
}

/// Local console behaviour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConsoleSection {
    /// Fallback log filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_event_log_capacity")]
    pub event_log_capacity: usize,
}

// ── Default value functions (used by serde) ───────────────────────────────────

fn default_ws_url() -> String {
    "ws://127.0.0.1:8000/ws/dashboard".to_string()
}
fn default_max_reconnect_attempts() -> u32 {
    5
}
fn default_retry_delay_ms() -> u64 {
    3_000
}
fn default_api_base() -> String {
    "http://127.0.0.1:8000/api".to_string()
}
fn default_request_timeout_ms() -> u64 {
    5_000
}
fn default_true() -> bool {
    true
}
fn default_stats_interval_ms() -> u64 {
    5_000
}
fn default_list_interval_ms() -> u64 {
    10_000
}
fn default_incident_window_hours() -> u32 {
    24
}
fn default_incident_limit() -> u32 {
    5
}
fn default_standard_ttl_ms() -> u64 {
    10_000
}
fn default_toast_ttl_ms() -> u64 {
    5_000
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_event_log_capacity() -> usize {
    50
}

impl Default for ConnectionSection {
    fn default() -> Self {
        Self {
            ws_url: default_ws_url(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl Default for BackendSection {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl Default for PollingSection {
    fn default() -> Self {
        Self {
            enabled: true,
            stats_interval_ms: default_stats_interval_ms(),
            agents_interval_ms: default_list_interval_ms(),
            incidents_interval_ms: default_list_interval_ms(),
            incident_window_hours: default_incident_window_hours(),
            incident_limit: default_incident_limit(),
        }
    }
}

impl Default for AlertSection {
    fn default() -> Self {
        Self {
            standard_ttl_ms: default_standard_ttl_ms(),
            toast_ttl_ms: default_toast_ttl_ms(),
        }
    }
}

impl Default for ConsoleSection {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            event_log_capacity: default_event_log_capacity(),
        }
    }
}

impl ConsoleConfig {
    /// The core session settings this configuration describes.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            reconnect: ReconnectPolicy {
                max_attempts: self.connection.max_reconnect_attempts,
                retry_delay: Duration::from_millis(self.connection.retry_delay_ms),
            },
            alert_ttls: AlertTtls {
                standard: Duration::from_millis(self.alerts.standard_ttl_ms),
                toast: Duration::from_millis(self.alerts.toast_ttl_ms),
            },
            event_log_capacity: self.console.event_log_capacity,
            polling: PollingConfig {
                enabled: self.polling.enabled,
                stats_interval: Duration::from_millis(self.polling.stats_interval_ms),
                agents_interval: Duration::from_millis(self.polling.agents_interval_ms),
                incidents_interval: Duration::from_millis(self.polling.incidents_interval_ms),
                incident_window_hours: self.polling.incident_window_hours,
                incident_limit: self.polling.incident_limit,
            },
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.backend.request_timeout_ms)
    }
}

// ── File I/O ──────────────────────────────────────────────────────────────────

/// Loads the config at `path`, or the defaults if the file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file exists but cannot be read, or
/// [`ConfigError::Parse`] if it is not valid TOML for this schema.
pub fn load_config(path: &Path) -> Result<ConsoleConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConsoleConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Writes `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config(config: &ConsoleConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_yields_defaults() {
        let cfg: ConsoleConfig = toml::from_str("").unwrap();
        assert_eq!(cfg, ConsoleConfig::default());
        assert_eq!(cfg.connection.ws_url, "ws://127.0.0.1:8000/ws/dashboard");
        assert_eq!(cfg.connection.max_reconnect_attempts, 5);
        assert_eq!(cfg.connection.retry_delay_ms, 3_000);
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        // Arrange
        let toml = r#"
            [connection]
            retry_delay_ms = 1000

            [polling]
            enabled = false
        "#;

        // Act
        let cfg: ConsoleConfig = toml::from_str(toml).unwrap();

        // Assert
        assert_eq!(cfg.connection.retry_delay_ms, 1_000);
        assert_eq!(cfg.connection.max_reconnect_attempts, 5);
        assert!(!cfg.polling.enabled);
        assert_eq!(cfg.polling.stats_interval_ms, 5_000);
        assert_eq!(cfg.alerts.standard_ttl_ms, 10_000);
    }

    #[test]
    fn test_session_config_carries_every_setting() {
        // Arrange
        let mut cfg = ConsoleConfig::default();
        cfg.connection.max_reconnect_attempts = 2;
        cfg.alerts.toast_ttl_ms = 1_500;
        cfg.console.event_log_capacity = 10;

        // Act
        let session = cfg.session_config();

        // Assert
        assert_eq!(session.reconnect.max_attempts, 2);
        assert_eq!(session.reconnect.retry_delay, Duration::from_millis(3_000));
        assert_eq!(session.alert_ttls.toast, Duration::from_millis(1_500));
        assert_eq!(session.alert_ttls.standard, Duration::from_millis(10_000));
        assert_eq!(session.event_log_capacity, 10);
        assert_eq!(session.polling.agents_interval, Duration::from_millis(10_000));
        assert_eq!(session.polling.incident_limit, 5);
    }

    #[test]
    fn test_defaults_match_core_defaults() {
        assert_eq!(ConsoleConfig::default().session_config(), SessionConfig::default());
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let path = std::env::temp_dir().join("guardian-console-test-missing/none.toml");
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg, ConsoleConfig::default());
    }

    #[test]
    fn test_save_then_load_preserves_values() {
        // Arrange
        let dir = std::env::temp_dir().join(format!("guardian-console-test-{}", std::process::id()));
        let path = dir.join("console.toml");
        let mut cfg = ConsoleConfig::default();
        cfg.backend.api_base = "http://10.0.0.5:8000/api".to_string();

        // Act
        save_config(&cfg, &path).unwrap();
        let loaded = load_config(&path).unwrap();

        // Assert
        assert_eq!(loaded, cfg);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        let result: Result<ConsoleConfig, _> = toml::from_str("[connection\nws_url = 1");
        assert!(result.is_err());
        let err: ConfigError = result.unwrap_err().into();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}

//! Configuration structures for deserialisation.
//!
//! These structures map directly to the JSON configuration file format.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Root configuration structure.
///
/// This is the top-level structure that matches the JSON config file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional JSON schema reference (ignored during parsing).
    #[serde(rename = "$schema", default)]
    _schema: Option<String>,

    /// Optional comment field (ignored during parsing).
    #[serde(rename = "_comment", default)]
    _comment: Option<String>,

    /// EPLAN host/edition settings.
    #[serde(default)]
    pub eplan: EplanConfig,

    /// Instance discovery settings.
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// Per-call timeout settings.
    #[serde(default)]
    pub timeouts: TimeoutConfig,

    /// Quiet-mode script hand-off settings.
    #[serde(default)]
    pub quiet: QuietConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.discovery.port_start > self.discovery.port_end {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "Discovery port range is empty: {}..={}",
                    self.discovery.port_start, self.discovery.port_end
                ),
            });
        }
        if self.discovery.probe_timeout_ms == 0 || self.discovery.total_timeout_ms == 0 {
            return Err(ConfigError::ValidationError {
                message: "Discovery timeouts must be non-zero".to_string(),
            });
        }
        let timeouts = [
            self.timeouts.connect_ms,
            self.timeouts.action_ms,
            self.timeouts.quiet_ms,
            self.timeouts.ping_ms,
        ];
        if timeouts.contains(&0) {
            return Err(ConfigError::ValidationError {
                message: "All per-call timeouts must be non-zero".to_string(),
            });
        }
        Ok(())
    }
}

/// EPLAN host selection.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EplanConfig {
    /// Target EPLAN platform version selector (e.g. "2026"). When set,
    /// discovery prefers instances reporting this version.
    #[serde(default)]
    pub target_version: Option<String>,

    /// Host the remoting endpoint listens on. EPLAN only exposes the API
    /// locally, so this is almost always the loopback address.
    #[serde(default = "default_host")]
    pub host: String,
}

impl Default for EplanConfig {
    fn default() -> Self {
        Self {
            target_version: None,
            host: default_host(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

/// Instance discovery settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiscoveryConfig {
    /// First port of the scan range. EPLAN allocates its remoting port from
    /// the ephemeral range starting at 49152.
    #[serde(default = "default_port_start")]
    pub port_start: u16,

    /// Last port of the scan range (inclusive).
    #[serde(default = "default_port_end")]
    pub port_end: u16,

    /// Per-probe handshake timeout in milliseconds.
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    /// Upper bound for the whole scan in milliseconds, regardless of how
    /// many candidate ports are probed.
    #[serde(default = "default_total_timeout_ms")]
    pub total_timeout_ms: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            port_start: default_port_start(),
            port_end: default_port_end(),
            probe_timeout_ms: default_probe_timeout_ms(),
            total_timeout_ms: default_total_timeout_ms(),
        }
    }
}

impl DiscoveryConfig {
    /// Per-probe timeout as a [`Duration`].
    #[must_use]
    pub const fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Whole-scan timeout as a [`Duration`].
    #[must_use]
    pub const fn total_timeout(&self) -> Duration {
        Duration::from_millis(self.total_timeout_ms)
    }
}

const fn default_port_start() -> u16 {
    49152
}

const fn default_port_end() -> u16 {
    49200
}

const fn default_probe_timeout_ms() -> u64 {
    500
}

const fn default_total_timeout_ms() -> u64 {
    5000
}

/// Per-call timeout settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimeoutConfig {
    /// Connect + handshake timeout in milliseconds.
    #[serde(default = "default_connect_ms")]
    pub connect_ms: u64,

    /// Timeout for a direct action round-trip in milliseconds.
    #[serde(default = "default_action_ms")]
    pub action_ms: u64,

    /// Timeout for quiet-mode result-file polling in milliseconds.
    #[serde(default = "default_quiet_ms")]
    pub quiet_ms: u64,

    /// Liveness-check timeout in milliseconds.
    #[serde(default = "default_ping_ms")]
    pub ping_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_ms: default_connect_ms(),
            action_ms: default_action_ms(),
            quiet_ms: default_quiet_ms(),
            ping_ms: default_ping_ms(),
        }
    }
}

impl TimeoutConfig {
    /// Connect timeout as a [`Duration`].
    #[must_use]
    pub const fn connect(&self) -> Duration {
        Duration::from_millis(self.connect_ms)
    }

    /// Action round-trip timeout as a [`Duration`].
    #[must_use]
    pub const fn action(&self) -> Duration {
        Duration::from_millis(self.action_ms)
    }

    /// Quiet-mode polling timeout as a [`Duration`].
    #[must_use]
    pub const fn quiet(&self) -> Duration {
        Duration::from_millis(self.quiet_ms)
    }

    /// Ping timeout as a [`Duration`].
    #[must_use]
    pub const fn ping(&self) -> Duration {
        Duration::from_millis(self.ping_ms)
    }
}

const fn default_connect_ms() -> u64 {
    10_000
}

const fn default_action_ms() -> u64 {
    30_000
}

const fn default_quiet_ms() -> u64 {
    30_000
}

const fn default_ping_ms() -> u64 {
    2_000
}

/// Quiet-mode script hand-off settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QuietConfig {
    /// Directory for generated scripts and result files.
    /// Defaults to the OS temporary directory when unset.
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
}

impl QuietConfig {
    /// Resolves the directory used for generated scripts and result files.
    #[must_use]
    pub fn resolved_temp_dir(&self) -> PathBuf {
        self.temp_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_config() {
        let json = r"{}";
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.eplan.host, "127.0.0.1");
        assert_eq!(config.discovery.port_start, 49152);
    }

    #[test]
    fn parse_full_config() {
        let json = r#"{
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "_comment": "Test config",
            "eplan": {
                "target_version": "2026",
                "host": "127.0.0.1"
            },
            "discovery": {
                "port_start": 49152,
                "port_end": 49160,
                "probe_timeout_ms": 250,
                "total_timeout_ms": 2000
            },
            "timeouts": {
                "connect_ms": 5000,
                "action_ms": 20000,
                "quiet_ms": 15000,
                "ping_ms": 1000
            },
            "quiet": {
                "temp_dir": "/tmp/eplan-mcp"
            },
            "logging": {
                "level": "debug"
            }
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.eplan.target_version, Some("2026".to_string()));
        assert_eq!(config.discovery.port_end, 49160);
        assert_eq!(config.timeouts.action(), Duration::from_secs(20));
        assert_eq!(
            config.quiet.temp_dir,
            Some(PathBuf::from("/tmp/eplan-mcp"))
        );
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn discovery_defaults() {
        let config = DiscoveryConfig::default();
        assert_eq!(config.port_start, 49152);
        assert_eq!(config.port_end, 49200);
        assert_eq!(config.probe_timeout(), Duration::from_millis(500));
        assert_eq!(config.total_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn timeout_defaults() {
        let config = TimeoutConfig::default();
        assert_eq!(config.connect(), Duration::from_secs(10));
        assert_eq!(config.action(), Duration::from_secs(30));
        assert_eq!(config.ping(), Duration::from_secs(2));
    }

    #[test]
    fn logging_config_defaults() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "warn");
    }

    #[test]
    fn quiet_temp_dir_falls_back_to_os_temp() {
        let config = QuietConfig::default();
        assert_eq!(config.resolved_temp_dir(), std::env::temp_dir());
    }

    #[test]
    fn reject_inverted_port_range() {
        let json = r#"{
            "discovery": {
                "port_start": 50000,
                "port_end": 49152
            }
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn reject_zero_timeout() {
        let json = r#"{
            "timeouts": {
                "action_ms": 0
            }
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn reject_unknown_fields() {
        let json = r#"{
            "unknown_field": "value"
        }"#;

        let result: Result<Config, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }
}

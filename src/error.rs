//! Error types for eplan-remote-mcp.
//!
//! Two families of errors exist:
//!
//! - [`ConfigError`] for configuration loading and validation
//! - [`EplanError`] for everything that can go wrong between the controller
//!   and a running EPLAN instance
//!
//! All host-facing failures are surfaced to the caller as structured errors;
//! nothing is silently swallowed and nothing is retried automatically,
//! because EPLAN actions are not guaranteed idempotent.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed.
    #[error("failed to parse configuration file: {path}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    NotFound {
        /// Path where the configuration file was expected.
        path: PathBuf,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation failure.
        message: String,
    },
}

/// Errors arising from the connection to, or dispatch against, an EPLAN
/// instance.
#[derive(Error, Debug)]
pub enum EplanError {
    /// No running EPLAN instance matched the selector (or none exist).
    #[error("no EPLAN instance found: {0}")]
    NotFound(String),

    /// The transport could be opened but the handshake did not complete.
    #[error("connection to EPLAN at {endpoint} failed: {message}")]
    Connection {
        /// The `host:port` endpoint that was targeted.
        endpoint: String,
        /// Description of the handshake/transport failure.
        message: String,
    },

    /// An operation was attempted without a live session.
    #[error("not connected to EPLAN; call eplan_connect first")]
    NotConnected,

    /// The host did not respond within the configured bound.
    #[error("EPLAN did not respond within {0:?}")]
    Timeout(Duration),

    /// The host explicitly reported a failure for the action.
    #[error("EPLAN reported an error: {0}")]
    Host(String),

    /// A quiet-mode result file existed but could not be parsed.
    #[error("quiet-mode result file is unreadable: {0}")]
    CorruptResult(String),

    /// Another action is already in flight on the session.
    #[error("session is busy with another action")]
    Busy,

    /// The requested operation is outside the supported action set.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// Underlying transport or file I/O fault.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EplanError {
    /// Short machine-readable kind, used in tool-result payloads.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Connection { .. } => "connection",
            Self::NotConnected => "not_connected",
            Self::Timeout(_) => "timeout",
            Self::Host(_) => "host",
            Self::CorruptResult(_) => "corrupt_result",
            Self::Busy => "busy",
            Self::Unsupported(_) => "unsupported",
            Self::Io(_) => "io",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let error = ConfigError::NotFound {
            path: PathBuf::from("/path/to/config.json"),
        };
        let msg = error.to_string();
        assert!(msg.contains("not found"));
        assert!(msg.contains("config.json"));
    }

    #[test]
    fn validation_error_display() {
        let error = ConfigError::ValidationError {
            message: "invalid setting".to_string(),
        };
        let msg = error.to_string();
        assert!(msg.contains("invalid setting"));
    }

    #[test]
    fn eplan_error_kinds() {
        assert_eq!(EplanError::NotConnected.kind(), "not_connected");
        assert_eq!(EplanError::Busy.kind(), "busy");
        assert_eq!(
            EplanError::Timeout(Duration::from_secs(5)).kind(),
            "timeout"
        );
        assert_eq!(EplanError::Host("boom".into()).kind(), "host");
    }

    #[test]
    fn not_connected_display_names_the_remedy() {
        let msg = EplanError::NotConnected.to_string();
        assert!(msg.contains("eplan_connect"));
    }
}

//! Error types for the parkwatch terminal views.
//!
//! **Panic-Free Policy:** This module follows the project's panic-free guidelines.
//! No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, or `todo!()`.

use std::io;
use thiserror::Error;

// ============================================================================
// TUI Error Type
// ============================================================================

/// Errors raised by the terminal views and the board client.
///
/// Connection errors are retried by the board client; terminal errors end
/// the view and are reported by the binary.
#[derive(Error, Debug)]
pub enum TuiError {
    /// Failed to initialize the terminal.
    ///
    /// Usually means stdout is not a TTY (pipes, scripts, CI).
    #[error("Failed to initialize terminal: {0}")]
    TerminalInit(String),

    /// Failed to cleanup/restore the terminal.
    ///
    /// The terminal may be left in raw mode; running `reset` can help recover.
    #[error("Failed to restore terminal: {0}")]
    TerminalCleanup(String),

    /// Failed to connect to the daemon.
    #[error("Failed to connect to daemon: {0}")]
    DaemonConnection(String),

    /// Protocol version mismatch with daemon
    ///
    /// The board and daemon were built from incompatible releases.
    #[error("Protocol version mismatch (client: {client_version}, daemon: {daemon_version})")]
    VersionMismatch {
        /// The protocol version the board speaks.
        client_version: String,
        /// The protocol version the daemon is running.
        daemon_version: String,
    },

    /// Protocol parse or format error.
    #[error("Protocol error: {0}")]
    ProtocolError(String),

    /// The mark tool could not turn its zones into a zone file.
    #[error("Invalid zones: {0}")]
    Zones(#[from] parkwatch_core::ConfigError),

    /// I/O error passthrough.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON parse error passthrough.
    #[error("Failed to parse message: {0}")]
    ParseError(#[from] serde_json::Error),
}

// ============================================================================
// Result Type Alias
// ============================================================================

/// Convenience Result type alias for TUI operations.
pub type Result<T> = std::result::Result<T, TuiError>;

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_init_error_display() {
        let error = TuiError::TerminalInit("not a TTY".to_string());
        let display = format!("{error}");
        assert!(display.contains("Failed to initialize terminal"));
        assert!(display.contains("not a TTY"));
    }

    #[test]
    fn test_version_mismatch_error_display() {
        let error = TuiError::VersionMismatch {
            client_version: "1.0".to_string(),
            daemon_version: "2.0".to_string(),
        };
        let display = format!("{error}");
        assert!(display.contains("client: 1.0"));
        assert!(display.contains("daemon: 2.0"));
    }

    #[test]
    fn test_io_error_from_conversion() {
        let io_error = io::Error::new(io::ErrorKind::ConnectionRefused, "refused");
        let tui_error: TuiError = io_error.into();
        assert!(matches!(tui_error, TuiError::Io(_)));
    }

    #[test]
    fn test_parse_error_from_conversion() {
        let json_error = serde_json::from_str::<serde_json::Value>("{ nope").unwrap_err();
        let tui_error: TuiError = json_error.into();
        assert!(tui_error.to_string().contains("Failed to parse message"));
    }

    #[test]
    fn test_zone_error_from_conversion() {
        let config_error = parkwatch_core::ConfigError::Parse("bad".to_string());
        let tui_error: TuiError = config_error.into();
        assert!(matches!(tui_error, TuiError::Zones(_)));
    }
}

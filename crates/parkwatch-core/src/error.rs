//! Domain-specific error types following panic-free policy.

use crate::ZoneId;
use thiserror::Error;

/// Errors raised while loading or validating zone configuration.
///
/// All of these are fatal at startup: the daemon refuses to run with a
/// zone set it cannot trust.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The zone file could not be read
    #[error("Failed to read {path}: {reason}")]
    Read { path: String, reason: String },

    /// The zone file is not valid TOML or has the wrong shape
    #[error("Failed to parse zone configuration: {0}")]
    Parse(String),

    /// Serializing a zone set back to TOML failed
    #[error("Failed to serialize zone configuration: {0}")]
    Serialize(String),

    /// A polygon needs at least three vertices to enclose anything
    #[error("Zone '{zone}' has {count} points (minimum {min})")]
    TooFewPoints {
        zone: ZoneId,
        count: usize,
        min: usize,
    },

    /// Two consecutive vertices (including last -> first) are identical
    #[error("Zone '{zone}' repeats point ({x}, {y}) at position {index}")]
    DuplicateConsecutivePoint {
        zone: ZoneId,
        index: usize,
        x: i32,
        y: i32,
    },

    /// Zone identifiers must be unique
    #[error("Duplicate zone id: {0}")]
    DuplicateZoneId(ZoneId),

    /// Invalid field value
    #[error("Invalid {field}: {value} (expected {expected})")]
    InvalidValue {
        field: String,
        value: String,
        expected: String,
    },
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

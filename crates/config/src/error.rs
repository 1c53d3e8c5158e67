//! Configuration error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during configuration loading and validation
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file
    #[error("Failed to read config file at {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write configuration file
    #[error("Failed to write config file at {path}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML configuration
    #[error("Failed to parse TOML config: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Failed to render TOML configuration
    #[error("Failed to serialize TOML config: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// Invalid gas limit
    #[error("Invalid gas limit: {name} must be at least {min}, got {value}")]
    InvalidGasLimit {
        name: &'static str,
        min: u64,
        value: u64,
    },

    /// A size or capacity that must be positive is zero
    #[error("Invalid capacity: {0} must be positive")]
    InvalidCapacity(&'static str),

    /// Invalid publish retry policy
    #[error("Invalid retry policy: {0}")]
    InvalidRetryPolicy(String),

    /// Inconsistent cycle timings
    #[error("Invalid cycle timings: {0}")]
    InvalidCycle(String),

    /// Invalid log level
    #[error("Invalid log level: {0}. Valid values: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    /// Invalid log format
    #[error("Invalid log format: {0}. Valid values: json, pretty")]
    InvalidLogFormat(String),
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

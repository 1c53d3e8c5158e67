//! Tracing initialisation.

use anyhow::{anyhow, Result};
use deltacore_config::LoggingConfig;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines with targets
    Text,
    /// One JSON object per event
    Json,
    /// Condensed human-readable lines
    Compact,
}

impl LogFormat {
    /// Format named by the `[logging]` section.
    pub fn from_config(config: &LoggingConfig) -> Self {
        match config.format.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Text,
        }
    }
}

/// Filter directive for a base level raised by `-v` repetitions.
pub fn filter_directive(level: &str, verbose: u8) -> String {
    let level = level.to_lowercase();
    match verbose {
        0 => level,
        1 => format!("{level},deltacore=debug,deltacore_consensus=debug"),
        2 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

/// Install the global subscriber. `RUST_LOG` takes precedence over the
/// computed filter.
pub fn init_tracing(format: LogFormat, config: &LoggingConfig, verbose: u8) -> Result<()> {
    let directive = filter_directive(&config.level, verbose);
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    let registry = tracing_subscriber::registry().with(env_filter);
    let installed = match format {
        LogFormat::Text => registry.with(fmt::layer().with_target(true)).try_init(),
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
        LogFormat::Compact => registry.with(fmt::layer().compact()).try_init(),
    };
    installed.map_err(|e| anyhow!("failed to install tracing subscriber: {e}"))
}

//! # Delta Core Configuration
//!
//! All engine settings live in one `deltacore.toml` file.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use deltacore_config::Config;
//! use std::path::Path;
//!
//! let config = Config::load(Path::new("deltacore.toml"))?;
//! println!("Delta gas limit: {}", config.builder.delta_gas_limit);
//! println!("Cycle: {}ms", config.cycle.cycle_duration_ms);
//! ```
//!
//! ## Configuration Sections
//!
//! - `[builder]` - Candidate construction (gas limits)
//! - `[voting]` - Voter and elector retention, election threshold
//! - `[cache]` - Delta cache expiry and size
//! - `[history]` - Confirmed hash history size and notification buffer
//! - `[hub]` - DFS publish retry policy
//! - `[cycle]` - Phase offsets and durations within a cycle
//! - `[logging]` - Logging settings (level, format)

mod config;
mod error;

pub use config::*;
pub use error::*;

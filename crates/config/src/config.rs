//! Main configuration module for Delta Core
//!
//! Every engine setting is defined in one `deltacore.toml` file. Missing
//! sections and fields fall back to their defaults.

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Main configuration struct containing all Delta Core settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Candidate construction
    pub builder: BuilderConfig,

    /// Voting and election
    pub voting: VotingConfig,

    /// Delta cache
    pub cache: CacheConfig,

    /// Confirmed delta hash history
    pub history: HistoryConfig,

    /// DFS publication
    pub hub: HubConfig,

    /// Cycle and phase timings
    pub cycle: CycleConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the TOML configuration file
    ///
    /// # Returns
    ///
    /// The parsed and validated configuration, or an error if loading fails.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        info!("Loading configuration from {:?}", path);

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content)?;

        debug!("Configuration parsed successfully, validating...");
        config.validate()?;

        info!(
            "Configuration loaded: delta_gas_limit={}, cycle_duration_ms={}",
            config.builder.delta_gas_limit, config.cycle.cycle_duration_ms
        );

        Ok(config)
    }

    /// Load configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> ConfigResult<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate every section.
    pub fn validate(&self) -> ConfigResult<()> {
        self.builder.validate()?;
        self.voting.validate()?;
        self.cache.validate()?;
        self.history.validate()?;
        self.hub.validate()?;
        self.cycle.validate()?;
        self.logging.validate()?;

        debug!("Configuration validation passed");
        Ok(())
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| ConfigError::FileWrite {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(())
    }
}

// =============================================================================
// Builder Configuration
// =============================================================================

/// Gas floor every accepted entry must declare.
pub const MIN_ENTRY_GAS_LIMIT: u64 = 21_000;

/// Candidate delta construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// Total gas a single delta may consume
    pub delta_gas_limit: u64,

    /// Entries declaring less gas than this are dropped
    pub min_entry_gas_limit: u64,
}

impl BuilderConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.min_entry_gas_limit < MIN_ENTRY_GAS_LIMIT {
            return Err(ConfigError::InvalidGasLimit {
                name: "min_entry_gas_limit",
                min: MIN_ENTRY_GAS_LIMIT,
                value: self.min_entry_gas_limit,
            });
        }

        if self.delta_gas_limit < self.min_entry_gas_limit {
            return Err(ConfigError::InvalidGasLimit {
                name: "delta_gas_limit",
                min: self.min_entry_gas_limit,
                value: self.delta_gas_limit,
            });
        }

        Ok(())
    }
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            delta_gas_limit: 8_000_000,
            min_entry_gas_limit: MIN_ENTRY_GAS_LIMIT,
        }
    }
}

// =============================================================================
// Voting Configuration
// =============================================================================

/// Voter and elector settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VotingConfig {
    /// How long candidate scores are retained (seconds)
    pub candidate_ttl_secs: u64,

    /// How long received favourites are retained (seconds)
    pub favourite_ttl_secs: u64,

    /// Election threshold is `producers / min_vote_ratio_denominator`
    pub min_vote_ratio_denominator: usize,
}

impl VotingConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.candidate_ttl_secs == 0 {
            return Err(ConfigError::InvalidCapacity("voting.candidate_ttl_secs"));
        }
        if self.favourite_ttl_secs == 0 {
            return Err(ConfigError::InvalidCapacity("voting.favourite_ttl_secs"));
        }
        if self.min_vote_ratio_denominator == 0 {
            return Err(ConfigError::InvalidCapacity(
                "voting.min_vote_ratio_denominator",
            ));
        }
        Ok(())
    }

    /// Candidate retention as a [`Duration`].
    pub fn candidate_ttl(&self) -> Duration {
        Duration::from_secs(self.candidate_ttl_secs)
    }

    /// Favourite retention as a [`Duration`].
    pub fn favourite_ttl(&self) -> Duration {
        Duration::from_secs(self.favourite_ttl_secs)
    }
}

impl Default for VotingConfig {
    fn default() -> Self {
        Self {
            candidate_ttl_secs: 180,
            favourite_ttl_secs: 180,
            min_vote_ratio_denominator: 3,
        }
    }
}

// =============================================================================
// Cache Configuration
// =============================================================================

/// Delta cache expiry policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Expiry of confirmed deltas (seconds, 0 = never)
    pub confirmed_ttl_secs: u64,

    /// Expiry of locally produced deltas (seconds)
    pub local_ttl_secs: u64,

    /// Upper bound on cached deltas
    pub max_entries: usize,
}

impl CacheConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.local_ttl_secs == 0 {
            return Err(ConfigError::InvalidCapacity("cache.local_ttl_secs"));
        }
        if self.max_entries == 0 {
            return Err(ConfigError::InvalidCapacity("cache.max_entries"));
        }
        Ok(())
    }

    /// Confirmed delta expiry, `None` when they never expire.
    pub fn confirmed_ttl(&self) -> Option<Duration> {
        (self.confirmed_ttl_secs > 0).then(|| Duration::from_secs(self.confirmed_ttl_secs))
    }

    /// Local delta expiry.
    pub fn local_ttl(&self) -> Duration {
        Duration::from_secs(self.local_ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            confirmed_ttl_secs: 0,
            local_ttl_secs: 180,
            max_entries: 100_000,
        }
    }
}

// =============================================================================
// History Configuration
// =============================================================================

/// Confirmed delta hash history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Number of (hash, timestamp) pairs retained
    pub capacity: usize,

    /// Buffer of the hash update notification channel
    pub channel_capacity: usize,
}

impl HistoryConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.capacity == 0 {
            return Err(ConfigError::InvalidCapacity("history.capacity"));
        }
        if self.channel_capacity == 0 {
            return Err(ConfigError::InvalidCapacity("history.channel_capacity"));
        }
        Ok(())
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: 10_000,
            channel_capacity: 1024,
        }
    }
}

// =============================================================================
// Hub Configuration
// =============================================================================

/// Largest allowed backoff exponent; keeps `2^n` in range.
pub const MAX_BACKOFF_EXPONENT_LIMIT: u32 = 20;

/// DFS publication retry policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Attempts before giving up on a publish
    pub max_publish_retries: u32,

    /// Base of the exponential backoff (milliseconds)
    pub retry_base_delay_ms: u64,

    /// Cap on the backoff exponent
    pub max_backoff_exponent: u32,
}

impl HubConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_publish_retries == 0 {
            return Err(ConfigError::InvalidRetryPolicy(
                "max_publish_retries must be at least 1".to_string(),
            ));
        }
        if self.max_backoff_exponent > MAX_BACKOFF_EXPONENT_LIMIT {
            return Err(ConfigError::InvalidRetryPolicy(format!(
                "max_backoff_exponent must be <= {}, got {}",
                MAX_BACKOFF_EXPONENT_LIMIT, self.max_backoff_exponent
            )));
        }
        Ok(())
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            max_publish_retries: 4,
            retry_base_delay_ms: 1000,
            max_backoff_exponent: 6,
        }
    }
}

// =============================================================================
// Cycle Configuration
// =============================================================================

/// Phase offsets within a cycle.
///
/// Each phase starts Producing at its offset and switches to Collecting
/// `production_time_ms` later. Phases must not overlap and must fit in the
/// cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CycleConfig {
    /// Construction phase offset (milliseconds)
    pub construction_offset_ms: u64,

    /// Campaigning phase offset (milliseconds)
    pub campaigning_offset_ms: u64,

    /// Voting phase offset (milliseconds)
    pub voting_offset_ms: u64,

    /// Synchronisation phase offset (milliseconds)
    pub synchronisation_offset_ms: u64,

    /// Producing window of each phase (milliseconds)
    pub production_time_ms: u64,

    /// Collecting window of each phase (milliseconds)
    pub collection_time_ms: u64,

    /// Total cycle length (milliseconds)
    pub cycle_duration_ms: u64,
}

impl CycleConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.cycle_duration_ms == 0 {
            return Err(ConfigError::InvalidCycle(
                "cycle_duration_ms must be positive".to_string(),
            ));
        }
        if self.production_time_ms == 0 {
            return Err(ConfigError::InvalidCycle(
                "production_time_ms must be positive".to_string(),
            ));
        }

        let window = self.production_time_ms + self.collection_time_ms;
        let offsets = self.offsets();
        for pair in offsets.windows(2) {
            let (start, next) = (pair[0], pair[1]);
            if start + window > next {
                return Err(ConfigError::InvalidCycle(format!(
                    "phase at {}ms overlaps the phase at {}ms",
                    start, next
                )));
            }
        }

        let last = offsets[offsets.len() - 1];
        if last + window > self.cycle_duration_ms {
            return Err(ConfigError::InvalidCycle(format!(
                "last phase ends at {}ms, after the {}ms cycle",
                last + window,
                self.cycle_duration_ms
            )));
        }

        Ok(())
    }

    /// Phase offsets in cycle order.
    pub fn offsets(&self) -> [u64; 4] {
        [
            self.construction_offset_ms,
            self.campaigning_offset_ms,
            self.voting_offset_ms,
            self.synchronisation_offset_ms,
        ]
    }
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            construction_offset_ms: 0,
            campaigning_offset_ms: 5_000,
            voting_offset_ms: 10_000,
            synchronisation_offset_ms: 15_000,
            production_time_ms: 2_000,
            collection_time_ms: 2_000,
            cycle_duration_ms: 20_000,
        }
    }
}

// =============================================================================
// Logging Configuration
// =============================================================================

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (json, pretty)
    pub format: String,
}

impl LoggingConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(self.level.clone()));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.format.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogFormat(self.format.clone()));
        }

        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

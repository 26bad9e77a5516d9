//! Configuration loading and management
//!
//! # Hierarchy
//!
//! Configuration is loaded in this order (later overrides earlier):
//! 1. Built-in defaults
//! 2. Config file (TOML)
//! 3. Environment variables: `WORKPOOL_*`
//! 4. CLI flags
//!
//! # Example Config
//!
//! ```toml
//! [pool]
//! parallel_workers = 4
//! rpc_timeout_ms = 5000
//! refill_on_launch_failure = false
//! log_filter = "info,orchestrator=debug"
//!
//! [demo]
//! time_scale = 0.5
//! stop_one_in = 10
//! tick_ms = 100
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tap::TapFallible;
use tracing::{debug, warn};

use crate::{Error, Result};

/// Environment variable overriding `pool.parallel_workers`.
pub const ENV_PARALLEL_WORKERS: &str = "WORKPOOL_PARALLEL_WORKERS";
/// Environment variable overriding `pool.rpc_timeout_ms`.
pub const ENV_RPC_TIMEOUT_MS: &str = "WORKPOOL_RPC_TIMEOUT_MS";
/// Environment variable overriding `pool.log_filter`.
pub const ENV_LOG_FILTER: &str = "WORKPOOL_LOG_FILTER";

// ═══════════════════════════════════════════════════════════════════════════
// CONFIGURATION STRUCTURES
// ═══════════════════════════════════════════════════════════════════════════

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Orchestration settings.
    #[serde(default)]
    pub pool: PoolConfig,
    /// Settings for the bundled document demo.
    #[serde(default)]
    pub demo: DemoConfig,
}

/// Settings for one orchestration run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PoolConfig {
    /// Maximum number of workers active at the same time.
    #[serde(default = "default_parallel_workers")]
    pub parallel_workers: usize,

    /// Timeout for request/response calls into actors.
    #[serde(default = "default_rpc_timeout_ms")]
    pub rpc_timeout_ms: u64,

    /// Launch the next waiting item right away when a launch fails,
    /// instead of leaving the slot empty.
    #[serde(default)]
    pub refill_on_launch_failure: bool,

    /// Default tracing filter, used when `RUST_LOG` is not set.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            parallel_workers: default_parallel_workers(),
            rpc_timeout_ms: default_rpc_timeout_ms(),
            refill_on_launch_failure: false,
            log_filter: default_log_filter(),
        }
    }
}

impl PoolConfig {
    /// Create a config for testing with short timeouts.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            parallel_workers: 2,
            rpc_timeout_ms: 1000,
            refill_on_launch_failure: false,
            log_filter: "debug".to_string(),
        }
    }

    /// Set the parallelism bound.
    #[must_use]
    pub fn with_parallel_workers(mut self, parallel_workers: usize) -> Self {
        self.parallel_workers = parallel_workers;
        self
    }

    /// Enable or disable refilling a slot after a launch failure.
    #[must_use]
    pub fn with_refill_on_launch_failure(mut self, refill: bool) -> Self {
        self.refill_on_launch_failure = refill;
        self
    }

    /// RPC timeout as a [`Duration`].
    #[must_use]
    pub const fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }

    /// Validate the configuration.
    ///
    /// A `parallel_workers` of 0 is accepted: such a run schedules nothing
    /// and completes immediately.
    ///
    /// # Errors
    ///
    /// Returns error if a field is out of range.
    pub fn validate(&self) -> Result<()> {
        if self.rpc_timeout_ms == 0 {
            return Err(Error::invalid_config(
                "pool.rpc_timeout_ms",
                "must be greater than 0",
            ));
        }

        if self.log_filter.trim().is_empty() {
            return Err(Error::invalid_config("pool.log_filter", "must not be empty"));
        }

        if self.parallel_workers == 0 {
            warn!("pool.parallel_workers is 0, no work item will ever be started");
        }

        Ok(())
    }
}

/// Settings for the bundled document demo.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DemoConfig {
    /// Seconds of simulated work per unit of document size.
    #[serde(default = "default_time_scale")]
    pub time_scale: f64,

    /// On every tick, stop a random worker with probability 1/N (0 disables).
    #[serde(default = "default_stop_one_in")]
    pub stop_one_in: u32,

    /// Interval between completion checks, in milliseconds.
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            time_scale: default_time_scale(),
            stop_one_in: default_stop_one_in(),
            tick_ms: default_tick_ms(),
        }
    }
}

impl DemoConfig {
    /// Interval between completion checks.
    #[must_use]
    pub const fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns error if a field is out of range.
    pub fn validate(&self) -> Result<()> {
        if !self.time_scale.is_finite() || self.time_scale < 0.0 {
            return Err(Error::invalid_config(
                "demo.time_scale",
                "must be a finite, non-negative number",
            ));
        }

        if self.tick_ms == 0 {
            return Err(Error::invalid_config("demo.tick_ms", "must be greater than 0"));
        }

        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// LOADING
// ═══════════════════════════════════════════════════════════════════════════

impl Config {
    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns error if the TOML is malformed or has wrongly typed fields.
    pub fn from_toml_str(input: &str) -> Result<Self> {
        toml::from_str(input)
            .map_err(|e| Error::toml_parse_failed(e.to_string()))
            .tap_err(|e| warn!(error = %e, "Failed to parse configuration"))
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::file_read_failed(path, e.to_string()))?;
        debug!(path = %path.display(), "Loaded configuration file");
        Self::from_toml_str(&content)
    }

    /// Apply `WORKPOOL_*` overrides using the given variable lookup.
    ///
    /// # Errors
    ///
    /// Returns error if an override is present but not parseable.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_PARALLEL_WORKERS) {
            self.pool.parallel_workers = raw.trim().parse().map_err(|_| {
                Error::invalid_config(ENV_PARALLEL_WORKERS, format!("not a count: '{raw}'"))
            })?;
        }

        if let Some(raw) = lookup(ENV_RPC_TIMEOUT_MS) {
            self.pool.rpc_timeout_ms = raw.trim().parse().map_err(|_| {
                Error::invalid_config(ENV_RPC_TIMEOUT_MS, format!("not milliseconds: '{raw}'"))
            })?;
        }

        if let Some(raw) = lookup(ENV_LOG_FILTER) {
            self.pool.log_filter = raw;
        }

        Ok(self)
    }

    /// Apply overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns error if an override is present but not parseable.
    pub fn with_process_env(self) -> Result<Self> {
        self.with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Validate every section.
    ///
    /// # Errors
    ///
    /// Returns the first invalid field found.
    pub fn validate(&self) -> Result<()> {
        self.pool.validate()?;
        self.demo.validate()
    }
}

const fn default_parallel_workers() -> usize {
    2
}

const fn default_rpc_timeout_ms() -> u64 {
    5000
}

fn default_log_filter() -> String {
    "info".to_string()
}

const fn default_time_scale() -> f64 {
    1.0
}

const fn default_stop_one_in() -> u32 {
    10
}

const fn default_tick_ms() -> u64 {
    100
}

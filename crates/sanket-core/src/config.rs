//! Configuration management for the Sanket sync engine.
//!
//! Configuration is loaded from (in priority order):
//! 1. Environment variables (SANKET_SYNC__ prefix)
//! 2. Config file (sanket.toml, `[sync]` section)
//! 3. Defaults

use std::time::Duration;

use serde::Deserialize;

use crate::error::{Result, SanketError};

/// Sync engine configuration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SyncConfig {
    /// Base URL of the swarm backend (default: "http://localhost:8000").
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Interval between poll cycles in milliseconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// How long polling stays suppressed after a manual analysis finishes.
    #[serde(default = "default_cooldown")]
    pub cooldown_ms: u64,

    /// Number of recent agent communications fetched per cycle.
    #[serde(default = "default_comms_limit")]
    pub comms_limit: u32,

    /// Per-request timeout for the four read endpoints.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    /// Timeout for the analysis call, which runs a full simulation server-side.
    #[serde(default = "default_analysis_timeout")]
    pub analysis_timeout_ms: u64,
}

fn default_api_base() -> String {
    "http://localhost:8000".to_string()
}

fn default_poll_interval() -> u64 {
    15_000
}

fn default_cooldown() -> u64 {
    5_000
}

fn default_comms_limit() -> u32 {
    50
}

fn default_request_timeout() -> u64 {
    8_000
}

fn default_analysis_timeout() -> u64 {
    60_000
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            poll_interval_ms: default_poll_interval(),
            cooldown_ms: default_cooldown(),
            comms_limit: default_comms_limit(),
            request_timeout_ms: default_request_timeout(),
            analysis_timeout_ms: default_analysis_timeout(),
        }
    }
}

impl SyncConfig {
    /// Load from `{file_prefix}.toml` (optional) and `SANKET_SYNC__` variables.
    ///
    /// A missing `[sync]` section yields the defaults.
    pub fn load(file_prefix: &str) -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::File::with_name(file_prefix).required(false))
            .add_source(
                config::Environment::with_prefix("SANKET")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let loaded = match cfg.get::<SyncConfig>("sync") {
            Ok(c) => c,
            Err(config::ConfigError::NotFound(_)) => SyncConfig::default(),
            Err(e) => return Err(e.into()),
        };
        loaded.validate()?;
        tracing::debug!(
            file_prefix,
            api_base = %loaded.api_base,
            poll_interval_ms = loaded.poll_interval_ms,
            "Sync config loaded"
        );
        Ok(loaded)
    }

    /// Reject values that would make the engine spin or never poll.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(SanketError::InvalidConfig {
                key: "poll_interval_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.comms_limit == 0 {
            return Err(SanketError::InvalidConfig {
                key: "comms_limit",
                reason: "must be greater than zero".to_string(),
            });
        }
        if !self.api_base.starts_with("http://") && !self.api_base.starts_with("https://") {
            return Err(SanketError::InvalidConfig {
                key: "api_base",
                reason: format!("expected an http(s) URL, got {:?}", self.api_base),
            });
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn analysis_timeout(&self) -> Duration {
        Duration::from_millis(self.analysis_timeout_ms)
    }
}

//! Marketplace configuration
//!
//! Loaded from `~/.timebank/config.toml` when present, then overridden by
//! `TIMEBANK_*` environment variables.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::{market, storage};
use crate::ledger::{RatePolicy, SettlementPolicy};
use crate::paths;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    /// How a booking's cost is derived from its duration.
    pub rate_policy: RatePolicy,
    /// When credits move between seeker and provider.
    pub settlement: SettlementPolicy,
    /// Credits minted for each newly registered user.
    pub starting_credits: i64,
    /// SQLite database location (defaults to ~/.timebank/timebank.db).
    pub database_path: Option<PathBuf>,
    pub busy_timeout_ms: u64,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            rate_policy: RatePolicy::default(),
            settlement: SettlementPolicy::default(),
            starting_credits: market::DEFAULT_STARTING_CREDITS,
            database_path: None,
            busy_timeout_ms: storage::DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

impl MarketConfig {
    /// Load from the default config file and apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from_path(&paths::config_file())?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load from a specific file; a missing file yields defaults.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content =
            std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
        let config: MarketConfig =
            toml::from_str(&content).with_context(|| format!("Failed to parse {:?}", path))?;
        config.validate()?;

        tracing::info!(
            rate_policy = ?config.rate_policy,
            settlement = ?config.settlement,
            "Loaded config from {:?}",
            path
        );
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(value) = std::env::var("TIMEBANK_RATE_POLICY") {
            self.rate_policy = value
                .parse::<RatePolicy>()
                .map_err(|e: String| anyhow::anyhow!("Invalid TIMEBANK_RATE_POLICY: {}", e))?;
        }
        if let Ok(value) = std::env::var("TIMEBANK_SETTLEMENT") {
            self.settlement = value
                .parse::<SettlementPolicy>()
                .map_err(|e: String| anyhow::anyhow!("Invalid TIMEBANK_SETTLEMENT: {}", e))?;
        }
        if let Ok(value) = std::env::var("TIMEBANK_STARTING_CREDITS") {
            self.starting_credits = value
                .parse()
                .with_context(|| format!("Invalid TIMEBANK_STARTING_CREDITS '{}'", value))?;
        }
        if let Ok(value) = std::env::var("TIMEBANK_DB") {
            self.database_path = Some(PathBuf::from(value));
        }
        self.validate()
    }

    fn validate(&self) -> Result<()> {
        if self.starting_credits < 0 {
            anyhow::bail!("starting_credits must not be negative");
        }
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(paths::database_path)
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

use std::path::Path;

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::{Config, TierConfig};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: [&str; 2] = ["json", "pretty"];

/// Reasons a merged configuration is rejected.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("logging.level must be one of trace, debug, info, warn, error (got {0:?})")]
    InvalidLogLevel(String),

    #[error("logging.format must be json or pretty (got {0:?})")]
    InvalidLogFormat(String),

    #[error("database.path is empty")]
    EmptyDatabasePath,

    #[error("database.max_connections must be at least 1 (got {0})")]
    InvalidMaxConnections(u32),

    #[error("sweeper.interval_secs must be at least 1 (got {0})")]
    InvalidSweepInterval(u64),

    #[error("sweeper.batch_limit must be at least 1 (got {0})")]
    InvalidBatchLimit(u32),

    #[error("no escalation tiers configured")]
    NoTiers,

    #[error("tier {tier}: sla_horas must be above 0 and at most {max} hours (got {value})", max = TierConfig::MAX_SLA_HORAS)]
    InvalidSla { tier: usize, value: f64 },

    #[error("tier {0}: department is empty")]
    EmptyDepartment(usize),

    #[error("notification.channel_capacity must be at least 1 (got {0})")]
    InvalidChannelCapacity(usize),

    #[error("retry.max_retries must be at least 1 (got {0})")]
    InvalidMaxRetries(u32),

    #[error("retry.initial_backoff_ms ({0}) must be below retry.max_backoff_ms ({1})")]
    InvalidBackoff(u64, u64),
}

/// Layered configuration loading.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .cascata/config.yaml (project config, created by init)
    /// 3. .cascata/local.yaml (project local overrides, optional)
    /// 4. Environment variables (CASCATA_* prefix, `__` for nesting)
    pub fn load() -> Result<Config> {
        let config: Config = Self::base()
            .merge(Env::prefixed("CASCATA_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Like [`ConfigLoader::load`], with `path` merged above the project files.
    pub fn load_with_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        if !path.exists() {
            anyhow::bail!("Config file not found: {}", path.display());
        }

        let config: Config = Self::base()
            .merge(Yaml::file(path))
            .merge(Env::prefixed("CASCATA_").split("__"))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, ignoring project files and env
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.as_ref().display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    fn base() -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".cascata/config.yaml"))
            .merge(Yaml::file(".cascata/local.yaml"))
    }

    /// Check cross-field constraints serde cannot express.
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        Self::check_database(config)?;
        Self::check_logging(config)?;
        Self::check_sweeper(config)?;
        Self::check_tiers(config)?;
        Self::check_delivery(config)
    }

    fn check_database(config: &Config) -> Result<(), ConfigError> {
        let db = &config.database;
        if db.path.trim().is_empty() {
            Err(ConfigError::EmptyDatabasePath)
        } else if db.max_connections == 0 {
            Err(ConfigError::InvalidMaxConnections(db.max_connections))
        } else {
            Ok(())
        }
    }

    fn check_logging(config: &Config) -> Result<(), ConfigError> {
        let logging = &config.logging;
        if !LOG_LEVELS.contains(&logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(logging.level.clone()));
        }
        if !LOG_FORMATS.contains(&logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(logging.format.clone()));
        }
        Ok(())
    }

    fn check_sweeper(config: &Config) -> Result<(), ConfigError> {
        let sweeper = &config.sweeper;
        if sweeper.interval_secs == 0 {
            Err(ConfigError::InvalidSweepInterval(sweeper.interval_secs))
        } else if sweeper.batch_limit == 0 {
            Err(ConfigError::InvalidBatchLimit(sweeper.batch_limit))
        } else {
            Ok(())
        }
    }

    fn check_tiers(config: &Config) -> Result<(), ConfigError> {
        if config.tiers.is_empty() {
            return Err(ConfigError::NoTiers);
        }
        for (tier, cfg) in (1..).zip(&config.tiers) {
            if !(cfg.sla_horas > 0.0 && cfg.sla_horas <= TierConfig::MAX_SLA_HORAS) {
                return Err(ConfigError::InvalidSla {
                    tier,
                    value: cfg.sla_horas,
                });
            }
            if cfg.department.trim().is_empty() {
                return Err(ConfigError::EmptyDepartment(tier));
            }
        }
        Ok(())
    }

    fn check_delivery(config: &Config) -> Result<(), ConfigError> {
        let retry = &config.retry;
        if config.notification.channel_capacity == 0 {
            Err(ConfigError::InvalidChannelCapacity(config.notification.channel_capacity))
        } else if retry.max_retries == 0 {
            Err(ConfigError::InvalidMaxRetries(retry.max_retries))
        } else if retry.initial_backoff_ms >= retry.max_backoff_ms {
            Err(ConfigError::InvalidBackoff(retry.initial_backoff_ms, retry.max_backoff_ms))
        } else {
            Ok(())
        }
    }
}

use serde::{Deserialize, Serialize};

/// Main configuration structure for Cascata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Expiry sweeper configuration
    #[serde(default)]
    pub sweeper: SweeperConfig,

    /// Escalation tiers, index 0 is tier 1
    #[serde(default = "default_tiers")]
    pub tiers: Vec<TierConfig>,

    /// Notification channel configuration
    #[serde(default)]
    pub notification: NotificationConfig,

    /// Retry policy for transient store failures
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            logging: LoggingConfig::default(),
            sweeper: SweeperConfig::default(),
            tiers: default_tiers(),
            notification: NotificationConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl Config {
    /// Budget for a 1-based tier, if the tier is configured.
    pub fn sla_horas(&self, tier: u32) -> Option<f64> {
        tier_index(tier).and_then(|i| self.tiers.get(i)).map(|t| t.sla_horas)
    }
}

fn tier_index(tier: u32) -> Option<usize> {
    (tier as usize).checked_sub(1)
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// Path to `SQLite` database file
    #[serde(default = "default_database_path")]
    pub path: String,

    /// Maximum number of database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// How long a writer waits on a locked database before giving up
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_database_path() -> String {
    ".cascata/cascata.db".to_string()
}

const fn default_max_connections() -> u32 {
    5
}

const fn default_busy_timeout_ms() -> u64 {
    5_000
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl DatabaseConfig {
    pub fn url(&self) -> String {
        if self.path.starts_with("sqlite:") {
            self.path.clone()
        } else {
            format!("sqlite:{}", self.path)
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling JSON log files; stdout only when unset
    #[serde(default)]
    pub log_dir: Option<String>,

    /// Number of days to retain logs
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

const fn default_retention_days() -> u32 {
    30
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            retention_days: default_retention_days(),
        }
    }
}

/// Expiry sweeper configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SweeperConfig {
    /// Seconds between sweeps
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Sweep once immediately on start
    #[serde(default = "default_true")]
    pub run_on_startup: bool,

    /// Maximum overdue tiers handled per sweep
    #[serde(default = "default_batch_limit")]
    pub batch_limit: u32,

    /// Overdue tiers advanced concurrently within one sweep
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

const fn default_interval_secs() -> u64 {
    30
}

const fn default_true() -> bool {
    true
}

const fn default_batch_limit() -> u32 {
    500
}

const fn default_concurrency() -> usize {
    4
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            run_on_startup: default_true(),
            batch_limit: default_batch_limit(),
            concurrency: default_concurrency(),
        }
    }
}

/// One escalation tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TierConfig {
    /// Department whose on-duty agents are addressed by this tier
    pub department: String,

    /// Hours the tier has before escalating
    pub sla_horas: f64,
}

impl TierConfig {
    /// Longest budget a tier may carry: one year.
    pub const MAX_SLA_HORAS: f64 = 24.0 * 366.0;

    pub fn new(department: impl Into<String>, sla_horas: f64) -> Self {
        Self {
            department: department.into(),
            sla_horas,
        }
    }
}

fn default_tiers() -> Vec<TierConfig> {
    vec![
        TierConfig::new("atendimento", 1.0),
        TierConfig::new("gerencia", 2.0),
    ]
}

/// Notification channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct NotificationConfig {
    /// Webhook receiving notification payloads; log-only when unset
    #[serde(default)]
    pub webhook_url: Option<String>,

    /// Pending notifications buffered before new ones are dropped
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Webhook request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

const fn default_channel_capacity() -> usize {
    256
}

const fn default_timeout_secs() -> u64 {
    10
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            channel_capacity: default_channel_capacity(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Retry policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial backoff delay in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff delay in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_initial_backoff_ms() -> u64 {
    200
}

const fn default_max_backoff_ms() -> u64 {
    5_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sla_horas_lookup_is_one_based() {
        let config = Config::default();
        assert_eq!(config.sla_horas(1), Some(1.0));
        assert_eq!(config.sla_horas(2), Some(2.0));
        assert_eq!(config.sla_horas(0), None);
        assert_eq!(config.sla_horas(3), None);
    }

    #[test]
    fn test_database_url() {
        let mut db = DatabaseConfig::default();
        assert_eq!(db.url(), "sqlite:.cascata/cascata.db");
        db.path = "sqlite::memory:".to_string();
        assert_eq!(db.url(), "sqlite::memory:");
    }
}

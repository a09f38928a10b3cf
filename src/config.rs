//! Monitor configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

/// Top-level configuration for the monitoring core.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Path of the SQLite trace database.
    pub destination: PathBuf,

    /// Handle table geometry.
    #[serde(default)]
    pub table: TableConfig,

    /// Remove a pre-existing trace database before opening. Default: false.
    #[serde(default)]
    pub purge_on_init: bool,

    /// Pause between commit attempts while the store reports busy.
    /// Default: 10ms.
    #[serde(default = "default_busy_retry_interval", with = "humantime_serde")]
    pub busy_retry_interval: Duration,
}

/// Handle table geometry.
#[derive(Debug, Clone, Deserialize)]
pub struct TableConfig {
    /// Number of independently locked shards. Default: 16.
    #[serde(default = "default_shards")]
    pub shards: usize,

    /// Hash buckets per shard. Default: 64.
    #[serde(default = "default_buckets_per_shard")]
    pub buckets_per_shard: usize,

    /// Maximum simultaneously open monitored handles. Default: 65536.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

// --- Default value functions ---

fn default_shards() -> usize {
    16
}

fn default_buckets_per_shard() -> usize {
    64
}

fn default_max_entries() -> usize {
    65_536
}

fn default_busy_retry_interval() -> Duration {
    Duration::from_millis(10)
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            shards: default_shards(),
            buckets_per_shard: default_buckets_per_shard(),
            max_entries: default_max_entries(),
        }
    }
}

impl Config {
    /// Configuration with defaults for the given trace destination.
    pub fn new(destination: impl Into<PathBuf>) -> Self {
        Self {
            destination: destination.into(),
            table: TableConfig::default(),
            purge_on_init: false,
            busy_retry_interval: default_busy_retry_interval(),
        }
    }

    /// Load configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;

        let cfg: Config = serde_yaml::from_str(&data)
            .with_context(|| format!("parsing config file {}", path.display()))?;

        cfg.validate()?;

        Ok(cfg)
    }

    /// Validate the configuration for required fields and consistency.
    pub fn validate(&self) -> Result<()> {
        if self.destination.as_os_str().is_empty() {
            bail!("destination is required");
        }

        if self.table.shards == 0 {
            bail!("table.shards must be positive");
        }

        if self.table.buckets_per_shard == 0 {
            bail!("table.buckets_per_shard must be positive");
        }

        if self.table.max_entries == 0 {
            bail!("table.max_entries must be positive");
        }

        if self.busy_retry_interval.is_zero() {
            bail!("busy_retry_interval must be positive");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let cfg = Config::new("/tmp/trace.db");
        assert_eq!(cfg.table.shards, 16);
        assert_eq!(cfg.table.buckets_per_shard, 64);
        assert_eq!(cfg.table.max_entries, 65_536);
        assert!(!cfg.purge_on_init);
        assert_eq!(cfg.busy_retry_interval, Duration::from_millis(10));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_parse_with_defaults_applied() {
        let cfg: Config = serde_yaml::from_str("destination: /var/log/trace.db\n")
            .expect("minimal document parses");
        assert_eq!(cfg.destination, PathBuf::from("/var/log/trace.db"));
        assert_eq!(cfg.table.shards, 16);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_parse_overrides() {
        let doc = "destination: /tmp/t.db
purge_on_init: true
busy_retry_interval: 50ms
table:
  shards: 4
  buckets_per_shard: 8
  max_entries: 128
";
        let cfg: Config = serde_yaml::from_str(doc).expect("document parses");

        assert!(cfg.purge_on_init);
        assert_eq!(cfg.busy_retry_interval, Duration::from_millis(50));
        assert_eq!(cfg.table.shards, 4);
        assert_eq!(cfg.table.buckets_per_shard, 8);
        assert_eq!(cfg.table.max_entries, 128);
    }

    #[test]
    fn test_validation_empty_destination() {
        let cfg = Config::new("");
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("destination"));
    }

    #[test]
    fn test_validation_zero_shards() {
        let mut cfg = Config::new("/tmp/t.db");
        cfg.table.shards = 0;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("table.shards"));
    }

    #[test]
    fn test_validation_zero_busy_retry_interval() {
        let mut cfg = Config::new("/tmp/t.db");
        cfg.busy_retry_interval = Duration::ZERO;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("busy_retry_interval"));
    }
}

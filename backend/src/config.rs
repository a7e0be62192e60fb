//! # Tracker Configuration
//!
//! Settings are kept in `tracker_config.yaml` at the root of the data
//! directory. Every field has a default, so a partial or missing file is
//! fine; a missing file is written out with the defaults on first load.
//!
//! ```yaml
//! cache_ttl_seconds: 0
//! collapse_after_day: false
//! span_policy: wrap_midnight
//! concurrency:
//!   mode: last_writer_wins
//! recent_count: 3
//! utc_offset_minutes: 60
//! ```

use anyhow::{Context, Result};
use chrono::{FixedOffset, Local, NaiveDateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::{ConcurrencyPolicy, LogPolicy, SpanPolicy};
use crate::storage::CachePolicy;

pub const CONFIG_FILE_NAME: &str = "tracker_config.yaml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// How long collection reads are served from cache (0 disables caching)
    pub cache_ttl_seconds: u64,
    /// Show "more than a day" instead of hours past 24h
    pub collapse_after_day: bool,
    pub span_policy: SpanPolicy,
    pub concurrency: ConcurrencyPolicy,
    /// Number of recent entries shown per category
    pub recent_count: usize,
    /// Fixed offset from UTC used for "now"; the system zone when absent
    pub utc_offset_minutes: Option<i32>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            cache_ttl_seconds: 0,
            collapse_after_day: false,
            span_policy: SpanPolicy::default(),
            concurrency: ConcurrencyPolicy::default(),
            recent_count: 3,
            utc_offset_minutes: None,
        }
    }
}

impl TrackerConfig {
    pub fn file_path(data_directory: &Path) -> PathBuf {
        data_directory.join(CONFIG_FILE_NAME)
    }

    /// Load the config from the data directory, creating it with defaults if missing
    pub fn load_or_create(data_directory: &Path) -> Result<Self> {
        let path = Self::file_path(data_directory);

        if !path.exists() {
            let config = Self::default();
            config.save(data_directory)?;
            info!("Created default configuration at {}", path.display());
            return Ok(config);
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Write the config through a temp file so a crash never leaves it half written
    pub fn save(&self, data_directory: &Path) -> Result<()> {
        let path = Self::file_path(data_directory);
        let temp_path = path.with_extension("yaml.tmp");

        let yaml = serde_yaml::to_string(self)?;
        fs::write(&temp_path, yaml)
            .with_context(|| format!("Failed to write {}", temp_path.display()))?;
        fs::rename(&temp_path, &path)
            .with_context(|| format!("Failed to replace {}", path.display()))?;
        Ok(())
    }

    pub fn log_policy(&self) -> LogPolicy {
        LogPolicy {
            span_policy: self.span_policy,
            concurrency: self.concurrency,
            collapse_after_day: self.collapse_after_day,
        }
    }

    pub fn cache_policy(&self) -> CachePolicy {
        CachePolicy::with_ttl(Duration::from_secs(self.cache_ttl_seconds))
    }

    /// Current wall-clock time in the configured zone
    pub fn now(&self) -> NaiveDateTime {
        match self.utc_offset_minutes {
            Some(minutes) => match minutes.checked_mul(60).and_then(FixedOffset::east_opt) {
                Some(offset) => Utc::now().with_timezone(&offset).naive_local(),
                None => {
                    warn!("Ignoring out of range UTC offset: {} minutes", minutes);
                    Local::now().naive_local()
                }
            },
            None => Local::now().naive_local(),
        }
    }
}

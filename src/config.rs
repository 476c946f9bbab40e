//! Configuration for the hasp CLI.
//!
//! The shared lock directory is explicit configuration, never an ambient
//! default baked into the library. The CLI resolves it from, in order:
//! the `--dir` flag, a config file (`--config` or `./hasp.yaml` when
//! present), then built-in defaults. Unknown fields in the YAML are ignored
//! for forward compatibility.

use crate::error::{HaspError, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file looked up in the working directory when `--config` is absent.
pub const CONFIG_FILE_NAME: &str = "hasp.yaml";

fn default_lock_dir() -> PathBuf {
    PathBuf::from(".hasp/locks")
}

fn default_lock_stale_minutes() -> u32 {
    120
}

fn default_max_age_seconds() -> u64 {
    300
}

fn default_poll_interval_ms() -> u64 {
    100
}

/// Configuration for hasp CLI operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding lock record files.
    pub lock_dir: PathBuf,

    /// Minutes after which `list`/`status` annotate a record as STALE.
    /// Display threshold only; breaking is governed by each lock's max age.
    pub lock_stale_minutes: u32,

    /// Max age, in seconds, for locks taken by `hasp run` without
    /// an explicit `--max-age`.
    pub default_max_age_seconds: u64,

    /// Interval between acquisition attempts when `run` waits on a
    /// contended lock.
    pub poll_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lock_dir: default_lock_dir(),
            lock_stale_minutes: default_lock_stale_minutes(),
            default_max_age_seconds: default_max_age_seconds(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Config {
    /// Load config from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            HaspError::UserError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)
            .map_err(|e| HaspError::UserError(format!("failed to parse config YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to a YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| HaspError::UserError(format!("failed to serialize config to YAML: {}", e)))
    }

    /// Resolve the effective config for a CLI invocation.
    ///
    /// An explicit `--config` path must exist; `./hasp.yaml` is used when
    /// present; otherwise defaults apply.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        let local = Path::new(CONFIG_FILE_NAME);
        if local.exists() {
            return Self::load(local);
        }

        Ok(Self::default())
    }

    /// Validate config values.
    pub fn validate(&self) -> Result<()> {
        if self.lock_stale_minutes == 0 {
            return Err(HaspError::UserError(
                "invalid config: lock_stale_minutes must be positive".to_string(),
            ));
        }

        if self.default_max_age_seconds == 0 {
            return Err(HaspError::UserError(
                "invalid config: default_max_age_seconds must be positive".to_string(),
            ));
        }

        if self.poll_interval_ms == 0 {
            return Err(HaspError::UserError(
                "invalid config: poll_interval_ms must be positive".to_string(),
            ));
        }

        Ok(())
    }

    /// Staleness-display threshold as a duration.
    pub fn stale_after(&self) -> Duration {
        Duration::minutes(i64::from(self.lock_stale_minutes))
    }

    /// Default max age for `run` locks as a duration.
    pub fn default_max_age(&self) -> Duration {
        Duration::seconds(self.default_max_age_seconds as i64)
    }

    /// Poll interval for `run` wait loops.
    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.poll_interval_ms)
    }
}

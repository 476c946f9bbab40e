//! Lock record structure and owner-token utilities.

use crate::error::{HaspError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

/// Lock record persisted in the store, one per lock name.
///
/// Equality compares all fields; `acquired_at` carries sub-second precision,
/// so two records written at different instants never compare equal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockRecord {
    /// Name of the contended resource.
    pub name: String,

    /// Owner token of the handle that currently holds the lock
    /// (e.g., `user@HOST:pid:seq:micros`).
    pub owner: String,

    /// Timestamp when the record was written (RFC3339).
    pub acquired_at: DateTime<Utc>,
}

impl LockRecord {
    /// Create a new lock record with the current timestamp.
    pub fn new(name: &str, owner: &str) -> Self {
        Self {
            name: name.to_string(),
            owner: owner.to_string(),
            acquired_at: Utc::now(),
        }
    }

    /// Parse a lock record from a file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            HaspError::StoreError(format!(
                "failed to read lock record '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Self::from_json(&content)
    }

    /// Parse a lock record from a JSON string.
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| HaspError::StoreError(format!("failed to parse lock record: {}", e)))
    }

    /// Serialize the lock record to a JSON string.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| HaspError::StoreError(format!("failed to serialize lock record: {}", e)))
    }

    /// Calculate the age of the record.
    pub fn age(&self) -> Duration {
        Utc::now().signed_duration_since(self.acquired_at)
    }

    /// Check if the record is older than the given threshold.
    pub fn is_stale(&self, max_age: Duration) -> bool {
        self.age() > max_age
    }

    /// Format the age as a human-readable string.
    pub fn age_string(&self) -> String {
        let age = self.age();
        let seconds = age.num_seconds();
        let minutes = age.num_minutes();
        let hours = age.num_hours();
        let days = age.num_days();

        if days > 0 {
            format!("{}d {}h", days, hours % 24)
        } else if hours > 0 {
            format!("{}h {}m", hours, minutes % 60)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds % 60)
        } else {
            format!("{}s", seconds)
        }
    }
}

/// Counter distinguishing handles created by the same process.
static HANDLE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Generate a fresh owner token, unique across live handles.
///
/// Composed of `user@HOST`, the process ID, a process-wide counter, and a
/// microsecond timestamp, so handles collide across neither threads,
/// processes, nor machines.
pub(crate) fn generate_owner_token() -> String {
    let seq = HANDLE_SEQ.fetch_add(1, Ordering::Relaxed);
    format!(
        "{}:{}:{}:{}",
        owner_string(),
        std::process::id(),
        seq,
        Utc::now().timestamp_micros()
    )
}

/// Get the `user@HOST` identity string for owner tokens.
pub(crate) fn owner_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn new_record_is_fresh() {
        let record = LockRecord::new("foo", "tok");
        assert_eq!(record.name, "foo");
        assert_eq!(record.owner, "tok");
        assert!(record.age() < Duration::seconds(1));
    }

    #[test]
    fn json_roundtrip_preserves_fields() {
        let record = LockRecord::new("foo", "alice@box:1:2:3");
        let json = record.to_json().unwrap();

        assert!(json.contains("owner"));
        assert!(json.contains("acquired_at"));

        let parsed = LockRecord::from_json(&json).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn from_json_rejects_garbage() {
        let result = LockRecord::from_json("not json");
        assert!(matches!(result, Err(crate::error::HaspError::StoreError(_))));
    }

    #[test]
    fn is_stale_respects_threshold() {
        let mut record = LockRecord::new("foo", "tok");
        assert!(!record.is_stale(Duration::seconds(5)));

        record.acquired_at = Utc::now() - Duration::seconds(10);
        assert!(record.is_stale(Duration::seconds(5)));
    }

    #[test]
    fn age_string_formats_each_magnitude() {
        let mut record = LockRecord::new("foo", "tok");
        assert!(record.age_string().ends_with('s'));

        record.acquired_at = Utc::now() - Duration::seconds(90);
        assert!(record.age_string().contains('m'));

        record.acquired_at = Utc::now() - Duration::hours(2);
        assert!(record.age_string().contains('h'));

        record.acquired_at = Utc::now() - Duration::days(3);
        assert!(record.age_string().contains('d'));
    }

    #[test]
    fn owner_tokens_are_unique() {
        let a = generate_owner_token();
        let b = generate_owner_token();
        assert_ne!(a, b);
    }

    #[test]
    #[serial]
    fn owner_string_uses_user_env() {
        let previous = std::env::var("USER").ok();
        unsafe {
            std::env::set_var("USER", "testuser");
        }

        let owner = owner_string();
        assert!(owner.starts_with("testuser@"));

        unsafe {
            match previous {
                Some(value) => std::env::set_var("USER", value),
                None => std::env::remove_var("USER"),
            }
        }
    }
}

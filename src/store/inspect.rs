//! Listing and clearing lock records in a file store.
//!
//! These operations exist for operators, not for the lock engine: `list`
//! answers "what is locked right now and by whom", and `clear` removes a
//! record outright. The caller is responsible for verifying that clearing
//! is appropriate (e.g., checking a `--force` flag).

use super::file::FileLockStore;
use super::record::LockRecord;
use crate::error::{HaspError, Result};
use chrono::Duration;
use std::fs;
use std::path::PathBuf;

/// Information about an active lock record.
#[derive(Debug, Clone)]
pub struct LockInfo {
    /// The record file path.
    pub path: PathBuf,

    /// The lock name.
    pub name: String,

    /// The persisted record.
    pub record: LockRecord,

    /// Whether the record is older than the staleness threshold.
    pub is_stale: bool,
}

impl std::fmt::Display for LockInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (owner: {}, age: {}{})",
            self.name,
            self.record.owner,
            self.record.age_string(),
            if self.is_stale { ", STALE" } else { "" }
        )
    }
}

/// List all lock records in the store.
///
/// Records older than `stale_after` are flagged. Scratch files and
/// unparseable records are skipped. Results are sorted by name for
/// consistent output.
pub fn list_locks(store: &FileLockStore, stale_after: Duration) -> Result<Vec<LockInfo>> {
    let mut locks = Vec::new();

    if !store.dir().exists() {
        return Ok(locks);
    }

    let entries = fs::read_dir(store.dir()).map_err(|e| {
        HaspError::StoreError(format!(
            "failed to read lock directory '{}': {}",
            store.dir().display(),
            e
        ))
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| {
            HaspError::StoreError(format!("failed to read lock directory entry: {}", e))
        })?;

        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("lock") {
            continue;
        }

        // Skip records a concurrent writer is mid-flight on.
        let record = match LockRecord::from_file(&path) {
            Ok(record) => record,
            Err(_) => continue,
        };

        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_string();
        let is_stale = record.is_stale(stale_after);

        locks.push(LockInfo {
            path,
            name,
            record,
            is_stale,
        });
    }

    locks.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(locks)
}

/// Look up a single lock record by name.
///
/// Returns `None` when the name is currently unlocked.
pub fn lock_status(
    store: &FileLockStore,
    name: &str,
    stale_after: Duration,
) -> Result<Option<LockInfo>> {
    super::validate_name(name)?;

    let Some(record) = crate::store::LockStore::read(store, name)? else {
        return Ok(None);
    };

    let is_stale = record.is_stale(stale_after);
    Ok(Some(LockInfo {
        path: store.record_path(name),
        name: name.to_string(),
        record,
        is_stale,
    }))
}

/// Clear a lock record regardless of owner.
///
/// # Arguments
///
/// * `store` - The file store holding the record
/// * `name` - The lock name
/// * `stale_after` - Threshold used to annotate the returned info
///
/// # Returns
///
/// * `Ok(LockInfo)` - Information about the cleared record (for audit output)
/// * `Err(HaspError::UserError)` - No record exists for `name`
pub fn clear_lock(store: &FileLockStore, name: &str, stale_after: Duration) -> Result<LockInfo> {
    super::validate_name(name)?;

    let path = store.record_path(name);
    if !path.exists() {
        return Err(HaspError::UserError(format!(
            "lock '{}' does not exist at: {}",
            name,
            path.display()
        )));
    }

    let record = LockRecord::from_file(&path)?;
    let is_stale = record.is_stale(stale_after);

    fs::remove_file(&path).map_err(|e| {
        HaspError::StoreError(format!("failed to clear lock '{}': {}", path.display(), e))
    })?;

    Ok(LockInfo {
        path,
        name: name.to_string(),
        record,
        is_stale,
    })
}

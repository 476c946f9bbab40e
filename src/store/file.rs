//! File-backed lock store adapter.
//!
//! One JSON record per lock name at `<dir>/<name>.lock`. The trait's
//! atomicity guarantees are built from the filesystem's native primitives:
//!
//! - `create` uses **create_new** semantics (exclusive create), so exactly
//!   one of any set of concurrent creators succeeds.
//! - `replace_if_owned` writes a scratch file, fsyncs it, and renames it
//!   over the record, so readers never observe a partial record.
//! - `force_replace` renames the record aside to a caller-unique path
//!   before re-creating it, so exactly one of any set of concurrent
//!   breakers succeeds.
//!
//! Scratch files are named `.<name>.<pid>.<seq>.<ext>` and never collide
//! across processes or threads.

use super::record::LockRecord;
use super::{LockStore, validate_name};
use crate::error::{HaspError, Result};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Counter distinguishing scratch files created by the same process.
static SCRATCH_SEQ: AtomicU64 = AtomicU64::new(0);

/// Lock store backed by a directory of JSON record files.
///
/// The directory is explicit configuration; it is created on first use.
/// Cloning is cheap and clones observe the same records, since all state
/// lives on disk.
#[derive(Debug, Clone)]
pub struct FileLockStore {
    dir: PathBuf,
}

impl FileLockStore {
    /// Create a store rooted at the given directory.
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    /// The directory holding the record files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the record file for a lock name.
    pub(crate) fn record_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.lock", name))
    }

    fn ensure_dir(&self) -> Result<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir).map_err(|e| {
                HaspError::StoreError(format!(
                    "failed to create lock directory '{}': {}",
                    self.dir.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// A process-and-call-unique scratch path alongside the record file.
    fn scratch_path(&self, name: &str, ext: &str) -> PathBuf {
        let seq = SCRATCH_SEQ.fetch_add(1, Ordering::Relaxed);
        self.dir
            .join(format!(".{}.{}.{}.{}", name, std::process::id(), seq, ext))
    }

    /// Write a record to `path` and fsync it, removing the file on failure.
    fn write_record(&self, path: &Path, record: &LockRecord) -> Result<()> {
        let json = record.to_json()?;

        let mut file = File::create(path).map_err(|e| {
            HaspError::StoreError(format!("failed to create '{}': {}", path.display(), e))
        })?;

        file.write_all(json.as_bytes())
            .and_then(|_| file.sync_all())
            .map_err(|e| {
                let _ = fs::remove_file(path);
                HaspError::StoreError(format!("failed to write '{}': {}", path.display(), e))
            })
    }
}

impl LockStore for FileLockStore {
    fn create(&self, name: &str, record: &LockRecord) -> Result<bool> {
        validate_name(name)?;
        self.ensure_dir()?;

        let path = self.record_path(name);
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => {
                return Err(HaspError::StoreError(format!(
                    "failed to create lock record '{}': {}",
                    path.display(),
                    e
                )));
            }
        };

        let json = record.to_json()?;
        file.write_all(json.as_bytes())
            .and_then(|_| file.sync_all())
            .map_err(|e| {
                // A half-written record must not keep the name locked.
                let _ = fs::remove_file(&path);
                HaspError::StoreError(format!("failed to write lock record: {}", e))
            })?;

        Ok(true)
    }

    fn read(&self, name: &str) -> Result<Option<LockRecord>> {
        validate_name(name)?;

        let path = self.record_path(name);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(HaspError::StoreError(format!(
                    "failed to read lock record '{}': {}",
                    path.display(),
                    e
                )));
            }
        };

        LockRecord::from_json(&content).map(Some)
    }

    fn replace_if_owned(&self, name: &str, token: &str, record: &LockRecord) -> Result<bool> {
        match self.read(name)? {
            Some(current) if current.owner == token => {}
            _ => return Ok(false),
        }

        // The owner is the only writer on this path; a breaker can race it
        // only at the exact staleness boundary.
        let path = self.record_path(name);
        let scratch = self.scratch_path(name, "tmp");
        self.write_record(&scratch, record)?;

        fs::rename(&scratch, &path).map_err(|e| {
            let _ = fs::remove_file(&scratch);
            HaspError::StoreError(format!(
                "failed to replace lock record '{}': {}",
                path.display(),
                e
            ))
        })?;

        Ok(true)
    }

    fn delete_if_owned(&self, name: &str, token: &str) -> Result<bool> {
        match self.read(name)? {
            Some(current) if current.owner == token => {}
            _ => return Ok(false),
        }

        let path = self.record_path(name);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(HaspError::StoreError(format!(
                "failed to delete lock record '{}': {}",
                path.display(),
                e
            ))),
        }
    }

    fn force_replace(
        &self,
        name: &str,
        expected: &LockRecord,
        record: &LockRecord,
    ) -> Result<bool> {
        match self.read(name)? {
            Some(current) if current == *expected => {}
            _ => return Ok(false),
        }

        // Rename the record aside: exactly one competing breaker wins the
        // rename, everyone else sees NotFound and loses.
        let path = self.record_path(name);
        let aside = self.scratch_path(name, "brk");
        match fs::rename(&path, &aside) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => {
                return Err(HaspError::StoreError(format!(
                    "failed to claim lock record '{}': {}",
                    path.display(),
                    e
                )));
            }
        }

        // Re-verify what we actually claimed: a renewal may have landed
        // between the read and the rename.
        let claimed = match LockRecord::from_file(&aside) {
            Ok(claimed) => claimed,
            Err(e) => {
                let _ = fs::hard_link(&aside, &path);
                let _ = fs::remove_file(&aside);
                return Err(e);
            }
        };

        if claimed != *expected {
            // Not the record we checked. Put it back unless a fresh record
            // has already taken the name (link fails with AlreadyExists).
            let _ = fs::hard_link(&aside, &path);
            let _ = fs::remove_file(&aside);
            return Ok(false);
        }

        // The stale record is gone; race any concurrent acquirers for the
        // now-free name through the exclusive create.
        let created = self.create(name, record);
        let _ = fs::remove_file(&aside);
        created
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use tempfile::TempDir;

    fn store() -> (TempDir, FileLockStore) {
        let temp_dir = TempDir::new().unwrap();
        let store = FileLockStore::new(temp_dir.path());
        (temp_dir, store)
    }

    #[test]
    fn create_is_exclusive() {
        let (_temp_dir, store) = store();

        let first = LockRecord::new("foo", "tok-1");
        let second = LockRecord::new("foo", "tok-2");

        assert!(store.create("foo", &first).unwrap());
        assert!(!store.create("foo", &second).unwrap());

        // The losing create must not have touched the record.
        let current = store.read("foo").unwrap().unwrap();
        assert_eq!(current.owner, "tok-1");
    }

    #[test]
    fn create_makes_the_directory() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileLockStore::new(temp_dir.path().join("nested").join("locks"));

        let record = LockRecord::new("foo", "tok");
        assert!(store.create("foo", &record).unwrap());
        assert!(store.record_path("foo").exists());
    }

    #[test]
    fn read_absent_returns_none() {
        let (_temp_dir, store) = store();
        assert!(store.read("foo").unwrap().is_none());
    }

    #[test]
    fn read_roundtrips_the_record() {
        let (_temp_dir, store) = store();

        let record = LockRecord::new("foo", "tok");
        store.create("foo", &record).unwrap();

        let read_back = store.read("foo").unwrap().unwrap();
        assert_eq!(read_back, record);
    }

    #[test]
    fn read_corrupt_record_is_a_store_error() {
        let (_temp_dir, store) = store();
        store.ensure_dir().unwrap();
        fs::write(store.record_path("foo"), "not json").unwrap();

        assert!(matches!(store.read("foo"), Err(HaspError::StoreError(_))));
    }

    #[test]
    fn replace_if_owned_requires_matching_token() {
        let (_temp_dir, store) = store();

        let record = LockRecord::new("foo", "tok");
        store.create("foo", &record).unwrap();

        let renewal = LockRecord::new("foo", "other");
        assert!(!store.replace_if_owned("foo", "other", &renewal).unwrap());

        let current = store.read("foo").unwrap().unwrap();
        assert_eq!(current.owner, "tok");
    }

    #[test]
    fn replace_if_owned_refreshes_the_timestamp() {
        let (_temp_dir, store) = store();

        let mut record = LockRecord::new("foo", "tok");
        record.acquired_at = Utc::now() - Duration::seconds(30);
        store.create("foo", &record).unwrap();

        let renewal = LockRecord::new("foo", "tok");
        assert!(store.replace_if_owned("foo", "tok", &renewal).unwrap());

        let current = store.read("foo").unwrap().unwrap();
        assert!(current.age() < Duration::seconds(5));
    }

    #[test]
    fn replace_if_owned_absent_returns_false() {
        let (_temp_dir, store) = store();
        let renewal = LockRecord::new("foo", "tok");
        assert!(!store.replace_if_owned("foo", "tok", &renewal).unwrap());
    }

    #[test]
    fn delete_if_owned_requires_matching_token() {
        let (_temp_dir, store) = store();

        let record = LockRecord::new("foo", "tok");
        store.create("foo", &record).unwrap();

        assert!(!store.delete_if_owned("foo", "other").unwrap());
        assert!(store.read("foo").unwrap().is_some());

        assert!(store.delete_if_owned("foo", "tok").unwrap());
        assert!(store.read("foo").unwrap().is_none());
    }

    #[test]
    fn delete_if_owned_absent_returns_false() {
        let (_temp_dir, store) = store();
        assert!(!store.delete_if_owned("foo", "tok").unwrap());
    }

    #[test]
    fn force_replace_takes_over_a_matching_record() {
        let (_temp_dir, store) = store();

        let mut stale = LockRecord::new("foo", "tok-1");
        stale.acquired_at = Utc::now() - Duration::seconds(60);
        store.create("foo", &stale).unwrap();

        let fresh = LockRecord::new("foo", "tok-2");
        assert!(store.force_replace("foo", &stale, &fresh).unwrap());

        let current = store.read("foo").unwrap().unwrap();
        assert_eq!(current.owner, "tok-2");
    }

    #[test]
    fn force_replace_fails_when_the_record_changed() {
        let (_temp_dir, store) = store();

        let stale = LockRecord::new("foo", "tok-1");
        store.create("foo", &stale).unwrap();

        // The holder renews before the breaker commits.
        let renewed = LockRecord::new("foo", "tok-1");
        store.replace_if_owned("foo", "tok-1", &renewed).unwrap();

        let fresh = LockRecord::new("foo", "tok-2");
        assert!(!store.force_replace("foo", &stale, &fresh).unwrap());

        let current = store.read("foo").unwrap().unwrap();
        assert_eq!(current.owner, "tok-1");
    }

    #[test]
    fn force_replace_absent_returns_false() {
        let (_temp_dir, store) = store();

        let expected = LockRecord::new("foo", "tok-1");
        let fresh = LockRecord::new("foo", "tok-2");
        assert!(!store.force_replace("foo", &expected, &fresh).unwrap());
    }

    #[test]
    fn force_replace_leaves_no_scratch_files() {
        let (_temp_dir, store) = store();

        let stale = LockRecord::new("foo", "tok-1");
        store.create("foo", &stale).unwrap();

        let fresh = LockRecord::new("foo", "tok-2");
        store.force_replace("foo", &stale, &fresh).unwrap();

        let leftovers: Vec<_> = fs::read_dir(store.dir())
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .filter(|path| path.extension().and_then(|e| e.to_str()) != Some("lock"))
            .collect();
        assert!(leftovers.is_empty(), "unexpected scratch files: {:?}", leftovers);
    }

    #[test]
    fn operations_reject_invalid_names() {
        let (_temp_dir, store) = store();
        let record = LockRecord::new("../escape", "tok");

        assert!(store.create("../escape", &record).is_err());
        assert!(store.read("../escape").is_err());
    }
}

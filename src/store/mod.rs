//! Lock store abstraction for hasp.
//!
//! A lock store is a shared, named, persistent location holding at most one
//! [`LockRecord`] per lock name. Everything the lock engine needs from its
//! backing is expressed by the [`LockStore`] trait: atomic conditional
//! create, read, replace, delete, and force-replace. Any backing with those
//! guarantees (a filesystem, a database row, a coordination service) can
//! implement it; this crate ships the file-backed adapter.
//!
//! # Atomicity
//!
//! Each trait operation must be atomic with respect to concurrent callers on
//! the same name. The whole locking design is unsafe without this; the file
//! adapter builds it from exclusive file creation and atomic rename.

mod file;
mod record;

pub mod inspect;

pub use file::FileLockStore;
pub use record::LockRecord;

pub(crate) use record::generate_owner_token;

use crate::error::{HaspError, Result};
use regex::Regex;
use std::sync::LazyLock;

/// Abstract atomic persistent backing for lock records.
pub trait LockStore {
    /// Write `record` for `name` only if no record currently exists.
    ///
    /// Returns `true` on success; `false` when a record already exists,
    /// without modifying state. Exactly one of any set of concurrent
    /// creators for the same name succeeds.
    fn create(&self, name: &str, record: &LockRecord) -> Result<bool>;

    /// Read the current record for `name`, or `None` when absent.
    fn read(&self, name: &str) -> Result<Option<LockRecord>>;

    /// Overwrite the record for `name` only if the existing record's owner
    /// equals `token`. Returns `false` otherwise, including when absent.
    fn replace_if_owned(&self, name: &str, token: &str, record: &LockRecord) -> Result<bool>;

    /// Remove the record for `name` only if the existing record's owner
    /// equals `token`. Returns `false` otherwise, including when absent.
    fn delete_if_owned(&self, name: &str, token: &str) -> Result<bool>;

    /// Overwrite the record for `name` only if the current record still
    /// equals `expected`.
    ///
    /// The equality check is the optimistic guard that keeps a breaker from
    /// clobbering a lock that was concurrently renewed. Among concurrent
    /// force-replacers with the same `expected`, at most one succeeds.
    fn force_replace(&self, name: &str, expected: &LockRecord, record: &LockRecord)
    -> Result<bool>;
}

static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").expect("Invalid lock name regex"));

/// Validate a lock name.
///
/// Names map directly to store keys (file names in the file adapter), so
/// they are restricted to a safe alphanumeric/dot/dash/underscore set and
/// must not start with a dot.
pub fn validate_name(name: &str) -> Result<()> {
    if NAME_PATTERN.is_match(name) {
        Ok(())
    } else {
        Err(HaspError::UserError(format!(
            "invalid lock name '{}': names must match [A-Za-z0-9][A-Za-z0-9._-]*",
            name
        )))
    }
}

//! RAII guard for scoped lock acquisition.

use super::Lock;
use crate::error::Result;
use crate::store::LockStore;

/// Guard holding a lock for a scope.
///
/// When dropped, the lock is released. If the release fails during drop, a
/// warning is printed but no panic occurs; use [`LockGuard::release`] to
/// handle release errors explicitly.
#[derive(Debug)]
pub struct LockGuard<'a, S: LockStore> {
    lock: &'a mut Lock<S>,
    released: bool,
}

impl<'a, S: LockStore> LockGuard<'a, S> {
    pub(super) fn new(lock: &'a mut Lock<S>) -> Self {
        Self {
            lock,
            released: false,
        }
    }

    /// The guarded lock's name.
    pub fn name(&self) -> &str {
        self.lock.name()
    }

    /// Refresh the guarded lock's timestamp. See [`Lock::renew`].
    pub fn renew(&mut self) -> Result<bool> {
        self.lock.renew()
    }

    /// Release the lock before the guard goes out of scope, surfacing any
    /// store error to the caller.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        self.lock.release()
    }
}

impl<S: LockStore> Drop for LockGuard<'_, S> {
    fn drop(&mut self) {
        if !self.released
            && let Err(e) = self.lock.release()
        {
            eprintln!("Warning: failed to release lock '{}': {}", self.lock.name(), e);
        }
    }
}

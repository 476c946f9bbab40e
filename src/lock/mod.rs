//! Cooperative, time-bounded mutual exclusion over a lock store.
//!
//! A [`Lock`] is a client-side handle bound to a lock name and a fresh owner
//! token. Handles contend through the store's atomic primitives only, so
//! they work across threads, processes, and machines that share nothing but
//! the store.
//!
//! # Model
//!
//! - `acquire` never blocks: it returns a boolean immediately. Callers that
//!   want retry-until-acquired loop with their own backoff.
//! - A held lock older than `max_age` is **stale** and can be broken by a
//!   competitor through `acquire_breaking_stale`, bounding worst-case
//!   unavailability after a crashed holder to `max_age`.
//! - `renew` refreshes the record timestamp, resetting the staleness clock.
//!   A handle cannot renew its own already-stale lock; the staleness check
//!   is the same one competitors apply.
//! - There is no fairness ordering. Among racing contenders exactly one
//!   wins each contended store write, but which one is unspecified.
//!
//! # RAII Guards
//!
//! Scoped use goes through [`LockGuard`]: acquiring on entry (failing
//! loudly when contended) and releasing on drop, including on panic.

mod guard;


pub use guard::LockGuard;

use crate::error::{HaspError, Result};
use crate::store::{LockRecord, LockStore, generate_owner_token, validate_name};
use chrono::Duration;

/// A handle for acquiring a named mutual-exclusion lock.
///
/// The handle caches whether it believes it holds the lock; the cache can go
/// stale when a competitor breaks the lock, so [`Lock::has_lock`] and
/// [`Lock::renew`] consult the store.
#[derive(Debug)]
pub struct Lock<S: LockStore> {
    store: S,
    name: String,
    token: String,
    max_age: Duration,
    held: bool,
}

impl<S: LockStore> Lock<S> {
    /// Create a handle for `name` with the given staleness threshold.
    ///
    /// Every handle gets a fresh owner token, so two handles never pass for
    /// one another even within the same thread.
    ///
    /// # Arguments
    ///
    /// * `store` - The lock store shared by all contenders
    /// * `name` - The contended resource name
    /// * `max_age` - Age beyond which a held lock becomes breakable
    ///
    /// # Returns
    ///
    /// * `Ok(Lock)` - A handle in the unheld state
    /// * `Err(HaspError::UserError)` - Invalid name or non-positive `max_age`
    pub fn new(store: S, name: &str, max_age: Duration) -> Result<Self> {
        validate_name(name)?;

        if max_age <= Duration::zero() {
            return Err(HaspError::UserError(format!(
                "invalid max_age for lock '{}': must be positive",
                name
            )));
        }

        Ok(Self {
            store,
            name: name.to_string(),
            token: generate_owner_token(),
            max_age,
            held: false,
        })
    }

    /// The lock name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// This handle's owner token.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Try to acquire the lock without breaking stale holders.
    ///
    /// Returns `true` and transitions to held when this handle wins the
    /// store's exclusive create; `false` on any contention outcome. Never
    /// blocks. Calling this while already held returns `false` without side
    /// effects.
    pub fn acquire(&mut self) -> Result<bool> {
        self.try_acquire(false)
    }

    /// Try to acquire the lock, breaking the current holder if stale.
    ///
    /// Identical to [`Lock::acquire`] unless a record exists whose age
    /// exceeds `max_age`; then this handle attempts to take the lock over.
    /// The takeover fails (returning `false`) when anyone else renews,
    /// breaks, or re-acquires the lock in the race window.
    pub fn acquire_breaking_stale(&mut self) -> Result<bool> {
        self.try_acquire(true)
    }

    fn try_acquire(&mut self, break_stale: bool) -> Result<bool> {
        if self.held {
            return Ok(false);
        }

        let record = LockRecord::new(&self.name, &self.token);
        if self.store.create(&self.name, &record)? {
            self.held = true;
            return Ok(true);
        }

        if !break_stale {
            return Ok(false);
        }

        let Some(existing) = self.store.read(&self.name)? else {
            // Released between the create and the read; the next attempt
            // can win cleanly.
            return Ok(false);
        };

        if !existing.is_stale(self.max_age) {
            return Ok(false);
        }

        let fresh = LockRecord::new(&self.name, &self.token);
        if self.store.force_replace(&self.name, &existing, &fresh)? {
            self.held = true;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Release the lock.
    ///
    /// Best-effort and idempotent: the handle transitions to unheld no
    /// matter what the store says, and releasing an unheld handle (or a
    /// lock that was already broken or cleared) is a no-op. Only store I/O
    /// failures surface as errors.
    pub fn release(&mut self) -> Result<()> {
        if !self.held {
            return Ok(());
        }

        self.held = false;
        self.store.delete_if_owned(&self.name, &self.token)?;
        Ok(())
    }

    /// Refresh the lock's timestamp, resetting the staleness clock.
    ///
    /// Returns `false` when exclusivity has been lost (the record is gone
    /// or owned by a competitor) or when this handle's own lock has already
    /// exceeded `max_age` (self-expiry). In both cases the local held state
    /// is left unchanged; a failed renew is the authoritative signal that
    /// the caller must stop relying on the lock and release explicitly.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - The record timestamp was refreshed
    /// * `Ok(false)` - Exclusivity lost or self-expired
    /// * `Err(HaspError::NotHeld)` - Called while unheld
    pub fn renew(&mut self) -> Result<bool> {
        if !self.held {
            return Err(HaspError::NotHeld(format!(
                "cannot renew '{}': this handle does not hold it",
                self.name
            )));
        }

        let Some(existing) = self.store.read(&self.name)? else {
            return Ok(false);
        };

        if existing.owner != self.token {
            return Ok(false);
        }

        if existing.is_stale(self.max_age) {
            // The same check competitors apply: an expired lock cannot be
            // resurrected, even by its owner.
            return Ok(false);
        }

        let fresh = LockRecord::new(&self.name, &self.token);
        self.store.replace_if_owned(&self.name, &self.token, &fresh)
    }

    /// Whether this handle authoritatively holds the lock.
    ///
    /// Consults the store: true only when the handle is locally held and
    /// the current record's owner is this handle's token.
    pub fn has_lock(&self) -> Result<bool> {
        if !self.held {
            return Ok(false);
        }

        Ok(self
            .store
            .read(&self.name)?
            .is_some_and(|record| record.owner == self.token))
    }

    /// Age of the current record for this name, regardless of ownership.
    ///
    /// # Returns
    ///
    /// * `Ok(duration)` - Time since the record was written
    /// * `Err(HaspError::NotHeld)` - No record exists
    pub fn age(&self) -> Result<Duration> {
        match self.store.read(&self.name)? {
            Some(record) => Ok(record.age()),
            None => Err(HaspError::NotHeld(format!(
                "no lock record exists for '{}'",
                self.name
            ))),
        }
    }

    /// Acquire the lock for a scope, failing loudly on contention.
    ///
    /// The returned guard releases the lock when dropped, on every exit
    /// path including panics. Scoped use assumes exclusivity is mandatory,
    /// so contention is an error here rather than a boolean.
    ///
    /// # Returns
    ///
    /// * `Ok(LockGuard)` - The lock is held for the guard's lifetime
    /// * `Err(HaspError::Contended)` - The lock is held by another owner
    pub fn hold(&mut self) -> Result<LockGuard<'_, S>> {
        if !self.acquire()? {
            return Err(HaspError::Contended(format!(
                "lock '{}' is held by another owner",
                self.name
            )));
        }
        Ok(LockGuard::new(self))
    }

    /// Like [`Lock::hold`], but breaks a stale holder first.
    pub fn hold_breaking_stale(&mut self) -> Result<LockGuard<'_, S>> {
        if !self.acquire_breaking_stale()? {
            return Err(HaspError::Contended(format!(
                "lock '{}' is held by another owner and is not stale",
                self.name
            )));
        }
        Ok(LockGuard::new(self))
    }
}

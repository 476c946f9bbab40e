//! File-backed cooperative locks with expiry, renewal, and stale-lock
//! breaking.
//!
//! A [`Lock`] is a handle bound to a named resource, contending with other
//! handles through an abstract [`store::LockStore`] that guarantees atomic
//! conditional create/replace/delete. The shipped [`FileLockStore`] backs
//! the store with a directory of JSON record files, so independent threads
//! and processes that share nothing but a filesystem can coordinate.
//!
//! Acquisition never blocks and fairness is not ordered; a holder whose
//! record outlives its `max_age` becomes stale and may be broken by a
//! competitor, bounding worst-case unavailability after a crash.
//!
//! ```no_run
//! use chrono::Duration;
//! use hasp::{FileLockStore, Lock};
//!
//! let store = FileLockStore::new("/var/lock/myapp");
//! let mut lock = Lock::new(store, "nightly-build", Duration::seconds(300))?;
//!
//! {
//!     let _guard = lock.hold()?;
//!     // exclusive work; released on every exit path
//! }
//! # Ok::<(), hasp::HaspError>(())
//! ```

pub mod config;
pub mod error;
pub mod exit_codes;
pub mod lock;
pub mod store;

pub use error::{HaspError, Result};
pub use lock::{Lock, LockGuard};
pub use store::{FileLockStore, LockRecord, LockStore};

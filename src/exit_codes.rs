//! Exit code constants for the hasp CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, invalid config, misuse)
//! - 2: Store failure (I/O error, corrupt record)
//! - 3: Lock acquisition failure (contention)

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments, invalid configuration, or misuse.
pub const USER_ERROR: i32 = 1;

/// Store failure: the lock store itself failed.
pub const STORE_FAILURE: i32 = 2;

/// Lock acquisition failure: the lock is held by another owner.
pub const LOCK_FAILURE: i32 = 3;

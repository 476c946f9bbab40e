//! Error types for hasp.
//!
//! Uses thiserror for derive macros and provides user-actionable error messages.
//! Lock contention is a boolean result, not an error; only misuse, store I/O
//! failures, and failed scoped acquisition surface here.

use crate::exit_codes;
use thiserror::Error;

/// Main error type for hasp operations.
///
/// Each variant maps to a specific exit code for the CLI.
#[derive(Error, Debug)]
pub enum HaspError {
    /// User provided invalid arguments or configuration.
    #[error("{0}")]
    UserError(String),

    /// An operation that requires a held lock was called without one.
    #[error("lock is not held: {0}")]
    NotHeld(String),

    /// Scoped acquisition failed because the lock is held by another owner.
    #[error("lock acquisition failed: {0}")]
    Contended(String),

    /// The underlying lock store failed (I/O error, corrupt record).
    ///
    /// Never retried internally; callers own the backoff policy.
    #[error("lock store operation failed: {0}")]
    StoreError(String),
}

impl HaspError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            HaspError::UserError(_) => exit_codes::USER_ERROR,
            HaspError::NotHeld(_) => exit_codes::USER_ERROR,
            HaspError::Contended(_) => exit_codes::LOCK_FAILURE,
            HaspError::StoreError(_) => exit_codes::STORE_FAILURE,
        }
    }
}

/// Result type alias for hasp operations.
pub type Result<T> = std::result::Result<T, HaspError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_error_has_correct_exit_code() {
        let err = HaspError::UserError("bad argument".to_string());
        assert_eq!(err.exit_code(), exit_codes::USER_ERROR);
    }

    #[test]
    fn not_held_error_has_correct_exit_code() {
        let err = HaspError::NotHeld("cannot renew 'foo'".to_string());
        assert_eq!(err.exit_code(), exit_codes::USER_ERROR);
    }

    #[test]
    fn contended_error_has_correct_exit_code() {
        let err = HaspError::Contended("'foo' is held".to_string());
        assert_eq!(err.exit_code(), exit_codes::LOCK_FAILURE);
    }

    #[test]
    fn store_error_has_correct_exit_code() {
        let err = HaspError::StoreError("disk full".to_string());
        assert_eq!(err.exit_code(), exit_codes::STORE_FAILURE);
    }

    #[test]
    fn error_messages_are_descriptive() {
        let err = HaspError::NotHeld("no record for 'foo'".to_string());
        assert_eq!(err.to_string(), "lock is not held: no record for 'foo'");

        let err = HaspError::Contended("'foo' is held by alice@box".to_string());
        assert_eq!(
            err.to_string(),
            "lock acquisition failed: 'foo' is held by alice@box"
        );
    }
}

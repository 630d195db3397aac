//! Transfer engine error types

use thiserror::Error;

use crate::db;

/// Transfer failure kinds.
///
/// `code()` and `http_status()` keep the API edge free of business
/// decisions: handlers map mechanically.
#[derive(Error, Debug, Clone)]
pub enum TransferError {
    // === Validation ===
    #[error("Sender and receiver cannot be the same user")]
    SelfTransferForbidden,

    #[error("Amount must be greater than zero")]
    InvalidAmount,

    #[error("Idempotency key must not be empty")]
    InvalidIdempotencyKey,

    // === Business rules ===
    #[error("Insufficient balance: need {required}, have {available}")]
    InsufficientBalance { required: i64, available: i64 },

    #[error("User not found: {0}")]
    UserNotFound(i64),

    // === Retryable ===
    #[error("Concurrent attempt with the same idempotency key")]
    IdempotencyRace,

    #[error("Transfer aborted after repeated lock contention")]
    TransientLockContention,

    // === System ===
    #[error("Transfer deadline exceeded")]
    DeadlineExceeded,

    #[error("Database error: {0}")]
    Database(String),
}

impl TransferError {
    /// Stable error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            TransferError::SelfTransferForbidden => "SELF_TRANSFER_FORBIDDEN",
            TransferError::InvalidAmount => "INVALID_AMOUNT",
            TransferError::InvalidIdempotencyKey => "INVALID_IDEMPOTENCY_KEY",
            TransferError::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            TransferError::UserNotFound(_) => "USER_NOT_FOUND",
            TransferError::IdempotencyRace => "IDEMPOTENCY_RACE",
            TransferError::TransientLockContention => "TRANSIENT_LOCK_CONTENTION",
            TransferError::DeadlineExceeded => "DEADLINE_EXCEEDED",
            TransferError::Database(_) => "DATABASE_ERROR",
        }
    }

    /// HTTP status suggestion
    pub fn http_status(&self) -> u16 {
        match self {
            TransferError::SelfTransferForbidden
            | TransferError::InvalidAmount
            | TransferError::InvalidIdempotencyKey
            | TransferError::InsufficientBalance { .. } => 400,
            TransferError::UserNotFound(_) => 404,
            TransferError::IdempotencyRace | TransferError::TransientLockContention => 503,
            TransferError::DeadlineExceeded => 504,
            TransferError::Database(_) => 500,
        }
    }

    /// Retryable inside the engine's attempt loop
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TransferError::IdempotencyRace | TransferError::TransientLockContention
        )
    }
}

impl From<sqlx::Error> for TransferError {
    fn from(e: sqlx::Error) -> Self {
        if db::is_lock_contention(&e) {
            TransferError::TransientLockContention
        } else {
            TransferError::Database(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            TransferError::SelfTransferForbidden.code(),
            "SELF_TRANSFER_FORBIDDEN"
        );
        assert_eq!(
            TransferError::InsufficientBalance {
                required: 100,
                available: 50
            }
            .code(),
            "INSUFFICIENT_BALANCE"
        );
        assert_eq!(TransferError::IdempotencyRace.code(), "IDEMPOTENCY_RACE");
    }

    #[test]
    fn test_http_status() {
        assert_eq!(TransferError::InvalidAmount.http_status(), 400);
        assert_eq!(TransferError::UserNotFound(7).http_status(), 404);
        assert_eq!(TransferError::TransientLockContention.http_status(), 503);
        assert_eq!(TransferError::DeadlineExceeded.http_status(), 504);
        assert_eq!(TransferError::Database("x".into()).http_status(), 500);
    }

    #[test]
    fn test_retryable_classification() {
        assert!(TransferError::IdempotencyRace.is_retryable());
        assert!(TransferError::TransientLockContention.is_retryable());
        assert!(!TransferError::InvalidAmount.is_retryable());
        assert!(
            !TransferError::InsufficientBalance {
                required: 1,
                available: 0
            }
            .is_retryable()
        );
    }
}

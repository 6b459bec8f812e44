//! Error types for the wallet ledger.
//!
//! [`StorageError`] is what a backend reports. [`LedgerError`] is the closed
//! set of outcomes callers match on; every variant maps to one [`ErrorKind`].

use rust_decimal::Decimal;
use thiserror::Error;

use walletcore_common::{UserId, WalletId};

/// Failures raised by a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Failed to reach the database.
    #[error("Database connection error: {0}")]
    Connection(String),

    /// A query failed to execute.
    #[error("Query execution error: {0}")]
    Query(String),

    /// Begin, commit or rollback failed.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// A stored value could not be decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Failure produced on purpose by a test or simulation fault.
    #[error("Injected fault: {0}")]
    Injected(String),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => StorageError::Connection(err.to_string()),
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                StorageError::Serialization(err.to_string())
            }
            _ => StorageError::Query(err.to_string()),
        }
    }
}

/// Classification of a [`LedgerError`], stable for callers to branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidAmount,
    SameWallets,
    WalletNotFound,
    AccessDenied,
    InsufficientFunds,
    InvalidListOptions,
    DeadlineExceeded,
    StorageFailure,
}

/// Errors returned by the transfer engine and the wallet service.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Transfer amount is zero or negative.
    #[error("Invalid transfer amount: {0}")]
    InvalidAmount(Decimal),

    /// Origin and destination are the same wallet.
    #[error("Origin and destination are the same wallet: {0}")]
    SameWallets(WalletId),

    /// Wallet does not exist.
    #[error("Wallet not found: {0}")]
    WalletNotFound(WalletId),

    /// Actor lacks the capability required on the wallet.
    #[error("Access to wallet {wallet_id} denied for user {user_id}")]
    AccessDenied { user_id: UserId, wallet_id: WalletId },

    /// Origin balance is below the requested amount.
    #[error("Insufficient funds in wallet {wallet_id}: required {required}, available {available}")]
    InsufficientFunds {
        wallet_id: WalletId,
        available: Decimal,
        required: Decimal,
    },

    /// Listing options are malformed or out of bounds.
    #[error("Invalid list options: {0}")]
    InvalidListOptions(String),

    /// The caller's deadline passed before the unit of work could commit.
    #[error("Deadline exceeded before commit")]
    DeadlineExceeded,

    /// Persistence failure.
    #[error("Storage failure: {0}")]
    Storage(#[from] StorageError),

    /// The operation failed and undoing its writes failed as well.
    #[error("{cause}; rollback also failed: {rollback}")]
    RollbackFailed {
        cause: Box<LedgerError>,
        #[source]
        rollback: StorageError,
    },
}

impl LedgerError {
    /// Classify the error. A failed rollback reports the kind of its cause.
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::InvalidAmount(_) => ErrorKind::InvalidAmount,
            LedgerError::SameWallets(_) => ErrorKind::SameWallets,
            LedgerError::WalletNotFound(_) => ErrorKind::WalletNotFound,
            LedgerError::AccessDenied { .. } => ErrorKind::AccessDenied,
            LedgerError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            LedgerError::InvalidListOptions(_) => ErrorKind::InvalidListOptions,
            LedgerError::DeadlineExceeded => ErrorKind::DeadlineExceeded,
            LedgerError::Storage(_) => ErrorKind::StorageFailure,
            LedgerError::RollbackFailed { cause, .. } => cause.kind(),
        }
    }

    /// Get error code for presentation layers.
    pub fn error_code(&self) -> &'static str {
        match self.kind() {
            ErrorKind::InvalidAmount => "INVALID_AMOUNT",
            ErrorKind::SameWallets => "SAME_WALLETS",
            ErrorKind::WalletNotFound => "WALLET_NOT_FOUND",
            ErrorKind::AccessDenied => "ACCESS_DENIED",
            ErrorKind::InsufficientFunds => "INSUFFICIENT_FUNDS",
            ErrorKind::InvalidListOptions => "INVALID_LIST_OPTIONS",
            ErrorKind::DeadlineExceeded => "DEADLINE_EXCEEDED",
            ErrorKind::StorageFailure => "STORAGE_FAILURE",
        }
    }

    /// Check if a fresh attempt of the same request could succeed.
    ///
    /// Business-rule rejections are final; timeouts and connectivity
    /// problems are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            LedgerError::DeadlineExceeded => true,
            LedgerError::Storage(StorageError::Connection(_)) => true,
            LedgerError::Storage(StorageError::Transaction(_)) => true,
            _ => false,
        }
    }

    /// Check if a rollback failure was attached to this error.
    pub fn rollback_failed(&self) -> bool {
        matches!(self, LedgerError::RollbackFailed { .. })
    }

    /// Attach a failed rollback to the error that triggered it.
    pub(crate) fn with_rollback_failure(self, rollback: StorageError) -> Self {
        LedgerError::RollbackFailed {
            cause: Box::new(self),
            rollback,
        }
    }
}

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_converts_to_storage_failure() {
        let err: LedgerError = StorageError::Query("boom".into()).into();
        assert_eq!(err.kind(), ErrorKind::StorageFailure);
        assert_eq!(err.error_code(), "STORAGE_FAILURE");
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn test_rollback_failure_keeps_cause_kind() {
        let wallet_id = WalletId::new();
        let err = LedgerError::InsufficientFunds {
            wallet_id,
            available: Decimal::ONE,
            required: Decimal::TEN,
        }
        .with_rollback_failure(StorageError::Transaction("connection reset".into()));

        assert_eq!(err.kind(), ErrorKind::InsufficientFunds);
        assert!(err.rollback_failed());
        let msg = err.to_string();
        assert!(msg.contains("Insufficient funds") && msg.contains("connection reset"));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(LedgerError::DeadlineExceeded.is_retryable());
        assert!(LedgerError::from(StorageError::Connection("down".into())).is_retryable());
        assert!(!LedgerError::InvalidAmount(Decimal::ZERO).is_retryable());
        assert!(!LedgerError::WalletNotFound(WalletId::new()).is_retryable());
    }
}

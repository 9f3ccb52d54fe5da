use crate::database::DatabaseError;
use crate::ledger::LedgerError;
use rust_decimal::Decimal;
use sqlx::Error as SqlxError;
use thiserror::Error;

/// Application-level error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database errors
    #[error("SQL error: {0}")]
    Sqlx(#[from] SqlxError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Missing or malformed input (e.g. an absent escrow sequence)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Not found errors
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Unauthorized access errors
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Buyer balance does not cover the escrow amount plus fee buffer
    #[error("Insufficient funds: balance {balance} XRP, required {required} XRP")]
    InsufficientFunds { balance: Decimal, required: Decimal },

    /// Wallet material could not be turned into a usable ledger wallet
    #[error("Invalid wallet: {0}")]
    InvalidWallet(String),

    /// Ledger or store unreachable, timed out or rate limited
    #[error("Network failure: {0}")]
    NetworkFailure(String),

    /// The ledger refused or failed the transaction
    #[error("Ledger rejected transaction: {engine_result} ({message})")]
    LedgerRejected {
        engine_result: String,
        message: String,
    },

    /// The escrow cannot take the requested transition right now
    #[error("Escrow state conflict: {0}")]
    EscrowState(String),

    /// Currency conversion has no quote for the resolved currency
    #[error("No conversion rate available: {0}")]
    ExternalRateUnavailable(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error with message
    #[error("{0}")]
    Message(String),
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Check if error is a database connection error
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            AppError::Database(
                DatabaseError::Connect(_) | DatabaseError::Unavailable(_) | DatabaseError::PingTimeout
            ) | AppError::Sqlx(SqlxError::PoolTimedOut)
        )
    }

    /// Check if error is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound(_))
    }

    /// Stable machine-readable code for API payloads
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Database(_) | AppError::Sqlx(_) => "DATABASE_ERROR",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::InvalidArgument(_) => "INVALID_ARGUMENT",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            AppError::InvalidWallet(_) => "INVALID_WALLET",
            AppError::NetworkFailure(_) => "NETWORK_FAILURE",
            AppError::LedgerRejected { .. } => "LEDGER_REJECTED",
            AppError::EscrowState(_) => "ESCROW_STATE_CONFLICT",
            AppError::ExternalRateUnavailable(_) => "EXTERNAL_RATE_UNAVAILABLE",
            AppError::Serialization(_) | AppError::Message(_) => "INTERNAL_ERROR",
        }
    }

    /// Get HTTP status code for the error
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::NotFound(_) => 404,
            AppError::Unauthorized(_) => 401,
            AppError::InvalidArgument(_)
            | AppError::InsufficientFunds { .. }
            | AppError::InvalidWallet(_) => 400,
            AppError::EscrowState(_) => 409,
            AppError::LedgerRejected { .. } => 422,
            AppError::NetworkFailure(_) | AppError::ExternalRateUnavailable(_) => 502,
            AppError::Config(_) => 500,
            AppError::Database(_) | AppError::Sqlx(_) => 500,
            _ => 500,
        }
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Rejected {
                engine_result,
                message,
            } => AppError::LedgerRejected {
                engine_result,
                message,
            },
            LedgerError::AccountNotFound(account) => {
                AppError::NotFound(format!("Ledger account {} not found", account))
            }
            // nothing reached the network
            LedgerError::Signing(msg) => AppError::Message(format!("Transaction signing failed: {}", msg)),
            other => AppError::NetworkFailure(other.to_string()),
        }
    }
}

/// Repository-specific error types
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// Database query error
    #[error("Query error: {0}")]
    Query(SqlxError),

    /// Record not found
    #[error("Record not found")]
    NotFound(String),

    /// Duplicate record
    #[error("Duplicate record: {0}")]
    Duplicate(String),

    /// Constraint violation
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Stored row could not be decoded into a domain value
    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

/// Result type alias for store operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(msg) => AppError::NotFound(msg),
            RepositoryError::Query(e) => AppError::Sqlx(e),
            RepositoryError::Duplicate(msg) => AppError::Message(format!("Duplicate: {}", msg)),
            RepositoryError::ConstraintViolation(msg) => AppError::InvalidArgument(msg),
            RepositoryError::Corrupt(msg) => AppError::Message(format!("Corrupt row: {}", msg)),
        }
    }
}

impl From<SqlxError> for RepositoryError {
    fn from(err: SqlxError) -> Self {
        match &err {
            SqlxError::RowNotFound => RepositoryError::NotFound("Record not found".to_string()),
            SqlxError::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                match code.as_deref() {
                    // unique_violation
                    Some("23505") => RepositoryError::Duplicate(db_err.message().to_string()),
                    // foreign_key_violation, check_violation
                    Some("23503") | Some("23514") => {
                        RepositoryError::ConstraintViolation(db_err.message().to_string())
                    }
                    _ => RepositoryError::Query(err),
                }
            }
            _ => RepositoryError::Query(err),
        }
    }
}

/// Convenience function to convert Option<T> to Result<T, AppError>
pub fn option_to_result<T>(opt: Option<T>, error_msg: &str) -> AppResult<T> {
    opt.ok_or_else(|| AppError::NotFound(error_msg.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct_for_core_taxonomy() {
        let errors = vec![
            AppError::InsufficientFunds {
                balance: Decimal::ONE,
                required: Decimal::TWO,
            },
            AppError::InvalidWallet("no address".into()),
            AppError::InvalidArgument("missing sequence".into()),
            AppError::NetworkFailure("timeout".into()),
            AppError::NotFound("product".into()),
            AppError::ExternalRateUnavailable("xyz".into()),
        ];

        let mut codes: Vec<_> = errors.iter().map(|e| e.code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), 6);
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::NotFound("x".into()).status_code(), 404);
        assert_eq!(AppError::Unauthorized("x".into()).status_code(), 401);
        assert_eq!(AppError::InvalidArgument("x".into()).status_code(), 400);
        assert_eq!(AppError::EscrowState("x".into()).status_code(), 409);
        assert_eq!(AppError::NetworkFailure("x".into()).status_code(), 502);
        assert_eq!(AppError::Message("x".into()).status_code(), 500);
    }

    #[test]
    fn test_ledger_rejection_maps_to_ledger_rejected() {
        let err: AppError = LedgerError::Rejected {
            engine_result: "tecNO_PERMISSION".into(),
            message: "No permission to perform requested operation.".into(),
        }
        .into();

        assert_eq!(err.code(), "LEDGER_REJECTED");
        assert!(err.to_string().contains("tecNO_PERMISSION"));
    }

    #[test]
    fn test_ledger_timeout_maps_to_network_failure() {
        let err: AppError = LedgerError::Timeout("account_tx".into()).into();
        assert_eq!(err.code(), "NETWORK_FAILURE");
    }

    #[test]
    fn test_local_signing_failure_is_internal() {
        let err: AppError = LedgerError::Signing("Amount must be an XRP drops string".into()).into();
        assert_eq!(err.code(), "INTERNAL_ERROR");
        assert_eq!(err.status_code(), 500);
    }

    #[test]
    fn test_repository_not_found_maps_to_not_found() {
        let err: AppError = RepositoryError::NotFound("price history".into()).into();
        assert!(err.is_not_found());
    }
}

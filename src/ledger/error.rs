use thiserror::Error;

/// Errors raised while talking to the ledger network
#[derive(Error, Debug)]
pub enum LedgerError {
    /// HTTP transport failure (connection refused, TLS, body decode)
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The node did not answer within the configured timeout
    #[error("Ledger request timed out: {0}")]
    Timeout(String),

    /// The node asked us to slow down (`slowDown`, `tooBusy`, HTTP 429/503)
    #[error("Ledger node rate limited the request: {0}")]
    RateLimited(String),

    /// JSON-RPC level error returned by the node
    #[error("Ledger RPC error {error}: {message}")]
    Rpc { error: String, message: String },

    /// Account does not exist (unfunded)
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Transaction refused at submission or validated with a failure code
    #[error("Transaction rejected: {engine_result} ({message})")]
    Rejected {
        engine_result: String,
        message: String,
    },

    /// Transaction not validated before its LastLedgerSequence or the timeout
    #[error("Transaction {hash} was not validated")]
    NotValidated { hash: String },

    /// Response did not have the expected shape
    #[error("Malformed ledger response: {0}")]
    Malformed(String),

    /// Transaction could not be encoded or signed locally
    #[error("Transaction signing failed: {0}")]
    Signing(String),
}

/// Result type alias for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

impl LedgerError {
    /// Transient failures that are safe to retry for read-only queries
    pub fn is_retryable(&self) -> bool {
        match self {
            LedgerError::Transport(e) => !e.is_decode() && !e.is_builder(),
            LedgerError::Timeout(_) | LedgerError::RateLimited(_) => true,
            _ => false,
        }
    }

    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        LedgerError::Malformed(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(LedgerError::Timeout("account_tx".into()).is_retryable());
        assert!(LedgerError::RateLimited("slowDown".into()).is_retryable());
        assert!(!LedgerError::AccountNotFound("r".into()).is_retryable());
        assert!(!LedgerError::Rejected {
            engine_result: "temBAD_AMOUNT".into(),
            message: "".into()
        }
        .is_retryable());
        assert!(!LedgerError::malformed("missing result").is_retryable());
        assert!(!LedgerError::Signing("unsupported field Memos".into()).is_retryable());
    }
}

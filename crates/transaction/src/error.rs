//! Transaction service error types.

/// Errors that can occur during transaction submission or receipt watching.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransactionError {
    /// The RPC endpoint rejected or failed the request.
    #[error("rpc error: {0}")]
    Rpc(String),

    /// The backend failed while assembling or signing the transaction.
    #[error("backend error: {0}")]
    Backend(String),

    /// The receipt watch was cancelled before an outcome was observed.
    #[error("receipt watch cancelled")]
    WatchCancelled,
}

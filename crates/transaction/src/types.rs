//! Transaction request and receipt types.

use alloy_primitives::{Address, Bytes, Log, B256, U256};

/// A prepared transaction ready for submission.
///
/// Gas fields left empty (`gas_price = None`, `gas_limit = 0`) delegate
/// estimation to the [`TransactionService`](crate::TransactionService)
/// implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRequest {
    /// Recipient contract or account.
    pub to: Address,
    /// ABI-encoded call data.
    pub data: Bytes,
    /// Gas price, or `None` to let the backend estimate.
    pub gas_price: Option<U256>,
    /// Gas limit, or `0` to let the backend estimate.
    pub gas_limit: u64,
    /// Ether value transferred with the call.
    pub value: U256,
}

/// Execution status recorded in a transaction receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptStatus {
    /// The transaction executed successfully.
    Success,
    /// The transaction reverted on-chain.
    Failed,
}

/// The on-chain outcome record of a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    /// Hash of the transaction this receipt belongs to.
    pub tx_hash: B256,
    /// Execution status.
    pub status: ReceiptStatus,
    /// Event logs emitted during execution, in emission order.
    pub logs: Vec<Log>,
}

impl TxReceipt {
    /// Whether the transaction executed successfully.
    pub fn is_success(&self) -> bool {
        self.status == ReceiptStatus::Success
    }
}

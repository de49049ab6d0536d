//! The transaction service trait and receipt watch plumbing.

use alloy_primitives::B256;
use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::{TransactionError, TxReceipt, TxRequest};

/// Service for submitting transactions and watching their receipts.
#[async_trait]
#[auto_impl::auto_impl(&, Arc)]
pub trait TransactionService: Send + Sync {
    /// Submit a transaction and return its hash.
    ///
    /// Returns once the transaction has been accepted into the mempool;
    /// mining and confirmation are observed separately through
    /// [`watch_for_receipt`](Self::watch_for_receipt).
    async fn send(&self, request: TxRequest) -> Result<B256, TransactionError>;

    /// Subscribe to the receipt of a previously submitted transaction.
    ///
    /// The returned watch resolves with exactly one receipt or one error,
    /// or with neither if the implementation tears the watch down.
    fn watch_for_receipt(&self, tx_hash: B256) -> ReceiptWatch;
}

/// Consumer side of a receipt subscription.
///
/// Exactly one of the two receivers resolves with a value; if the watch is
/// torn down without an outcome, both resolve with a receive error.
#[derive(Debug)]
pub struct ReceiptWatch {
    /// Resolves with the receipt once the transaction is mined.
    pub receipt: oneshot::Receiver<TxReceipt>,
    /// Resolves if watching failed before a receipt was observed.
    pub error: oneshot::Receiver<TransactionError>,
}

impl ReceiptWatch {
    /// Create a connected handle/watch pair.
    ///
    /// Implementations keep the [`ReceiptWatchHandle`] and hand the
    /// [`ReceiptWatch`] to the caller.
    pub fn channel() -> (ReceiptWatchHandle, ReceiptWatch) {
        let (receipt_tx, receipt_rx) = oneshot::channel();
        let (error_tx, error_rx) = oneshot::channel();
        (
            ReceiptWatchHandle {
                receipt: receipt_tx,
                error: error_tx,
            },
            ReceiptWatch {
                receipt: receipt_rx,
                error: error_rx,
            },
        )
    }
}

/// Producer side of a receipt subscription.
///
/// Consuming methods enforce the one-outcome contract; dropping the handle
/// closes both channels, which consumers treat as a silent teardown.
#[derive(Debug)]
pub struct ReceiptWatchHandle {
    receipt: oneshot::Sender<TxReceipt>,
    error: oneshot::Sender<TransactionError>,
}

impl ReceiptWatchHandle {
    /// Deliver the mined receipt.
    pub fn deliver(self, receipt: TxReceipt) {
        let _ = self.receipt.send(receipt);
    }

    /// Report that watching failed.
    pub fn fail(self, error: TransactionError) {
        let _ = self.error.send(error);
    }
}

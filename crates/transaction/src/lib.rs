//! Transaction submission and receipt watching.
//!
//! This crate defines the seam between settlement subsystems and the
//! blockchain client: a [`TransactionService`] submits prepared call data
//! and hands back a [`ReceiptWatch`] that resolves once the transaction is
//! mined (or watching fails).
//!
//! The crate is **pure plumbing** - it does not choose gas prices, manage
//! wallet keys or talk to an RPC endpoint itself. Implementations wrap a
//! concrete backend; consumers depend only on the trait.
//!
//! # Receipt watching
//!
//! [`watch_for_receipt`](TransactionService::watch_for_receipt) returns a
//! pair of oneshot receivers. An implementation delivers exactly one value
//! on exactly one of them, or drops both senders when watching is torn
//! down (shutdown, dropped subscription). Consumers treat a closed channel
//! as "watching ended without an outcome" and exit silently.

mod error;
mod service;
mod types;

pub use error::TransactionError;
pub use service::{ReceiptWatch, ReceiptWatchHandle, TransactionService};
pub use types::{ReceiptStatus, TxReceipt, TxRequest};

//! Chequebook-based settlement for SWAP.
//!
//! This crate provides the chequebook side of SWAP settlement:
//!
//! - [`Cheque`] / [`SignedCheque`] - EIP-712 cheque types and signing
//! - [`ChequeStore`] / [`StoredChequeStore`] - validated storage of
//!   received cheques
//! - [`CashoutService`] - on-chain cashing of the latest received cheque,
//!   with durable tracking of the cashout transaction across restarts
//!
//! # Cashing out
//!
//! ```ignore
//! use vertex_chequebook::CashoutService;
//!
//! let service = CashoutService::new(store, transaction, cheque_store);
//! service.set_notify_bounced(Box::new(|chequebook| {
//!     // blocklist the peer whose chequebook bounced
//!     Ok(())
//! }));
//! service.start()?; // resume monitors for in-flight cashouts
//!
//! let tx_hash = service.cash_cheque(chequebook, recipient).await?;
//! // ... later ...
//! let status = service.cashout_status(chequebook)?;
//! ```
//!
//! # Wire Format
//!
//! Cheques and cashout records are serialized as JSON with camelCase
//! fields, matching Bee's format for interoperability.

pub mod cashout;
pub mod cheque;
pub mod contract;
mod metrics;
pub mod store;

pub use cashout::{
    CashChequeResult, CashoutError, CashoutService, CashoutStatus, NotifyBouncedFn,
};
pub use cheque::{Cheque, ChequeExt, SignedCheque, DOMAIN_NAME, DOMAIN_VERSION};
pub use contract::ERC20SimpleSwap;
pub use store::{ChequeStore, ChequeStoreError, MemoryChequeStore, StoredChequeStore};

// Re-export commonly used types
pub use alloy_primitives::{Address, U256};

/// Errors that can occur during cheque operations.
#[derive(Debug, thiserror::Error)]
pub enum ChequeError {
    /// Failed to recover signer from signature.
    #[error("failed to recover signer: {0}")]
    SignatureRecovery(String),

    /// Cheque was signed by unexpected address.
    #[error("invalid signer: expected {expected}, got {actual}")]
    InvalidSigner {
        /// The owner the cheque was expected to be signed by.
        expected: Address,
        /// The address actually recovered from the signature.
        actual: Address,
    },

    /// Cheque serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

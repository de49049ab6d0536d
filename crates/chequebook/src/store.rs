//! Cheque store for received cheques.
//!
//! This module defines the [`ChequeStore`] trait which abstracts over how
//! received cheques are kept, plus the persisted [`StoredChequeStore`]
//! implementation used by nodes and an in-memory store for testing.
//!
//! Cheques are cumulative: each cheque received from a chequebook replaces
//! the previous one, and only the latest is retained. Receiving validates
//! the issuer signature and that the new cumulative payout covers the
//! stored one before anything is overwritten.

use std::collections::HashMap;

use alloy_primitives::{hex, Address, U256};
use auto_impl::auto_impl;
use parking_lot::RwLock;
use thiserror::Error;
use tracing::debug;
use vertex_statestore::{StateStore, StateStoreError};

use crate::cheque::ChequeExt;
use crate::{ChequeError, SignedCheque};

/// Error type for cheque store operations.
#[derive(Debug, Error)]
pub enum ChequeStoreError {
    /// No cheque has been received from the chequebook.
    #[error("no cheque recorded for chequebook")]
    NoCheque,
    /// The cheque names a different beneficiary than this node.
    #[error("wrong beneficiary: expected {expected}, got {actual}")]
    WrongBeneficiary {
        /// The beneficiary this store accepts cheques for.
        expected: Address,
        /// The beneficiary named by the rejected cheque.
        actual: Address,
    },
    /// The cheque's cumulative payout does not cover the stored one.
    #[error("cumulative payout {cumulative_payout} does not cover previous {previous}")]
    NotCovering {
        /// Cumulative payout of the rejected cheque.
        cumulative_payout: U256,
        /// Cumulative payout of the cheque already stored.
        previous: U256,
    },
    /// Cheque signature validation failed.
    #[error(transparent)]
    Cheque(#[from] ChequeError),
    /// Persistence failure.
    #[error(transparent)]
    Store(#[from] StateStoreError),
}

/// Trait for reading the latest cheque received from a chequebook.
#[auto_impl(&, Box, Arc)]
pub trait ChequeStore: Send + Sync {
    /// Return the most recent cheque received from `chequebook`.
    fn last_cheque(&self, chequebook: Address) -> Result<SignedCheque, ChequeStoreError>;
}

/// Computes the store key for the last cheque received from a chequebook.
fn cheque_key(chequebook: Address) -> String {
    format!("swap_cheque_{}", hex::encode(chequebook))
}

/// Persisted cheque store with receive-side validation.
#[derive(Debug)]
pub struct StoredChequeStore<S> {
    store: S,
    chain_id: u64,
    beneficiary: Address,
}

impl<S: StateStore> StoredChequeStore<S> {
    /// Create a new cheque store.
    ///
    /// `beneficiary` is the address this node expects cheques to be made
    /// out to; `chain_id` anchors the EIP-712 signature domain.
    pub fn new(store: S, chain_id: u64, beneficiary: Address) -> Self {
        Self {
            store,
            chain_id,
            beneficiary,
        }
    }

    /// Validate and persist a cheque received from a peer.
    ///
    /// `issuer` is the chequebook owner expected to have signed the cheque.
    /// Returns the amount gained over the previously stored cheque.
    pub fn receive_cheque(
        &self,
        cheque: &SignedCheque,
        issuer: Address,
    ) -> Result<U256, ChequeStoreError> {
        if cheque.cheque.beneficiary != self.beneficiary {
            return Err(ChequeStoreError::WrongBeneficiary {
                expected: self.beneficiary,
                actual: cheque.cheque.beneficiary,
            });
        }

        cheque.verify(issuer, self.chain_id)?;

        let chequebook = cheque.chequebook();
        let previous = match self.last_cheque(chequebook) {
            Ok(last) => last.cheque.cumulative_payout(),
            Err(ChequeStoreError::NoCheque) => U256::ZERO,
            Err(err) => return Err(err),
        };

        let cumulative_payout = cheque.cheque.cumulative_payout();
        if cumulative_payout < previous {
            return Err(ChequeStoreError::NotCovering {
                cumulative_payout,
                previous,
            });
        }

        self.store.put(&cheque_key(chequebook), cheque)?;

        let gained = cumulative_payout - previous;
        debug!(%chequebook, %cumulative_payout, %gained, "stored received cheque");
        Ok(gained)
    }
}

impl<S: StateStore> ChequeStore for StoredChequeStore<S> {
    fn last_cheque(&self, chequebook: Address) -> Result<SignedCheque, ChequeStoreError> {
        self.store
            .get::<SignedCheque>(&cheque_key(chequebook))?
            .ok_or(ChequeStoreError::NoCheque)
    }
}

/// In-memory cheque store for testing.
#[derive(Debug, Default)]
pub struct MemoryChequeStore {
    cheques: RwLock<HashMap<Address, SignedCheque>>,
}

impl MemoryChequeStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the latest cheque for its chequebook, without validation.
    pub fn set_cheque(&self, cheque: SignedCheque) {
        self.cheques.write().insert(cheque.chequebook(), cheque);
    }
}

impl ChequeStore for MemoryChequeStore {
    fn last_cheque(&self, chequebook: Address) -> Result<SignedCheque, ChequeStoreError> {
        self.cheques
            .read()
            .get(&chequebook)
            .cloned()
            .ok_or(ChequeStoreError::NoCheque)
    }
}

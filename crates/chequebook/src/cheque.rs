//! Cheque signing and verification.
//!
//! A cheque promises a cumulative amount from a chequebook contract to a
//! beneficiary. Only the latest cheque per chequebook matters: the contract
//! pays out the difference between the promised cumulative amount and what
//! it has already paid. Peers exchange cheques off-chain as
//! [`SignedCheque`]s and cash them on-chain whenever they choose.
//!
//! Signatures are EIP-712 typed-data signatures over the [`Cheque`] struct.
//! The domain ([`DOMAIN_NAME`], [`DOMAIN_VERSION`], chain id) ties every
//! signature to one chain, so a cheque signed for a test network cannot be
//! replayed against a mainnet chequebook.

use alloy_primitives::{Address, Bytes, Signature, SignatureError, B256, U256};
use alloy_sol_types::{eip712_domain, Eip712Domain, SolStruct};
use serde::{Deserialize, Serialize};

use crate::ChequeError;

pub use crate::contract::Cheque;

/// EIP-712 domain name for chequebook signing.
pub const DOMAIN_NAME: &str = "Chequebook";

/// EIP-712 domain version for chequebook signing.
pub const DOMAIN_VERSION: &str = "1.0";

/// Constructor, accessor and signing-hash extensions for the generated
/// [`Cheque`] type.
pub trait ChequeExt {
    /// Create a cheque drawing `cumulative_payout` from `chequebook` for
    /// `beneficiary`.
    fn new(chequebook: Address, beneficiary: Address, cumulative_payout: U256) -> Self;

    /// The cumulative payout this cheque promises.
    fn cumulative_payout(&self) -> U256;

    /// The signing domain for cheques on the chain with `chain_id`.
    fn domain(chain_id: u64) -> Eip712Domain;

    /// The hash the chequebook owner signs for this cheque.
    fn signing_hash(&self, chain_id: u64) -> B256;
}

impl ChequeExt for Cheque {
    fn new(chequebook: Address, beneficiary: Address, cumulative_payout: U256) -> Self {
        Self {
            chequebook,
            beneficiary,
            cumulativePayout: cumulative_payout,
        }
    }

    fn cumulative_payout(&self) -> U256 {
        self.cumulativePayout
    }

    fn domain(chain_id: u64) -> Eip712Domain {
        eip712_domain! {
            name: DOMAIN_NAME,
            version: DOMAIN_VERSION,
            chain_id: chain_id,
        }
    }

    fn signing_hash(&self, chain_id: u64) -> B256 {
        self.eip712_signing_hash(&Self::domain(chain_id))
    }
}

/// A cheque together with its issuer's signature.
///
/// Serializes to the flattened camelCase JSON used on the SWAP wire and in
/// the state store, with the 65-byte signature (`r || s || v`) hex-encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedCheque {
    /// The signed payload.
    #[serde(flatten)]
    pub cheque: Cheque,
    /// ECDSA signature over the cheque's EIP-712 hash.
    pub signature: Bytes,
}

impl SignedCheque {
    /// Attach raw signature bytes to a cheque.
    pub fn new(cheque: Cheque, signature: Bytes) -> Self {
        Self { cheque, signature }
    }

    /// Attach a parsed signature to a cheque.
    pub fn from_signature(cheque: Cheque, sig: Signature) -> Self {
        Self {
            cheque,
            signature: Bytes::copy_from_slice(&sig.as_bytes()),
        }
    }

    /// The chequebook contract this cheque draws on.
    pub fn chequebook(&self) -> Address {
        self.cheque.chequebook
    }

    /// Recover the address that signed this cheque for chain `chain_id`.
    pub fn recover_signer(&self, chain_id: u64) -> Result<Address, ChequeError> {
        let sig: Signature = self.signature.as_ref().try_into().map_err(
            |e: SignatureError| {
                ChequeError::SignatureRecovery(format!("malformed signature: {e}"))
            },
        )?;

        sig.recover_address_from_prehash(&self.cheque.signing_hash(chain_id))
            .map_err(|e| ChequeError::SignatureRecovery(format!("recovery failed: {e}")))
    }

    /// Check that `owner` is the address that signed this cheque.
    pub fn verify(&self, owner: Address, chain_id: u64) -> Result<(), ChequeError> {
        let signer = self.recover_signer(chain_id)?;
        if signer == owner {
            Ok(())
        } else {
            Err(ChequeError::InvalidSigner {
                expected: owner,
                actual: signer,
            })
        }
    }

    /// Encode for SWAP protocol transmission.
    pub fn to_json(&self) -> Result<Bytes, ChequeError> {
        serde_json::to_vec(self)
            .map(Bytes::from)
            .map_err(|e| ChequeError::Serialization(e.to_string()))
    }

    /// Decode from SWAP protocol bytes.
    pub fn from_json(data: &[u8]) -> Result<Self, ChequeError> {
        serde_json::from_slice(data).map_err(|e| ChequeError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_signer::SignerSync;
    use alloy_signer_local::PrivateKeySigner;

    const CHAIN_ID: u64 = 100;

    fn cheque_over(amount: u64) -> Cheque {
        Cheque::new(
            Address::repeat_byte(0xaa),
            Address::repeat_byte(0xbe),
            U256::from(amount),
        )
    }

    fn sign(cheque: Cheque, signer: &PrivateKeySigner) -> SignedCheque {
        let sig = signer
            .sign_hash_sync(&cheque.signing_hash(CHAIN_ID))
            .unwrap();
        SignedCheque::from_signature(cheque, sig)
    }

    #[test]
    fn test_accessors() {
        let cheque = cheque_over(500);
        assert_eq!(cheque.chequebook, Address::repeat_byte(0xaa));
        assert_eq!(cheque.beneficiary, Address::repeat_byte(0xbe));
        assert_eq!(cheque.cumulative_payout(), U256::from(500u64));

        let signed = SignedCheque::new(cheque, Bytes::from(vec![0u8; 65]));
        assert_eq!(signed.chequebook(), Address::repeat_byte(0xaa));
    }

    #[test]
    fn test_domain_binds_chain_id() {
        assert_eq!(
            Cheque::domain(CHAIN_ID).chain_id,
            Some(U256::from(CHAIN_ID))
        );
    }

    #[test]
    fn test_signing_hash_commits_to_payout_and_chain() {
        let base = cheque_over(500).signing_hash(CHAIN_ID);

        assert_eq!(base, cheque_over(500).signing_hash(CHAIN_ID));
        assert_ne!(base, cheque_over(501).signing_hash(CHAIN_ID));
        assert_ne!(base, cheque_over(500).signing_hash(CHAIN_ID + 1));
    }

    #[test]
    fn test_recover_matches_signer() {
        let signer = PrivateKeySigner::random();
        let signed = sign(cheque_over(500), &signer);

        assert_eq!(signed.recover_signer(CHAIN_ID).unwrap(), signer.address());
        signed.verify(signer.address(), CHAIN_ID).unwrap();
    }

    #[test]
    fn test_verify_rejects_other_owner() {
        let signer = PrivateKeySigner::random();
        let signed = sign(cheque_over(500), &signer);

        let err = signed
            .verify(Address::repeat_byte(0x01), CHAIN_ID)
            .unwrap_err();
        assert!(matches!(err, ChequeError::InvalidSigner { actual, .. }
            if actual == signer.address()));
    }

    #[test]
    fn test_verify_rejects_tampered_payout() {
        let signer = PrivateKeySigner::random();
        let mut signed = sign(cheque_over(500), &signer);
        signed.cheque.cumulativePayout = U256::from(5_000u64);

        // recovery yields some address, just not the issuer
        assert!(signed.verify(signer.address(), CHAIN_ID).is_err());
    }

    #[test]
    fn test_recover_rejects_malformed_signature() {
        let signed = SignedCheque::new(cheque_over(500), Bytes::from(vec![0u8; 64]));
        assert!(matches!(
            signed.recover_signer(CHAIN_ID),
            Err(ChequeError::SignatureRecovery(_))
        ));
    }

    #[test]
    fn test_wire_format() {
        let signed = SignedCheque::new(cheque_over(500), Bytes::from(vec![0x11u8; 65]));

        let json = signed.to_json().unwrap();
        let text = core::str::from_utf8(&json).unwrap();
        // cheque fields are flattened next to the signature, in camelCase
        assert!(text.contains("\"cumulativePayout\""));
        assert!(text.contains("\"signature\""));
        assert!(!text.contains("\"cheque\""));

        assert_eq!(SignedCheque::from_json(&json).unwrap(), signed);
    }
}

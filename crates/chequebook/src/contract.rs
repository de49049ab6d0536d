//! ERC20SimpleSwap contract surface.
//!
//! Generated call and event types for the chequebook contract, plus thin
//! helpers for the two operations the settlement layer needs: encoding a
//! `cashChequeBeneficiary` call and decoding the events a cashout emits.
//!
//! Event decoding is pure - decoders check the log's topic signature and
//! fail on anything else, so callers can probe a log against each event in
//! turn. Filtering logs by emitting address is the caller's concern.

use alloy_primitives::{Address, Bytes, Log, U256};
use alloy_sol_types::{sol, SolCall, SolEvent};

sol! {
    /// EIP-712 payload of a chequebook cheque.
    ///
    /// Field names follow the Solidity declaration so that ABI hashing and
    /// JSON serialization both match the on-chain type.
    #[derive(Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
    struct Cheque {
        address chequebook;
        address beneficiary;
        uint256 cumulativePayout;
    }
}

sol! {
    #[derive(Debug, PartialEq, Eq)]
    contract ERC20SimpleSwap {
        /// Emitted when a cheque is cashed against the chequebook.
        event ChequeCashed(
            address indexed beneficiary,
            address indexed recipient,
            address indexed caller,
            uint256 totalPayout,
            uint256 cumulativePayout,
            uint256 callerPayout
        );

        /// Emitted when the chequebook could not cover the full owed amount.
        event ChequeBounced();

        /// Cash the owed amount of a cheque to `recipient`.
        function cashChequeBeneficiary(
            address recipient,
            uint256 cumulativePayout,
            bytes calldata beneficiarySig
        );
    }
}

/// ABI-encode a `cashChequeBeneficiary` call.
pub fn cash_cheque_beneficiary_call(
    recipient: Address,
    cumulative_payout: U256,
    beneficiary_sig: Bytes,
) -> Bytes {
    let call = ERC20SimpleSwap::cashChequeBeneficiaryCall {
        recipient,
        cumulativePayout: cumulative_payout,
        beneficiarySig: beneficiary_sig,
    };
    call.abi_encode().into()
}

/// Attempt to decode a log as a [`ERC20SimpleSwap::ChequeCashed`] event.
pub fn parse_cheque_cashed(
    log: &Log,
) -> Result<ERC20SimpleSwap::ChequeCashed, alloy_sol_types::Error> {
    ERC20SimpleSwap::ChequeCashed::decode_log(log).map(|decoded| decoded.data)
}

/// Attempt to decode a log as a [`ERC20SimpleSwap::ChequeBounced`] event.
pub fn parse_cheque_bounced(
    log: &Log,
) -> Result<ERC20SimpleSwap::ChequeBounced, alloy_sol_types::Error> {
    ERC20SimpleSwap::ChequeBounced::decode_log(log).map(|decoded| decoded.data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::hex;

    fn cashed_event() -> ERC20SimpleSwap::ChequeCashed {
        ERC20SimpleSwap::ChequeCashed {
            beneficiary: Address::repeat_byte(0x0b),
            recipient: Address::repeat_byte(0x0c),
            caller: Address::repeat_byte(0x0d),
            totalPayout: U256::from(400u64),
            cumulativePayout: U256::from(1000u64),
            callerPayout: U256::from(5u64),
        }
    }

    #[test]
    fn test_call_encoding_has_selector() {
        let data = cash_cheque_beneficiary_call(
            Address::repeat_byte(0x0c),
            U256::from(1000u64),
            Bytes::from(vec![0u8; 65]),
        );
        assert_eq!(
            &data[..4],
            ERC20SimpleSwap::cashChequeBeneficiaryCall::SELECTOR
        );
        // selector + three head words + signature tail
        assert!(data.len() > 4 + 32 * 3);
    }

    #[test]
    fn test_cheque_cashed_roundtrip() {
        let event = cashed_event();
        let log = Log {
            address: Address::repeat_byte(0xcb),
            data: event.encode_log_data(),
        };
        assert_eq!(parse_cheque_cashed(&log).unwrap(), event);
    }

    #[test]
    fn test_cheque_bounced_roundtrip() {
        let log = Log {
            address: Address::repeat_byte(0xcb),
            data: ERC20SimpleSwap::ChequeBounced {}.encode_log_data(),
        };
        assert!(parse_cheque_bounced(&log).is_ok());
    }

    #[test]
    fn test_events_do_not_cross_decode() {
        let cashed = Log {
            address: Address::repeat_byte(0xcb),
            data: cashed_event().encode_log_data(),
        };
        let bounced = Log {
            address: Address::repeat_byte(0xcb),
            data: ERC20SimpleSwap::ChequeBounced {}.encode_log_data(),
        };
        assert!(parse_cheque_bounced(&cashed).is_err());
        assert!(parse_cheque_cashed(&bounced).is_err());
    }

    #[test]
    fn test_cheque_struct_json_field_names() {
        let cheque = Cheque {
            chequebook: Address::repeat_byte(0x01),
            beneficiary: Address::repeat_byte(0x02),
            cumulativePayout: U256::from(7u64),
        };
        let json = serde_json::to_string(&cheque).unwrap();
        assert!(json.contains("cumulativePayout"));
        assert!(json.contains(&format!("0x{}", hex::encode([0x01u8; 20]))));
    }
}

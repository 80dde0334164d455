//! Hashing utilities for farmscope.
//!
//! Provides keccak256 hashing, event topic computation and the topic padding
//! helpers that indexer filters need. All of them must match what the EVM
//! writes into log topics.

use crate::error::{CoreError, Result};
use crate::types::ChainAddress;
use alloy_primitives::{keccak256 as alloy_keccak256, Address, B256};

/// Compute keccak256 hash of input data.
///
/// This is a re-export of Alloy's keccak256 for convenience.
pub fn keccak256(data: &[u8]) -> B256 {
    alloy_keccak256(data)
}

/// Compute the topic hash of an event from its canonical signature.
///
/// The signature must be in canonical form: the event name followed by the
/// parenthesised, comma-separated parameter types with no spaces or names.
///
/// # Example
///
/// ```
/// use farmscope_core::hashing::event_topic;
///
/// let topic = event_topic("FarmDepositChange(bytes32,int256)");
/// assert_ne!(topic, farmscope_core::B256::ZERO);
/// ```
pub fn event_topic(signature: &str) -> B256 {
    keccak256(signature.as_bytes())
}

/// Expand a `bytes24` value to the 32-byte word an indexed `bytes24` occupies in a topic.
///
/// Fixed-size byte arrays are left-aligned, so the value is padded with zeros on the right.
pub fn expand_bytes24_to_bytes32(value: &ChainAddress) -> B256 {
    let mut word = [0u8; 32];
    word[..24].copy_from_slice(value.as_slice());
    B256::from(word)
}

/// Expand an address to the 32-byte word an indexed `address` occupies in a topic.
///
/// Addresses are right-aligned, so the value is padded with zeros on the left.
pub fn expand_address_to_bytes32(address: &Address) -> B256 {
    address.into_word()
}

/// Encode a metastate key name: ASCII bytes right-padded with zeros to 32 bytes.
pub fn metastate_key(name: &str) -> Result<B256> {
    let bytes = name.as_bytes();
    if bytes.len() > 32 {
        return Err(CoreError::MetastateKeyTooLong(name.to_string()));
    }

    let mut word = [0u8; 32];
    word[..bytes.len()].copy_from_slice(bytes);
    Ok(B256::from(word))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::hex;

    #[test]
    fn test_keccak256() {
        let hash = keccak256(b"hello");
        let expected = hex!("1c8aff950685c2ed4bc3174f3472287b56d9517b9c948127319a09a7a36deac8");
        assert_eq!(hash.as_slice(), &expected);
    }

    #[test]
    fn test_event_topic_is_keccak_of_signature() {
        let sig = "FarmExists(address,bytes24,bytes24,bytes32)";
        assert_eq!(event_topic(sig), keccak256(sig.as_bytes()));
    }

    #[test]
    fn test_expand_bytes24_pads_right() {
        let ca = ChainAddress::new(137, Address::repeat_byte(0xab)).unwrap();
        let word = expand_bytes24_to_bytes32(&ca);

        assert_eq!(&word[..24], ca.as_slice());
        assert_eq!(&word[24..], &[0u8; 8]);
    }

    #[test]
    fn test_expand_address_pads_left() {
        let addr = Address::repeat_byte(0x11);
        let word = expand_address_to_bytes32(&addr);

        assert_eq!(&word[..12], &[0u8; 12]);
        assert_eq!(&word[12..], addr.as_slice());
    }

    #[test]
    fn test_metastate_key() {
        let key = metastate_key("abc").unwrap();
        assert_eq!(&key[..3], b"abc");
        assert!(key[3..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_metastate_key_too_long() {
        let name = "x".repeat(33);
        assert_eq!(
            metastate_key(&name),
            Err(CoreError::MetastateKeyTooLong(name.clone()))
        );
        assert!(metastate_key(&"x".repeat(32)).is_ok());
    }
}

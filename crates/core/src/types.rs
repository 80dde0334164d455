//! Core types for farmscope.

use alloy_primitives::{Address, FixedBytes};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// EVM chain identifier.
pub type ChainId = u64;

/// Token definition as the farms contract stores it (`bytes24`).
///
/// Layout: 4-byte big-endian chain id followed by the 20-byte token address.
/// Reward and referred token definitions, and proportional-farm tokens, all use it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChainAddress(FixedBytes<24>);

impl ChainAddress {
    /// Wrap raw `bytes24` without interpretation.
    pub const fn from_raw(bytes: FixedBytes<24>) -> Self {
        ChainAddress(bytes)
    }

    /// Build a chain address from a chain id and a token address.
    pub fn new(chain_id: ChainId, address: Address) -> Result<Self, CoreError> {
        let chain = u32::try_from(chain_id).map_err(|_| CoreError::ChainIdOutOfRange(chain_id))?;

        let mut bytes = [0u8; 24];
        bytes[..4].copy_from_slice(&chain.to_be_bytes());
        bytes[4..].copy_from_slice(address.as_slice());
        Ok(ChainAddress(FixedBytes::from(bytes)))
    }

    /// The native reward token definition of a chain (zero address).
    pub fn native(chain_id: ChainId) -> Result<Self, CoreError> {
        Self::new(chain_id, Address::ZERO)
    }

    /// Chain id prefix.
    pub fn chain_id(&self) -> ChainId {
        let mut chain = [0u8; 4];
        chain.copy_from_slice(&self.0[..4]);
        u32::from_be_bytes(chain) as ChainId
    }

    /// Token address part.
    pub fn address(&self) -> Address {
        Address::from_slice(&self.0[4..])
    }

    /// Whether this definition refers to the chain's native token.
    pub fn is_native(&self) -> bool {
        self.address().is_zero()
    }

    /// Raw bytes.
    pub fn as_slice(&self) -> &[u8] {
        self.0.as_slice()
    }

    /// Get the inner `bytes24`.
    pub const fn into_inner(self) -> FixedBytes<24> {
        self.0
    }
}

impl From<FixedBytes<24>> for ChainAddress {
    fn from(bytes: FixedBytes<24>) -> Self {
        ChainAddress(bytes)
    }
}

impl From<ChainAddress> for FixedBytes<24> {
    fn from(value: ChainAddress) -> Self {
        value.0
    }
}

impl fmt::Display for ChainAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0.as_slice()))
    }
}

impl FromStr for ChainAddress {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let raw = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let bytes = hex::decode(raw).map_err(|_| CoreError::InvalidHex)?;
        if bytes.len() != 24 {
            return Err(CoreError::InvalidChainAddress(s.to_string()));
        }
        Ok(ChainAddress(FixedBytes::from_slice(&bytes)))
    }
}

// Serialized as a 0x-prefixed hex string, validated on the way in.
impl Serialize for ChainAddress {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ChainAddress {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        value
            .parse::<ChainAddress>()
            .map_err(|e| serde::de::Error::custom(format!("{}", e)))
    }
}

/// How a farm distributes rewards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FarmType {
    /// One referred token paired with one reward token.
    PairToken,
    /// A token set that grows and shrinks through token-change events.
    Proportional,
}

/// Direction of a `FarmTokenChange` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenChange {
    /// Token joined the farm (`change == 0`).
    Added,
    /// Token left the farm (`change == 1`).
    Removed,
}

impl TokenChange {
    /// Interpret the contract's `uint8 change` flag.
    pub fn from_flag(flag: u8) -> Option<Self> {
        match flag {
            0 => Some(TokenChange::Added),
            1 => Some(TokenChange::Removed),
            _ => None,
        }
    }

    /// Contract flag for this change.
    pub const fn flag(&self) -> u8 {
        match self {
            TokenChange::Added => 0,
            TokenChange::Removed => 1,
        }
    }
}

//! Canonical constants for the referral-farm contracts.
//!
//! These constants MUST match the values the farms contract and verifier use.

use alloy_primitives::{address, b256, fixed_bytes, Address, B256};

use crate::types::ChainAddress;

/// Metastate key name carrying the farm's daily reward rate.
pub const DAILY_REWARD_RATE: &str = "dailyRewardRate";

/// `dailyRewardRate` as a metastate key: ASCII bytes right-padded to 32 bytes.
pub const DAILY_REWARD_RATE_KEY: B256 =
    b256!("6461696c79526577617264526174650000000000000000000000000000000000");

/// Referred-token definition that marks a farm as proportional.
///
/// Chain id `0xffffffff` with the zero address: a token that exists on no chain.
/// Deployments that use a different marker override it in configuration.
pub const PROPORTIONAL_FARM_REFERRED_TOKEN_DEFN: ChainAddress =
    ChainAddress::from_raw(fixed_bytes!("ffffffff0000000000000000000000000000000000000000"));

/// Referrer address used when the app itself refers a token.
pub const MASK_REFERRER: Address = address!("172059839d80773eC8617C4CB33835175d364cEE");

//! Call data for the farm funding and configuration transactions.
//!
//! Only the bytes are built here. Signing and broadcasting belong to the wallet.

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol;
use alloy::sol_types::{SolCall, SolValue};
use farmscope_core::{ChainAddress, DAILY_REWARD_RATE_KEY};

sol! {
    /// Metastate key/value pair.
    #[derive(Debug, PartialEq, Eq)]
    struct Metastate {
        bytes32 key;
        bytes value;
    }

    /// Fund (or top up) an ERC-20 reward farm.
    #[derive(Debug, PartialEq, Eq)]
    function increaseReferralFarm(
        bytes24 rewardToken,
        bytes24 referredTokenDefn,
        uint256 rewardDeposit,
        Metastate[] metastate
    );

    /// Fund a native-token reward farm; the deposit is the call value.
    #[derive(Debug, PartialEq, Eq)]
    function increaseReferralFarmNative(bytes24 referredTokenDefn, Metastate[] metastate) payable;

    /// Update metastate without changing the deposit.
    #[derive(Debug, PartialEq, Eq)]
    function configureMetastate(bytes24 rewardTokenDefn, bytes24 referredTokenDefn, Metastate[] metastate);

    /// ERC-20 allowance for the farms contract to pull the deposit.
    #[derive(Debug, PartialEq, Eq)]
    function approve(address spender, uint256 amount) returns (bool);
}

/// `dailyRewardRate` metastate entry for a rate in wei.
pub fn daily_reward_rate_metastate(daily_reward: U256) -> Metastate {
    Metastate {
        key: DAILY_REWARD_RATE_KEY,
        value: Bytes::from(daily_reward.abi_encode()),
    }
}

fn metastate_for(daily_reward: Option<U256>) -> Vec<Metastate> {
    daily_reward
        .map(daily_reward_rate_metastate)
        .into_iter()
        .collect()
}

/// `increaseReferralFarm` call data. Without a daily reward no metastate is sent.
pub fn increase_referral_farm(
    reward_token: ChainAddress,
    referred_token: ChainAddress,
    deposit: U256,
    daily_reward: Option<U256>,
) -> Bytes {
    increaseReferralFarmCall {
        rewardToken: reward_token.into_inner(),
        referredTokenDefn: referred_token.into_inner(),
        rewardDeposit: deposit,
        metastate: metastate_for(daily_reward),
    }
    .abi_encode()
    .into()
}

/// `increaseReferralFarmNative` call data. The deposit travels as the transaction value.
pub fn increase_referral_farm_native(referred_token: ChainAddress, daily_reward: Option<U256>) -> Bytes {
    increaseReferralFarmNativeCall {
        referredTokenDefn: referred_token.into_inner(),
        metastate: metastate_for(daily_reward),
    }
    .abi_encode()
    .into()
}

/// `configureMetastate` call data setting the daily reward rate.
pub fn configure_metastate(
    reward_token: ChainAddress,
    referred_token: ChainAddress,
    daily_reward: U256,
) -> Bytes {
    configureMetastateCall {
        rewardTokenDefn: reward_token.into_inner(),
        referredTokenDefn: referred_token.into_inner(),
        metastate: vec![daily_reward_rate_metastate(daily_reward)],
    }
    .abi_encode()
    .into()
}

/// ERC-20 `approve` call data, sent to the reward token before funding a farm.
pub fn approve(spender: Address, amount: U256) -> Bytes {
    approveCall { spender, amount }.abi_encode().into()
}

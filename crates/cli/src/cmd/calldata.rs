use alloy::primitives::utils::parse_ether;
use alloy::primitives::{Address, Bytes, U256};
use anyhow::Result;
use clap::Subcommand;
use farmscope_core::ChainAddress;
use farmscope_indexer::calls;
use serde::Serialize;

#[derive(Debug, Subcommand)]
pub enum CalldataCommand {
    /// Create or top up an ERC-20 funded farm.
    Create {
        #[arg(long)]
        reward_token: ChainAddress,
        #[arg(long)]
        referred_token: ChainAddress,
        /// Deposit in whole tokens (18 decimals)
        #[arg(long, value_parser = parse_amount)]
        deposit: U256,
        /// Daily reward in whole tokens (18 decimals)
        #[arg(long, value_parser = parse_amount)]
        daily_reward: Option<U256>,
    },
    /// Create or top up a farm funded with the native token.
    CreateNative {
        #[arg(long)]
        referred_token: ChainAddress,
        /// Deposit sent as transaction value, in ether
        #[arg(long, value_parser = parse_amount)]
        deposit: U256,
        #[arg(long, value_parser = parse_amount)]
        daily_reward: Option<U256>,
    },
    /// Change the daily reward rate of an existing farm.
    Metastate {
        #[arg(long)]
        reward_token: ChainAddress,
        #[arg(long)]
        referred_token: ChainAddress,
        #[arg(long, value_parser = parse_amount)]
        daily_reward: U256,
    },
    /// ERC-20 approval for the farms contract.
    Approve {
        #[arg(long)]
        spender: Address,
        #[arg(long, value_parser = parse_amount)]
        amount: U256,
    },
}

#[derive(Debug, PartialEq, Serialize)]
struct CallData {
    function: &'static str,
    data: Bytes,
    value: U256,
}

fn parse_amount(s: &str) -> Result<U256, String> {
    parse_ether(s).map_err(|e| format!("invalid amount '{}': {}", s, e))
}

fn build(command: CalldataCommand) -> CallData {
    match command {
        CalldataCommand::Create {
            reward_token,
            referred_token,
            deposit,
            daily_reward,
        } => CallData {
            function: "increaseReferralFarm",
            data: calls::increase_referral_farm(reward_token, referred_token, deposit, daily_reward),
            value: U256::ZERO,
        },
        CalldataCommand::CreateNative {
            referred_token,
            deposit,
            daily_reward,
        } => CallData {
            function: "increaseReferralFarmNative",
            data: calls::increase_referral_farm_native(referred_token, daily_reward),
            value: deposit,
        },
        CalldataCommand::Metastate {
            reward_token,
            referred_token,
            daily_reward,
        } => CallData {
            function: "configureMetastate",
            data: calls::configure_metastate(reward_token, referred_token, daily_reward),
            value: U256::ZERO,
        },
        CalldataCommand::Approve { spender, amount } => CallData {
            function: "approve",
            data: calls::approve(spender, amount),
            value: U256::ZERO,
        },
    }
}

pub fn run(command: CalldataCommand) -> Result<()> {
    super::print_json(&build(command))
}

use alloy::primitives::Address;
use anyhow::{Context, Result};
use clap::Args;
use farmscope_core::ChainAddress;
use farmscope_indexer::config::Config;
use farmscope_indexer::{Farm, TokenFilter};
use farmscope_verifier::{AprParams, VerifierClient};
use serde::Serialize;
use std::time::Duration;

use super::print_json;

#[derive(Debug, Args)]
pub struct TokenFilterArgs {
    /// Only farms paying this reward token (bytes24 chain address, repeatable)
    #[arg(long = "reward-token")]
    reward_tokens: Vec<ChainAddress>,

    /// Only farms referring this token (bytes24 chain address, repeatable)
    #[arg(long = "referred-token")]
    referred_tokens: Vec<ChainAddress>,
}

impl From<TokenFilterArgs> for TokenFilter {
    fn from(args: TokenFilterArgs) -> Self {
        TokenFilter {
            reward_tokens: args.reward_tokens,
            referred_tokens: args.referred_tokens,
        }
    }
}

#[derive(Debug, Args)]
pub struct FarmsArgs {
    #[command(flatten)]
    tokens: TokenFilterArgs,

    /// Join each farm with its APR from the verifier
    #[arg(long)]
    with_apr: bool,
}

#[derive(Debug, Args)]
pub struct MyFarmsArgs {
    /// Farm sponsor address
    #[arg(long)]
    sponsor: Address,

    #[command(flatten)]
    tokens: TokenFilterArgs,
}

#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
pub struct TokenFarmsArgs {
    /// Referred token (bytes24 chain address)
    #[arg(long)]
    referred: Option<ChainAddress>,

    /// Reward token (bytes24 chain address)
    #[arg(long)]
    reward: Option<ChainAddress>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FarmView<'a> {
    #[serde(flatten)]
    farm: &'a Farm,
    total_farm_rewards_ether: String,
    daily_farm_reward_ether: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    apr: Option<f64>,
}

pub async fn run_farms(config: &Config, args: FarmsArgs) -> Result<()> {
    let queries = config.farm_queries()?;
    let farms = queries.all_farms(&args.tokens.into()).await?;

    let apr = if args.with_apr {
        let verifier = verifier_client(config)?;
        let params = AprParams {
            farm_hash: None,
            chain_id: Some(config.network.chain_id),
        };
        Some(verifier.fetch_apr(&params).await?)
    } else {
        None
    };

    let views: Vec<FarmView<'_>> = farms
        .iter()
        .map(|farm| FarmView {
            farm,
            total_farm_rewards_ether: farm.total_rewards_ether(),
            daily_farm_reward_ether: farm.daily_reward_ether(),
            apr: apr
                .as_ref()
                .and_then(|map| map.get(&farm.farm_hash))
                .map(|info| info.apr),
        })
        .collect();

    print_json(&views)
}

pub async fn run_my_farms(config: &Config, args: MyFarmsArgs) -> Result<()> {
    let queries = config.farm_queries()?;
    let farms = queries
        .farms_by_sponsor(args.sponsor, &args.tokens.into())
        .await?;
    print_json(&farms)
}

pub async fn run_token_farms(config: &Config, args: TokenFarmsArgs) -> Result<()> {
    let queries = config.farm_queries()?;
    let farms = match (args.referred, args.reward) {
        (Some(token), _) => queries.farms_for_referred_token(token).await?,
        (None, Some(token)) => queries.farms_for_reward_token(token).await?,
        (None, None) => anyhow::bail!("Either --referred or --reward is required"),
    };
    print_json(&farms)
}

pub async fn run_deposits(config: &Config) -> Result<()> {
    let queries = config.farm_queries()?;
    let deposits = queries.farm_deposits().await?;
    print_json(&deposits)
}

pub(crate) fn verifier_client(config: &Config) -> Result<VerifierClient> {
    let verifier = config
        .verifier
        .as_ref()
        .context("This command needs a [verifier] section in the configuration")?;
    Ok(VerifierClient::new(
        verifier.url.clone(),
        Duration::from_secs(verifier.timeout_secs),
    )?)
}

use alloy::primitives::utils::format_ether;
use alloy::primitives::{Address, Bytes, B256, U256};
use anyhow::Result;
use clap::{Args, Subcommand};
use farmscope_core::{ChainAddress, ChainId, MASK_REFERRER};
use farmscope_indexer::config::Config;
use farmscope_indexer::{Farm, TokenFilter};
use farmscope_verifier::{
    AprInfo, AprParams, ProofOfRecommendation, RewardProof, TimePromise, TimePromiseRequest,
};
use serde::Serialize;
use std::collections::BTreeMap;

use super::farms::verifier_client;
use super::print_json;

#[derive(Debug, Args)]
pub struct ProofsArgs {
    /// Account to list reward proofs for
    #[arg(long)]
    account: Address,

    /// Join each proof's rewards with farm state and APR
    #[arg(long)]
    with_farms: bool,
}

#[derive(Debug, Args)]
pub struct AprArgs {
    /// Restrict to one farm
    #[arg(long)]
    farm_hash: Option<B256>,

    /// Restrict to one chain (defaults to the configured network)
    #[arg(long)]
    chain_id: Option<ChainId>,
}

#[derive(Debug, Args)]
pub struct LinkArgs {
    /// Account creating the link
    #[arg(long)]
    signer: Address,

    /// Token being referred
    #[arg(long)]
    token: Address,

    /// Dapp identifier
    #[arg(long, default_value_t = B256::ZERO)]
    dapp: B256,

    /// Upstream referrer
    #[arg(long, default_value_t = Address::ZERO)]
    referrer: Address,

    /// Router the referral goes through
    #[arg(long, default_value_t = MASK_REFERRER)]
    router: Address,
}

impl From<&LinkArgs> for TimePromiseRequest {
    fn from(args: &LinkArgs) -> Self {
        TimePromiseRequest {
            signer: args.signer,
            token: args.token,
            dapp: args.dapp,
            referrer: args.referrer,
            router: args.router,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum LinkCommand {
    /// Request a time promise for a new referral link.
    Promise(LinkArgs),
    /// Submit a signed proof of recommendation.
    Submit {
        #[command(flatten)]
        link: LinkArgs,

        /// Promised time returned by `link promise`
        #[arg(long)]
        time: u64,

        /// Oracle signature returned by `link promise`
        #[arg(long)]
        time_promise: Bytes,

        /// Wallet signature over the recommendation
        #[arg(long)]
        sig: Bytes,

        /// Referrer of the link itself
        #[arg(long, default_value = "")]
        link_referrer: String,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PromiseView {
    request: TimePromiseRequest,
    promise: TimePromise,
}

/// One reward line of a proof, joined with its farm.
#[derive(Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct RewardLine {
    farm_hash: B256,
    value: U256,
    value_ether: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    referred_token_defn: Option<ChainAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    apr: Option<f64>,
}

/// A proof with its rewards summed. Unknown farms contribute no APR.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProofRewards<'a> {
    proof: &'a RewardProof,
    #[serde(skip_serializing_if = "Option::is_none")]
    reward_token_defn: Option<ChainAddress>,
    total_rewards: U256,
    total_rewards_ether: String,
    total_apr: f64,
    rewards: Vec<RewardLine>,
}

fn join_rewards<'a>(
    proofs: &'a [RewardProof],
    farms: &BTreeMap<B256, Farm>,
    apr: &BTreeMap<B256, AprInfo>,
) -> Vec<ProofRewards<'a>> {
    proofs
        .iter()
        .map(|proof| {
            let rewards: Vec<RewardLine> = proof
                .reward_values()
                .into_iter()
                .map(|(farm_hash, value)| RewardLine {
                    farm_hash,
                    value,
                    value_ether: format_ether(value),
                    referred_token_defn: farms.get(&farm_hash).map(|f| f.referred_token_defn),
                    apr: apr.get(&farm_hash).map(|info| info.apr),
                })
                .collect();
            let total_rewards = proof.total_reward();
            ProofRewards {
                proof,
                reward_token_defn: proof.reward_token_defn(),
                total_rewards,
                total_rewards_ether: format_ether(total_rewards),
                total_apr: rewards.iter().filter_map(|r| r.apr).sum(),
                rewards,
            }
        })
        .collect()
}

pub async fn run_proofs(config: &Config, args: ProofsArgs) -> Result<()> {
    let verifier = verifier_client(config)?;
    let proofs = verifier.fetch_proofs(args.account).await?;
    tracing::info!(account = %args.account, count = proofs.len(), "Fetched reward proofs");

    if !args.with_farms {
        return print_json(&proofs);
    }

    let farms: BTreeMap<B256, Farm> = config
        .farm_queries()?
        .all_farms(&TokenFilter::default())
        .await?
        .into_iter()
        .map(|farm| (farm.farm_hash, farm))
        .collect();
    let apr = verifier
        .fetch_apr(&AprParams {
            farm_hash: None,
            chain_id: Some(config.network.chain_id),
        })
        .await?;

    print_json(&join_rewards(&proofs, &farms, &apr))
}

pub async fn run_apr(config: &Config, args: AprArgs) -> Result<()> {
    let verifier = verifier_client(config)?;
    let params = AprParams {
        farm_hash: args.farm_hash,
        chain_id: Some(args.chain_id.unwrap_or(config.network.chain_id)),
    };
    let apr = verifier.fetch_apr(&params).await?;
    let items: Vec<_> = apr.into_values().collect();
    print_json(&items)
}

pub async fn run_link(config: &Config, command: LinkCommand) -> Result<()> {
    let verifier = verifier_client(config)?;

    match command {
        LinkCommand::Promise(args) => {
            let request = TimePromiseRequest::from(&args);
            let promise = verifier.request_time_promise(&request).await?;
            print_json(&PromiseView { request, promise })
        }
        LinkCommand::Submit {
            link,
            time,
            time_promise,
            sig,
            link_referrer,
        } => {
            let request = TimePromiseRequest::from(&link);
            let promise = TimePromise {
                time,
                sig: time_promise,
            };
            let proof = ProofOfRecommendation::new(&request, &promise, sig);
            let commitment = verifier
                .post_proof_of_recommendation(&proof, &link_referrer)
                .await?;
            print_json(&commitment)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use farmscope_core::{FarmType, PROPORTIONAL_FARM_REFERRED_TOKEN_DEFN};

    fn farm(hash: B256) -> Farm {
        Farm {
            farm_hash: hash,
            sponsor: Address::repeat_byte(0x5a),
            reward_token_defn: ChainAddress::new(137, Address::repeat_byte(0x01)).unwrap(),
            referred_token_defn: PROPORTIONAL_FARM_REFERRED_TOKEN_DEFN,
            farm_type: FarmType::Proportional,
            total_farm_rewards: Default::default(),
            daily_farm_reward: U256::ZERO,
            tokens: Default::default(),
        }
    }

    #[test]
    fn test_join_rewards_sums_values_and_apr() {
        let known = B256::repeat_byte(0x11);
        let unknown = B256::repeat_byte(0x22);
        let req = format!(
            r#"{{"rewardTokenDefn":"0x000000890000000000000000000000000000000000000001","rewards":[{{"farmHash":"{known}","value":{{"hex":"0x0de0b6b3a7640000"}}}},{{"farmHash":"{unknown}","value":"0x0de0b6b3a7640000"}}]}}"#
        );
        let proof: RewardProof =
            serde_json::from_str(&format!(r#"{{"req":{req},"effect":{{"sig":"0x01"}}}}"#)).unwrap();
        let proofs = vec![proof];

        let farms = BTreeMap::from([(known, farm(known))]);
        let apr = BTreeMap::from([(
            known,
            AprInfo {
                farm_hash: known,
                apr: 0.25,
            },
        )]);

        let joined = join_rewards(&proofs, &farms, &apr);

        assert_eq!(joined.len(), 1);
        let view = &joined[0];
        assert_eq!(view.reward_token_defn.map(|d| d.chain_id()), Some(137));
        assert_eq!(view.total_rewards, U256::from(2_000_000_000_000_000_000u128));
        assert_eq!(view.total_rewards_ether, "2.000000000000000000");
        assert_eq!(view.total_apr, 0.25);
        assert_eq!(
            view.rewards[0].referred_token_defn,
            Some(PROPORTIONAL_FARM_REFERRED_TOKEN_DEFN)
        );
        assert_eq!(view.rewards[1].referred_token_defn, None);
        assert_eq!(view.rewards[1].apr, None);

        let json = serde_json::to_value(view).unwrap();
        assert_eq!(json["proof"]["effect"]["sig"], "0x01");
    }

    #[derive(Debug, clap::Parser)]
    struct Harness {
        #[command(subcommand)]
        link: LinkCommand,
    }

    #[test]
    fn test_link_defaults() {
        use clap::Parser;

        let signer = Address::repeat_byte(0x01);
        let token = Address::repeat_byte(0x02);
        let harness = Harness::parse_from([
            "link",
            "promise",
            "--signer",
            &signer.to_string(),
            "--token",
            &token.to_string(),
        ]);

        let LinkCommand::Promise(args) = harness.link else {
            panic!("expected promise");
        };
        let request = TimePromiseRequest::from(&args);
        assert_eq!(request.signer, signer);
        assert_eq!(request.dapp, B256::ZERO);
        assert_eq!(request.referrer, Address::ZERO);
        assert_eq!(request.router, MASK_REFERRER);
    }
}

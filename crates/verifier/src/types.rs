//! Verifier request and response types.

use farmscope_core::{Address, Bytes, ChainAddress, ChainId, B256, U256};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use serde_json::Value;

/// A signed reward proof, exactly as the verifier issued it.
///
/// Both halves are kept as raw JSON text and re-emitted byte for byte; key
/// order and big integers survive. The accessors parse a copy to read the
/// fields needed to join proofs with farms and APR data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardProof {
    pub req: Box<RawValue>,
    pub effect: Box<RawValue>,
}

impl PartialEq for RewardProof {
    fn eq(&self, other: &Self) -> bool {
        self.req.get() == other.req.get() && self.effect.get() == other.effect.get()
    }
}

impl RewardProof {
    /// Farm hashes listed in `req.rewards[].farmHash`. Unparseable entries are skipped.
    pub fn farm_hashes(&self) -> Vec<B256> {
        self.rewards()
            .iter()
            .filter_map(|reward| reward.get("farmHash")?.as_str()?.parse().ok())
            .collect()
    }

    /// Reward amounts from `req.rewards[].value`, keyed by farm hash.
    ///
    /// Values arrive either as a hex string or as `{"hex": "0x.."}`.
    pub fn reward_values(&self) -> Vec<(B256, U256)> {
        self.rewards()
            .iter()
            .filter_map(|reward| {
                let farm_hash: B256 = reward.get("farmHash")?.as_str()?.parse().ok()?;
                let value = reward.get("value")?;
                let hex = value
                    .as_str()
                    .or_else(|| value.get("hex").and_then(Value::as_str))?;
                let amount: U256 = hex.parse().ok()?;
                Some((farm_hash, amount))
            })
            .collect()
    }

    /// Sum of [`reward_values`](Self::reward_values), saturating.
    pub fn total_reward(&self) -> U256 {
        self.reward_values()
            .into_iter()
            .fold(U256::ZERO, |total, (_, amount)| total.saturating_add(amount))
    }

    /// Reward token definition from `req.rewardTokenDefn`.
    pub fn reward_token_defn(&self) -> Option<ChainAddress> {
        self.req_value()?.get("rewardTokenDefn")?.as_str()?.parse().ok()
    }

    fn req_value(&self) -> Option<Value> {
        serde_json::from_str(self.req.get()).ok()
    }

    fn rewards(&self) -> Vec<Value> {
        match self.req_value() {
            Some(Value::Object(mut req)) => match req.remove("rewards") {
                Some(Value::Array(rewards)) => rewards,
                _ => Vec::new(),
            },
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ProofsResponse {
    pub items: Vec<RewardProof>,
}

/// Annual percentage rate of one farm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AprInfo {
    pub farm_hash: B256,
    pub apr: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AprResponse {
    pub items: Vec<AprInfo>,
}

/// Optional APR query restrictions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AprParams {
    pub farm_hash: Option<B256>,
    pub chain_id: Option<ChainId>,
}

/// Request for a time promise, the first step of a referral link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimePromiseRequest {
    /// Account creating the link.
    pub signer: Address,
    /// Token being referred.
    pub token: Address,
    /// Dapp identifier; zero for none.
    pub dapp: B256,
    /// Upstream referrer; zero for none.
    pub referrer: Address,
    /// Router the referral goes through.
    pub router: Address,
}

/// Oracle-signed promise of the link creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimePromise {
    pub time: u64,
    pub sig: Bytes,
}

/// Signed proof of recommendation submitted to the verifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofOfRecommendation {
    pub signer: Address,
    pub token: Address,
    pub referrer: Address,
    pub dapp: B256,
    pub router: Address,
    pub time: u64,
    /// The oracle's time promise signature.
    pub time_promise: Bytes,
    /// The signer's wallet signature over the recommendation.
    pub sig: Bytes,
}

impl ProofOfRecommendation {
    /// Combine a time-promise request, the oracle's answer and the wallet signature.
    pub fn new(request: &TimePromiseRequest, promise: &TimePromise, sig: Bytes) -> Self {
        Self {
            signer: request.signer,
            token: request.token,
            referrer: request.referrer,
            dapp: request.dapp,
            router: request.router,
            time: promise.time,
            time_promise: promise.sig.clone(),
            sig,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProofSubmission<'a> {
    pub data: &'a ProofOfRecommendation,
    pub link_referrer: &'a str,
}

//! Replay decoded farm events into per-farm state.
//!
//! Farms are never stored: every query rebuilds them from a fresh replay.

use alloy::primitives::utils::format_ether;
use alloy::primitives::{Address, B256, I256, U256};
use alloy::sol_types::SolValue;
use farmscope_core::{ChainAddress, FarmType, TokenChange, DAILY_REWARD_RATE_KEY};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::events::{DomainEvent, FarmExistsEvent};

/// Aggregate state of one farm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Farm {
    pub farm_hash: B256,
    pub sponsor: Address,
    pub reward_token_defn: ChainAddress,
    pub referred_token_defn: ChainAddress,
    pub farm_type: FarmType,
    /// Sum of all deposit changes, in wei.
    pub total_farm_rewards: I256,
    /// Last `dailyRewardRate` metastate value, in wei.
    pub daily_farm_reward: U256,
    /// Current token set. Always empty for pair-token farms.
    pub tokens: BTreeSet<ChainAddress>,
}

impl Farm {
    fn create(event: &FarmExistsEvent, sentinel: &ChainAddress) -> Self {
        let farm_type = if event.referred_token_defn == *sentinel {
            FarmType::Proportional
        } else {
            FarmType::PairToken
        };

        Self {
            farm_hash: event.farm_hash,
            sponsor: event.sponsor,
            reward_token_defn: event.reward_token_defn,
            referred_token_defn: event.referred_token_defn,
            farm_type,
            total_farm_rewards: I256::ZERO,
            daily_farm_reward: U256::ZERO,
            tokens: BTreeSet::new(),
        }
    }

    /// Total rewards as a decimal ether string.
    pub fn total_rewards_ether(&self) -> String {
        format_ether(self.total_farm_rewards)
    }

    /// Daily reward as a decimal ether string.
    pub fn daily_reward_ether(&self) -> String {
        format_ether(self.daily_farm_reward)
    }
}

/// Outcome of a replay.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reduction {
    /// Farms keyed by farm hash.
    pub farms: BTreeMap<B256, Farm>,
    /// Events whose farm never appeared in the batch, grouped by farm hash
    /// and in arrival order within a farm.
    pub orphaned: Vec<DomainEvent>,
    /// Token changes received for pair-token farms.
    pub ignored_token_changes: usize,
}

/// Replay events and return the resulting farms.
///
/// Never fails; see [`reduce_with_report`] for what gets dropped.
pub fn reduce<'a, I>(events: I, sentinel: &ChainAddress) -> BTreeMap<B256, Farm>
where
    I: IntoIterator<Item = &'a DomainEvent>,
{
    reduce_with_report(events, sentinel).farms
}

/// Replay events, reporting what could not be applied.
///
/// Events that arrive before their farm's `FarmExists` are held back and
/// applied, in arrival order, right after it. Those still held back at the end
/// of the batch are dropped and reported as orphaned.
pub fn reduce_with_report<'a, I>(events: I, sentinel: &ChainAddress) -> Reduction
where
    I: IntoIterator<Item = &'a DomainEvent>,
{
    let mut reduction = Reduction::default();
    let mut pending: BTreeMap<B256, Vec<&'a DomainEvent>> = BTreeMap::new();

    for event in events {
        let farm_hash = event.farm_hash();

        if let DomainEvent::FarmExists(exists) = event {
            if reduction.farms.contains_key(&farm_hash) {
                tracing::debug!(%farm_hash, "Ignoring repeated FarmExists");
                continue;
            }

            let mut farm = Farm::create(exists, sentinel);
            for held in pending.remove(&farm_hash).unwrap_or_default() {
                apply(&mut farm, held, &mut reduction.ignored_token_changes);
            }
            reduction.farms.insert(farm_hash, farm);
            continue;
        }

        match reduction.farms.get_mut(&farm_hash) {
            Some(farm) => apply(farm, event, &mut reduction.ignored_token_changes),
            None => pending.entry(farm_hash).or_default().push(event),
        }
    }

    for (farm_hash, events) in pending {
        tracing::warn!(
            %farm_hash,
            events = events.len(),
            "Dropping events for a farm with no FarmExists in this batch"
        );
        reduction.orphaned.extend(events.into_iter().cloned());
    }

    reduction
}

fn apply(farm: &mut Farm, event: &DomainEvent, ignored_token_changes: &mut usize) {
    match event {
        DomainEvent::FarmExists(_) => {}
        DomainEvent::FarmDepositChange(change) => {
            farm.total_farm_rewards = farm.total_farm_rewards.saturating_add(change.delta);
        }
        DomainEvent::FarmTokenChange(change) => {
            if farm.farm_type != FarmType::Proportional {
                tracing::debug!(farm_hash = %farm.farm_hash, token = %change.token, "Token change on pair-token farm");
                *ignored_token_changes += 1;
                return;
            }
            match change.change {
                TokenChange::Added => {
                    farm.tokens.insert(change.token);
                }
                TokenChange::Removed => {
                    farm.tokens.remove(&change.token);
                }
            }
        }
        DomainEvent::FarmMetastateSet(meta) => {
            if meta.key != DAILY_REWARD_RATE_KEY {
                tracing::debug!(farm_hash = %farm.farm_hash, key = %meta.key, "Ignoring metastate key");
                return;
            }
            match U256::abi_decode(&meta.value, true) {
                Ok(rate) => farm.daily_farm_reward = rate,
                Err(e) => {
                    tracing::warn!(farm_hash = %farm.farm_hash, error = %e, "Undecodable dailyRewardRate");
                }
            }
        }
    }
}

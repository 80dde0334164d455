//! Log filters and the indexer request body.

use alloy::primitives::{Address, B256};
use farmscope_core::ChainId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// What to ask the indexers for.
///
/// Each topic position is either unconstrained or matches any of a set of
/// values. Sets keep the request body stable regardless of insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogFilter {
    /// Emitting contracts.
    pub addresses: BTreeSet<Address>,
    /// Topic positions 0..=3.
    pub topics: [Option<BTreeSet<B256>>; 4],
    /// Chains to search.
    pub chain_ids: BTreeSet<ChainId>,
}

impl LogFilter {
    /// Empty filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an emitting contract.
    pub fn address(mut self, address: Address) -> Self {
        self.addresses.insert(address);
        self
    }

    /// Add a chain.
    pub fn chain_id(mut self, chain_id: ChainId) -> Self {
        self.chain_ids.insert(chain_id);
        self
    }

    /// Constrain a topic position. An empty set leaves it unconstrained.
    pub fn topic<I>(mut self, position: usize, values: I) -> Self
    where
        I: IntoIterator<Item = B256>,
    {
        if let Some(slot) = self.topics.get_mut(position) {
            let set: BTreeSet<B256> = values.into_iter().collect();
            *slot = (!set.is_empty()).then_some(set);
        }
        self
    }

    /// Event signature position.
    pub fn topic1<I: IntoIterator<Item = B256>>(self, values: I) -> Self {
        self.topic(0, values)
    }

    /// First indexed field.
    pub fn topic2<I: IntoIterator<Item = B256>>(self, values: I) -> Self {
        self.topic(1, values)
    }

    /// Second indexed field.
    pub fn topic3<I: IntoIterator<Item = B256>>(self, values: I) -> Self {
        self.topic(2, values)
    }

    /// Third indexed field.
    pub fn topic4<I: IntoIterator<Item = B256>>(self, values: I) -> Self {
        self.topic(3, values)
    }

    /// Wire representation.
    pub fn to_request(&self) -> IndexerRequest {
        let topic = |i: usize| {
            self.topics[i]
                .as_ref()
                .map(|set| set.iter().copied().collect())
        };
        IndexerRequest {
            addresses: self.addresses.iter().copied().collect(),
            topic1: topic(0),
            topic2: topic(1),
            topic3: topic(2),
            topic4: topic(3),
            chain_id: self.chain_ids.iter().copied().collect(),
        }
    }
}

/// Body POSTed to an indexer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexerRequest {
    /// Emitting contracts.
    pub addresses: Vec<Address>,
    /// Signature topics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic1: Option<Vec<B256>>,
    /// First indexed field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic2: Option<Vec<B256>>,
    /// Second indexed field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic3: Option<Vec<B256>>,
    /// Third indexed field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic4: Option<Vec<B256>>,
    /// Chains to search.
    pub chain_id: Vec<ChainId>,
}

//! Farm queries: filter shapes over the quorum client, decoder and reducer.

use alloy::primitives::{Address, B256};
use farmscope_core::hashing::{expand_address_to_bytes32, expand_bytes24_to_bytes32};
use farmscope_core::{ChainAddress, ChainId};
use std::collections::BTreeSet;

use crate::error::QueryError;
use crate::events::{
    DecodeMode, DomainEvent, EventKind, EventRegistry, FarmDepositChangeEvent, FarmExistsEvent,
};
use crate::filter::LogFilter;
use crate::log::RawLogEntry;
use crate::ordering::sort_by_chain_position;
use crate::quorum::QuorumClient;
use crate::reducer::{reduce_with_report, Farm};

/// Optional token restrictions. Empty lists leave a position unconstrained.
///
/// The tokens are indexed fields of `FarmExists` only, so they select farms
/// rather than events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenFilter {
    /// Match farms paying any of these reward tokens (`FarmExists` topic 3).
    pub reward_tokens: Vec<ChainAddress>,
    /// Match farms referring any of these tokens (`FarmExists` topic 4).
    pub referred_tokens: Vec<ChainAddress>,
}

impl TokenFilter {
    pub fn is_empty(&self) -> bool {
        self.reward_tokens.is_empty() && self.referred_tokens.is_empty()
    }

    fn apply(&self, filter: LogFilter) -> LogFilter {
        filter
            .topic3(self.reward_tokens.iter().map(expand_bytes24_to_bytes32))
            .topic4(self.referred_tokens.iter().map(expand_bytes24_to_bytes32))
    }
}

/// Queries against one deployment of the referral farms contract.
pub struct FarmQueries {
    client: QuorumClient,
    registry: EventRegistry,
    farms_contract: Address,
    chain_id: ChainId,
    sentinel: ChainAddress,
    decode_mode: DecodeMode,
}

impl FarmQueries {
    /// Queries decoding in [`DecodeMode::Strict`].
    pub fn new(
        client: QuorumClient,
        registry: EventRegistry,
        farms_contract: Address,
        chain_id: ChainId,
        sentinel: ChainAddress,
    ) -> Self {
        Self {
            client,
            registry,
            farms_contract,
            chain_id,
            sentinel,
            decode_mode: DecodeMode::Strict,
        }
    }

    pub fn with_decode_mode(mut self, mode: DecodeMode) -> Self {
        self.decode_mode = mode;
        self
    }

    /// Every farm, rebuilt from all four farm events.
    ///
    /// With token restrictions, matching farms are found through their
    /// `FarmExists` events first; their other events are then fetched by farm
    /// hash so deposits and metastate are never lost to the token filter.
    pub async fn all_farms(&self, tokens: &TokenFilter) -> Result<Vec<Farm>, QueryError> {
        let mut entries = if tokens.is_empty() {
            let filter = self.base_filter().topic1(self.registry.all_topics());
            self.fetch_entries(&filter).await?
        } else {
            self.entries_for_matching_farms(tokens).await?
        };
        sort_by_chain_position(&mut entries);
        let events = self.decode(&entries)?;

        let reduction = reduce_with_report(&events, &self.sentinel);
        tracing::info!(
            farms = reduction.farms.len(),
            orphaned = reduction.orphaned.len(),
            ignored_token_changes = reduction.ignored_token_changes,
            "Reduced farm events"
        );
        Ok(reduction.farms.into_values().collect())
    }

    async fn entries_for_matching_farms(
        &self,
        tokens: &TokenFilter,
    ) -> Result<Vec<RawLogEntry>, QueryError> {
        let exists_filter = tokens.apply(
            self.base_filter()
                .topic1([self.registry.topic(EventKind::FarmExists)]),
        );
        let mut entries = self.fetch_entries(&exists_filter).await?;

        let farm_hashes: BTreeSet<B256> = self
            .decode(&entries)?
            .iter()
            .filter(|event| matches!(event, DomainEvent::FarmExists(_)))
            .map(DomainEvent::farm_hash)
            .collect();
        if farm_hashes.is_empty() {
            return Ok(entries);
        }
        tracing::debug!(farms = farm_hashes.len(), "Fetching events of matching farms");

        let follow_up = self
            .base_filter()
            .topic1([
                self.registry.topic(EventKind::FarmDepositChange),
                self.registry.topic(EventKind::FarmTokenChange),
                self.registry.topic(EventKind::FarmMetastate),
            ])
            .topic2(farm_hashes);
        entries.extend(self.fetch_entries(&follow_up).await?);
        Ok(entries)
    }

    /// Farms created by `sponsor`.
    pub async fn farms_by_sponsor(
        &self,
        sponsor: Address,
        tokens: &TokenFilter,
    ) -> Result<Vec<FarmExistsEvent>, QueryError> {
        let filter = tokens.apply(
            self.base_filter()
                .topic1([self.registry.topic(EventKind::FarmExists)])
                .topic2([expand_address_to_bytes32(&sponsor)]),
        );
        self.farm_exists_events(&filter).await
    }

    /// Every deposit change on the contract.
    pub async fn farm_deposits(&self) -> Result<Vec<FarmDepositChangeEvent>, QueryError> {
        let filter = self
            .base_filter()
            .topic1([self.registry.topic(EventKind::FarmDepositChange)]);

        let events = self.fetch_events(&filter).await?;
        Ok(events
            .into_iter()
            .filter_map(|event| match event {
                DomainEvent::FarmDepositChange(e) => Some(e),
                _ => None,
            })
            .collect())
    }

    /// Farms referring `token`.
    pub async fn farms_for_referred_token(
        &self,
        token: ChainAddress,
    ) -> Result<Vec<FarmExistsEvent>, QueryError> {
        let filter = self
            .base_filter()
            .topic1([self.registry.topic(EventKind::FarmExists)])
            .topic4([expand_bytes24_to_bytes32(&token)]);
        self.farm_exists_events(&filter).await
    }

    /// Farms paying out `token`.
    pub async fn farms_for_reward_token(
        &self,
        token: ChainAddress,
    ) -> Result<Vec<FarmExistsEvent>, QueryError> {
        let filter = self
            .base_filter()
            .topic1([self.registry.topic(EventKind::FarmExists)])
            .topic3([expand_bytes24_to_bytes32(&token)]);
        self.farm_exists_events(&filter).await
    }

    fn base_filter(&self) -> LogFilter {
        LogFilter::new()
            .address(self.farms_contract)
            .chain_id(self.chain_id)
    }

    async fn farm_exists_events(
        &self,
        filter: &LogFilter,
    ) -> Result<Vec<FarmExistsEvent>, QueryError> {
        let events = self.fetch_events(filter).await?;
        Ok(events
            .into_iter()
            .filter_map(|event| match event {
                DomainEvent::FarmExists(e) => Some(e),
                _ => None,
            })
            .collect())
    }

    async fn fetch_entries(&self, filter: &LogFilter) -> Result<Vec<RawLogEntry>, QueryError> {
        let mut entries = self.client.query(filter).await?.items;
        if !sort_by_chain_position(&mut entries) {
            tracing::debug!("Indexer entries lack chain positions, keeping indexer order");
        }
        Ok(entries)
    }

    async fn fetch_events(&self, filter: &LogFilter) -> Result<Vec<DomainEvent>, QueryError> {
        let entries = self.fetch_entries(filter).await?;
        self.decode(&entries)
    }

    fn decode(&self, entries: &[RawLogEntry]) -> Result<Vec<DomainEvent>, QueryError> {
        Ok(self.registry.decode_all(entries, self.decode_mode)?)
    }
}

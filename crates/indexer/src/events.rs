//! Referral-farm event definitions, the topic registry and the log decoder.

use alloy::primitives::{Address, Bytes, LogData, B256, I256};
use alloy::sol;
use alloy::sol_types::SolEvent;
use farmscope_core::{event_topic, ChainAddress, TokenChange};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DecodeError;
use crate::log::RawLogEntry;

// Field order matters: it fixes both the signature hash and the topic layout.
sol! {
    /// Emitted when a farm is first funded.
    #[derive(Debug, PartialEq, Eq)]
    event FarmExists(
        address indexed sponsor,
        bytes24 indexed rewardTokenDefn,
        bytes24 indexed referredTokenDefn,
        bytes32 farmHash
    );

    /// Emitted on every deposit increase or withdrawal.
    #[derive(Debug, PartialEq, Eq)]
    event FarmDepositChange(bytes32 indexed farmHash, int256 delta);

    /// Emitted when a token joins or leaves a proportional farm.
    #[derive(Debug, PartialEq, Eq)]
    event FarmTokenChange(bytes32 indexed farmHash, bytes24 indexed token, uint8 change);

    /// Emitted when the sponsor sets a metastate key.
    #[derive(Debug, PartialEq, Eq)]
    event FarmMetastate(bytes32 indexed farmHash, bytes32 indexed key, bytes value);
}

/// The farm events this crate understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventKind {
    /// `FarmExists`
    FarmExists,
    /// `FarmDepositChange`
    FarmDepositChange,
    /// `FarmTokenChange`
    FarmTokenChange,
    /// `FarmMetastate`
    FarmMetastate,
}

impl EventKind {
    /// Every known event, in registry order.
    pub const ALL: [EventKind; 4] = [
        EventKind::FarmExists,
        EventKind::FarmDepositChange,
        EventKind::FarmTokenChange,
        EventKind::FarmMetastate,
    ];

    /// Event name as declared in the contract.
    pub const fn name(&self) -> &'static str {
        match self {
            EventKind::FarmExists => "FarmExists",
            EventKind::FarmDepositChange => "FarmDepositChange",
            EventKind::FarmTokenChange => "FarmTokenChange",
            EventKind::FarmMetastate => "FarmMetastate",
        }
    }

    /// Canonical signature string.
    pub const fn signature(&self) -> &'static str {
        match self {
            EventKind::FarmExists => FarmExists::SIGNATURE,
            EventKind::FarmDepositChange => FarmDepositChange::SIGNATURE,
            EventKind::FarmTokenChange => FarmTokenChange::SIGNATURE,
            EventKind::FarmMetastate => FarmMetastate::SIGNATURE,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Event name to topic hash table.
///
/// Built once at startup and shared by reference; it never changes afterwards.
#[derive(Debug, Clone)]
pub struct EventRegistry {
    topics: [(EventKind, B256); 4],
}

impl Default for EventRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EventRegistry {
    /// Hash every known event signature.
    pub fn new() -> Self {
        let topics = EventKind::ALL.map(|kind| (kind, event_topic(kind.signature())));
        Self { topics }
    }

    /// Topic hash of an event.
    pub fn topic(&self, kind: EventKind) -> B256 {
        self.topics
            .iter()
            .find_map(|(k, topic)| (*k == kind).then_some(*topic))
            .unwrap_or(B256::ZERO)
    }

    /// Event for a signature topic, if known.
    pub fn kind_of(&self, topic: &B256) -> Option<EventKind> {
        self.topics
            .iter()
            .find_map(|(kind, t)| (t == topic).then_some(*kind))
    }

    /// All topic hashes, in registry order.
    pub fn all_topics(&self) -> Vec<B256> {
        self.topics.iter().map(|(_, topic)| *topic).collect()
    }

    /// `(name, signature, topic)` rows, for display.
    pub fn entries(&self) -> impl Iterator<Item = (&'static str, &'static str, B256)> + '_ {
        self.topics
            .iter()
            .map(|(kind, topic)| (kind.name(), kind.signature(), *topic))
    }

    /// Decode one raw log.
    ///
    /// Fails if the first topic is not a known signature, if topics or data
    /// do not fit that event's ABI, or if a token change flag is invalid.
    pub fn decode(&self, entry: &RawLogEntry) -> Result<DomainEvent, DecodeError> {
        let signature = entry.signature().ok_or(DecodeError::MissingSignature)?;
        let kind = self
            .kind_of(signature)
            .ok_or(DecodeError::UnknownSignature(*signature))?;

        let topics = entry.topics.iter().copied();
        let abi_error = |e: alloy::sol_types::Error| DecodeError::Abi {
            event: kind,
            reason: e.to_string(),
        };

        let event = match kind {
            EventKind::FarmExists => {
                let log = FarmExists::decode_raw_log(topics, &entry.data, true).map_err(abi_error)?;
                DomainEvent::FarmExists(FarmExistsEvent {
                    farm_hash: log.farmHash,
                    sponsor: log.sponsor,
                    reward_token_defn: ChainAddress::from(log.rewardTokenDefn),
                    referred_token_defn: ChainAddress::from(log.referredTokenDefn),
                })
            }
            EventKind::FarmDepositChange => {
                let log = FarmDepositChange::decode_raw_log(topics, &entry.data, true)
                    .map_err(abi_error)?;
                DomainEvent::FarmDepositChange(FarmDepositChangeEvent {
                    farm_hash: log.farmHash,
                    delta: log.delta,
                })
            }
            EventKind::FarmTokenChange => {
                let log = FarmTokenChange::decode_raw_log(topics, &entry.data, true)
                    .map_err(abi_error)?;
                let change = TokenChange::from_flag(log.change)
                    .ok_or(DecodeError::InvalidTokenChange(log.change))?;
                DomainEvent::FarmTokenChange(FarmTokenChangeEvent {
                    farm_hash: log.farmHash,
                    token: ChainAddress::from(log.token),
                    change,
                })
            }
            EventKind::FarmMetastate => {
                let log =
                    FarmMetastate::decode_raw_log(topics, &entry.data, true).map_err(abi_error)?;
                DomainEvent::FarmMetastateSet(FarmMetastateEvent {
                    farm_hash: log.farmHash,
                    key: log.key,
                    value: log.value,
                })
            }
        };

        Ok(event)
    }

    /// Decode a batch, preserving order.
    ///
    /// In [`DecodeMode::Strict`] the first failure aborts the batch. In
    /// [`DecodeMode::BestEffort`] failed entries are logged and skipped.
    pub fn decode_all(
        &self,
        entries: &[RawLogEntry],
        mode: DecodeMode,
    ) -> Result<Vec<DomainEvent>, DecodeError> {
        let mut events = Vec::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            match self.decode(entry) {
                Ok(event) => events.push(event),
                Err(e) if mode == DecodeMode::BestEffort => {
                    tracing::warn!(index, error = %e, "Skipping undecodable log entry");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(events)
    }
}

/// How [`EventRegistry::decode_all`] treats undecodable entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodeMode {
    /// Abort the batch on the first failure.
    #[default]
    Strict,
    /// Skip failures with a warning.
    BestEffort,
}

/// Payload of `FarmExists`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FarmExistsEvent {
    /// Farm identifier.
    pub farm_hash: B256,
    /// Account that funded the farm.
    pub sponsor: Address,
    /// Token paid out as reward.
    pub reward_token_defn: ChainAddress,
    /// Token being referred (or the proportional sentinel).
    pub referred_token_defn: ChainAddress,
}

/// Payload of `FarmDepositChange`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FarmDepositChangeEvent {
    /// Farm identifier.
    pub farm_hash: B256,
    /// Signed deposit change in wei.
    pub delta: I256,
}

/// Payload of `FarmTokenChange`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FarmTokenChangeEvent {
    /// Farm identifier.
    pub farm_hash: B256,
    /// Token joining or leaving.
    pub token: ChainAddress,
    /// Direction.
    pub change: TokenChange,
}

/// Payload of `FarmMetastate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FarmMetastateEvent {
    /// Farm identifier.
    pub farm_hash: B256,
    /// Metastate key (ASCII, right-padded).
    pub key: B256,
    /// ABI-encoded value.
    pub value: Bytes,
}

/// A decoded farm event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DomainEvent {
    /// Farm created.
    FarmExists(FarmExistsEvent),
    /// Deposit changed.
    FarmDepositChange(FarmDepositChangeEvent),
    /// Token set changed.
    FarmTokenChange(FarmTokenChangeEvent),
    /// Metastate key set.
    FarmMetastateSet(FarmMetastateEvent),
}

impl DomainEvent {
    /// Farm the event belongs to.
    pub fn farm_hash(&self) -> B256 {
        match self {
            DomainEvent::FarmExists(e) => e.farm_hash,
            DomainEvent::FarmDepositChange(e) => e.farm_hash,
            DomainEvent::FarmTokenChange(e) => e.farm_hash,
            DomainEvent::FarmMetastateSet(e) => e.farm_hash,
        }
    }

    /// Contract event this was decoded from.
    pub fn kind(&self) -> EventKind {
        match self {
            DomainEvent::FarmExists(_) => EventKind::FarmExists,
            DomainEvent::FarmDepositChange(_) => EventKind::FarmDepositChange,
            DomainEvent::FarmTokenChange(_) => EventKind::FarmTokenChange,
            DomainEvent::FarmMetastateSet(_) => EventKind::FarmMetastate,
        }
    }

    /// ABI-encode the event as the contract would emit it.
    pub fn encode_log(&self) -> LogData {
        match self {
            DomainEvent::FarmExists(e) => FarmExists {
                sponsor: e.sponsor,
                rewardTokenDefn: e.reward_token_defn.into_inner(),
                referredTokenDefn: e.referred_token_defn.into_inner(),
                farmHash: e.farm_hash,
            }
            .encode_log_data(),
            DomainEvent::FarmDepositChange(e) => FarmDepositChange {
                farmHash: e.farm_hash,
                delta: e.delta,
            }
            .encode_log_data(),
            DomainEvent::FarmTokenChange(e) => FarmTokenChange {
                farmHash: e.farm_hash,
                token: e.token.into_inner(),
                change: e.change.flag(),
            }
            .encode_log_data(),
            DomainEvent::FarmMetastateSet(e) => FarmMetastate {
                farmHash: e.farm_hash,
                key: e.key,
                value: e.value.clone(),
            }
            .encode_log_data(),
        }
    }
}

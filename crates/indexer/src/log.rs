//! Raw log entries and the indexer response wire format.

use alloy::primitives::{Bytes, LogData, B256};
use serde::{Deserialize, Serialize};

use crate::error::IndexerError;
use crate::ordering::ChainPosition;

/// A log as an indexer reports it.
///
/// Equality covers the full content, provenance included: two indexers agree
/// on an entry only if they report the same bytes at the same chain position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RawLogEntry {
    /// ABI-encoded non-indexed event fields.
    pub data: Bytes,
    /// Topic 0 is the event signature hash; the rest are indexed fields.
    pub topics: Vec<B256>,
    /// Block the log was emitted in.
    pub block_number: Option<u64>,
    /// Transaction index within the block.
    pub transaction_index: Option<u64>,
    /// Log index within the block.
    pub log_index: Option<u64>,
    /// Emitting transaction.
    pub transaction_hash: Option<B256>,
}

impl RawLogEntry {
    /// Create an entry without provenance.
    pub fn new(topics: Vec<B256>, data: Bytes) -> Self {
        Self {
            data,
            topics,
            block_number: None,
            transaction_index: None,
            log_index: None,
            transaction_hash: None,
        }
    }

    /// Create an entry from ABI-encoded log data.
    pub fn from_log_data(log: &LogData) -> Self {
        Self::new(log.topics().to_vec(), log.data.clone())
    }

    /// Attach a chain position.
    pub fn at(mut self, block_number: u64, transaction_index: u64, log_index: u64) -> Self {
        self.block_number = Some(block_number);
        self.transaction_index = Some(transaction_index);
        self.log_index = Some(log_index);
        self
    }

    /// Event signature hash (topic 0).
    pub fn signature(&self) -> Option<&B256> {
        self.topics.first()
    }

    /// Chain position, if the indexer reported block and log index.
    pub fn chain_position(&self) -> Option<ChainPosition> {
        let block = self.block_number?;
        let log = self.log_index?;
        Some((block, self.transaction_index.unwrap_or(0), log))
    }
}

/// `{items: [...]}` body returned by an indexer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexerResponse {
    /// Matching logs.
    pub items: Vec<IndexerItem>,
}

/// One log in an indexer response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexerItem {
    /// Hex-encoded log data.
    pub data: Bytes,
    /// Topics, usually as a JSON-encoded string array.
    pub topics: WireTopics,
    /// Block number, when the indexer reports provenance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    /// Transaction index within the block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_index: Option<u64>,
    /// Log index within the block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_index: Option<u64>,
    /// Emitting transaction hash.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<B256>,
}

/// Indexers send topics as a JSON string (`"[\"0x..\"]"`); some send a plain array.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireTopics {
    /// JSON-encoded array of hex strings.
    Encoded(String),
    /// Plain array of hex strings.
    List(Vec<B256>),
}

impl WireTopics {
    fn into_topics(self) -> Result<Vec<B256>, IndexerError> {
        match self {
            WireTopics::List(topics) => Ok(topics),
            WireTopics::Encoded(raw) => serde_json::from_str(&raw)
                .map_err(|e| IndexerError::Malformed(format!("invalid topics '{}': {}", raw, e))),
        }
    }
}

impl IndexerItem {
    /// Convert to a [`RawLogEntry`].
    pub fn into_entry(self) -> Result<RawLogEntry, IndexerError> {
        Ok(RawLogEntry {
            data: self.data,
            topics: self.topics.into_topics()?,
            block_number: self.block_number,
            transaction_index: self.transaction_index,
            log_index: self.log_index,
            transaction_hash: self.transaction_hash,
        })
    }
}

impl From<&RawLogEntry> for IndexerItem {
    fn from(entry: &RawLogEntry) -> Self {
        let topics: Vec<String> = entry.topics.iter().map(|t| t.to_string()).collect();
        Self {
            data: entry.data.clone(),
            // Vec<String> serialization cannot fail.
            topics: WireTopics::Encoded(serde_json::to_string(&topics).unwrap_or_default()),
            block_number: entry.block_number,
            transaction_index: entry.transaction_index,
            log_index: entry.log_index,
            transaction_hash: entry.transaction_hash,
        }
    }
}

impl IndexerResponse {
    /// Convert all items, failing on the first malformed one.
    pub fn into_entries(self) -> Result<Vec<RawLogEntry>, IndexerError> {
        self.items.into_iter().map(IndexerItem::into_entry).collect()
    }

    /// Build a response body from entries.
    pub fn from_entries(entries: &[RawLogEntry]) -> Self {
        Self {
            items: entries.iter().map(IndexerItem::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_encoded_topics() {
        let topic = B256::repeat_byte(0x11);
        let body = json!({
            "items": [{
                "data": "0x0102",
                "topics": format!("[\"{}\"]", topic),
            }]
        });

        let response: IndexerResponse = serde_json::from_value(body).unwrap();
        let entries = response.into_entries().unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].topics, vec![topic]);
        assert_eq!(entries[0].data, Bytes::from(vec![1u8, 2]));
        assert_eq!(entries[0].block_number, None);
    }

    #[test]
    fn test_parse_list_topics_with_provenance() {
        let topic = B256::repeat_byte(0x22);
        let body = json!({
            "items": [{
                "data": "0x",
                "topics": [topic.to_string()],
                "blockNumber": 100,
                "transactionIndex": 3,
                "logIndex": 7,
            }]
        });

        let response: IndexerResponse = serde_json::from_value(body).unwrap();
        let entry = response.into_entries().unwrap().remove(0);

        assert_eq!(entry.topics, vec![topic]);
        assert_eq!(entry.block_number, Some(100));
        assert_eq!(entry.transaction_index, Some(3));
        assert_eq!(entry.log_index, Some(7));
    }

    #[test]
    fn test_malformed_topics_string() {
        let body = json!({"items": [{"data": "0x", "topics": "not json"}]});
        let response: IndexerResponse = serde_json::from_value(body).unwrap();

        assert!(matches!(
            response.into_entries(),
            Err(IndexerError::Malformed(_))
        ));
    }

    #[test]
    fn test_wire_roundtrip_preserves_entry() {
        let entry = RawLogEntry::new(
            vec![B256::repeat_byte(0x01), B256::repeat_byte(0x02)],
            Bytes::from(vec![0xde, 0xad]),
        )
        .at(5, 1, 2);

        let body = serde_json::to_value(IndexerResponse::from_entries(&[entry.clone()])).unwrap();
        assert!(body["items"][0]["topics"].is_string());

        let parsed: IndexerResponse = serde_json::from_value(body).unwrap();
        assert_eq!(parsed.into_entries().unwrap(), vec![entry]);
    }

    #[test]
    fn test_chain_position_requires_block_and_log() {
        let bare = RawLogEntry::new(vec![], Bytes::new());
        assert_eq!(bare.chain_position(), None);

        let placed = bare.at(10, 0, 4);
        assert_eq!(placed.chain_position(), Some((10, 0, 4)));
    }
}

//! Ordering helpers for agreed log entries.

use crate::log::RawLogEntry;

/// `(block_number, transaction_index, log_index)`; compares lexicographically.
pub type ChainPosition = (u64, u64, u64);

/// Put entries into chain order when every entry carries a position.
///
/// Returns `false` (and leaves the slice untouched) when any entry lacks one;
/// the indexer's own order is then the best order available.
pub fn sort_by_chain_position(entries: &mut [RawLogEntry]) -> bool {
    if entries.iter().any(|e| e.chain_position().is_none()) {
        return false;
    }

    entries.sort_by_key(|e| e.chain_position());
    true
}

//! Error types for decoding, indexer calls and quorum queries.

use alloy::primitives::B256;
use std::time::Duration;
use thiserror::Error;

use crate::events::EventKind;

/// A raw log could not be turned into a [`DomainEvent`](crate::events::DomainEvent).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Log carries no topics, so it has no event signature.
    #[error("Log has no signature topic")]
    MissingSignature,

    /// First topic matches none of the known farm events.
    #[error("Unknown event signature: {0}")]
    UnknownSignature(B256),

    /// Topics or data do not match the ABI of the signalled event.
    #[error("Failed to decode {event} log: {reason}")]
    Abi {
        /// Event the signature topic names.
        event: EventKind,
        /// Decoder message.
        reason: String,
    },

    /// `FarmTokenChange.change` is neither add nor remove.
    #[error("Invalid token change flag: {0}")]
    InvalidTokenChange(u8),
}

/// A single indexer failed to answer; it abstains from the quorum.
#[derive(Error, Debug)]
pub enum IndexerError {
    /// Transport-level failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Indexer answered with a non-success status.
    #[error("Indexer returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body (truncated).
        body: String,
    },

    /// Body did not match the indexer response format.
    #[error("Malformed indexer response: {0}")]
    Malformed(String),

    /// No answer before the shared deadline.
    #[error("Indexer did not answer within {0:?}")]
    Timeout(Duration),
}

/// A quorum query failed as a whole.
#[derive(Error, Debug)]
pub enum QueryError {
    /// Too few indexers answered to even attempt a quorum.
    #[error("Only {respondents} of {configured} indexers responded, need at least {required}")]
    InsufficientRespondents {
        /// Indexers that answered.
        respondents: usize,
        /// Indexers configured.
        configured: usize,
        /// Minimum respondents required.
        required: usize,
    },

    /// Indexers answered but no group of identical answers is large enough.
    #[error("Quorum not reached: largest agreeing group is {largest} of {respondents}, need {required}")]
    QuorumNotReached {
        /// Size of the largest agreeing group.
        largest: usize,
        /// Indexers that answered.
        respondents: usize,
        /// Group size required.
        required: usize,
    },

    /// Agreed logs could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

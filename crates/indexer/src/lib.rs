//! Referral-farm event queries over untrusted log indexers.
//!
//! This crate provides:
//! - A registry and decoder for the four referral-farm contract events
//! - A quorum client that asks several indexers and accepts only a majority answer
//! - A reducer that replays decoded events into per-farm state
//! - Farm query shapes and transaction call builders
//! - TOML configuration
//!
//! # Data flow
//!
//! ```text
//!  LogFilter ──► QuorumClient ──► indexer A ┐
//!                               ├► indexer B ├─► agreed RawLogEntry list
//!                               └► indexer C ┘            │
//!                                                         ▼
//!                                         EventRegistry::decode_all
//!                                                         │
//!                                                         ▼
//!                                                reduce ──► Farm
//! ```

pub mod calls;
pub mod config;
pub mod error;
pub mod events;
pub mod farms;
pub mod filter;
pub mod log;
pub mod ordering;
pub mod quorum;
pub mod reducer;

pub use error::{DecodeError, IndexerError, QueryError};
pub use events::{DecodeMode, DomainEvent, EventKind, EventRegistry};
pub use farms::{FarmQueries, TokenFilter};
pub use filter::LogFilter;
pub use log::RawLogEntry;
pub use quorum::{HttpIndexer, LogIndexer, QueryResult, QuorumClient, QuorumPolicy};
pub use reducer::{reduce, reduce_with_report, Farm, Reduction};

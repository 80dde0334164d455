//! # farmscope core
//!
//! Primitive types, constants and hashing helpers shared by every farmscope crate.
//!
//! Values here must match the referral-farm contracts byte for byte:
//!
//! - **Chain addresses**: `bytes24` token definitions (chain id + EVM address)
//! - **Constants**: metastate keys, the proportional-farm sentinel, well-known addresses
//! - **Hashing**: event topic hashes and topic padding helpers
//! - **Chain boundary**: wallet/network gate evaluated before an on-chain action

#![warn(missing_docs)]

pub mod boundary;
pub mod constants;
pub mod error;
pub mod hashing;
pub mod types;

// Re-export commonly used items
pub use boundary::{BoundaryInput, BoundaryState};
pub use constants::*;
pub use error::{CoreError, Result};
pub use hashing::{event_topic, keccak256};
pub use types::*;

// Re-export Alloy primitives for convenience
pub use alloy_primitives::{Address, Bytes, B256, I256, U256};

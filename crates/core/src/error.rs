//! Error types for the core crate.

use thiserror::Error;

/// Core error type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Chain address was not 24 bytes of hex.
    #[error("Invalid chain address: {0}")]
    InvalidChainAddress(String),

    /// Chain id does not fit the 4-byte prefix of a chain address.
    #[error("Chain id {0} does not fit in a chain address (max {max})", max = u32::MAX)]
    ChainIdOutOfRange(u64),

    /// Metastate key longer than one word.
    #[error("Metastate key '{0}' is longer than 32 bytes")]
    MetastateKeyTooLong(String),

    /// Wallet reported a different chain than the one requested.
    #[error("Chain mismatch: expected {expected}, wallet reports {actual}")]
    ChainMismatch {
        /// Requested chain.
        expected: u64,
        /// Chain the wallet reports.
        actual: u64,
    },

    /// Invalid hex encoding.
    #[error("Invalid hex encoding")]
    InvalidHex,
}

/// Result type alias for CoreError.
pub type Result<T> = std::result::Result<T, CoreError>;

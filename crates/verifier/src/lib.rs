//! Reward verifier client for farmscope.
//!
//! The verifier issues signed reward proofs and farm APR figures, and accepts
//! referral-link proofs of recommendation. This crate only talks to it: proofs
//! are passed through verbatim and any failure surfaces as
//! [`VerifierError::Unavailable`].

pub mod client;
pub mod error;
pub mod types;

pub use client::VerifierClient;
pub use error::{Result, VerifierError};
pub use types::{
    AprInfo, AprParams, ProofOfRecommendation, RewardProof, TimePromise, TimePromiseRequest,
};

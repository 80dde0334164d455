use thiserror::Error;

/// Verifier client errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerifierError {
    /// The verifier could not be reached or gave an unusable answer.
    ///
    /// Covers transport failures, timeouts, non-success statuses and
    /// undecodable bodies.
    #[error("Verifier unavailable at {endpoint}: {reason}")]
    Unavailable {
        /// Endpoint path that failed.
        endpoint: String,
        /// What went wrong.
        reason: String,
    },

    /// A request could not be built from the given input.
    #[error("Invalid verifier input: {0}")]
    InvalidInput(String),
}

impl VerifierError {
    pub(crate) fn unavailable(endpoint: &str, reason: impl ToString) -> Self {
        VerifierError::Unavailable {
            endpoint: endpoint.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, VerifierError>;

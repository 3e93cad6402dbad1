use thiserror::Error;
use uuid::Uuid;

use crate::services::repository::RepositoryError;

/// Errors surfaced by the matching core
///
/// Every public operation fails fast with one of these. Only
/// `AlgorithmExecution` is tied to a round transition (the round is
/// marked FAILED before the error is returned).
#[derive(Debug, Error)]
pub enum MatchingError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("organization {organization_id} has no remaining positions ({filled}/{available} filled)")]
    CapacityExceeded {
        organization_id: String,
        available: u32,
        filled: u32,
    },

    #[error("matching round {round_id} failed: {reason}")]
    AlgorithmExecution { round_id: Uuid, reason: String },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl MatchingError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

use std::time::Duration;
use teammatch_types::{ExternalUserId, ProfileId};
use thiserror::Error;

/// Storage backend errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQL driver failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored column could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored row holds a value that does not parse
    #[error("Corrupt record {id}: {details}")]
    Corrupt { id: String, details: String },

    #[error("A profile already exists for user {0}")]
    DuplicateUser(ExternalUserId),

    #[error("Profile {0} already exists")]
    DuplicateProfile(ProfileId),

    #[error("Profile {0} not found")]
    NotFound(ProfileId),

    /// The call did not finish within the configured budget
    #[error("Store call '{operation}' timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },
}

impl StoreError {
    /// Transient failures the caller may retry as a whole command
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Database(_) | StoreError::Timeout { .. })
    }
}

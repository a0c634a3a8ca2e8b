//! Error types for the matching core

use teammatch_persistence::StoreError;
use teammatch_types::{ExternalUserId, ProfileId, RegistrationStep};
use thiserror::Error;

/// Core operation errors
#[derive(Debug, Error)]
pub enum MatchError {
    /// No profile for this user; the user should register
    #[error("User {0} is not registered")]
    NotRegistered(ExternalUserId),

    /// The state machine was driven out of sequence
    #[error("Registration step '{attempted}' is not valid while the session is at '{current}'")]
    InvalidStep {
        current: RegistrationStep,
        attempted: RegistrationStep,
    },

    /// The referenced candidate no longer exists; the caller should re-rank
    #[error("Candidate {0} not found")]
    CandidateNotFound(ProfileId),

    /// Persistence failed or timed out
    #[error("Profile store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    #[error("User {0} is already registered")]
    AlreadyRegistered(ExternalUserId),

    #[error("User {0} has no registration in progress")]
    NoOpenSession(ExternalUserId),

    /// A user tried to connect with or reject their own profile
    #[error("Profile {0} cannot respond to itself")]
    SelfReference(ProfileId),
}

impl MatchError {
    /// Whether retrying the whole user-visible command may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, MatchError::StoreUnavailable(e) if e.is_retryable())
    }
}

/// Convenient Result type alias
pub type Result<T> = std::result::Result<T, MatchError>;

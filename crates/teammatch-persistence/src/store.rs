use crate::Result;
use async_trait::async_trait;
use teammatch_types::{ExternalUserId, Profile, ProfileId, RegistrationSession};

/// Backend-agnostic profile table.
///
/// Every call returns complete records; nothing is streamed or partial.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Look up the profile registered by a chat user.
    async fn find_by_user_id(&self, user_id: ExternalUserId) -> Result<Option<Profile>>;

    /// Look up a profile by its own identifier.
    async fn find_by_id(&self, id: ProfileId) -> Result<Option<Profile>>;

    /// All profiles, in the order they were created.
    async fn list_all(&self) -> Result<Vec<Profile>>;

    /// Insert a new profile. Fails if the id or the user id is taken.
    async fn create(&self, profile: &Profile) -> Result<()>;

    /// Replace the stored record with the same profile id.
    async fn update(&self, profile: &Profile) -> Result<()>;

    /// Replace several records at once: either every write lands or none does.
    async fn update_all(&self, profiles: &[Profile]) -> Result<()>;

    async fn exists(&self, id: ProfileId) -> Result<bool> {
        Ok(self.find_by_id(id).await?.is_some())
    }
}

/// Storage for open registration / update sessions, one per user.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, user_id: ExternalUserId) -> Result<Option<RegistrationSession>>;

    /// Insert or overwrite the user's session.
    async fn put(&self, session: &RegistrationSession) -> Result<()>;

    /// Drop the user's session. Returns whether one existed.
    async fn remove(&self, user_id: ExternalUserId) -> Result<bool>;
}

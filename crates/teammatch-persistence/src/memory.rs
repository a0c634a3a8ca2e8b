use crate::{ProfileStore, Result, SessionStore, StoreError};
use async_trait::async_trait;
use std::collections::HashMap;
use teammatch_types::{ExternalUserId, Profile, ProfileId, RegistrationSession};
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Default)]
struct ProfileTable {
    by_id: HashMap<ProfileId, Profile>,
    by_user: HashMap<ExternalUserId, ProfileId>,
    /// Creation order, used by `list_all`
    order: Vec<ProfileId>,
}

/// In-memory profile table
#[derive(Default)]
pub struct InMemoryProfileStore {
    table: RwLock<ProfileTable>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored profiles
    pub async fn len(&self) -> usize {
        self.table.read().await.order.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn find_by_user_id(&self, user_id: ExternalUserId) -> Result<Option<Profile>> {
        let table = self.table.read().await;
        Ok(table
            .by_user
            .get(&user_id)
            .and_then(|id| table.by_id.get(id))
            .cloned())
    }

    async fn find_by_id(&self, id: ProfileId) -> Result<Option<Profile>> {
        Ok(self.table.read().await.by_id.get(&id).cloned())
    }

    async fn list_all(&self) -> Result<Vec<Profile>> {
        let table = self.table.read().await;
        Ok(table
            .order
            .iter()
            .filter_map(|id| table.by_id.get(id))
            .cloned()
            .collect())
    }

    async fn create(&self, profile: &Profile) -> Result<()> {
        let mut table = self.table.write().await;
        if table.by_id.contains_key(&profile.id) {
            return Err(StoreError::DuplicateProfile(profile.id));
        }
        if table.by_user.contains_key(&profile.external_user_id) {
            return Err(StoreError::DuplicateUser(profile.external_user_id));
        }

        table.by_user.insert(profile.external_user_id, profile.id);
        table.order.push(profile.id);
        table.by_id.insert(profile.id, profile.clone());
        debug!("Stored profile {} for user {}", profile.id, profile.external_user_id);
        Ok(())
    }

    async fn update(&self, profile: &Profile) -> Result<()> {
        self.update_all(std::slice::from_ref(profile)).await
    }

    async fn update_all(&self, profiles: &[Profile]) -> Result<()> {
        let mut table = self.table.write().await;

        // Validate everything before touching the table
        for profile in profiles {
            let Some(existing) = table.by_id.get(&profile.id) else {
                return Err(StoreError::NotFound(profile.id));
            };
            if existing.external_user_id != profile.external_user_id
                && table.by_user.contains_key(&profile.external_user_id)
            {
                return Err(StoreError::DuplicateUser(profile.external_user_id));
            }
        }

        for profile in profiles {
            if let Some(previous) = table.by_id.insert(profile.id, profile.clone()) {
                if previous.external_user_id != profile.external_user_id {
                    table.by_user.remove(&previous.external_user_id);
                    table.by_user.insert(profile.external_user_id, profile.id);
                }
            }
        }
        Ok(())
    }
}

/// In-memory session table keyed by chat user
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<ExternalUserId, RegistrationSession>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, user_id: ExternalUserId) -> Result<Option<RegistrationSession>> {
        Ok(self.sessions.read().await.get(&user_id).cloned())
    }

    async fn put(&self, session: &RegistrationSession) -> Result<()> {
        self.sessions
            .write()
            .await
            .insert(session.external_user_id, session.clone());
        Ok(())
    }

    async fn remove(&self, user_id: ExternalUserId) -> Result<bool> {
        Ok(self.sessions.write().await.remove(&user_id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeSet;

    fn profile(user: ExternalUserId, name: &str) -> Profile {
        let now = Utc::now();
        Profile {
            id: ProfileId::new(),
            external_user_id: user,
            name: name.to_string(),
            skills: vec!["Rust".to_string(), "Go".to_string()],
            past_projects: vec![],
            bio: "builder".to_string(),
            looking_for_skills: vec!["Design".to_string()],
            project_idea: None,
            location: Some("Ankara".to_string()),
            matches: BTreeSet::new(),
            rejections: BTreeSet::new(),
            pending_outgoing: BTreeSet::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let store = InMemoryProfileStore::new();
        let ada = profile(1, "Ada");
        store.create(&ada).await.unwrap();

        assert_eq!(store.find_by_user_id(1).await.unwrap(), Some(ada.clone()));
        assert_eq!(store.find_by_id(ada.id).await.unwrap(), Some(ada.clone()));
        assert!(store.exists(ada.id).await.unwrap());
        assert!(store.find_by_user_id(2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_user() {
        let store = InMemoryProfileStore::new();
        store.create(&profile(1, "Ada")).await.unwrap();

        let err = store.create(&profile(1, "Ada again")).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateUser(1)));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_list_all_keeps_creation_order() {
        let store = InMemoryProfileStore::new();
        for (user, name) in [(3, "C"), (1, "A"), (2, "B")] {
            store.create(&profile(user, name)).await.unwrap();
        }

        let names: Vec<String> = store
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["C", "A", "B"]);
    }

    #[tokio::test]
    async fn test_update_all_is_all_or_nothing() {
        let store = InMemoryProfileStore::new();
        let mut ada = profile(1, "Ada");
        store.create(&ada).await.unwrap();

        ada.bio = "changed".to_string();
        let ghost = profile(9, "Ghost");

        let err = store.update_all(&[ada.clone(), ghost]).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));

        let stored = store.find_by_id(ada.id).await.unwrap().unwrap();
        assert_eq!(stored.bio, "builder");
    }

    #[tokio::test]
    async fn test_session_store() {
        let store = InMemorySessionStore::new();
        let session = RegistrationSession::registration(5, Utc::now());

        store.put(&session).await.unwrap();
        assert_eq!(store.get(5).await.unwrap(), Some(session));
        assert!(store.remove(5).await.unwrap());
        assert!(!store.remove(5).await.unwrap());
        assert!(store.get(5).await.unwrap().is_none());
    }
}

//! End-to-end tests of the match service over the in-memory stores

#![allow(clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;
use teammatch_core::{MatchError, MatchService, ServiceSettings};
use teammatch_persistence::{
    InMemoryProfileStore, InMemorySessionStore, ProfileStore, SessionStore, StoreError,
};
use teammatch_types::{
    ExternalUserId, Profile, ProfileField, ProfileId, RegistrationSession, Response,
};

struct Harness {
    service: Arc<MatchService>,
    profiles: Arc<InMemoryProfileStore>,
    sessions: Arc<InMemorySessionStore>,
}

fn harness() -> Harness {
    let profiles = Arc::new(InMemoryProfileStore::new());
    let sessions = Arc::new(InMemorySessionStore::new());
    let service = Arc::new(MatchService::new(
        profiles.clone(),
        sessions.clone(),
        ServiceSettings::default(),
    ));
    Harness {
        service,
        profiles,
        sessions,
    }
}

async fn register(
    service: &MatchService,
    user: ExternalUserId,
    name: &str,
    skills: &str,
    wants: &str,
) -> Profile {
    service.begin_or_resume_registration(user).await.unwrap();
    let answers = [name, skills, "", "bio", wants, "", ""];
    let mut last = None;
    for answer in answers {
        last = Some(service.submit_registration_answer(user, answer).await.unwrap());
    }
    let outcome = last.unwrap();
    assert!(outcome.done);
    outcome.profile.unwrap()
}

#[tokio::test]
async fn test_registration_flow() {
    let h = harness();
    let first = h.service.begin_or_resume_registration(1).await.unwrap();
    assert!(!first.resumed);
    assert!(first.prompt.contains("name"));

    let answers = ["Ada", "Rust, Go", "", "builder", "Design", "", ""];
    for (i, answer) in answers.iter().enumerate() {
        let outcome = h.service.submit_registration_answer(1, answer).await.unwrap();
        assert_eq!(outcome.done, i == answers.len() - 1);
    }

    let profile = h.service.get_profile(1).await.unwrap();
    assert_eq!(profile.name, "Ada");
    assert_eq!(profile.skills, vec!["Rust", "Go"]);
    assert!(profile.past_projects.is_empty());
    assert_eq!(profile.looking_for_skills, vec!["Design"]);
    assert!(profile.matches.is_empty());
    assert!(profile.rejections.is_empty());
    assert!(profile.pending_outgoing.is_empty());

    // Session is gone once the profile is stored
    assert!(h.sessions.get(1).await.unwrap().is_none());
    assert!(!h.service.has_open_session(1).await.unwrap());
}

#[tokio::test]
async fn test_begin_twice_resumes_pending_question() {
    let h = harness();
    h.service.begin_or_resume_registration(5).await.unwrap();
    h.service.submit_registration_answer(5, "Ada").await.unwrap();

    let resumed = h.service.begin_or_resume_registration(5).await.unwrap();
    assert!(resumed.resumed);
    assert!(resumed.prompt.contains("technical skills"));
}

#[tokio::test]
async fn test_registered_user_cannot_register_again() {
    let h = harness();
    register(&h.service, 1, "Ada", "Rust", "Design").await;

    let err = h.service.begin_or_resume_registration(1).await.unwrap_err();
    assert!(matches!(err, MatchError::AlreadyRegistered(1)));
}

#[tokio::test]
async fn test_answer_without_session() {
    let h = harness();
    let err = h.service.submit_registration_answer(9, "hello").await.unwrap_err();
    assert!(matches!(err, MatchError::NoOpenSession(9)));
}

#[tokio::test]
async fn test_abandon_session() {
    let h = harness();
    h.service.begin_or_resume_registration(3).await.unwrap();
    assert!(h.service.abandon_session(3).await.unwrap());
    assert!(!h.service.abandon_session(3).await.unwrap());
    assert!(h.service.get_profile(3).await.is_err());
}

#[tokio::test]
async fn test_stale_session_is_discarded() {
    let h = harness();
    let session = RegistrationSession::registration(4, Utc::now() - ChronoDuration::days(3));
    h.sessions.put(&session).await.unwrap();

    let err = h.service.submit_registration_answer(4, "Ada").await.unwrap_err();
    assert!(matches!(err, MatchError::NoOpenSession(4)));
    assert!(h.sessions.get(4).await.unwrap().is_none());
}

#[tokio::test]
async fn test_long_but_active_session_survives() {
    let h = harness();
    let mut session = RegistrationSession::registration(4, Utc::now() - ChronoDuration::days(3));
    let recent = Utc::now() - ChronoDuration::minutes(5);
    session.touch(recent);
    h.sessions.put(&session).await.unwrap();

    let outcome = h.service.submit_registration_answer(4, "Ada").await.unwrap();
    assert!(!outcome.done);

    // Every answer refreshes the activity stamp, not the start time
    let stored = h.sessions.get(4).await.unwrap().unwrap();
    assert_eq!(stored.started_at, session.started_at);
    assert!(stored.last_activity > recent);
    assert_eq!(stored.partial.name.as_deref(), Some("Ada"));
}

#[tokio::test]
async fn test_unregistered_user_operations() {
    let h = harness();
    assert!(matches!(
        h.service.list_ranked_candidates(1).await,
        Err(MatchError::NotRegistered(1))
    ));
    assert!(matches!(
        h.service.get_profile(1).await,
        Err(MatchError::NotRegistered(1))
    ));
    assert!(matches!(
        h.service.update_field(1, ProfileField::Bio, "x").await,
        Err(MatchError::NotRegistered(1))
    ));
    assert!(matches!(
        h.service
            .respond_to_candidate(1, ProfileId::new(), Response::Connect)
            .await,
        Err(MatchError::NotRegistered(1))
    ));
}

#[tokio::test]
async fn test_ranking_through_service() {
    let h = harness();
    let ada = register(&h.service, 1, "Ada", "Go", "react").await;
    assert!(h.service.list_ranked_candidates(1).await.unwrap().is_empty());

    let nobody = register(&h.service, 2, "Nobody", "Cooking", "").await;
    let bob = register(&h.service, 3, "Bob", "React, Go", "go").await;

    let ranked = h.service.ranked_candidates_with_scores(1).await.unwrap();
    let ids: Vec<ProfileId> = ranked.iter().map(|c| c.profile.id).collect();
    assert_eq!(ids, vec![bob.id, nobody.id]);
    assert_eq!(ranked[0].score, 4);
    assert_eq!(ranked[1].score, 0);
    assert!(!ids.contains(&ada.id));
}

#[tokio::test]
async fn test_connect_then_reciprocate_is_mutual_match() {
    let h = harness();
    let a = register(&h.service, 1, "Ada", "Go", "react").await;
    let b = register(&h.service, 2, "Bob", "React", "go").await;

    let first = h
        .service
        .respond_to_candidate(1, b.id, Response::Connect)
        .await
        .unwrap();
    assert!(!first.matched);
    assert!(first.counterpart.is_none());
    assert!(first.requester.pending_outgoing.contains(&b.id));

    // B is unaffected and still sees A as a candidate
    let b_stored = h.profiles.find_by_id(b.id).await.unwrap().unwrap();
    assert!(b_stored.pending_outgoing.is_empty() && b_stored.matches.is_empty());
    let for_b = h.service.list_ranked_candidates(2).await.unwrap();
    assert_eq!(for_b.iter().map(|p| p.id).collect::<Vec<_>>(), vec![a.id]);

    let second = h
        .service
        .respond_to_candidate(2, a.id, Response::Connect)
        .await
        .unwrap();
    assert!(second.matched);
    assert_eq!(second.counterpart.as_ref().map(|p| p.id), Some(a.id));

    let a_stored = h.profiles.find_by_id(a.id).await.unwrap().unwrap();
    let b_stored = h.profiles.find_by_id(b.id).await.unwrap().unwrap();
    assert!(a_stored.matches.contains(&b.id));
    assert!(b_stored.matches.contains(&a.id));
    assert!(!a_stored.pending_outgoing.contains(&b.id));
    assert!(!b_stored.pending_outgoing.contains(&a.id));

    let connections = h.service.connections(1).await.unwrap();
    assert_eq!(connections.len(), 1);
    assert_eq!(connections[0].id, b.id);

    // Matched profiles drop out of each other's rankings
    assert!(h.service.list_ranked_candidates(1).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_reject_is_idempotent_and_one_sided() {
    let h = harness();
    let _a = register(&h.service, 1, "Ada", "Go", "react").await;
    let b = register(&h.service, 2, "Bob", "React", "go").await;

    for _ in 0..2 {
        let outcome = h
            .service
            .respond_to_candidate(1, b.id, Response::Reject)
            .await
            .unwrap();
        assert!(!outcome.matched);
    }

    let a_stored = h.service.get_profile(1).await.unwrap();
    assert_eq!(a_stored.rejections.len(), 1);
    assert!(a_stored.rejections.contains(&b.id));

    let b_stored = h.service.get_profile(2).await.unwrap();
    assert!(b_stored.rejections.is_empty());
    assert!(h.service.list_ranked_candidates(1).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_respond_to_missing_or_self() {
    let h = harness();
    let a = register(&h.service, 1, "Ada", "Go", "react").await;

    let err = h
        .service
        .respond_to_candidate(1, ProfileId::new(), Response::Connect)
        .await
        .unwrap_err();
    assert!(matches!(err, MatchError::CandidateNotFound(_)));

    let err = h
        .service
        .respond_to_candidate(1, a.id, Response::Reject)
        .await
        .unwrap_err();
    assert!(matches!(err, MatchError::SelfReference(_)));
}

#[tokio::test]
async fn test_field_update_session_and_direct_update() {
    let h = harness();
    let _a = register(&h.service, 1, "Ada", "Go", "react").await;
    let b = register(&h.service, 2, "Bob", "React", "go").await;
    h.service
        .respond_to_candidate(1, b.id, Response::Connect)
        .await
        .unwrap();

    let prompt = h
        .service
        .begin_field_update(1, ProfileField::Skills)
        .await
        .unwrap();
    assert!(prompt.prompt.contains("skills"));

    let outcome = h
        .service
        .submit_registration_answer(1, "Rust, , Figma")
        .await
        .unwrap();
    assert!(outcome.done);
    let updated = outcome.profile.unwrap();
    assert_eq!(updated.skills, vec!["Rust", "Figma"]);
    assert!(updated.pending_outgoing.contains(&b.id));
    assert!(!h.service.has_open_session(1).await.unwrap());

    let updated = h
        .service
        .update_field(1, ProfileField::Location, "  Istanbul ")
        .await
        .unwrap();
    assert_eq!(updated.location.as_deref(), Some("Istanbul"));
    assert_eq!(updated.skills, vec!["Rust", "Figma"]);
    assert_eq!(h.service.get_profile(1).await.unwrap(), updated);
}

#[tokio::test]
async fn test_concurrent_reciprocal_connects_always_match() {
    let h = harness();
    let mut pairs = Vec::new();
    for i in 0..10 {
        let user_a = 100 + i * 2;
        let user_b = user_a + 1;
        let a = register(&h.service, user_a, "A", "Go", "react").await;
        let b = register(&h.service, user_b, "B", "React", "go").await;
        pairs.push((user_a, a, user_b, b));
    }

    let mut handles = Vec::new();
    for (user_a, a, user_b, b) in pairs.clone() {
        let service = h.service.clone();
        handles.push(tokio::spawn(async move {
            service.respond_to_candidate(user_a, b.id, Response::Connect).await
        }));
        let service = h.service.clone();
        handles.push(tokio::spawn(async move {
            service.respond_to_candidate(user_b, a.id, Response::Connect).await
        }));
    }

    let mut matched = 0;
    for handle in handles {
        if handle.await.unwrap().unwrap().matched {
            matched += 1;
        }
    }
    assert_eq!(matched, pairs.len());

    for (_, a, _, b) in pairs {
        let a = h.profiles.find_by_id(a.id).await.unwrap().unwrap();
        let b = h.profiles.find_by_id(b.id).await.unwrap().unwrap();
        assert!(a.matches.contains(&b.id) && b.matches.contains(&a.id));
        assert!(a.pending_outgoing.is_empty() && b.pending_outgoing.is_empty());
        assert!(a.connection_sets_consistent() && b.connection_sets_consistent());
    }
}

/// Profile store whose calls never finish in time
struct StalledStore;

#[async_trait]
impl ProfileStore for StalledStore {
    async fn find_by_user_id(&self, _: ExternalUserId) -> Result<Option<Profile>, StoreError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(None)
    }

    async fn find_by_id(&self, _: ProfileId) -> Result<Option<Profile>, StoreError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(None)
    }

    async fn list_all(&self) -> Result<Vec<Profile>, StoreError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(Vec::new())
    }

    async fn create(&self, _: &Profile) -> Result<(), StoreError> {
        Ok(())
    }

    async fn update(&self, _: &Profile) -> Result<(), StoreError> {
        Ok(())
    }

    async fn update_all(&self, _: &[Profile]) -> Result<(), StoreError> {
        Ok(())
    }
}

#[tokio::test]
async fn test_store_timeout_surfaces_as_retryable() {
    let service = MatchService::new(
        Arc::new(StalledStore),
        Arc::new(InMemorySessionStore::new()),
        ServiceSettings {
            store_timeout: Duration::from_millis(50),
            session_ttl: None,
        },
    );

    let err = service.get_profile(1).await.unwrap_err();
    assert!(matches!(
        err,
        MatchError::StoreUnavailable(StoreError::Timeout { .. })
    ));
    assert!(err.is_retryable());
}

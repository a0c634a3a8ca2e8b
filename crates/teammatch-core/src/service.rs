//! The matching service: the operations a transport layer calls

use crate::error::{MatchError, Result};
use crate::ledger::{self, ConnectOutcome, RejectOutcome};
use crate::locks::KeyedLocks;
use crate::matching::{self, ScoredCandidate};
use crate::registration;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use teammatch_persistence::{ProfileStore, SessionStore, StoreError};
use teammatch_types::{
    ExternalUserId, Profile, ProfileField, ProfileId, RegistrationSession, Response, SessionMode,
};
use tracing::{debug, info, warn};

/// Tunables for [`MatchService`]
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    /// Budget for every individual store call
    pub store_timeout: Duration,
    /// Sessions older than this are discarded when next touched; `None` keeps them forever
    pub session_ttl: Option<Duration>,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            store_timeout: Duration::from_secs(10),
            session_ttl: Some(Duration::from_secs(24 * 60 * 60)),
        }
    }
}

/// Answer to `begin_or_resume_registration` / `begin_field_update`
#[derive(Debug, Clone, PartialEq)]
pub struct SessionPrompt {
    pub prompt: String,
    /// An existing session was picked up instead of a new one being opened
    pub resumed: bool,
}

/// Answer to `submit_registration_answer`
#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    pub prompt: String,
    pub done: bool,
    /// The stored profile once the session finished
    pub profile: Option<Profile>,
}

/// Answer to `respond_to_candidate`
#[derive(Debug, Clone)]
pub struct RespondOutcome {
    pub response: Response,
    pub matched: bool,
    /// True only for the call that confirmed the match
    pub newly_matched: bool,
    /// The actor's record after the change
    pub requester: Profile,
    /// The candidate's record, present when a mutual match was confirmed
    pub counterpart: Option<Profile>,
}

/// Core facade over the profile store, the session store and the handshake
pub struct MatchService {
    profiles: Arc<dyn ProfileStore>,
    sessions: Arc<dyn SessionStore>,
    profile_locks: KeyedLocks<ProfileId>,
    user_locks: KeyedLocks<ExternalUserId>,
    settings: ServiceSettings,
}

impl MatchService {
    /// Create a new matching service
    pub fn new(
        profiles: Arc<dyn ProfileStore>,
        sessions: Arc<dyn SessionStore>,
        settings: ServiceSettings,
    ) -> Self {
        info!(
            "Match service initialized (store timeout {:?}, session ttl {:?})",
            settings.store_timeout, settings.session_ttl
        );
        Self {
            profiles,
            sessions,
            profile_locks: KeyedLocks::new(),
            user_locks: KeyedLocks::new(),
            settings,
        }
    }

    /// Run a store call under the configured timeout
    async fn call<T, F>(&self, operation: &'static str, fut: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, StoreError>>,
    {
        let timeout = self.settings.store_timeout;
        match tokio::time::timeout(timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                warn!("Store call '{}' failed: {}", operation, e);
                Err(e.into())
            }
            Err(_) => {
                warn!("Store call '{}' timed out after {:?}", operation, timeout);
                Err(StoreError::Timeout { operation, timeout }.into())
            }
        }
    }

    fn is_expired(&self, session: &RegistrationSession, now: DateTime<Utc>) -> bool {
        let Some(ttl) = self.settings.session_ttl else {
            return false;
        };
        let idle = now.signed_duration_since(session.last_activity);
        idle.to_std().is_ok_and(|idle| idle > ttl)
    }

    /// Persist `session`, marking it active now
    async fn save_session(&self, mut session: RegistrationSession) -> Result<()> {
        session.touch(Utc::now());
        self.call("session_put", self.sessions.put(&session)).await
    }

    /// Current session for `user_id`, discarding it if it went stale
    async fn live_session(&self, user_id: ExternalUserId) -> Result<Option<RegistrationSession>> {
        let Some(session) = self.call("session_get", self.sessions.get(user_id)).await? else {
            return Ok(None);
        };
        if self.is_expired(&session, Utc::now()) {
            info!("Discarding stale session for user {}", user_id);
            self.call("session_remove", self.sessions.remove(user_id)).await?;
            return Ok(None);
        }
        Ok(Some(session))
    }

    async fn require_profile(&self, user_id: ExternalUserId) -> Result<Profile> {
        self.call("find_by_user_id", self.profiles.find_by_user_id(user_id))
            .await?
            .ok_or(MatchError::NotRegistered(user_id))
    }

    // ── Registration ───────────────────────────────────────────────

    /// Open a registration for `user_id`, or repeat the pending question
    pub async fn begin_or_resume_registration(&self, user_id: ExternalUserId) -> Result<SessionPrompt> {
        let _guard = self.user_locks.lock(user_id).await;

        if let Some(session) = self.live_session(user_id).await? {
            if session.mode == SessionMode::Registration {
                debug!("Resuming registration for user {} at {}", user_id, session.current_step);
                return Ok(SessionPrompt {
                    prompt: registration::prompt_for(session.current_step).to_string(),
                    resumed: true,
                });
            }
        }

        if self
            .call("find_by_user_id", self.profiles.find_by_user_id(user_id))
            .await?
            .is_some()
        {
            return Err(MatchError::AlreadyRegistered(user_id));
        }

        let session = RegistrationSession::registration(user_id, Utc::now());
        let step = session.current_step;
        self.save_session(session).await?;
        info!("Started registration for user {}", user_id);

        Ok(SessionPrompt {
            prompt: registration::prompt_for(step).to_string(),
            resumed: false,
        })
    }

    /// Feed one reply into the user's open session
    pub async fn submit_registration_answer(
        &self,
        user_id: ExternalUserId,
        text: &str,
    ) -> Result<SubmitOutcome> {
        let _guard = self.user_locks.lock(user_id).await;

        let session = self
            .live_session(user_id)
            .await?
            .ok_or(MatchError::NoOpenSession(user_id))?;

        match session.mode {
            SessionMode::Registration => self.advance_registration(session, text).await,
            SessionMode::Update { field } => {
                let result = self.update_field(user_id, field, text).await;
                if matches!(result, Ok(_) | Err(MatchError::NotRegistered(_))) {
                    self.call("session_remove", self.sessions.remove(user_id)).await?;
                }
                let profile = result?;
                Ok(SubmitOutcome {
                    prompt: format!("{} updated successfully!", field.label()),
                    done: true,
                    profile: Some(profile),
                })
            }
        }
    }

    async fn advance_registration(
        &self,
        session: RegistrationSession,
        text: &str,
    ) -> Result<SubmitOutcome> {
        let user_id = session.external_user_id;
        let advance = registration::advance(session, text)?;

        let Some(profile) = advance.completed else {
            self.save_session(advance.session).await?;
            return Ok(SubmitOutcome {
                prompt: advance.prompt,
                done: false,
                profile: None,
            });
        };

        // The session stays at its last question until the profile is stored
        match self.call("create", self.profiles.create(&profile)).await {
            Err(MatchError::StoreUnavailable(StoreError::DuplicateUser(_))) => {
                self.call("session_remove", self.sessions.remove(user_id)).await?;
                return Err(MatchError::AlreadyRegistered(user_id));
            }
            other => other?,
        }
        self.call("session_remove", self.sessions.remove(user_id)).await?;
        info!("User {} registered as profile {}", user_id, profile.id);

        Ok(SubmitOutcome {
            prompt: advance.prompt,
            done: true,
            profile: Some(profile),
        })
    }

    /// Drop the user's open session, if any
    pub async fn abandon_session(&self, user_id: ExternalUserId) -> Result<bool> {
        let _guard = self.user_locks.lock(user_id).await;
        let removed = self.call("session_remove", self.sessions.remove(user_id)).await?;
        if removed {
            info!("User {} abandoned their session", user_id);
        }
        Ok(removed)
    }

    pub async fn has_open_session(&self, user_id: ExternalUserId) -> Result<bool> {
        let _guard = self.user_locks.lock(user_id).await;
        Ok(self.live_session(user_id).await?.is_some())
    }

    // ── Profile ─────────────────────────────────────────────────────

    pub async fn get_profile(&self, user_id: ExternalUserId) -> Result<Profile> {
        self.require_profile(user_id).await
    }

    /// Profiles the user has a confirmed mutual match with
    pub async fn connections(&self, user_id: ExternalUserId) -> Result<Vec<Profile>> {
        let profile = self.require_profile(user_id).await?;
        let mut connections = Vec::with_capacity(profile.matches.len());
        for id in &profile.matches {
            match self.call("find_by_id", self.profiles.find_by_id(*id)).await? {
                Some(other) => connections.push(other),
                None => debug!("Match {} of user {} no longer exists", id, user_id),
            }
        }
        Ok(connections)
    }

    /// Open a single-field update session; the next reply becomes the new value
    pub async fn begin_field_update(
        &self,
        user_id: ExternalUserId,
        field: ProfileField,
    ) -> Result<SessionPrompt> {
        let _guard = self.user_locks.lock(user_id).await;
        self.require_profile(user_id).await?;

        let resumed = self.live_session(user_id).await?.is_some();
        self.save_session(RegistrationSession::field_update(user_id, field, Utc::now()))
            .await?;
        debug!("User {} editing {}", user_id, field);

        Ok(SessionPrompt {
            prompt: registration::update_prompt_for(field).to_string(),
            resumed,
        })
    }

    /// Replace one field of the user's profile
    pub async fn update_field(
        &self,
        user_id: ExternalUserId,
        field: ProfileField,
        text: &str,
    ) -> Result<Profile> {
        let id = self.require_profile(user_id).await?.id;
        let _guard = self.profile_locks.lock(id).await;

        // Re-read under the lock so concurrent connection changes are kept
        let current = self
            .call("find_by_id", self.profiles.find_by_id(id))
            .await?
            .ok_or(MatchError::NotRegistered(user_id))?;

        let updated = registration::apply_field(current, field, text, Utc::now());
        self.call("update", self.profiles.update(&updated)).await?;
        info!("User {} updated {}", user_id, field);
        Ok(updated)
    }

    // ── Matching ────────────────────────────────────────────────────

    /// Every eligible candidate with its score, best first
    pub async fn ranked_candidates_with_scores(
        &self,
        user_id: ExternalUserId,
    ) -> Result<Vec<ScoredCandidate>> {
        let requester = self.require_profile(user_id).await?;
        let pool = self.call("list_all", self.profiles.list_all()).await?;
        let ranked = matching::rank(&requester, pool);
        debug!("Ranked {} candidates for user {}", ranked.len(), user_id);
        Ok(ranked)
    }

    /// Every eligible candidate, best first
    pub async fn list_ranked_candidates(&self, user_id: ExternalUserId) -> Result<Vec<Profile>> {
        Ok(self
            .ranked_candidates_with_scores(user_id)
            .await?
            .into_iter()
            .map(|candidate| candidate.profile)
            .collect())
    }

    /// Connect with or reject a proposed candidate
    pub async fn respond_to_candidate(
        &self,
        user_id: ExternalUserId,
        candidate_id: ProfileId,
        response: Response,
    ) -> Result<RespondOutcome> {
        let actor_id = self.require_profile(user_id).await?.id;
        if actor_id == candidate_id {
            return Err(MatchError::SelfReference(candidate_id));
        }

        let _guards = self.profile_locks.lock_pair(actor_id, candidate_id).await;

        let mut actor = self
            .call("find_by_id", self.profiles.find_by_id(actor_id))
            .await?
            .ok_or(MatchError::NotRegistered(user_id))?;
        let mut candidate = self
            .call("find_by_id", self.profiles.find_by_id(candidate_id))
            .await?
            .ok_or(MatchError::CandidateNotFound(candidate_id))?;

        let now = Utc::now();
        match response {
            Response::Reject => match ledger::reject(&mut actor, &candidate, now) {
                RejectOutcome::Rejected { newly_recorded } => {
                    self.call("update", self.profiles.update(&actor)).await?;
                    debug!(
                        "User {} rejected {} (new: {})",
                        user_id, candidate_id, newly_recorded
                    );
                    Ok(RespondOutcome {
                        response,
                        matched: false,
                        newly_matched: false,
                        requester: actor,
                        counterpart: None,
                    })
                }
                RejectOutcome::AlreadyMatched => Ok(RespondOutcome {
                    response,
                    matched: true,
                    newly_matched: false,
                    requester: actor,
                    counterpart: None,
                }),
            },
            Response::Connect => match ledger::connect(&mut actor, &mut candidate, now) {
                ConnectOutcome::Matched => {
                    self.call(
                        "update_all",
                        self.profiles.update_all(&[actor.clone(), candidate.clone()]),
                    )
                    .await?;
                    info!("Mutual match between {} and {}", actor.id, candidate.id);
                    Ok(RespondOutcome {
                        response,
                        matched: true,
                        newly_matched: true,
                        requester: actor,
                        counterpart: Some(candidate),
                    })
                }
                ConnectOutcome::AlreadyMatched => Ok(RespondOutcome {
                    response,
                    matched: true,
                    newly_matched: false,
                    requester: actor,
                    counterpart: Some(candidate),
                }),
                ConnectOutcome::AwaitingReciprocation { newly_recorded } => {
                    self.call("update", self.profiles.update(&actor)).await?;
                    debug!(
                        "User {} is interested in {} (new: {})",
                        user_id, candidate_id, newly_recorded
                    );
                    Ok(RespondOutcome {
                        response,
                        matched: false,
                        newly_matched: false,
                        requester: actor,
                        counterpart: None,
                    })
                }
            },
        }
    }
}

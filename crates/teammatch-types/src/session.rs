use crate::{ExternalUserId, ProfileField};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Registration questions in the order they are asked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStep {
    Name,
    Skills,
    PastProjects,
    Bio,
    LookingForSkills,
    ProjectIdea,
    Location,
    Complete,
}

impl RegistrationStep {
    /// First question of a fresh registration
    pub const FIRST: RegistrationStep = RegistrationStep::Name;

    /// The step that follows this one, `None` once complete
    pub fn next(&self) -> Option<RegistrationStep> {
        use RegistrationStep::*;
        match self {
            Name => Some(Skills),
            Skills => Some(PastProjects),
            PastProjects => Some(Bio),
            Bio => Some(LookingForSkills),
            LookingForSkills => Some(ProjectIdea),
            ProjectIdea => Some(Location),
            Location => Some(Complete),
            Complete => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RegistrationStep::Complete)
    }

    /// The profile attribute this step collects
    pub fn field(&self) -> Option<ProfileField> {
        match self {
            RegistrationStep::Name => Some(ProfileField::Name),
            RegistrationStep::Skills => Some(ProfileField::Skills),
            RegistrationStep::PastProjects => Some(ProfileField::PastProjects),
            RegistrationStep::Bio => Some(ProfileField::Bio),
            RegistrationStep::LookingForSkills => Some(ProfileField::LookingForSkills),
            RegistrationStep::ProjectIdea => Some(ProfileField::ProjectIdea),
            RegistrationStep::Location => Some(ProfileField::Location),
            RegistrationStep::Complete => None,
        }
    }
}

impl From<ProfileField> for RegistrationStep {
    fn from(field: ProfileField) -> Self {
        match field {
            ProfileField::Name => RegistrationStep::Name,
            ProfileField::Skills => RegistrationStep::Skills,
            ProfileField::PastProjects => RegistrationStep::PastProjects,
            ProfileField::Bio => RegistrationStep::Bio,
            ProfileField::LookingForSkills => RegistrationStep::LookingForSkills,
            ProfileField::ProjectIdea => RegistrationStep::ProjectIdea,
            ProfileField::Location => RegistrationStep::Location,
        }
    }
}

impl fmt::Display for RegistrationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.field() {
            Some(field) => f.write_str(field.as_str()),
            None => f.write_str("complete"),
        }
    }
}

/// Whether a session walks the full questionnaire or edits one field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SessionMode {
    Registration,
    Update { field: ProfileField },
}

/// Answers collected so far
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialProfile {
    pub name: Option<String>,
    pub skills: Option<Vec<String>>,
    pub past_projects: Option<Vec<String>>,
    pub bio: Option<String>,
    pub looking_for_skills: Option<Vec<String>>,
    pub project_idea: Option<String>,
    pub location: Option<String>,
}

/// Per-user progress through registration or a single-field update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationSession {
    pub external_user_id: ExternalUserId,
    pub current_step: RegistrationStep,
    pub mode: SessionMode,
    pub partial: PartialProfile,
    pub started_at: DateTime<Utc>,
    /// Last time the session was saved; staleness is measured from here
    pub last_activity: DateTime<Utc>,
}

impl RegistrationSession {
    /// A fresh registration waiting for the user's name
    pub fn registration(external_user_id: ExternalUserId, now: DateTime<Utc>) -> Self {
        Self {
            external_user_id,
            current_step: RegistrationStep::FIRST,
            mode: SessionMode::Registration,
            partial: PartialProfile::default(),
            started_at: now,
            last_activity: now,
        }
    }

    /// A session restricted to the single step that edits `field`
    pub fn field_update(
        external_user_id: ExternalUserId,
        field: ProfileField,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            external_user_id,
            current_step: field.into(),
            mode: SessionMode::Update { field },
            partial: PartialProfile::default(),
            started_at: now,
            last_activity: now,
        }
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity = now;
    }

    pub fn is_complete(&self) -> bool {
        self.current_step.is_terminal()
    }
}

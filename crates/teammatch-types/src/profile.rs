use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Chat-platform identity (Telegram user ID)
pub type ExternalUserId = i64;

/// Opaque profile identifier, assigned when registration completes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileId(Uuid);

impl ProfileId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ProfileId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ProfileId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// A registered person: skills, interests and connection sets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: ProfileId,
    pub external_user_id: ExternalUserId,
    pub name: String,
    pub skills: Vec<String>,
    pub past_projects: Vec<String>,
    pub bio: String,
    pub looking_for_skills: Vec<String>,
    pub project_idea: Option<String>,
    pub location: Option<String>,
    /// Confirmed mutual matches (symmetric)
    pub matches: BTreeSet<ProfileId>,
    pub rejections: BTreeSet<ProfileId>,
    /// One-sided interest awaiting reciprocation
    pub pending_outgoing: BTreeSet<ProfileId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Refresh `updated_at` after a mutation
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    /// Whether `other` already appears in any of the three connection sets
    pub fn has_responded_to(&self, other: &ProfileId) -> bool {
        self.matches.contains(other)
            || self.rejections.contains(other)
            || self.pending_outgoing.contains(other)
    }

    /// Connection sets are pairwise disjoint and never contain the profile itself
    pub fn connection_sets_consistent(&self) -> bool {
        let own = [&self.matches, &self.rejections, &self.pending_outgoing];
        if own.iter().any(|set| set.contains(&self.id)) {
            return false;
        }
        self.matches.is_disjoint(&self.rejections)
            && self.matches.is_disjoint(&self.pending_outgoing)
            && self.rejections.is_disjoint(&self.pending_outgoing)
    }
}

/// An attribute of a profile that can be answered or edited on its own
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileField {
    Name,
    Skills,
    PastProjects,
    Bio,
    LookingForSkills,
    ProjectIdea,
    Location,
}

impl ProfileField {
    pub const ALL: [ProfileField; 7] = [
        ProfileField::Name,
        ProfileField::Skills,
        ProfileField::PastProjects,
        ProfileField::Bio,
        ProfileField::LookingForSkills,
        ProfileField::ProjectIdea,
        ProfileField::Location,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileField::Name => "name",
            ProfileField::Skills => "skills",
            ProfileField::PastProjects => "past_projects",
            ProfileField::Bio => "bio",
            ProfileField::LookingForSkills => "looking_for_skills",
            ProfileField::ProjectIdea => "project_idea",
            ProfileField::Location => "location",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            ProfileField::Name => "Name",
            ProfileField::Skills => "Skills",
            ProfileField::PastProjects => "Past projects",
            ProfileField::Bio => "Bio",
            ProfileField::LookingForSkills => "Skills I'm looking for",
            ProfileField::ProjectIdea => "Project idea",
            ProfileField::Location => "Location",
        }
    }
}

impl fmt::Display for ProfileField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a field name is not recognised
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown profile field: {0}")]
pub struct UnknownField(pub String);

impl FromStr for ProfileField {
    type Err = UnknownField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Short aliases match the callback keys used by the chat keyboards
        match s.trim().to_lowercase().as_str() {
            "name" => Ok(ProfileField::Name),
            "skills" => Ok(ProfileField::Skills),
            "past_projects" | "pastprojects" | "projects" => Ok(ProfileField::PastProjects),
            "bio" => Ok(ProfileField::Bio),
            "looking_for_skills" | "lookingforskills" | "lookingfor" => {
                Ok(ProfileField::LookingForSkills)
            }
            "project_idea" | "projectidea" | "idea" => Ok(ProfileField::ProjectIdea),
            "location" => Ok(ProfileField::Location),
            other => Err(UnknownField(other.to_string())),
        }
    }
}

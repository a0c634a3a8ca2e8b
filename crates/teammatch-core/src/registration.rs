//! Registration state machine
//!
//! One call to [`advance`] consumes one user reply. The session walks
//! `name → skills → pastProjects → bio → lookingForSkills → projectIdea →
//! location → complete`; reaching `complete` produces a finished [`Profile`]
//! that the caller persists before discarding the session.

use crate::error::{MatchError, Result};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use teammatch_types::{
    PartialProfile, Profile, ProfileField, ProfileId, RegistrationSession, RegistrationStep,
    SessionMode,
};
use tracing::debug;

/// Result of feeding one answer into a session
#[derive(Debug, Clone)]
pub struct Advance {
    pub session: RegistrationSession,
    /// Question for the next step, or the completion message
    pub prompt: String,
    /// Set once the final step has been answered
    pub completed: Option<Profile>,
}

/// Split a comma-separated answer into trimmed, non-empty entries.
///
/// Order and duplicates are kept as entered.
pub fn parse_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Trim free text; optional fields become absent when empty
fn optional_text(input: &str) -> Option<String> {
    let trimmed = input.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Question asked when a session arrives at `step`
pub fn prompt_for(step: RegistrationStep) -> &'static str {
    match step {
        RegistrationStep::Name => {
            "Let's start your registration for project team matching! What's your name?"
        }
        RegistrationStep::Skills => {
            "Great! What are your technical skills? (comma-separated list, e.g., \
             JavaScript, React, Node.js, UI/UX Design, Project Management)"
        }
        RegistrationStep::PastProjects => {
            "What projects have you worked on in the past? (comma-separated list)"
        }
        RegistrationStep::Bio => "Tell us a bit about yourself and your experience (your bio):",
        RegistrationStep::LookingForSkills => {
            "What skills are you looking for in potential team members? (comma-separated list)"
        }
        RegistrationStep::ProjectIdea => {
            "Do you have a project idea you'd like to work on? Please describe it briefly:"
        }
        RegistrationStep::Location => "What's your location? (city/country)",
        RegistrationStep::Complete => {
            "Registration complete! You can now start matching with potential team members. \
             Use /matches to find teammates."
        }
    }
}

/// Question asked when a registered user edits one field
pub fn update_prompt_for(field: ProfileField) -> &'static str {
    match field {
        ProfileField::Name => "Update your name:",
        ProfileField::Skills => {
            "Update your technical skills (comma-separated list, e.g., JavaScript, React, \
             Node.js, UI/UX Design, Project Management):"
        }
        ProfileField::PastProjects => "Update your past projects (comma-separated list):",
        ProfileField::Bio => "Update your bio:",
        ProfileField::LookingForSkills => {
            "Update the skills you're looking for (comma-separated list):"
        }
        ProfileField::ProjectIdea => "Update your project idea:",
        ProfileField::Location => "Update your location (city/country):",
    }
}

/// Advance a registration session using the current time
pub fn advance(session: RegistrationSession, raw_input: &str) -> Result<Advance> {
    advance_at(session, raw_input, Utc::now())
}

/// Advance a session only if it is waiting at `expected`
pub fn advance_step(
    session: RegistrationSession,
    expected: RegistrationStep,
    raw_input: &str,
) -> Result<Advance> {
    if session.current_step != expected {
        return Err(MatchError::InvalidStep {
            current: session.current_step,
            attempted: expected,
        });
    }
    advance(session, raw_input)
}

/// Store the answer for the current step and move to the next one
pub fn advance_at(
    mut session: RegistrationSession,
    raw_input: &str,
    now: DateTime<Utc>,
) -> Result<Advance> {
    let current = session.current_step;

    // Update sessions never walk the questionnaire; they go through `apply_field`
    let (Some(field), Some(next), SessionMode::Registration) =
        (current.field(), current.next(), session.mode)
    else {
        return Err(MatchError::InvalidStep {
            current,
            attempted: current,
        });
    };

    store_answer(&mut session.partial, field, raw_input);
    session.current_step = next;
    debug!(
        "User {} registration: {} -> {}",
        session.external_user_id, current, next
    );

    let completed = next.is_terminal().then(|| finalize(&session, now));

    Ok(Advance {
        prompt: prompt_for(next).to_string(),
        session,
        completed,
    })
}

fn store_answer(partial: &mut PartialProfile, field: ProfileField, raw_input: &str) {
    match field {
        ProfileField::Name => partial.name = Some(raw_input.trim().to_string()),
        ProfileField::Skills => partial.skills = Some(parse_list(raw_input)),
        ProfileField::PastProjects => partial.past_projects = Some(parse_list(raw_input)),
        ProfileField::Bio => partial.bio = Some(raw_input.trim().to_string()),
        ProfileField::LookingForSkills => partial.looking_for_skills = Some(parse_list(raw_input)),
        ProfileField::ProjectIdea => partial.project_idea = optional_text(raw_input),
        ProfileField::Location => partial.location = optional_text(raw_input),
    }
}

/// Build the finished profile from a completed session
fn finalize(session: &RegistrationSession, now: DateTime<Utc>) -> Profile {
    let partial = session.partial.clone();
    Profile {
        id: ProfileId::new(),
        external_user_id: session.external_user_id,
        name: partial.name.unwrap_or_default(),
        skills: partial.skills.unwrap_or_default(),
        past_projects: partial.past_projects.unwrap_or_default(),
        bio: partial.bio.unwrap_or_default(),
        looking_for_skills: partial.looking_for_skills.unwrap_or_default(),
        project_idea: partial.project_idea,
        location: partial.location,
        matches: BTreeSet::new(),
        rejections: BTreeSet::new(),
        pending_outgoing: BTreeSet::new(),
        created_at: now,
        updated_at: now,
    }
}

/// Apply one answer to a single field of an existing profile.
///
/// Uses the same parsing rules as registration and leaves every other
/// field, including the connection sets, untouched.
pub fn apply_field(
    mut profile: Profile,
    field: ProfileField,
    raw_input: &str,
    now: DateTime<Utc>,
) -> Profile {
    match field {
        ProfileField::Name => profile.name = raw_input.trim().to_string(),
        ProfileField::Skills => profile.skills = parse_list(raw_input),
        ProfileField::PastProjects => profile.past_projects = parse_list(raw_input),
        ProfileField::Bio => profile.bio = raw_input.trim().to_string(),
        ProfileField::LookingForSkills => profile.looking_for_skills = parse_list(raw_input),
        ProfileField::ProjectIdea => profile.project_idea = optional_text(raw_input),
        ProfileField::Location => profile.location = optional_text(raw_input),
    }
    profile.touch(now);
    profile
}

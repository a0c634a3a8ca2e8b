//! Message text for the chat surface

use teammatch_core::{MatchError, ScoredCandidate};
use teammatch_types::Profile;
use tracing::{error, warn};

const NOT_SPECIFIED: &str = "Not specified";

pub(crate) const WELCOME: &str = "Welcome to the Project Team Matching Bot! 👋\n\n\
    I'm here to help you find teammates with complementary skills for your group projects. \
    Here's what you can do:\n\n\
    /register - Create your profile with your skills and interests\n\
    /profile - View your profile\n\
    /matches - Find potential team members\n\
    /help - Get help using the bot\n\n\
    Let's get started! Use /register to create your profile.";

pub(crate) const HELP: &str = "How to use the Project Team Matching Bot:\n\n\
    /register - Start registration to add your skills and interests\n\
    /profile - View your current profile and connections\n\
    /matches - Find potential team members with complementary skills\n\
    /update - Update a part of your profile\n\
    /cancel - Stop the registration or update in progress\n\
    /help - Show this help message\n\n\
    During registration the bot guides you step by step; just reply to its questions.\n\n\
    When a potential teammate is shown, tap Connect or Reject. If they also want to \
    connect with you, you'll both be notified!";

pub(crate) const NO_SESSION_HINT: &str =
    "I'm not waiting for an answer right now. Use /help to see what I can do.";

pub(crate) const UNKNOWN_COMMAND: &str = "Unknown command. Use /help to see the available commands.";

pub(crate) const NO_CANDIDATES: &str =
    "No potential team members found at the moment. Try again later when more users have registered.";

pub(crate) const CHOOSE_FIELD: &str = "Which information would you like to update?";

pub(crate) const INTEREST_RECORDED: &str = "You've expressed interest in connecting with this \
    team member. If they also want to connect with you, you'll be notified!";

pub(crate) const REJECTED: &str =
    "You've decided not to connect with this team member at this time. Use /matches to see the next one.";

pub(crate) const CANCELLED: &str = "Okay, I've cancelled what we were doing.";

pub(crate) const NOTHING_TO_CANCEL: &str = "There's nothing to cancel.";

pub(crate) const STALE_BUTTON: &str = "That button has expired. Use /matches to see fresh candidates.";

fn join_or(items: &[String]) -> String {
    if items.is_empty() {
        NOT_SPECIFIED.to_string()
    } else {
        items.join(", ")
    }
}

fn optional(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or(NOT_SPECIFIED)
}

/// The user's own profile and confirmed connections
pub(crate) fn profile_card(profile: &Profile, connections: &[Profile]) -> String {
    let mut text = format!(
        "📋 Your profile:\n\n\
         Name: {}\n\
         Skills: {}\n\
         Past projects: {}\n\
         About: {}\n\
         Looking for: {}\n\
         Project idea: {}\n\
         Location: {}\n",
        profile.name,
        join_or(&profile.skills),
        join_or(&profile.past_projects),
        profile.bio,
        join_or(&profile.looking_for_skills),
        optional(&profile.project_idea),
        optional(&profile.location),
    );

    if connections.is_empty() {
        text.push_str("\nNo connections yet. Use /matches to find teammates.");
    } else {
        text.push_str("\n🤝 Connections:\n");
        for other in connections {
            text.push_str(&format!("- {} ({})\n", other.name, join_or(&other.skills)));
        }
    }
    text
}

/// The best-ranked candidate, followed by a short list of the runners-up
pub(crate) fn candidate_card(best: &ScoredCandidate, others: &[ScoredCandidate]) -> String {
    let candidate = &best.profile;
    let mut text = format!(
        "Found a potential team member! (score {})\n\n\
         Name: {}\n\
         Skills: {}\n\
         Past projects: {}\n\
         About: {}\n\
         Looking for: {}\n\
         Project idea: {}\n\
         Location: {}\n",
        best.score,
        candidate.name,
        join_or(&candidate.skills),
        join_or(&candidate.past_projects),
        candidate.bio,
        join_or(&candidate.looking_for_skills),
        optional(&candidate.project_idea),
        optional(&candidate.location),
    );

    if !others.is_empty() {
        text.push_str("\nAlso worth a look:\n");
        for other in others {
            text.push_str(&format!("- {} (score {})\n", other.profile.name, other.score));
        }
    }
    text
}

/// Sent to one side of a confirmed match, describing the other side
pub(crate) fn match_notice(counterpart: &Profile) -> String {
    format!(
        "Great news! You and {name} are now connected for potential project collaboration.\n\n\
         {name}'s skills: {skills}\n\
         Project idea: {idea}\n\
         Contact: tg://user?id={user}\n\n\
         We recommend reaching out to start discussing your project ideas and how you can work together!",
        name = counterpart.name,
        skills = join_or(&counterpart.skills),
        idea = optional(&counterpart.project_idea),
        user = counterpart.external_user_id,
    )
}

/// User-facing text for a failed operation
pub(crate) fn error_text(err: &MatchError) -> String {
    match err {
        MatchError::NotRegistered(_) => {
            "You don't have a profile yet. Use /register to create one.".to_string()
        }
        MatchError::AlreadyRegistered(_) => {
            "You're already registered. Use /profile to view your profile or /update to change it."
                .to_string()
        }
        MatchError::CandidateNotFound(_) => {
            "This person is no longer available. Use /matches to see fresh candidates.".to_string()
        }
        MatchError::NoOpenSession(_) => NO_SESSION_HINT.to_string(),
        MatchError::SelfReference(_) => "You can't connect with yourself.".to_string(),
        MatchError::InvalidStep { .. } => {
            warn!("Registration driven out of sequence: {}", err);
            "Something went wrong with your registration. Use /register to start again.".to_string()
        }
        MatchError::StoreUnavailable(e) => {
            error!("Store failure: {}", e);
            "Something went wrong on our side. Please try again later.".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeSet;
    use teammatch_types::ProfileId;

    fn profile(name: &str, skills: &[&str]) -> Profile {
        let now = Utc::now();
        Profile {
            id: ProfileId::new(),
            external_user_id: 77,
            name: name.to_string(),
            skills: skills.iter().map(|s| s.to_string()).collect(),
            past_projects: vec![],
            bio: "builder".to_string(),
            looking_for_skills: vec![],
            project_idea: None,
            location: Some("Izmir".to_string()),
            matches: BTreeSet::new(),
            rejections: BTreeSet::new(),
            pending_outgoing: BTreeSet::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_profile_card() {
        let ada = profile("Ada", &["Rust", "Go"]);
        let card = profile_card(&ada, &[]);
        assert!(card.contains("Skills: Rust, Go"));
        assert!(card.contains("Past projects: Not specified"));
        assert!(card.contains("Location: Izmir"));
        assert!(card.contains("No connections yet"));

        let bob = profile("Bob", &["React"]);
        let card = profile_card(&ada, &[bob]);
        assert!(card.contains("- Bob (React)"));
    }

    #[test]
    fn test_match_notice_has_contact() {
        let bob = profile("Bob", &["React"]);
        let notice = match_notice(&bob);
        assert!(notice.contains("You and Bob are now connected"));
        assert!(notice.contains("tg://user?id=77"));
    }
}

//! Skill-compatibility scoring and candidate ranking
//!
//! Matching is a literal, case-insensitive substring test: a wanted skill
//! `"go"` is satisfied by `"Go"`, `"Golang"` and also `"Django"`. Short or
//! partial names overmatch; there is no taxonomy normalization.

use teammatch_types::Profile;

/// Points awarded per satisfied wanted skill, in either direction
const POINTS_PER_SKILL: u32 = 2;

/// A candidate together with its score against the requester
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub profile: Profile,
    pub score: u32,
}

/// `needle` lowercased is a substring of `haystack` lowercased
pub fn contains_case_insensitive(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Number of entries in `wanted` that some skill in `offered` satisfies.
/// Duplicate wanted entries count once per occurrence.
fn satisfied(wanted: &[String], offered: &[String]) -> u32 {
    let count = wanted
        .iter()
        .filter(|want| offered.iter().any(|have| contains_case_insensitive(have, want)))
        .count();
    u32::try_from(count).unwrap_or(u32::MAX)
}

/// Score `candidate` from `requester`'s point of view.
///
/// Two points for every skill the requester wants that the candidate has,
/// plus two for every skill the candidate wants that the requester has.
pub fn score(requester: &Profile, candidate: &Profile) -> u32 {
    let wanted_by_requester = satisfied(&requester.looking_for_skills, &candidate.skills);
    let wanted_by_candidate = satisfied(&candidate.looking_for_skills, &requester.skills);
    POINTS_PER_SKILL
        .saturating_mul(wanted_by_requester)
        .saturating_add(POINTS_PER_SKILL.saturating_mul(wanted_by_candidate))
}

/// Whether `candidate` may be proposed to `requester` at all
fn is_eligible(requester: &Profile, candidate: &Profile) -> bool {
    candidate.id != requester.id
        && candidate.external_user_id != requester.external_user_id
        && !requester.has_responded_to(&candidate.id)
}

/// Order every eligible candidate in `pool` for `requester`, best first.
///
/// Excludes the requester and anyone already matched, rejected or pending.
/// Equal scores keep pool order. A score of zero still ranks; an empty result
/// only means nobody is eligible.
pub fn rank<I>(requester: &Profile, pool: I) -> Vec<ScoredCandidate>
where
    I: IntoIterator<Item = Profile>,
{
    let mut scored: Vec<ScoredCandidate> = pool
        .into_iter()
        .filter(|candidate| is_eligible(requester, candidate))
        .map(|candidate| ScoredCandidate {
            score: score(requester, &candidate),
            profile: candidate,
        })
        .collect();

    // `sort_by` is stable
    scored.sort_by(|a, b| b.score.cmp(&a.score));
    scored
}

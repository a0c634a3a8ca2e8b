//! Connect / reject handshake
//!
//! Pair state is never stored on its own; it is read off the two profiles'
//! `matches`, `rejections` and `pending_outgoing` sets. The functions here
//! only stage changes on in-memory profiles; the service commits them.

use chrono::{DateTime, Utc};
use teammatch_types::Profile;

/// Relationship of `a` towards `b`, derived from both profiles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairState {
    None,
    /// `a` has expressed interest, `b` has not answered
    Pending,
    Matched,
    /// `a` rejected `b`
    Rejected,
}

/// Read the pair state from `a`'s perspective
pub fn pair_state(a: &Profile, b: &Profile) -> PairState {
    if a.matches.contains(&b.id) && b.matches.contains(&a.id) {
        PairState::Matched
    } else if a.rejections.contains(&b.id) {
        PairState::Rejected
    } else if a.pending_outgoing.contains(&b.id) {
        PairState::Pending
    } else {
        PairState::None
    }
}

/// What `connect` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// The candidate had already asked for the actor: both profiles changed
    Matched,
    /// Interest recorded on the actor only; `newly_recorded` is false on repeats
    AwaitingReciprocation { newly_recorded: bool },
    /// Nothing changed
    AlreadyMatched,
}

impl ConnectOutcome {
    pub fn is_match(&self) -> bool {
        matches!(self, ConnectOutcome::Matched | ConnectOutcome::AlreadyMatched)
    }
}

/// What `reject` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectOutcome {
    Rejected { newly_recorded: bool },
    /// Confirmed matches are not undone by a rejection; nothing changed
    AlreadyMatched,
}

/// `actor` wants to work with `candidate`.
///
/// If the candidate already has the actor in `pending_outgoing`, the pair is
/// promoted to a mutual match on both sides. Otherwise the candidate is added
/// to the actor's `pending_outgoing` and the candidate is left untouched.
pub fn connect(actor: &mut Profile, candidate: &mut Profile, now: DateTime<Utc>) -> ConnectOutcome {
    if actor.matches.contains(&candidate.id) {
        return ConnectOutcome::AlreadyMatched;
    }

    if candidate.pending_outgoing.remove(&actor.id) {
        // Keep each profile's sets disjoint
        actor.pending_outgoing.remove(&candidate.id);
        actor.rejections.remove(&candidate.id);
        candidate.rejections.remove(&actor.id);

        actor.matches.insert(candidate.id);
        candidate.matches.insert(actor.id);
        actor.touch(now);
        candidate.touch(now);
        return ConnectOutcome::Matched;
    }

    // A change of heart after a rejection
    let was_rejected = actor.rejections.remove(&candidate.id);
    let newly_recorded = actor.pending_outgoing.insert(candidate.id);
    if was_rejected || newly_recorded {
        actor.touch(now);
    }
    ConnectOutcome::AwaitingReciprocation { newly_recorded }
}

/// `actor` does not want to work with `candidate`.
///
/// Only the actor's record changes. A pending entry the candidate holds for
/// the actor is left in place; the candidate will not be proposed to the
/// actor again because ranking skips rejected profiles.
pub fn reject(actor: &mut Profile, candidate: &Profile, now: DateTime<Utc>) -> RejectOutcome {
    if actor.matches.contains(&candidate.id) {
        return RejectOutcome::AlreadyMatched;
    }

    let withdrew_interest = actor.pending_outgoing.remove(&candidate.id);
    let newly_recorded = actor.rejections.insert(candidate.id);
    if withdrew_interest || newly_recorded {
        actor.touch(now);
    }
    RejectOutcome::Rejected { newly_recorded }
}

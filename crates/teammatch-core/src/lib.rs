//! TeamMatch Core
//!
//! The logic behind the team-matching bot, free of any chat transport:
//!
//! - [`registration`]: the multi-step questionnaire that produces a profile
//! - [`matching`]: skill-compatibility scoring and candidate ranking
//! - [`ledger`]: the connect / reject handshake that confirms mutual matches
//! - [`MatchService`]: the operations a transport calls, with per-key
//!   serialization and store timeouts

pub mod error;
pub mod ledger;
pub mod locks;
pub mod matching;
pub mod registration;
pub mod service;

pub use error::{MatchError, Result};
pub use matching::ScoredCandidate;
pub use service::{MatchService, RespondOutcome, ServiceSettings, SessionPrompt, SubmitOutcome};

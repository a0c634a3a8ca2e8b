//! TeamMatch Types - Core types for the TeamMatch service
//!
//! This module defines the data types shared by the store, the matching core
//! and the chat transport.

mod profile;
mod session;

pub use profile::{ExternalUserId, Profile, ProfileField, ProfileId, UnknownField};
pub use session::{PartialProfile, RegistrationSession, RegistrationStep, SessionMode};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a user answered a proposed candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Response {
    Connect,
    Reject,
}

impl Response {
    pub fn as_str(&self) -> &'static str {
        match self {
            Response::Connect => "connect",
            Response::Reject => "reject",
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a response keyword is not recognised
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown response: {0}")]
pub struct UnknownResponse(pub String);

impl FromStr for Response {
    type Err = UnknownResponse;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "connect" => Ok(Response::Connect),
            "reject" => Ok(Response::Reject),
            other => Err(UnknownResponse(other.to_string())),
        }
    }
}

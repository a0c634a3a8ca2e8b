//! Profile and session storage for TeamMatch
//!
//! The matching core only sees the [`ProfileStore`] and [`SessionStore`]
//! traits. Two profile backends ship: an in-memory table and SQLite.

mod error;
mod memory;
mod sqlite;
mod store;

pub use error::StoreError;
pub use memory::{InMemoryProfileStore, InMemorySessionStore};
pub use sqlite::SqliteProfileStore;
pub use store::{ProfileStore, SessionStore};

/// Convenient Result type alias
pub type Result<T> = std::result::Result<T, StoreError>;

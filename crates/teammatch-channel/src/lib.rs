//! Chat channel for TeamMatch
//!
//! [`CommandRouter`] turns an inbound `(user, command | text | button)` into
//! exactly one core operation and returns plain [`Reply`] values. The
//! Telegram adapter only converts updates into [`Inbound`] and renders the
//! replies, so the routing is testable without a bot token.

mod render;
mod router;
mod telegram;
pub mod utils;

pub use router::{Button, CallbackAction, ChatCommand, CommandRouter, Inbound, Reply};
pub use telegram::TelegramService;

//! Discord OAuth authentication
//!
//! Handles:
//! - Discord implicit-grant flow
//! - Session management and its local cache
//! - Authentication middleware

pub mod discord;
pub mod fragment;
mod middleware;
mod oauth;
pub mod session;

pub use discord::{AccessToken, DiscordClient, DiscordUser, ProfileSource};
pub use middleware::{CurrentUser, MaybeUser, require_auth};
pub use oauth::auth_router;
pub use session::{LoginOutcome, Session, SessionManager, SessionSource, SessionState};

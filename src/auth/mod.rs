use crate::state::AppState;
use axum::Router;

pub mod dto;
pub(crate) mod extractors;
pub mod google;
pub mod handlers;
mod jwt;
mod password;
pub mod repo;
pub mod repo_types;

pub use jwt::{Claims, SessionKeys, TokenError};

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "token";
/// Short-lived cookie carrying the OAuth CSRF state across the redirect.
pub const OAUTH_STATE_COOKIE: &str = "oauth_state";

pub fn router(google_enabled: bool) -> Router<AppState> {
    handlers::routes(google_enabled)
}

// ABOUTME: Session extraction helpers for handlers
// ABOUTME: Required and optional variants of "who is the caller"

use crate::{AppState, error, session};
use axum_extra::extract::cookie::CookieJar;
use uuid::Uuid;

pub fn validate_session(jar: &CookieJar, state: &AppState) -> error::Result<session::SessionData> {
    session::extract_session_from_jar(jar, &state.sessions)
}

pub fn current_user_id(jar: &CookieJar, state: &AppState) -> error::Result<Uuid> {
    Ok(validate_session(jar, state)?.user_id)
}

/// Viewer identity for public endpoints: anonymous callers are fine, a
/// stale cookie just reads as anonymous.
pub fn optional_user_id(jar: &CookieJar, state: &AppState) -> Option<Uuid> {
    validate_session(jar, state).ok().map(|s| s.user_id)
}

//! Axum route handlers for the session endpoint.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use axum_extra::extract::cookie::PrivateCookieJar;
use serde_json::{json, Value};

use crate::errors::AppError;
use crate::session::models::{SessionData, SessionUpdate};
use crate::state::AppState;

/// GET /api/session
///
/// Returns the visitor's session, creating a guest session on first visit.
pub async fn handle_get_session(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
) -> Result<(PrivateCookieJar, Json<SessionData>), AppError> {
    let (jar, session) = state.sessions.get_or_create(jar)?;
    Ok((jar, Json(session)))
}

/// POST /api/session
///
/// Merges allow-listed fields from the body into the session.
pub async fn handle_update_session(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(PrivateCookieJar, Json<Value>), AppError> {
    let Json(body) = body.map_err(|rejection| AppError::Validation(rejection.body_text()))?;
    let update = SessionUpdate::from_json(body)?;
    let (jar, _) = state.sessions.update(jar, update)?;
    Ok((jar, Json(json!({ "success": true }))))
}

//! Cookie-backed session store.
//!
//! The whole session is serialized to JSON and sealed into a single private
//! (encrypted + authenticated) cookie. There is no server-side storage, so a
//! write is only as durable as the browser's cookie jar and concurrent tabs
//! race with last-write-wins.

use axum::{http::header, response::IntoResponse};
use axum_extra::extract::cookie::{Cookie, PrivateCookieJar, SameSite};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::session::models::{SessionData, SessionUpdate};

pub const SESSION_COOKIE_NAME: &str = "career-session";
pub const SESSION_MAX_AGE_DAYS: i64 = 7;
/// Browsers drop cookies larger than this (name + value + attributes).
pub const MAX_COOKIE_BYTES: usize = 4096;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Failed to encode session: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Session cookie would be {size} bytes, over the {limit}-byte limit")]
    TooLarge { size: usize, limit: usize },
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    cookie_name: String,
    secure: bool,
    max_age: time::Duration,
}

impl SessionStore {
    pub fn new(secure: bool) -> Self {
        Self {
            cookie_name: SESSION_COOKIE_NAME.to_string(),
            secure,
            max_age: time::Duration::days(SESSION_MAX_AGE_DAYS),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.cookie_secure)
    }

    /// Decodes the session in `jar`. A missing, tampered or undecodable
    /// cookie yields an empty session.
    pub fn load(&self, jar: &PrivateCookieJar) -> SessionData {
        let Some(cookie) = jar.get(&self.cookie_name) else {
            return SessionData::default();
        };
        match serde_json::from_str(cookie.value()) {
            Ok(session) => session,
            Err(e) => {
                warn!("Discarding undecodable session cookie: {e}");
                SessionData::default()
            }
        }
    }

    /// Returns the visitor's session, creating and persisting a guest
    /// session when no identity is present.
    pub fn get_or_create(
        &self,
        jar: PrivateCookieJar,
    ) -> Result<(PrivateCookieJar, SessionData), SessionError> {
        let session = self.load(&jar);
        if session.has_identity() {
            return Ok((jar, session));
        }

        let session = SessionData::new_guest();
        info!(guest_id = session.id().unwrap_or_default(), "Created guest session");
        let jar = self.save(jar, &session)?;
        Ok((jar, session))
    }

    /// Merges `update` into the stored session and persists the result.
    pub fn update(
        &self,
        jar: PrivateCookieJar,
        update: SessionUpdate,
    ) -> Result<(PrivateCookieJar, SessionData), SessionError> {
        let (jar, mut session) = self.get_or_create(jar)?;
        session.apply(update);
        let jar = self.save(jar, &session)?;
        debug!(session_id = session.id().unwrap_or_default(), "Session updated");
        Ok((jar, session))
    }

    fn save(
        &self,
        jar: PrivateCookieJar,
        session: &SessionData,
    ) -> Result<PrivateCookieJar, SessionError> {
        let value = serde_json::to_string(session)?;

        let cookie = Cookie::build((self.cookie_name.clone(), value))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .max_age(self.max_age);
        let jar = jar.add(cookie);

        let size = self.set_cookie_len(&jar);
        if size > MAX_COOKIE_BYTES {
            return Err(SessionError::TooLarge {
                size,
                limit: MAX_COOKIE_BYTES,
            });
        }
        Ok(jar)
    }

    /// Length of the `Set-Cookie` header `jar` will emit for the session,
    /// after sealing and percent-encoding.
    fn set_cookie_len(&self, jar: &PrivateCookieJar) -> usize {
        let prefix = format!("{}=", self.cookie_name);
        let response = jar.clone().into_response();
        response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|value| value.as_bytes())
            .filter(|value| value.starts_with(prefix.as_bytes()))
            .map(<[u8]>::len)
            .max()
            .unwrap_or_default()
    }
}

use anyhow::{Context, Result};
use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use reqwest::Client;

use crate::config::Config;
use crate::session::store::SessionStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Encrypts and authenticates the session cookie.
    pub cookie_key: Key,
    pub sessions: SessionStore,
    /// Client used to forward `/api/*` requests to the backend.
    pub http: Client,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        let cookie_key = Key::derive_from(config.session_secret.as_bytes());
        let sessions = SessionStore::from_config(&config);
        let http = Client::builder()
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            config,
            cookie_key,
            sessions,
            http,
        })
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

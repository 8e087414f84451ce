use anyhow::{bail, Context, Result};

use crate::backend::BackendConfig;

/// Minimum `SESSION_SECRET` length; the cookie key is derived from it.
pub const MIN_SESSION_SECRET_BYTES: usize = 32;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the assessment backend, without a trailing slash.
    pub api_url: String,
    pub session_secret: String,
    /// Mark the session cookie `Secure` (on when `APP_ENV=production`).
    pub cookie_secure: bool,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let session_secret = require_env("SESSION_SECRET")?;
        if session_secret.len() < MIN_SESSION_SECRET_BYTES {
            bail!("SESSION_SECRET must be at least {MIN_SESSION_SECRET_BYTES} bytes long");
        }

        Ok(Config {
            api_url: BackendConfig::from_env().base_url,
            session_secret,
            cookie_secure: std::env::var("APP_ENV").is_ok_and(|env| env == "production"),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

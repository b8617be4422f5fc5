//! Cookie-keyed server-side sessions.
//!
//! The browser only ever holds an opaque random token (`cv_session` cookie);
//! the verification state and the post-submission flash live in a
//! [`store::SessionStore`]. Handlers take a [`Session`] extractor, mutate
//! `data`, and call [`Session::save`] to persist it and refresh the cookie.

pub mod store;

use std::time::Duration;

use axum::{
    extract::FromRequestParts,
    http::{header::SET_COOKIE, request::Parts, HeaderMap, HeaderName},
    response::AppendHeaders,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::{rngs::OsRng, TryRngCore};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;

pub const COOKIE_NAME: &str = "cv_session";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("corrupt session payload: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("session store lock poisoned")]
    Poisoned,
    #[error("could not generate a session token")]
    TokenGeneration,
}

/// One-shot confirmation shown after a successful submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flash {
    pub message: String,
    pub submission_id: Uuid,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    pub verification_email: Option<String>,
    pub verification_code: Option<String>,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub flash: Option<Flash>,
}

pub type SessionCookie = AppendHeaders<[(HeaderName, String); 1]>;

/// The caller's session. A missing or unknown cookie yields an empty session
/// that gets a fresh token when first saved.
#[derive(Debug)]
pub struct Session {
    token: Option<String>,
    pub data: SessionData,
}

impl Session {
    /// Persists the session and returns the `Set-Cookie` header to attach to
    /// the response.
    pub async fn save(self, state: &AppState) -> Result<SessionCookie, AppError> {
        let token = match self.token {
            Some(token) => token,
            None => generate_token()?,
        };
        let ttl = Duration::from_secs(state.config.session_ttl_secs);
        state.sessions.save(&token, &self.data, ttl).await?;
        let cookie = build_cookie(&token, ttl, state.config.session_cookie_secure);
        Ok(AppendHeaders([(SET_COOKIE, cookie)]))
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for Session {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = token_from_cookies(&parts.headers) else {
            return Ok(Session {
                token: None,
                data: SessionData::default(),
            });
        };

        Ok(match state.sessions.load(&token).await? {
            Some(data) => Session {
                token: Some(token),
                data,
            },
            None => Session {
                token: None,
                data: SessionData::default(),
            },
        })
    }
}

/// 256 bits from the OS RNG, URL-safe base64 without padding.
pub fn generate_token() -> Result<String, SessionError> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|_| SessionError::TokenGeneration)?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

pub fn token_from_cookies(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all("cookie")
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|cookie| {
            let (name, value) = cookie.trim().split_once('=')?;
            (name == COOKIE_NAME && !value.is_empty()).then(|| value.to_string())
        })
}

pub fn build_cookie(token: &str, ttl: Duration, secure: bool) -> String {
    let mut cookie = format!(
        "{COOKIE_NAME}={token}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        ttl.as_secs()
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

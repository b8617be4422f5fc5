use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::session::{SessionData, SessionError};

const KEY_PREFIX: &str = "cv_session:";

/// Server-side session storage keyed by the opaque token carried in the
/// session cookie.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, token: &str) -> Result<Option<SessionData>, SessionError>;

    async fn save(&self, token: &str, data: &SessionData, ttl: Duration)
        -> Result<(), SessionError>;
}

/// Redis-backed sessions, one JSON value per token with a sliding TTL.
#[derive(Clone)]
pub struct RedisSessionStore {
    conn: MultiplexedConnection,
}

impl RedisSessionStore {
    pub async fn connect(redis_url: &str) -> Result<Self, SessionError> {
        let client = redis::Client::open(redis_url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        info!("Redis session store connected");
        Ok(Self { conn })
    }
}

fn key(token: &str) -> String {
    format!("{KEY_PREFIX}{token}")
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn load(&self, token: &str) -> Result<Option<SessionData>, SessionError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(key(token)).await?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => {
                debug!("No session stored for presented token");
                Ok(None)
            }
        }
    }

    async fn save(
        &self,
        token: &str,
        data: &SessionData,
        ttl: Duration,
    ) -> Result<(), SessionError> {
        let json = serde_json::to_string(data)?;
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(key(token), json, ttl.as_secs().max(1))
            .await?;
        Ok(())
    }
}

/// Process-local sessions for single-instance deployments and tests.
/// Expired entries read as absent and are swept on every save.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<String, (SessionData, Instant)>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, token: &str) -> Result<Option<SessionData>, SessionError> {
        let sessions = self.sessions.lock().map_err(|_| SessionError::Poisoned)?;
        let now = Instant::now();
        Ok(sessions
            .get(token)
            .filter(|(_, expires_at)| *expires_at > now)
            .map(|(data, _)| data.clone()))
    }

    async fn save(
        &self,
        token: &str,
        data: &SessionData,
        ttl: Duration,
    ) -> Result<(), SessionError> {
        let mut sessions = self.sessions.lock().map_err(|_| SessionError::Poisoned)?;
        let now = Instant::now();
        sessions.retain(|_, (_, expires_at)| *expires_at > now);
        sessions.insert(token.to_string(), (data.clone(), now + ttl));
        Ok(())
    }
}

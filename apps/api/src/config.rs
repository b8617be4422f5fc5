use anyhow::{bail, Context, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionBackend {
    Redis,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MailBackend {
    /// Log messages instead of sending them.
    Log,
    /// POST messages to an HTTP mail relay.
    Http { relay_url: String, token: Option<String> },
}

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: Option<String>,
    pub session_backend: SessionBackend,
    pub session_ttl_secs: u64,
    pub session_cookie_secure: bool,
    pub mail_backend: MailBackend,
    pub mail_from: String,
    /// Enables the `/admin` API when set.
    pub admin_token: Option<String>,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let session_backend = match optional_env("SESSION_BACKEND").as_deref() {
            None | Some("redis") => SessionBackend::Redis,
            Some("memory") => SessionBackend::Memory,
            Some(other) => bail!("SESSION_BACKEND must be 'redis' or 'memory', got '{other}'"),
        };
        let redis_url = match session_backend {
            SessionBackend::Redis => Some(require_env("REDIS_URL")?),
            SessionBackend::Memory => optional_env("REDIS_URL"),
        };

        let mail_backend = match optional_env("MAIL_BACKEND").as_deref() {
            None | Some("log") => MailBackend::Log,
            Some("http") => MailBackend::Http {
                relay_url: require_env("MAIL_RELAY_URL")?,
                token: optional_env("MAIL_RELAY_TOKEN"),
            },
            Some(other) => bail!("MAIL_BACKEND must be 'log' or 'http', got '{other}'"),
        };

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url,
            session_backend,
            session_ttl_secs: optional_env("SESSION_TTL_SECS")
                .unwrap_or_else(|| "1209600".to_string())
                .parse::<u64>()
                .context("SESSION_TTL_SECS must be a whole number of seconds")?,
            session_cookie_secure: parse_flag(optional_env("SESSION_COOKIE_SECURE").as_deref())
                .context("SESSION_COOKIE_SECURE must be true or false")?,
            mail_backend,
            mail_from: optional_env("MAIL_FROM")
                .unwrap_or_else(|| "noreply@abu.edu.ng".to_string()),
            admin_token: optional_env("ADMIN_TOKEN"),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Unset and blank variables both read as `None`.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_flag(value: Option<&str>) -> Result<bool> {
    match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        None | Some("0") | Some("false") | Some("no") => Ok(false),
        Some("1") | Some("true") | Some("yes") => Ok(true),
        Some(other) => bail!("unrecognised flag value '{other}'"),
    }
}

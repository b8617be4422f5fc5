mod admin;
mod config;
mod db;
mod errors;
mod models;
mod repository;
mod routes;
mod session;
mod state;
mod submission;
mod verification;

#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, MailBackend, SessionBackend};
use crate::db::create_pool;
use crate::repository::postgres::PgCvRepository;
use crate::routes::build_router;
use crate::session::store::{MemorySessionStore, RedisSessionStore, SessionStore};
use crate::state::AppState;
use crate::verification::mailer::{HttpMailer, LogMailer, Mailer};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting CV portal API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL (runs migrations)
    let db = create_pool(&config.database_url).await?;
    let repo = Arc::new(PgCvRepository::new(db));

    // Initialize session store
    let sessions: Arc<dyn SessionStore> = match config.session_backend {
        SessionBackend::Redis => {
            let url = config
                .redis_url
                .as_deref()
                .context("REDIS_URL is required for the redis session backend")?;
            Arc::new(RedisSessionStore::connect(url).await?)
        }
        SessionBackend::Memory => {
            warn!("Using in-process session store; sessions are lost on restart");
            Arc::new(MemorySessionStore::new())
        }
    };

    // Initialize mailer
    let mailer: Arc<dyn Mailer> = match &config.mail_backend {
        MailBackend::Log => {
            info!("Mail backend: log");
            Arc::new(LogMailer::new(config.mail_from.clone()))
        }
        MailBackend::Http { relay_url, token } => {
            info!("Mail backend: HTTP relay at {relay_url}");
            Arc::new(HttpMailer::new(
                relay_url.clone(),
                token.clone(),
                config.mail_from.clone(),
            )?)
        }
    };

    if config.admin_token.is_none() {
        info!("ADMIN_TOKEN not set; admin API disabled");
    }

    // Build app state
    let state = AppState {
        repo,
        sessions,
        mailer,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state).layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

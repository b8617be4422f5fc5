use std::sync::Arc;

use crate::config::Config;
use crate::repository::CvRepository;
use crate::session::store::SessionStore;
use crate::verification::mailer::Mailer;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn CvRepository>,
    pub sessions: Arc<dyn SessionStore>,
    pub mailer: Arc<dyn Mailer>,
    pub config: Config,
}

//! Back-office API: units, submissions and per-section listings.
//!
//! Mounted under `/admin` only when `ADMIN_TOKEN` is configured; every
//! request must carry the token in the `x-admin-token` header.

pub mod handlers;

use axum::{
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    routing::{get, patch},
    Router,
};
use tracing::warn;

use crate::errors::AppError;
use crate::state::AppState;

pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

pub async fn require_admin_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(expected) = state.config.admin_token.as_deref() else {
        return Err(AppError::NotFound("Admin API is disabled".to_string()));
    };

    let presented = request
        .headers()
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok());
    if presented != Some(expected) {
        warn!("Rejected admin request to {}", request.uri().path());
        return Err(AppError::Unauthorized);
    }

    Ok(next.run(request).await)
}

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/units",
            get(handlers::handle_list_units).post(handlers::handle_create_unit),
        )
        .route(
            "/units/:id",
            axum::routing::delete(handlers::handle_delete_unit),
        )
        .route("/submissions", get(handlers::handle_list_submissions))
        .route(
            "/submissions/:id",
            get(handlers::handle_get_submission).delete(handlers::handle_delete_submission),
        )
        .route(
            "/submissions/:id/status",
            patch(handlers::handle_update_status),
        )
        .route("/sections/:section", get(handlers::handle_list_section))
        .route_layer(middleware::from_fn_with_state(state, require_admin_token))
}

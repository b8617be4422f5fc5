pub mod health;

use axum::{routing::get, Router};

use crate::admin;
use crate::state::AppState;
use crate::submission::handlers as submission;
use crate::verification::handlers as verification;

pub fn build_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/health", get(health::health_handler))
        // Email verification
        .route(
            "/",
            get(verification::handle_email_form).post(verification::handle_request_code),
        )
        .route(
            "/verify-code/",
            get(verification::handle_code_form).post(verification::handle_verify_code),
        )
        // Submission
        .route(
            "/cv_submission/",
            get(submission::handle_submission_form).post(submission::handle_submit),
        )
        .route("/success/", get(submission::handle_success));

    if state.config.admin_token.is_some() {
        router = router.nest("/admin", admin::router(state.clone()));
    }

    router.with_state(state)
}

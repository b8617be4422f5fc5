use axum::{
    extract::{rejection::JsonRejection, State},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde_json::json;
use tracing::info;

use crate::errors::AppError;
use crate::repository::UnitFilter;
use crate::session::{Flash, Session};
use crate::state::AppState;
use crate::submission::form::submission_form;
use crate::submission::orchestrator::{submit_cv, SubmitError};
use crate::submission::payload::SubmissionPayload;
use crate::verification::machine;

pub const SUCCESS_MESSAGE: &str = "CV submitted successfully!";

/// GET /cv_submission/
pub async fn handle_submission_form(
    State(state): State<AppState>,
    session: Session,
) -> Result<Response, AppError> {
    let Some(email) = machine::verified_email(&session.data) else {
        return Ok(Redirect::to("/").into_response());
    };
    let units = state.repo.list_units(&UnitFilter::default()).await?;
    Ok(Json(submission_form(email, units)).into_response())
}

/// POST /cv_submission/
/// Unverified sessions are sent back to `/` before the body is looked at.
pub async fn handle_submit(
    State(state): State<AppState>,
    mut session: Session,
    body: Result<Json<SubmissionPayload>, JsonRejection>,
) -> Result<Response, AppError> {
    let Some(email) = machine::verified_email(&session.data).map(str::to_owned) else {
        info!("Submission attempted without a verified session");
        return Ok(Redirect::to("/").into_response());
    };
    let Json(payload) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let row = match submit_cv(state.repo.as_ref(), &email, &payload).await {
        Ok(row) => row,
        Err(SubmitError::Invalid(errors)) => return Err(AppError::validation(errors, &payload)),
        Err(SubmitError::Repository(e)) => return Err(e.into()),
    };

    session.data.flash = Some(Flash {
        message: SUCCESS_MESSAGE.to_string(),
        submission_id: row.id,
    });
    let cookie = session.save(&state).await?;
    Ok((cookie, Redirect::to("/success/")).into_response())
}

/// GET /success/
/// Shows the pending flash once, then clears it.
pub async fn handle_success(
    State(state): State<AppState>,
    mut session: Session,
) -> Result<Response, AppError> {
    let Some(flash) = session.data.flash.take() else {
        return Ok(Json(json!({ "page": "success", "flash": null })).into_response());
    };
    let cookie = session.save(&state).await?;
    Ok((cookie, Json(json!({ "page": "success", "flash": flash }))).into_response())
}

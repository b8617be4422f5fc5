use axum::{
    extract::{rejection::JsonRejection, State},
    response::Redirect,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::errors::AppError;
use crate::session::{Session, SessionCookie};
use crate::state::AppState;
use crate::submission::validation::{self, FieldErrors, EMAIL_MAX_LEN};
use crate::verification::code::{generate_code, CODE_LEN};
use crate::verification::machine;
use crate::verification::mailer::{verification_body, VERIFICATION_SUBJECT};

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct EmailForm {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CodeForm {
    #[serde(default)]
    pub verification_code: String,
}

/// GET /
pub async fn handle_email_form() -> Json<Value> {
    Json(json!({
        "form": "email_verification",
        "action": "/",
        "method": "POST",
        "fields": [{
            "name": "email",
            "type": "email",
            "label": "Email",
            "required": true,
            "max_length": EMAIL_MAX_LEN,
        }],
    }))
}

/// POST /
/// Issues a code to the submitted address and moves the session to
/// `CodeIssued`. The session is only saved once the mail has gone out.
pub async fn handle_request_code(
    State(state): State<AppState>,
    mut session: Session,
    body: Result<Json<EmailForm>, JsonRejection>,
) -> Result<(SessionCookie, Redirect), AppError> {
    let Json(form) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let mut errors = FieldErrors::new();
    let email = validation::email(&mut errors, "email", &form.email);
    if !errors.is_empty() {
        return Err(AppError::validation(errors, &form));
    }

    let code = generate_code();
    state
        .mailer
        .send(&email, VERIFICATION_SUBJECT, &verification_body(&code))
        .await?;

    info!("Issued verification code to {email}");
    machine::issue_code(&mut session.data, email, code);
    let cookie = session.save(&state).await?;
    Ok((cookie, Redirect::to("/verify-code/")))
}

/// GET /verify-code/
pub async fn handle_code_form(session: Session) -> Json<Value> {
    Json(json!({
        "form": "code_verification",
        "action": "/verify-code/",
        "method": "POST",
        "sent_to": session.data.verification_email,
        "fields": [{
            "name": "verification_code",
            "type": "text",
            "label": "Verification code",
            "required": true,
            "max_length": CODE_LEN,
        }],
    }))
}

/// POST /verify-code/
pub async fn handle_verify_code(
    State(state): State<AppState>,
    mut session: Session,
    body: Result<Json<CodeForm>, JsonRejection>,
) -> Result<(SessionCookie, Redirect), AppError> {
    let Json(form) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let mut errors = FieldErrors::new();
    validation::required_text(
        &mut errors,
        "verification_code",
        &form.verification_code,
        CODE_LEN,
    );
    if !errors.is_empty() {
        return Err(AppError::validation(errors, &form));
    }

    // Compared as submitted, surrounding whitespace included.
    if !machine::submit_code(&mut session.data, &form.verification_code) {
        info!("Rejected verification code attempt");
        return Err(AppError::InvalidCode);
    }

    if let Some(email) = machine::verified_email(&session.data) {
        info!("Verified email {email}");
    }
    let cookie = session.save(&state).await?;
    Ok((cookie, Redirect::to("/cv_submission/")))
}

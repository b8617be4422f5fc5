use std::collections::BTreeMap;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::choices::{AgeBracket, SubmissionStatus, UnitType};
use crate::models::sections::SectionKind;
use crate::models::submission::{SubmissionDetail, SubmissionRow};
use crate::models::unit::{NewUnit, UnitRow};
use crate::repository::listing::SectionQuery;
use crate::repository::{RepositoryError, SubmissionFilter, UnitFilter};
use crate::state::AppState;
use crate::submission::orchestrator::INVALID_UNIT;
use crate::submission::validation::{choice, push, required_text, FieldErrors};

pub const DUPLICATE_UNIT_NAME: &str = "Unit with this Name already exists.";

fn check_filter(name: &str, value: Option<&str>, valid: fn(&str) -> bool) -> Result<(), AppError> {
    match value {
        Some(v) if !v.is_empty() && !valid(v) => Err(AppError::BadRequest(format!(
            "Unknown value '{v}' for filter '{name}'"
        ))),
        _ => Ok(()),
    }
}

/// Blank filter values mean "no filter", as in a cleared select box.
fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// GET /admin/units
pub async fn handle_list_units(
    State(state): State<AppState>,
    Query(filter): Query<UnitFilter>,
) -> Result<Json<Vec<UnitRow>>, AppError> {
    check_filter("unit_type", filter.unit_type.as_deref(), |v| {
        UnitType::parse(v).is_some()
    })?;
    let filter = UnitFilter {
        search: filter.search,
        unit_type: non_blank(filter.unit_type),
    };
    Ok(Json(state.repo.list_units(&filter).await?))
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UnitForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub unit_type: String,
    #[serde(default)]
    pub parent: Option<Uuid>,
}

/// POST /admin/units
pub async fn handle_create_unit(
    State(state): State<AppState>,
    body: Result<Json<UnitForm>, JsonRejection>,
) -> Result<(StatusCode, Json<UnitRow>), AppError> {
    let Json(form) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let mut errors = FieldErrors::new();
    let name = required_text(&mut errors, "name", &form.name, 200);
    let unit_type = choice(&mut errors, "unit_type", &form.unit_type, UnitType::parse);
    if let Some(parent) = form.parent {
        if !state.repo.unit_exists(parent).await? {
            push(&mut errors, "parent", INVALID_UNIT);
        }
    }
    let Some(unit_type) = unit_type.filter(|_| errors.is_empty()) else {
        return Err(AppError::validation(errors, &form));
    };

    let unit = NewUnit {
        name,
        unit_type,
        parent_id: form.parent,
    };
    match state.repo.create_unit(&unit).await {
        Ok(row) => Ok((StatusCode::CREATED, Json(row))),
        Err(RepositoryError::Duplicate(_)) => {
            Err(AppError::field("name", DUPLICATE_UNIT_NAME, &form))
        }
        // The parent was removed after the existence check.
        Err(RepositoryError::Integrity(_)) => Err(AppError::field("parent", INVALID_UNIT, &form)),
        Err(e) => Err(e.into()),
    }
}

/// DELETE /admin/units/:id
pub async fn handle_delete_unit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if !state.repo.delete_unit(id).await? {
        return Err(AppError::NotFound(format!("Unit {id} not found")));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// GET /admin/submissions
pub async fn handle_list_submissions(
    State(state): State<AppState>,
    Query(filter): Query<SubmissionFilter>,
) -> Result<Json<Vec<SubmissionRow>>, AppError> {
    check_filter("status", filter.status.as_deref(), |v| {
        SubmissionStatus::parse(v).is_some()
    })?;
    check_filter("age_bracket", filter.age_bracket.as_deref(), |v| {
        AgeBracket::parse(v).is_some()
    })?;
    let filter = SubmissionFilter {
        search: filter.search,
        status: non_blank(filter.status),
        age_bracket: non_blank(filter.age_bracket),
        unit: filter.unit,
    };
    Ok(Json(state.repo.list_submissions(&filter).await?))
}

/// GET /admin/submissions/:id
pub async fn handle_get_submission(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SubmissionDetail>, AppError> {
    state
        .repo
        .fetch_submission(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Submission {id} not found")))
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct StatusForm {
    #[serde(default)]
    pub status: String,
}

/// PATCH /admin/submissions/:id/status
pub async fn handle_update_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Result<Json<StatusForm>, JsonRejection>,
) -> Result<Json<SubmissionRow>, AppError> {
    let Json(form) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let mut errors = FieldErrors::new();
    let Some(status) = choice(&mut errors, "status", &form.status, SubmissionStatus::parse) else {
        return Err(AppError::validation(errors, &form));
    };

    let row = state
        .repo
        .update_status(id, status)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Submission {id} not found")))?;
    info!("Submission {id} moved to {status}");
    Ok(Json(row))
}

/// DELETE /admin/submissions/:id
pub async fn handle_delete_submission(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if !state.repo.delete_submission(id).await? {
        return Err(AppError::NotFound(format!("Submission {id} not found")));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// GET /admin/sections/:section
pub async fn handle_list_section(
    State(state): State<AppState>,
    Path(section): Path<String>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Result<Json<Vec<Value>>, AppError> {
    let kind = SectionKind::from_key(&section)
        .ok_or_else(|| AppError::NotFound(format!("Unknown section '{section}'")))?;
    let query = SectionQuery::from_params(kind, &params).map_err(AppError::BadRequest)?;
    Ok(Json(state.repo.list_section(kind, &query).await?))
}

//! Submission orchestration: validate the profile and all eleven sections as
//! one unit, then hand the whole graph to the repository for a single atomic
//! insert.

use std::collections::HashSet;

use tracing::info;

use crate::models::sections::{NewSections, SectionKind};
use crate::models::submission::{NewSubmission, SubmissionRow};
use crate::repository::{CvRepository, RepositoryError};
use crate::submission::payload::{RowForm, SubmissionPayload};
use crate::submission::validation::{push, SectionErrors, ValidationErrors};

pub const INVALID_UNIT: &str =
    "Select a valid choice. That choice is not one of the available choices.";
pub const DUPLICATE_LANGUAGE: &str =
    "Please correct the duplicate data for language, which must be unique.";

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("submission is invalid")]
    Invalid(ValidationErrors),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Validates one section's rows. Rows flagged for deletion are dropped
/// before counting and validation.
pub fn validate_rows<F: RowForm>(
    rows: &[F],
    max_rows: Option<usize>,
) -> Result<Vec<F::Valid>, SectionErrors> {
    let mut errors = SectionErrors::default();
    let mut valid = Vec::with_capacity(rows.len());

    let live = rows
        .iter()
        .enumerate()
        .filter(|(_, row)| !row.marked_for_deletion());

    let mut live_count = 0;
    for (index, row) in live {
        live_count += 1;
        match row.validate() {
            Ok(v) => valid.push(v),
            Err(field_errors) => {
                errors.rows.insert(index, field_errors);
            }
        }
    }

    if let Some(max) = max_rows {
        if live_count > max {
            errors
                .non_row
                .push(format!("Please submit at most {max} forms."));
        }
    }

    if errors.is_empty() {
        Ok(valid)
    } else {
        Err(errors)
    }
}

/// Flags every language row whose name repeats an earlier live row.
fn check_unique_languages(payload: &SubmissionPayload, errors: &mut SectionErrors) {
    let mut seen = HashSet::new();
    for (index, row) in payload.language.iter().enumerate() {
        if row.delete {
            continue;
        }
        let language = row.language.trim();
        if language.is_empty() {
            continue;
        }
        if !seen.insert(language) {
            let row_errors = errors.rows.entry(index).or_default();
            push(row_errors, "language", DUPLICATE_LANGUAGE);
        }
    }
}

/// Collects a section's result into `sections` or `errors`.
fn collect<T>(
    kind: SectionKind,
    result: Result<Vec<T>, SectionErrors>,
    errors: &mut ValidationErrors,
) -> Vec<T> {
    match result {
        Ok(rows) => rows,
        Err(section_errors) => {
            errors.add_section(kind.key(), section_errors);
            Vec::new()
        }
    }
}

/// Pure validation of the whole payload. Every failure in the profile and in
/// every section is reported together.
pub fn validate_submission(payload: &SubmissionPayload) -> Result<NewSubmission, ValidationErrors> {
    let mut errors = ValidationErrors::default();

    let profile = match payload.profile.validate() {
        Ok(profile) => Some(profile),
        Err(field_errors) => {
            errors.root = field_errors;
            None
        }
    };

    let mut language_result = validate_rows(&payload.language, SectionKind::Language.max_rows());
    let mut duplicate_errors = SectionErrors::default();
    check_unique_languages(payload, &mut duplicate_errors);
    if !duplicate_errors.is_empty() {
        let mut merged = language_result.err().unwrap_or_default();
        for (index, field_errors) in duplicate_errors.rows {
            let row = merged.rows.entry(index).or_default();
            for (field, messages) in field_errors {
                row.entry(field).or_default().extend(messages);
            }
        }
        language_result = Err(merged);
    }

    let sections = NewSections {
        languages: collect(SectionKind::Language, language_result, &mut errors),
        educations: collect(
            SectionKind::Education,
            validate_rows(&payload.education, SectionKind::Education.max_rows()),
            &mut errors,
        ),
        trainings: collect(
            SectionKind::Training,
            validate_rows(&payload.training, SectionKind::Training.max_rows()),
            &mut errors,
        ),
        computer_skills: collect(
            SectionKind::Computer,
            validate_rows(&payload.computer, SectionKind::Computer.max_rows()),
            &mut errors,
        ),
        research_areas: collect(
            SectionKind::Research,
            validate_rows(&payload.research, SectionKind::Research.max_rows()),
            &mut errors,
        ),
        patents: collect(
            SectionKind::Patent,
            validate_rows(&payload.patent, SectionKind::Patent.max_rows()),
            &mut errors,
        ),
        grants: collect(
            SectionKind::Grant,
            validate_rows(&payload.grant, SectionKind::Grant.max_rows()),
            &mut errors,
        ),
        awards: collect(
            SectionKind::Award,
            validate_rows(&payload.award, SectionKind::Award.max_rows()),
            &mut errors,
        ),
        memberships: collect(
            SectionKind::Membership,
            validate_rows(&payload.membership, SectionKind::Membership.max_rows()),
            &mut errors,
        ),
        projects: collect(
            SectionKind::Project,
            validate_rows(&payload.project, SectionKind::Project.max_rows()),
            &mut errors,
        ),
        other_institutions: collect(
            SectionKind::Institution,
            validate_rows(&payload.institution, SectionKind::Institution.max_rows()),
            &mut errors,
        ),
    };

    match profile {
        Some(profile) if errors.is_empty() => Ok(NewSubmission {
            name: profile.name,
            phone: profile.phone,
            unit_id: profile.unit_id,
            age_bracket: profile.age_bracket,
            sections,
        }),
        _ => Err(errors),
    }
}

/// Validates `payload` and, when everything passes, persists the submission
/// under `verified_email` in one transaction.
pub async fn submit_cv(
    repo: &dyn CvRepository,
    verified_email: &str,
    payload: &SubmissionPayload,
) -> Result<SubmissionRow, SubmitError> {
    let validated = validate_submission(payload);

    // The unit reference is checked alongside the field rules so its error
    // is reported with the rest.
    let unit_ok = match payload.profile.unit {
        Some(unit_id) => repo.unit_exists(unit_id).await?,
        None => true,
    };

    let submission = match (validated, unit_ok) {
        (Ok(submission), true) => submission,
        (Ok(_), false) => {
            let mut errors = ValidationErrors::default();
            errors.add_root("unit", INVALID_UNIT);
            return Err(SubmitError::Invalid(errors));
        }
        (Err(mut errors), unit_ok) => {
            if !unit_ok {
                errors.add_root("unit", INVALID_UNIT);
            }
            return Err(SubmitError::Invalid(errors));
        }
    };

    let row = repo.insert_submission(verified_email, &submission).await?;
    info!(
        "Persisted CV submission {} with {} child rows",
        row.id,
        SectionKind::ALL
            .iter()
            .map(|k| submission.sections.len_of(*k))
            .sum::<usize>()
    );
    Ok(row)
}

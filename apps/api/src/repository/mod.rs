//! Storage boundary for the CV record graph.
//!
//! `AppState` carries an `Arc<dyn CvRepository>`; production uses
//! [`postgres::PgCvRepository`], handler tests use the in-memory store.
//! Both enforce the same referential rules: deleting a submission removes
//! its eleven collections, deleting a unit clears references to it.

pub mod listing;
#[cfg(test)]
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::models::choices::SubmissionStatus;
use crate::models::sections::SectionKind;
use crate::models::submission::{NewSubmission, SubmissionDetail, SubmissionRow};
use crate::models::unit::{NewUnit, UnitRow};
use listing::SectionQuery;

#[derive(Debug, Error)]
pub enum RepositoryError {
    /// A unique constraint rejected the write.
    #[error("duplicate value: {0}")]
    Duplicate(String),
    /// A foreign-key or check constraint rejected the write.
    #[error("constraint violation: {0}")]
    Integrity(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UnitFilter {
    pub search: Option<String>,
    pub unit_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmissionFilter {
    pub search: Option<String>,
    pub status: Option<String>,
    pub age_bracket: Option<String>,
    pub unit: Option<Uuid>,
}

#[async_trait]
pub trait CvRepository: Send + Sync {
    /// Units ordered by name.
    async fn list_units(&self, filter: &UnitFilter) -> Result<Vec<UnitRow>, RepositoryError>;

    async fn unit_exists(&self, id: Uuid) -> Result<bool, RepositoryError>;

    async fn create_unit(&self, unit: &NewUnit) -> Result<UnitRow, RepositoryError>;

    /// Deletes a unit, clearing the reference held by submissions and by
    /// child units. Returns `false` when no such unit exists.
    async fn delete_unit(&self, id: Uuid) -> Result<bool, RepositoryError>;

    /// Inserts the root row and every section row atomically.
    async fn insert_submission(
        &self,
        email: &str,
        submission: &NewSubmission,
    ) -> Result<SubmissionRow, RepositoryError>;

    async fn fetch_submission(&self, id: Uuid)
        -> Result<Option<SubmissionDetail>, RepositoryError>;

    /// Submissions newest first.
    async fn list_submissions(
        &self,
        filter: &SubmissionFilter,
    ) -> Result<Vec<SubmissionRow>, RepositoryError>;

    async fn update_status(
        &self,
        id: Uuid,
        status: SubmissionStatus,
    ) -> Result<Option<SubmissionRow>, RepositoryError>;

    /// Deletes a submission together with all of its section rows.
    async fn delete_submission(&self, id: Uuid) -> Result<bool, RepositoryError>;

    /// Generic list over one section: each row as a JSON object carrying an
    /// extra `submission_name` field.
    async fn list_section(
        &self,
        kind: SectionKind,
        query: &SectionQuery,
    ) -> Result<Vec<Value>, RepositoryError>;
}

/// Escapes `%`, `_` and `\` and wraps the term for a substring `ILIKE`.
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Non-blank, trimmed search term.
pub fn search_term(search: Option<&str>) -> Option<&str> {
    search.map(str::trim).filter(|s| !s.is_empty())
}

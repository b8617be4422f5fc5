use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::choices::AgeBracket;
use crate::models::sections::{NewSections, SectionRows};

/// Root record of one CV submission.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct SubmissionRow {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub unit_id: Option<Uuid>,
    pub age_bracket: String,
    pub status: String,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A fully validated submission, ready to persist. The email of record is
/// supplied separately from the verified session.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSubmission {
    pub name: String,
    pub phone: String,
    pub unit_id: Option<Uuid>,
    pub age_bracket: AgeBracket,
    pub sections: NewSections,
}

/// A submission with all eleven collections, as shown in the back office.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SubmissionDetail {
    #[serde(flatten)]
    pub submission: SubmissionRow,
    pub sections: SectionRows,
}

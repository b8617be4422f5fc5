//! In-memory repository for handler tests. Mirrors the Postgres rules:
//! unique unit names, unique language per submission, unit references must
//! exist, cascade on submission delete, set-null on unit delete.

use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::models::choices::SubmissionStatus;
use crate::models::sections::{SectionKind, SectionRows};
use crate::models::submission::{NewSubmission, SubmissionDetail, SubmissionRow};
use crate::models::unit::{NewUnit, UnitRow};
use crate::repository::listing::{listing_spec, FilterValue, SectionQuery};
use crate::repository::{search_term, CvRepository, RepositoryError, SubmissionFilter, UnitFilter};

#[derive(Default)]
struct Tables {
    units: BTreeMap<Uuid, UnitRow>,
    submissions: BTreeMap<Uuid, SubmissionRow>,
    sections: BTreeMap<Uuid, SectionRows>,
}

#[derive(Default)]
pub struct MemoryCvRepository {
    tables: Mutex<Tables>,
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn to_values<T: Serialize>(rows: &[T], submission_name: &str) -> Vec<Value> {
    rows.iter()
        .filter_map(|row| serde_json::to_value(row).ok())
        .map(|mut value| {
            if let Value::Object(map) = &mut value {
                map.insert(
                    "submission_name".to_string(),
                    Value::String(submission_name.to_string()),
                );
            }
            value
        })
        .collect()
}

fn section_values(rows: &SectionRows, kind: SectionKind, submission_name: &str) -> Vec<Value> {
    match kind {
        SectionKind::Language => to_values(&rows.languages, submission_name),
        SectionKind::Computer => to_values(&rows.computer_skills, submission_name),
        SectionKind::Education => to_values(&rows.educations, submission_name),
        SectionKind::Membership => to_values(&rows.memberships, submission_name),
        SectionKind::Research => to_values(&rows.research_areas, submission_name),
        SectionKind::Training => to_values(&rows.trainings, submission_name),
        SectionKind::Project => to_values(&rows.projects, submission_name),
        SectionKind::Award => to_values(&rows.awards, submission_name),
        SectionKind::Patent => to_values(&rows.patents, submission_name),
        SectionKind::Grant => to_values(&rows.grants, submission_name),
        SectionKind::Institution => to_values(&rows.other_institutions, submission_name),
    }
}

impl MemoryCvRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submission_count(&self) -> usize {
        self.tables.lock().unwrap().submissions.len()
    }

    /// Number of stored rows of `kind` across all submissions.
    pub fn section_count(&self, kind: SectionKind) -> usize {
        self.tables
            .lock()
            .unwrap()
            .sections
            .values()
            .map(|rows| rows.len_of(kind))
            .sum()
    }
}

#[async_trait]
impl CvRepository for MemoryCvRepository {
    async fn list_units(&self, filter: &UnitFilter) -> Result<Vec<UnitRow>, RepositoryError> {
        let tables = self.tables.lock().unwrap();
        let term = search_term(filter.search.as_deref());
        let mut units: Vec<UnitRow> = tables
            .units
            .values()
            .filter(|u| term.map_or(true, |t| contains_ci(&u.name, t)))
            .filter(|u| filter.unit_type.as_ref().map_or(true, |t| &u.unit_type == t))
            .cloned()
            .collect();
        units.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(units)
    }

    async fn unit_exists(&self, id: Uuid) -> Result<bool, RepositoryError> {
        Ok(self.tables.lock().unwrap().units.contains_key(&id))
    }

    async fn create_unit(&self, unit: &NewUnit) -> Result<UnitRow, RepositoryError> {
        let mut tables = self.tables.lock().unwrap();
        if tables.units.values().any(|u| u.name == unit.name) {
            return Err(RepositoryError::Duplicate(format!(
                "duplicate unit name {}",
                unit.name
            )));
        }
        if let Some(parent) = unit.parent_id {
            if !tables.units.contains_key(&parent) {
                return Err(RepositoryError::Integrity(format!("unknown parent unit {parent}")));
            }
        }
        let row = unit.to_row(Uuid::new_v4());
        tables.units.insert(row.id, row.clone());
        Ok(row)
    }

    async fn delete_unit(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let mut tables = self.tables.lock().unwrap();
        for submission in tables.submissions.values_mut() {
            if submission.unit_id == Some(id) {
                submission.unit_id = None;
            }
        }
        for unit in tables.units.values_mut() {
            if unit.parent_id == Some(id) {
                unit.parent_id = None;
            }
        }
        Ok(tables.units.remove(&id).is_some())
    }

    async fn insert_submission(
        &self,
        email: &str,
        submission: &NewSubmission,
    ) -> Result<SubmissionRow, RepositoryError> {
        let mut tables = self.tables.lock().unwrap();

        // Stage and check everything before touching the tables.
        if let Some(unit_id) = submission.unit_id {
            if !tables.units.contains_key(&unit_id) {
                return Err(RepositoryError::Integrity(format!("unknown unit {unit_id}")));
            }
        }
        let mut languages = HashSet::new();
        for skill in &submission.sections.languages {
            if !languages.insert(skill.language.as_str()) {
                return Err(RepositoryError::Duplicate(format!(
                    "duplicate language {}",
                    skill.language
                )));
            }
        }

        let now = Utc::now();
        let row = SubmissionRow {
            id: Uuid::new_v4(),
            name: submission.name.clone(),
            phone: submission.phone.clone(),
            email: email.to_string(),
            unit_id: submission.unit_id,
            age_bracket: submission.age_bracket.as_str().to_string(),
            status: SubmissionStatus::default().as_str().to_string(),
            submitted_at: now,
            updated_at: now,
        };
        let sections = SectionRows::from_new(row.id, &submission.sections);

        tables.submissions.insert(row.id, row.clone());
        tables.sections.insert(row.id, sections);
        Ok(row)
    }

    async fn fetch_submission(
        &self,
        id: Uuid,
    ) -> Result<Option<SubmissionDetail>, RepositoryError> {
        let tables = self.tables.lock().unwrap();
        let Some(submission) = tables.submissions.get(&id).cloned() else {
            return Ok(None);
        };
        let mut sections = tables.sections.get(&id).cloned().unwrap_or_default();
        sections.sort_for_display();
        Ok(Some(SubmissionDetail {
            submission,
            sections,
        }))
    }

    async fn list_submissions(
        &self,
        filter: &SubmissionFilter,
    ) -> Result<Vec<SubmissionRow>, RepositoryError> {
        let tables = self.tables.lock().unwrap();
        let term = search_term(filter.search.as_deref());
        let mut rows: Vec<SubmissionRow> = tables
            .submissions
            .values()
            .filter(|s| {
                term.map_or(true, |t| {
                    contains_ci(&s.name, t) || contains_ci(&s.email, t) || contains_ci(&s.phone, t)
                })
            })
            .filter(|s| filter.status.as_ref().map_or(true, |v| &s.status == v))
            .filter(|s| filter.age_bracket.as_ref().map_or(true, |v| &s.age_bracket == v))
            .filter(|s| filter.unit.map_or(true, |u| s.unit_id == Some(u)))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(rows)
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: SubmissionStatus,
    ) -> Result<Option<SubmissionRow>, RepositoryError> {
        let mut tables = self.tables.lock().unwrap();
        Ok(tables.submissions.get_mut(&id).map(|row| {
            row.status = status.as_str().to_string();
            row.updated_at = Utc::now();
            row.clone()
        }))
    }

    async fn delete_submission(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let mut tables = self.tables.lock().unwrap();
        tables.sections.remove(&id);
        Ok(tables.submissions.remove(&id).is_some())
    }

    async fn list_section(
        &self,
        kind: SectionKind,
        query: &SectionQuery,
    ) -> Result<Vec<Value>, RepositoryError> {
        let tables = self.tables.lock().unwrap();
        let spec = listing_spec(kind);
        let term = search_term(query.search.as_deref());

        let mut rows: Vec<Value> = tables
            .sections
            .iter()
            .filter_map(|(id, rows)| {
                let name = &tables.submissions.get(id)?.name;
                Some(section_values(rows, kind, name))
            })
            .flatten()
            .filter(|row| {
                term.map_or(true, |t| {
                    std::iter::once("submission_name")
                        .chain(spec.search.iter().copied())
                        .any(|column| row[column].as_str().is_some_and(|v| contains_ci(v, t)))
                })
            })
            .filter(|row| {
                query.filters.iter().all(|(column, value)| match value {
                    FilterValue::Int(v) => row[*column].as_i64() == Some(i64::from(*v)),
                    FilterValue::Text(v) => row[*column].as_str() == Some(v.as_str()),
                })
            })
            .collect();

        let by_year = kind.ordered_by_year();
        rows.sort_by(|a, b| {
            let year = if by_year {
                b["year"].as_i64().cmp(&a["year"].as_i64())
            } else {
                std::cmp::Ordering::Equal
            };
            year.then_with(|| {
                a["submission_name"]
                    .as_str()
                    .cmp(&b["submission_name"].as_str())
            })
            .then_with(|| a["position"].as_i64().cmp(&b["position"].as_i64()))
        });
        Ok(rows)
    }
}

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::query_builder::Separated;
use sqlx::{FromRow, PgConnection, PgPool, Postgres, QueryBuilder, Row};
use tracing::info;
use uuid::Uuid;

use crate::models::choices::SubmissionStatus;
use crate::models::sections::{SectionKind, SectionRows};
use crate::models::submission::{NewSubmission, SubmissionDetail, SubmissionRow};
use crate::models::unit::{NewUnit, UnitRow};
use crate::repository::listing::{listing_spec, FilterValue, SectionQuery};
use crate::repository::{
    like_pattern, search_term, CvRepository, RepositoryError, SubmissionFilter, UnitFilter,
};

/// Postgres-backed repository. Every multi-statement write runs inside one
/// transaction; an early return drops the transaction and rolls it back.
#[derive(Clone)]
pub struct PgCvRepository {
    pool: PgPool,
}

impl PgCvRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_section<T>(&self, kind: SectionKind, submission_id: Uuid) -> Result<Vec<T>, RepositoryError>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let order = if kind.ordered_by_year() {
            "year DESC, position"
        } else {
            "position"
        };
        let sql = format!(
            "SELECT * FROM {} WHERE submission_id = $1 ORDER BY {order}",
            kind.table()
        );
        Ok(sqlx::query_as::<_, T>(&sql)
            .bind(submission_id)
            .fetch_all(&self.pool)
            .await?)
    }
}

/// Maps constraint violations to `Integrity`; everything else stays a
/// database error.
fn classify(err: sqlx::Error) -> RepositoryError {
    if let Some(db) = err.as_database_error() {
        match db.code().as_deref() {
            // unique_violation
            Some("23505") => return RepositoryError::Duplicate(db.message().to_string()),
            // foreign_key_violation, check_violation
            Some("23503" | "23514") => {
                return RepositoryError::Integrity(db.message().to_string())
            }
            _ => {}
        }
    }
    RepositoryError::Database(err)
}

/// Multi-row insert of one section. No-op for an empty section.
async fn insert_rows<'a, T, F>(
    conn: &mut PgConnection,
    head: &str,
    rows: &'a [T],
    push_row: F,
) -> Result<(), RepositoryError>
where
    T: Sync,
    F: FnMut(Separated<'_, 'a, Postgres, &'static str>, &'a T),
{
    if rows.is_empty() {
        return Ok(());
    }
    let mut builder: QueryBuilder<'a, Postgres> = QueryBuilder::new(head);
    builder.push_values(rows, push_row);
    builder.build().execute(conn).await.map_err(classify)?;
    Ok(())
}

async fn insert_sections(conn: &mut PgConnection, rows: &SectionRows) -> Result<(), RepositoryError> {
    insert_rows(
        conn,
        "INSERT INTO language_skills (id, submission_id, position, language, proficiency) ",
        &rows.languages,
        |mut b, r| {
            b.push_bind(r.id)
                .push_bind(r.submission_id)
                .push_bind(r.position)
                .push_bind(r.language.clone())
                .push_bind(r.proficiency.clone());
        },
    )
    .await?;

    insert_rows(
        conn,
        "INSERT INTO computer_skills (id, submission_id, position, skill, proficiency) ",
        &rows.computer_skills,
        |mut b, r| {
            b.push_bind(r.id)
                .push_bind(r.submission_id)
                .push_bind(r.position)
                .push_bind(r.skill.clone())
                .push_bind(r.proficiency.clone());
        },
    )
    .await?;

    insert_rows(
        conn,
        "INSERT INTO educations (id, submission_id, position, institution, degree, year) ",
        &rows.educations,
        |mut b, r| {
            b.push_bind(r.id)
                .push_bind(r.submission_id)
                .push_bind(r.position)
                .push_bind(r.institution.clone())
                .push_bind(r.degree.clone())
                .push_bind(r.year);
        },
    )
    .await?;

    insert_rows(
        conn,
        "INSERT INTO professional_memberships \
         (id, submission_id, position, organization, membership_type, year_joined) ",
        &rows.memberships,
        |mut b, r| {
            b.push_bind(r.id)
                .push_bind(r.submission_id)
                .push_bind(r.position)
                .push_bind(r.organization.clone())
                .push_bind(r.membership_type.clone())
                .push_bind(r.year_joined);
        },
    )
    .await?;

    insert_rows(
        conn,
        "INSERT INTO research_areas (id, submission_id, position, area) ",
        &rows.research_areas,
        |mut b, r| {
            b.push_bind(r.id)
                .push_bind(r.submission_id)
                .push_bind(r.position)
                .push_bind(r.area.clone());
        },
    )
    .await?;

    insert_rows(
        conn,
        "INSERT INTO trainings (id, submission_id, position, title, institution, year) ",
        &rows.trainings,
        |mut b, r| {
            b.push_bind(r.id)
                .push_bind(r.submission_id)
                .push_bind(r.position)
                .push_bind(r.title.clone())
                .push_bind(r.institution.clone())
                .push_bind(r.year);
        },
    )
    .await?;

    insert_rows(
        conn,
        "INSERT INTO professional_projects \
         (id, submission_id, position, title, role, description, start_year, end_year) ",
        &rows.projects,
        |mut b, r| {
            b.push_bind(r.id)
                .push_bind(r.submission_id)
                .push_bind(r.position)
                .push_bind(r.title.clone())
                .push_bind(r.role.clone())
                .push_bind(r.description.clone())
                .push_bind(r.start_year)
                .push_bind(r.end_year);
        },
    )
    .await?;

    insert_rows(
        conn,
        "INSERT INTO awards (id, submission_id, position, name, organization, year) ",
        &rows.awards,
        |mut b, r| {
            b.push_bind(r.id)
                .push_bind(r.submission_id)
                .push_bind(r.position)
                .push_bind(r.name.clone())
                .push_bind(r.organization.clone())
                .push_bind(r.year);
        },
    )
    .await?;

    insert_rows(
        conn,
        "INSERT INTO patents (id, submission_id, position, title, patent_number, year) ",
        &rows.patents,
        |mut b, r| {
            b.push_bind(r.id)
                .push_bind(r.submission_id)
                .push_bind(r.position)
                .push_bind(r.title.clone())
                .push_bind(r.patent_number.clone())
                .push_bind(r.year);
        },
    )
    .await?;

    insert_rows(
        conn,
        "INSERT INTO grants (id, submission_id, position, title, amount, year) ",
        &rows.grants,
        |mut b, r| {
            b.push_bind(r.id)
                .push_bind(r.submission_id)
                .push_bind(r.position)
                .push_bind(r.title.clone())
                .push_bind(r.amount.clone())
                .push_bind(r.year);
        },
    )
    .await?;

    insert_rows(
        conn,
        "INSERT INTO other_institutions (id, submission_id, position, name, purpose) ",
        &rows.other_institutions,
        |mut b, r| {
            b.push_bind(r.id)
                .push_bind(r.submission_id)
                .push_bind(r.position)
                .push_bind(r.name.clone())
                .push_bind(r.purpose.clone());
        },
    )
    .await?;

    Ok(())
}

#[async_trait]
impl CvRepository for PgCvRepository {
    async fn list_units(&self, filter: &UnitFilter) -> Result<Vec<UnitRow>, RepositoryError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM units WHERE TRUE");
        if let Some(term) = search_term(filter.search.as_deref()) {
            qb.push(" AND name ILIKE ").push_bind(like_pattern(term));
        }
        if let Some(unit_type) = &filter.unit_type {
            qb.push(" AND unit_type = ").push_bind(unit_type.clone());
        }
        qb.push(" ORDER BY name");
        Ok(qb.build_query_as::<UnitRow>().fetch_all(&self.pool).await?)
    }

    async fn unit_exists(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let found: Option<Uuid> = sqlx::query_scalar("SELECT id FROM units WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    async fn create_unit(&self, unit: &NewUnit) -> Result<UnitRow, RepositoryError> {
        let row = sqlx::query_as::<_, UnitRow>(
            "INSERT INTO units (id, name, unit_type, parent_id) VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&unit.name)
        .bind(unit.unit_type.as_str())
        .bind(unit.parent_id)
        .fetch_one(&self.pool)
        .await
        .map_err(classify)?;
        info!("Created unit {} ({})", row.name, row.id);
        Ok(row)
    }

    async fn delete_unit(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let detached = sqlx::query("UPDATE cv_submissions SET unit_id = NULL WHERE unit_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        sqlx::query("UPDATE units SET parent_id = NULL WHERE parent_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let deleted = sqlx::query("DELETE FROM units WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        if deleted > 0 {
            info!("Deleted unit {id}; cleared it from {detached} submissions");
        }
        Ok(deleted > 0)
    }

    async fn insert_submission(
        &self,
        email: &str,
        submission: &NewSubmission,
    ) -> Result<SubmissionRow, RepositoryError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, SubmissionRow>(
            r#"
            INSERT INTO cv_submissions
                (id, name, phone, email, unit_id, age_bracket, status, submitted_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&submission.name)
        .bind(&submission.phone)
        .bind(email)
        .bind(submission.unit_id)
        .bind(submission.age_bracket.as_str())
        .bind(SubmissionStatus::default().as_str())
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(classify)?;

        let sections = SectionRows::from_new(row.id, &submission.sections);
        insert_sections(&mut tx, &sections).await?;

        tx.commit().await?;
        Ok(row)
    }

    async fn fetch_submission(
        &self,
        id: Uuid,
    ) -> Result<Option<SubmissionDetail>, RepositoryError> {
        let Some(submission) =
            sqlx::query_as::<_, SubmissionRow>("SELECT * FROM cv_submissions WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
        else {
            return Ok(None);
        };

        let sections = SectionRows {
            languages: self.fetch_section(SectionKind::Language, id).await?,
            computer_skills: self.fetch_section(SectionKind::Computer, id).await?,
            educations: self.fetch_section(SectionKind::Education, id).await?,
            memberships: self.fetch_section(SectionKind::Membership, id).await?,
            research_areas: self.fetch_section(SectionKind::Research, id).await?,
            trainings: self.fetch_section(SectionKind::Training, id).await?,
            projects: self.fetch_section(SectionKind::Project, id).await?,
            awards: self.fetch_section(SectionKind::Award, id).await?,
            patents: self.fetch_section(SectionKind::Patent, id).await?,
            grants: self.fetch_section(SectionKind::Grant, id).await?,
            other_institutions: self.fetch_section(SectionKind::Institution, id).await?,
        };

        Ok(Some(SubmissionDetail {
            submission,
            sections,
        }))
    }

    async fn list_submissions(
        &self,
        filter: &SubmissionFilter,
    ) -> Result<Vec<SubmissionRow>, RepositoryError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM cv_submissions WHERE TRUE");
        if let Some(term) = search_term(filter.search.as_deref()) {
            let pattern = like_pattern(term);
            qb.push(" AND (name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR email ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR phone ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(status) = &filter.status {
            qb.push(" AND status = ").push_bind(status.clone());
        }
        if let Some(age_bracket) = &filter.age_bracket {
            qb.push(" AND age_bracket = ").push_bind(age_bracket.clone());
        }
        if let Some(unit) = filter.unit {
            qb.push(" AND unit_id = ").push_bind(unit);
        }
        qb.push(" ORDER BY submitted_at DESC");
        Ok(qb
            .build_query_as::<SubmissionRow>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: SubmissionStatus,
    ) -> Result<Option<SubmissionRow>, RepositoryError> {
        Ok(sqlx::query_as::<_, SubmissionRow>(
            "UPDATE cv_submissions SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete_submission(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        for kind in SectionKind::ALL {
            let sql = format!("DELETE FROM {} WHERE submission_id = $1", kind.table());
            sqlx::query(&sql).bind(id).execute(&mut *tx).await?;
        }
        let deleted = sqlx::query("DELETE FROM cv_submissions WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        if deleted > 0 {
            info!("Deleted CV submission {id} and its sections");
        }
        Ok(deleted > 0)
    }

    async fn list_section(
        &self,
        kind: SectionKind,
        query: &SectionQuery,
    ) -> Result<Vec<Value>, RepositoryError> {
        let spec = listing_spec(kind);
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT row_to_json(t) FROM (SELECT c.*, s.name AS submission_name FROM ",
        );
        qb.push(kind.table())
            .push(" c JOIN cv_submissions s ON s.id = c.submission_id WHERE TRUE");

        if let Some(term) = search_term(query.search.as_deref()) {
            let pattern = like_pattern(term);
            qb.push(" AND (s.name ILIKE ").push_bind(pattern.clone());
            for column in spec.search {
                qb.push(" OR c.")
                    .push(*column)
                    .push(" ILIKE ")
                    .push_bind(pattern.clone());
            }
            qb.push(")");
        }

        for (column, value) in &query.filters {
            qb.push(" AND c.").push(*column).push(" = ");
            match value {
                FilterValue::Int(v) => qb.push_bind(*v),
                FilterValue::Text(v) => qb.push_bind(v.clone()),
            };
        }

        qb.push(") t ORDER BY ");
        if kind.ordered_by_year() {
            qb.push("t.year DESC, ");
        }
        qb.push("t.submission_name, t.position");

        let rows = qb.build().fetch_all(&self.pool).await?;
        Ok(rows
            .iter()
            .map(|row| row.try_get::<Value, _>(0))
            .collect::<Result<Vec<_>, _>>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::choices::UnitType;
    use crate::tests::common::{sample_submission, unit};

    const EMAIL: &str = "user@abu.edu.ng";

    async fn count(pool: &PgPool, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a Postgres DATABASE_URL"]
    async fn test_insert_links_every_section_to_root(pool: PgPool) {
        let repo = PgCvRepository::new(pool.clone());
        let submission = sample_submission(None);

        let row = repo.insert_submission(EMAIL, &submission).await.unwrap();
        assert_eq!(row.email, EMAIL);
        assert_eq!(row.status, "submitted");
        assert_eq!(count(&pool, "cv_submissions").await, 1);

        for kind in SectionKind::ALL {
            let linked: i64 = sqlx::query_scalar(&format!(
                "SELECT COUNT(*) FROM {} WHERE submission_id = $1",
                kind.table()
            ))
            .bind(row.id)
            .fetch_one(&pool)
            .await
            .unwrap();
            assert_eq!(linked as usize, submission.sections.len_of(kind), "{}", kind.key());
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a Postgres DATABASE_URL"]
    async fn test_failed_child_insert_rolls_back_root(pool: PgPool) {
        let repo = PgCvRepository::new(pool.clone());
        let mut submission = sample_submission(None);
        // Bypass form validation to hit the UNIQUE (submission_id, language) constraint.
        let duplicate = submission.sections.languages[0].clone();
        submission.sections.languages.push(duplicate);

        let err = repo.insert_submission(EMAIL, &submission).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Duplicate(_)));
        assert_eq!(count(&pool, "cv_submissions").await, 0);
        assert_eq!(count(&pool, "educations").await, 0);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a Postgres DATABASE_URL"]
    async fn test_deleting_unit_clears_submission_reference(pool: PgPool) {
        let repo = PgCvRepository::new(pool.clone());
        let faculty = repo.create_unit(&unit("Faculty of Engineering", UnitType::Faculty, None)).await.unwrap();
        let department = repo
            .create_unit(&unit("Civil Engineering", UnitType::Department, Some(faculty.id)))
            .await
            .unwrap();
        let row = repo
            .insert_submission(EMAIL, &sample_submission(Some(faculty.id)))
            .await
            .unwrap();

        assert!(repo.delete_unit(faculty.id).await.unwrap());

        let detail = repo.fetch_submission(row.id).await.unwrap().unwrap();
        assert_eq!(detail.submission.unit_id, None);
        let units = repo.list_units(&UnitFilter::default()).await.unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].id, department.id);
        assert_eq!(units[0].parent_id, None);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a Postgres DATABASE_URL"]
    async fn test_deleting_submission_removes_all_sections(pool: PgPool) {
        let repo = PgCvRepository::new(pool.clone());
        let keep = repo.insert_submission(EMAIL, &sample_submission(None)).await.unwrap();
        let gone = repo.insert_submission(EMAIL, &sample_submission(None)).await.unwrap();

        assert!(repo.delete_submission(gone.id).await.unwrap());
        assert!(!repo.delete_submission(gone.id).await.unwrap());

        for kind in SectionKind::ALL {
            let orphans: i64 = sqlx::query_scalar(&format!(
                "SELECT COUNT(*) FROM {} WHERE submission_id = $1",
                kind.table()
            ))
            .bind(gone.id)
            .fetch_one(&pool)
            .await
            .unwrap();
            assert_eq!(orphans, 0, "{}", kind.key());
        }
        assert!(repo.fetch_submission(keep.id).await.unwrap().is_some());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a Postgres DATABASE_URL"]
    async fn test_list_section_searches_parent_name_and_filters_year(pool: PgPool) {
        let repo = PgCvRepository::new(pool.clone());
        repo.insert_submission(EMAIL, &sample_submission(None)).await.unwrap();

        let mut params = std::collections::BTreeMap::new();
        params.insert("search".to_string(), "amina".to_string());
        let query = SectionQuery::from_params(SectionKind::Education, &params).unwrap();
        let rows = repo.list_section(SectionKind::Education, &query).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["submission_name"], "Amina Bello");
        assert!(rows[0]["year"].as_i64() >= rows[1]["year"].as_i64());

        params.insert("year".to_string(), "2001".to_string());
        let query = SectionQuery::from_params(SectionKind::Education, &params).unwrap();
        let rows = repo.list_section(SectionKind::Education, &query).await.unwrap();
        assert_eq!(rows.len(), 1);
    }
}

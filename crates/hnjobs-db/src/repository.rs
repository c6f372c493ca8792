use chrono::{DateTime, Utc};
use hnjobs_core::error::AppError;
use hnjobs_core::models::{JobFields, JobPosting, UpsertOutcome};
use hnjobs_core::traits::JobStore;
use sqlx::{PgPool, Pool, Postgres};

/// Repository for job postings in `hn.jobs`, keyed by source item id.
#[derive(Clone)]
pub struct JobRepository {
    pool: Pool<Postgres>,
}

impl JobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert or fully overwrite the row for `external_id`.
    ///
    /// Every extracted field is replaced (not merged) and `updated_at`
    /// is refreshed. A stored `posted_at` survives when the new one is
    /// `None`. Records without content are not written.
    pub async fn upsert(
        &self,
        external_id: i64,
        fields: &JobFields,
        posted_at: Option<DateTime<Utc>>,
    ) -> Result<UpsertOutcome, AppError> {
        if !fields.has_content() {
            tracing::debug!(external_id, "Skipping empty record");
            return Ok(UpsertOutcome::Skipped);
        }

        // xmax is zero only for a freshly inserted tuple.
        let (inserted,): (bool,) = sqlx::query_as(
            r#"
            INSERT INTO hn.jobs
                (hn_comment_id, company, role, location, salary, contact, description, posted_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW())
            ON CONFLICT (hn_comment_id) DO UPDATE SET
                company = EXCLUDED.company,
                role = EXCLUDED.role,
                location = EXCLUDED.location,
                salary = EXCLUDED.salary,
                contact = EXCLUDED.contact,
                description = EXCLUDED.description,
                posted_at = COALESCE(EXCLUDED.posted_at, hn.jobs.posted_at),
                updated_at = NOW()
            RETURNING (xmax = 0) AS inserted
            "#,
        )
        .bind(external_id)
        .bind(&fields.company)
        .bind(&fields.role)
        .bind(&fields.location)
        .bind(&fields.salary)
        .bind(&fields.contact)
        .bind(&fields.description)
        .bind(posted_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(if inserted {
            UpsertOutcome::Inserted
        } else {
            UpsertOutcome::Updated
        })
    }

    pub async fn get(&self, external_id: i64) -> Result<Option<JobPosting>, AppError> {
        let row = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT hn_comment_id, company, role, location, salary, contact, description, posted_at, updated_at
            FROM hn.jobs
            WHERE hn_comment_id = $1
            "#,
        )
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(row.map(Into::into))
    }

    pub async fn count(&self) -> Result<i64, AppError> {
        let (count,): (i64,) = sqlx::query_as(r#"SELECT COUNT(*) FROM hn.jobs"#)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(count)
    }

    /// Whole table, newest posts first, undated posts last.
    pub async fn list_for_export(&self) -> Result<Vec<JobPosting>, AppError> {
        let rows = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT hn_comment_id, company, role, location, salary, contact, description, posted_at, updated_at
            FROM hn.jobs
            ORDER BY posted_at DESC NULLS LAST, hn_comment_id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Check database connectivity.
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;
        Ok(())
    }
}

// -- Internal row type for sqlx deserialization --

#[derive(sqlx::FromRow)]
struct JobRow {
    hn_comment_id: i64,
    company: Option<String>,
    role: Option<String>,
    location: Option<String>,
    salary: Option<String>,
    contact: Option<String>,
    description: Option<String>,
    posted_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

impl From<JobRow> for JobPosting {
    fn from(row: JobRow) -> Self {
        JobPosting {
            external_id: row.hn_comment_id,
            fields: JobFields {
                company: row.company,
                role: row.role,
                location: row.location,
                salary: row.salary,
                contact: row.contact,
                description: row.description,
            },
            posted_at: row.posted_at,
            updated_at: row.updated_at,
        }
    }
}

// -- Trait implementation --

impl JobStore for JobRepository {
    async fn upsert(
        &self,
        external_id: i64,
        fields: &JobFields,
        posted_at: Option<DateTime<Utc>>,
    ) -> Result<UpsertOutcome, AppError> {
        JobRepository::upsert(self, external_id, fields, posted_at).await
    }
}

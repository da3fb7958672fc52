use sqlx::{Pool, Postgres, QueryBuilder};
use tracing::debug;

use crate::api::job::models::{JobPatch, NewJob};
use crate::api::pagination::{like_pattern, Page};
use crate::db::id::RecordId;
use crate::db::models::{JobRow, JobView, JobViewRow};

const JOB_COLUMNS: &str = "id, title, company, location, job_type, description, requirements, salary, \
                           category, experience, company_logo, posted_by, is_active, application_count, \
                           created_at, updated_at";

const JOB_VIEW_SELECT: &str = "SELECT j.id, j.title, j.company, j.location, j.job_type, j.description, \
                               j.requirements, j.salary, j.category, j.experience, j.company_logo, \
                               j.posted_by, j.is_active, j.application_count, j.created_at, j.updated_at, \
                               p.name AS poster_name, p.email AS poster_email \
                               FROM jobs j LEFT JOIN users p ON p.id = j.posted_by";

/// Listing filters; every value is a case-insensitive substring
#[derive(Debug, Default, Clone, Copy)]
pub struct JobFilter<'a> {
    /// Matches title, company or description
    pub search: Option<&'a str>,
    pub location: Option<&'a str>,
    pub job_type: Option<&'a str>,
    pub category: Option<&'a str>,
    pub active_only: bool,
}

impl JobFilter<'_> {
    fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(" WHERE TRUE");

        if self.active_only {
            qb.push(" AND j.is_active");
        }
        if let Some(term) = self.search {
            let pattern = like_pattern(term);
            qb.push(" AND (j.title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR j.company ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR j.description ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(location) = self.location {
            qb.push(" AND j.location ILIKE ").push_bind(like_pattern(location));
        }
        if let Some(job_type) = self.job_type {
            qb.push(" AND j.job_type::TEXT ILIKE ").push_bind(like_pattern(job_type));
        }
        if let Some(category) = self.category {
            qb.push(" AND j.category ILIKE ").push_bind(like_pattern(category));
        }
    }
}

/// Aggregates for the public landing page
#[derive(Debug, sqlx::FromRow)]
pub struct JobCounts {
    pub total_jobs: i64,
    pub active_jobs: i64,
    pub total_companies: i64,
}

/// Repository for Job database operations
pub struct JobRepository;

impl JobRepository {
    /// Create a new job in the database and return the full job record
    pub async fn create(
        pool: &Pool<Postgres>,
        job: &NewJob,
        company_logo: Option<&str>,
        posted_by: &RecordId,
    ) -> Result<JobRow, sqlx::Error> {
        debug!("Creating job: title={}, company={}", job.title, job.company);

        let sql = format!(
            "INSERT INTO jobs (id, title, company, location, job_type, description, requirements, \
                               salary, category, experience, company_logo, posted_by, is_active) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
             RETURNING {}",
            JOB_COLUMNS
        );
        let row = sqlx::query_as::<_, JobRow>(&sql)
            .bind(RecordId::generate())
            .bind(&job.title)
            .bind(&job.company)
            .bind(&job.location)
            .bind(job.job_type)
            .bind(&job.description)
            .bind(&job.requirements)
            .bind(job.salary.as_deref())
            .bind(job.category.as_deref())
            .bind(job.experience.as_deref())
            .bind(company_logo)
            .bind(posted_by)
            .bind(job.is_active)
            .fetch_one(pool)
            .await?;

        debug!("Job created with id={}", row.id);
        Ok(row)
    }

    pub async fn find_by_id(pool: &Pool<Postgres>, id: &RecordId) -> Result<Option<JobRow>, sqlx::Error> {
        let sql = format!("SELECT {} FROM jobs WHERE id = $1", JOB_COLUMNS);
        sqlx::query_as::<_, JobRow>(&sql).bind(id).fetch_optional(pool).await
    }

    /// Job with its poster populated
    pub async fn find_view_by_id(pool: &Pool<Postgres>, id: &RecordId) -> Result<Option<JobView>, sqlx::Error> {
        let sql = format!("{} WHERE j.id = $1", JOB_VIEW_SELECT);
        let row = sqlx::query_as::<_, JobViewRow>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(row.map(JobView::from))
    }

    /// Replace the supplied fields; the logo only when a new one was stored
    pub async fn update(
        pool: &Pool<Postgres>,
        id: &RecordId,
        patch: &JobPatch,
        company_logo: Option<&str>,
    ) -> Result<Option<JobRow>, sqlx::Error> {
        debug!("Updating job id={}", id);

        let sql = format!(
            "UPDATE jobs SET \
                title = COALESCE($2, title), \
                company = COALESCE($3, company), \
                location = COALESCE($4, location), \
                job_type = COALESCE($5, job_type), \
                description = COALESCE($6, description), \
                requirements = COALESCE($7, requirements), \
                salary = COALESCE($8, salary), \
                category = COALESCE($9, category), \
                experience = COALESCE($10, experience), \
                is_active = COALESCE($11, is_active), \
                company_logo = COALESCE($12, company_logo), \
                updated_at = NOW() \
             WHERE id = $1 RETURNING {}",
            JOB_COLUMNS
        );
        sqlx::query_as::<_, JobRow>(&sql)
            .bind(id)
            .bind(patch.title.as_deref())
            .bind(patch.company.as_deref())
            .bind(patch.location.as_deref())
            .bind(patch.job_type)
            .bind(patch.description.as_deref())
            .bind(patch.requirements.as_ref())
            .bind(patch.salary.as_deref())
            .bind(patch.category.as_deref())
            .bind(patch.experience.as_deref())
            .bind(patch.is_active)
            .bind(company_logo)
            .fetch_optional(pool)
            .await
    }

    /// Delete a job and every application referencing it, atomically
    ///
    /// Returns the deleted job and the number of applications removed, or
    /// `None` when the job does not exist.
    pub async fn delete_with_applications(
        pool: &Pool<Postgres>,
        id: &RecordId,
    ) -> Result<Option<(JobRow, u64)>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let removed = sqlx::query("DELETE FROM applications WHERE job_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let sql = format!("DELETE FROM jobs WHERE id = $1 RETURNING {}", JOB_COLUMNS);
        let job = sqlx::query_as::<_, JobRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        match job {
            Some(job) => {
                tx.commit().await?;
                debug!("Deleted job id={} and {} applications", id, removed);
                Ok(Some((job, removed)))
            }
            None => {
                tx.rollback().await?;
                Ok(None)
            }
        }
    }

    /// Newest first, with the poster populated
    pub async fn list(
        pool: &Pool<Postgres>,
        filter: JobFilter<'_>,
        page: Page,
    ) -> Result<(Vec<JobView>, i64), sqlx::Error> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM jobs j");
        filter.push_where(&mut count);
        let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(JOB_VIEW_SELECT);
        filter.push_where(&mut select);
        select
            .push(" ORDER BY j.created_at DESC, j.id DESC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset());
        let rows = select.build_query_as::<JobViewRow>().fetch_all(pool).await?;

        Ok((rows.into_iter().map(JobView::from).collect(), total))
    }

    pub async fn counts(pool: &Pool<Postgres>) -> Result<JobCounts, sqlx::Error> {
        sqlx::query_as::<_, JobCounts>(
            r#"
            SELECT COUNT(*) AS total_jobs,
                   COUNT(*) FILTER (WHERE is_active) AS active_jobs,
                   COUNT(DISTINCT LOWER(company)) FILTER (WHERE is_active) AS total_companies
            FROM jobs
            "#,
        )
        .fetch_one(pool)
        .await
    }
}

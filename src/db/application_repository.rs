use sqlx::{Pool, Postgres, QueryBuilder};
use tracing::debug;

use crate::api::pagination::{like_pattern, Page};
use crate::db::id::RecordId;
use crate::db::models::{ApplicationRow, ApplicationStatus, ApplicationView, ApplicationViewRow};

const APPLICATION_COLUMNS: &str = "id, job_id, applicant_id, status, cover_letter, resume, portfolio_url, \
                                   linkedin_url, expected_salary, applied_at, updated_at";

const APPLICATION_VIEW_SELECT: &str = "SELECT a.id, a.job_id, a.applicant_id, a.status, a.cover_letter, \
                                       a.resume, a.portfolio_url, a.linkedin_url, a.expected_salary, \
                                       a.applied_at, a.updated_at, \
                                       j.title AS job_title, j.company AS job_company, \
                                       j.location AS job_location, j.job_type AS job_type, \
                                       j.company_logo AS job_company_logo, j.is_active AS job_is_active, \
                                       j.salary AS job_salary, \
                                       p.id AS poster_id, p.name AS poster_name, p.email AS poster_email, \
                                       u.name AS applicant_name, u.email AS applicant_email, \
                                       u.phone AS applicant_phone \
                                       FROM applications a \
                                       JOIN jobs j ON j.id = a.job_id \
                                       JOIN users u ON u.id = a.applicant_id \
                                       LEFT JOIN users p ON p.id = j.posted_by";

/// Values stored for a new application
pub struct NewApplication<'a> {
    pub job_id: &'a RecordId,
    pub applicant_id: &'a RecordId,
    pub cover_letter: Option<&'a str>,
    pub resume: Option<&'a str>,
    pub portfolio_url: Option<&'a str>,
    pub linkedin_url: Option<&'a str>,
    pub expected_salary: Option<&'a str>,
}

/// Admin search over applications
#[derive(Debug, Default, Clone, Copy)]
pub struct ApplicationFilter<'a> {
    pub status: Option<ApplicationStatus>,
    pub search: Option<&'a str>,
}

impl ApplicationFilter<'_> {
    fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(" WHERE TRUE");

        if let Some(status) = self.status {
            qb.push(" AND a.status = ").push_bind(status);
        }
        if let Some(term) = self.search {
            let pattern = like_pattern(term);
            qb.push(" AND (u.name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR u.email ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR j.title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR j.company ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
    }
}

/// Repository for Application database operations
pub struct ApplicationRepository;

impl ApplicationRepository {
    /// Insert an application and bump its job's counter in one transaction
    ///
    /// The unique (job_id, applicant_id) index rejects duplicates. Returns
    /// `None` (and rolls back) if the job disappeared before its counter
    /// could be incremented.
    pub async fn create_and_count(
        pool: &Pool<Postgres>,
        application: NewApplication<'_>,
    ) -> Result<Option<ApplicationRow>, sqlx::Error> {
        debug!(
            "Creating application: job_id={}, applicant_id={}",
            application.job_id, application.applicant_id
        );

        let mut tx = pool.begin().await?;

        let sql = format!(
            "INSERT INTO applications (id, job_id, applicant_id, cover_letter, resume, portfolio_url, \
                                       linkedin_url, expected_salary) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {}",
            APPLICATION_COLUMNS
        );
        let row = sqlx::query_as::<_, ApplicationRow>(&sql)
            .bind(RecordId::generate())
            .bind(application.job_id)
            .bind(application.applicant_id)
            .bind(application.cover_letter)
            .bind(application.resume)
            .bind(application.portfolio_url)
            .bind(application.linkedin_url)
            .bind(application.expected_salary)
            .fetch_one(&mut *tx)
            .await?;

        let bumped = sqlx::query(
            "UPDATE jobs SET application_count = application_count + 1 WHERE id = $1",
        )
        .bind(application.job_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if bumped == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        tx.commit().await?;
        debug!("Application created with id={}", row.id);
        Ok(Some(row))
    }

    pub async fn find_by_id(pool: &Pool<Postgres>, id: &RecordId) -> Result<Option<ApplicationRow>, sqlx::Error> {
        let sql = format!("SELECT {} FROM applications WHERE id = $1", APPLICATION_COLUMNS);
        sqlx::query_as::<_, ApplicationRow>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_view_by_id(
        pool: &Pool<Postgres>,
        id: &RecordId,
    ) -> Result<Option<ApplicationView>, sqlx::Error> {
        let sql = format!("{} WHERE a.id = $1", APPLICATION_VIEW_SELECT);
        let row = sqlx::query_as::<_, ApplicationViewRow>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(row.map(ApplicationView::from))
    }

    pub async fn exists_for(
        pool: &Pool<Postgres>,
        job_id: &RecordId,
        applicant_id: &RecordId,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM applications WHERE job_id = $1 AND applicant_id = $2)",
        )
        .bind(job_id)
        .bind(applicant_id)
        .fetch_one(pool)
        .await
    }

    pub async fn list_for_applicant(
        pool: &Pool<Postgres>,
        applicant_id: &RecordId,
    ) -> Result<Vec<ApplicationView>, sqlx::Error> {
        let sql = format!(
            "{} WHERE a.applicant_id = $1 ORDER BY a.applied_at DESC",
            APPLICATION_VIEW_SELECT
        );
        let rows = sqlx::query_as::<_, ApplicationViewRow>(&sql)
            .bind(applicant_id)
            .fetch_all(pool)
            .await?;
        Ok(rows.into_iter().map(ApplicationView::from).collect())
    }

    pub async fn list_for_job(pool: &Pool<Postgres>, job_id: &RecordId) -> Result<Vec<ApplicationView>, sqlx::Error> {
        let sql = format!("{} WHERE a.job_id = $1 ORDER BY a.applied_at DESC", APPLICATION_VIEW_SELECT);
        let rows = sqlx::query_as::<_, ApplicationViewRow>(&sql)
            .bind(job_id)
            .fetch_all(pool)
            .await?;
        Ok(rows.into_iter().map(ApplicationView::from).collect())
    }

    /// Filtered, paginated listing; the text search runs in SQL
    pub async fn search(
        pool: &Pool<Postgres>,
        filter: ApplicationFilter<'_>,
        page: Page,
    ) -> Result<(Vec<ApplicationView>, i64), sqlx::Error> {
        let mut count = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM applications a \
             JOIN jobs j ON j.id = a.job_id \
             JOIN users u ON u.id = a.applicant_id",
        );
        filter.push_where(&mut count);
        let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(APPLICATION_VIEW_SELECT);
        filter.push_where(&mut select);
        select
            .push(" ORDER BY a.applied_at DESC, a.id DESC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset());
        let rows = select.build_query_as::<ApplicationViewRow>().fetch_all(pool).await?;

        Ok((rows.into_iter().map(ApplicationView::from).collect(), total))
    }

    pub async fn recent(pool: &Pool<Postgres>, limit: i64) -> Result<Vec<ApplicationView>, sqlx::Error> {
        let sql = format!("{} ORDER BY a.applied_at DESC LIMIT $1", APPLICATION_VIEW_SELECT);
        let rows = sqlx::query_as::<_, ApplicationViewRow>(&sql)
            .bind(limit)
            .fetch_all(pool)
            .await?;
        Ok(rows.into_iter().map(ApplicationView::from).collect())
    }

    pub async fn update_status(
        pool: &Pool<Postgres>,
        id: &RecordId,
        status: ApplicationStatus,
    ) -> Result<Option<ApplicationRow>, sqlx::Error> {
        debug!("Setting status of application id={} to {:?}", id, status);

        let sql = format!(
            "UPDATE applications SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            APPLICATION_COLUMNS
        );
        sqlx::query_as::<_, ApplicationRow>(&sql)
            .bind(id)
            .bind(status)
            .fetch_optional(pool)
            .await
    }

    /// Delete an application and decrement its job's counter
    ///
    /// Only the caller whose `DELETE ... RETURNING` actually removed the row
    /// decrements, and the counter never drops below zero.
    pub async fn delete_and_count(
        pool: &Pool<Postgres>,
        id: &RecordId,
    ) -> Result<Option<ApplicationRow>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let sql = format!("DELETE FROM applications WHERE id = $1 RETURNING {}", APPLICATION_COLUMNS);
        let deleted = sqlx::query_as::<_, ApplicationRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(application) = deleted else {
            tx.rollback().await?;
            return Ok(None);
        };

        sqlx::query(
            "UPDATE jobs SET application_count = GREATEST(application_count - 1, 0) WHERE id = $1",
        )
        .bind(&application.job_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        debug!("Deleted application id={} from job id={}", id, application.job_id);
        Ok(Some(application))
    }

    pub async fn count(pool: &Pool<Postgres>) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM applications").fetch_one(pool).await
    }

    pub async fn count_by_status(pool: &Pool<Postgres>) -> Result<Vec<(ApplicationStatus, i64)>, sqlx::Error> {
        sqlx::query_as::<_, (ApplicationStatus, i64)>(
            "SELECT status, COUNT(*) FROM applications GROUP BY status",
        )
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::error::ApiError;
    use crate::db::fixtures::{account, apply, counts, posting};
    use crate::db::models::Role;

    #[sqlx::test(migrations = "./migrations")]
    async fn counter_follows_creates_and_deletes(pool: Pool<Postgres>) {
        let admin = account(&pool, "Boss", Role::Admin).await;
        let ada = account(&pool, "Ada", Role::User).await;
        let alan = account(&pool, "Alan", Role::User).await;
        let job = posting(&pool, &admin, "Rust Engineer").await;

        let first = apply(&pool, &job, &ada).await;
        apply(&pool, &job, &alan).await;
        assert_eq!(counts(&pool, &job.id).await, (2, 2));

        assert!(ApplicationRepository::delete_and_count(&pool, &first.id).await.unwrap().is_some());
        assert_eq!(counts(&pool, &job.id).await, (1, 1));

        // A repeated delete removes nothing and must not decrement again
        assert!(ApplicationRepository::delete_and_count(&pool, &first.id).await.unwrap().is_none());
        assert_eq!(counts(&pool, &job.id).await, (1, 1));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn second_application_for_same_pair_is_rejected(pool: Pool<Postgres>) {
        let admin = account(&pool, "Boss", Role::Admin).await;
        let ada = account(&pool, "Ada", Role::User).await;
        let job = posting(&pool, &admin, "Rust Engineer").await;
        apply(&pool, &job, &ada).await;

        let again = ApplicationRepository::create_and_count(
            &pool,
            NewApplication {
                job_id: &job.id,
                applicant_id: &ada.id,
                cover_letter: Some("Please reconsider"),
                resume: None,
                portfolio_url: None,
                linkedin_url: None,
                expected_salary: None,
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(ApiError::from(again), ApiError::Conflict(_)));
        assert_eq!(counts(&pool, &job.id).await, (1, 1));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn applying_to_a_missing_job_stores_nothing(pool: Pool<Postgres>) {
        let ada = account(&pool, "Ada", Role::User).await;
        let ghost = RecordId::generate();

        let result = ApplicationRepository::create_and_count(
            &pool,
            NewApplication {
                job_id: &ghost,
                applicant_id: &ada.id,
                cover_letter: None,
                resume: None,
                portfolio_url: None,
                linkedin_url: None,
                expected_salary: None,
            },
        )
        .await;

        match result {
            Ok(None) => {}
            Err(e) => assert!(matches!(ApiError::from(e), ApiError::NotFound(_))),
            Ok(Some(row)) => panic!("application {} stored for a missing job", row.id),
        }
        assert_eq!(ApplicationRepository::count(&pool).await.unwrap(), 0);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn search_matches_applicant_and_job_text(pool: Pool<Postgres>) {
        let admin = account(&pool, "Boss", Role::Admin).await;
        let ada = account(&pool, "Ada", Role::User).await;
        let alan = account(&pool, "Alan", Role::User).await;
        let react = posting(&pool, &admin, "React Developer").await;
        let rust = posting(&pool, &admin, "Rust Engineer").await;

        let ada_react = apply(&pool, &react, &ada).await;
        apply(&pool, &rust, &alan).await;
        ApplicationRepository::update_status(&pool, &ada_react.id, ApplicationStatus::Accepted)
            .await
            .unwrap();

        let by_title = ApplicationFilter {
            search: Some("react"),
            ..Default::default()
        };
        let (found, total) = ApplicationRepository::search(&pool, by_title, Page::new(None, None))
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(found[0].application.id, ada_react.id);
        assert_eq!(found[0].job.title, "React Developer");
        assert_eq!(found[0].applicant.name, "Ada");

        let by_status = ApplicationFilter {
            status: Some(ApplicationStatus::Pending),
            ..Default::default()
        };
        let (found, total) = ApplicationRepository::search(&pool, by_status, Page::new(None, None))
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(found[0].applicant.name, "Alan");
    }
}

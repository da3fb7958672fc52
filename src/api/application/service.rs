use actix_multipart::form::tempfile::TempFile;
use sqlx::{Pool, Postgres};
use tracing::{info, warn};

use super::models::ApplicationInput;
use crate::api::error::{ApiError, ApiResult};
use crate::api::pagination::{non_empty, Page, Paginated};
use crate::api::validation::validate;
use crate::db::application_repository::{ApplicationFilter, ApplicationRepository, NewApplication};
use crate::db::id::RecordId;
use crate::db::job_repository::JobRepository;
use crate::db::models::{ApplicationRow, ApplicationStatus, ApplicationView, Role, UserRow};
use crate::upload::{UploadKind, UploadStore};

const DUPLICATE_APPLICATION: &str = "You have already applied for this job";

/// The applicant who owns an application, or any admin
pub fn can_access(actor: &UserRow, application: &ApplicationRow) -> bool {
    actor.role == Role::Admin || actor.id == application.applicant_id
}

/// Application lifecycle: apply, review, withdraw
pub struct ApplicationService {
    pool: Pool<Postgres>,
    uploads: UploadStore,
}

impl ApplicationService {
    pub fn new(pool: Pool<Postgres>, uploads: UploadStore) -> Self {
        Self { pool, uploads }
    }

    /// Submit an application for `job_id` on behalf of `applicant`
    ///
    /// # Business Logic
    /// - The job must exist and be accepting applications
    /// - One application per (job, applicant); the existence check only
    ///   gives a friendlier message, the unique index is the real guard
    /// - The job's application counter moves in the same transaction
    pub async fn apply(
        &self,
        applicant: &UserRow,
        job_id: &RecordId,
        input: ApplicationInput,
        resume_file: Option<TempFile>,
    ) -> ApiResult<ApplicationRow> {
        let input = input.normalized();
        validate(&input)?;
        info!("Service: User id={} applying to job id={}", applicant.id, job_id);

        let job = JobRepository::find_by_id(&self.pool, job_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Job not found"))?;

        if !job.is_active {
            return Err(ApiError::invalid("This job is no longer accepting applications"));
        }

        if ApplicationRepository::exists_for(&self.pool, job_id, &applicant.id).await? {
            warn!("Service: Duplicate application by user id={} for job id={}", applicant.id, job_id);
            return Err(ApiError::invalid(DUPLICATE_APPLICATION));
        }

        let uploaded = match resume_file {
            Some(file) => Some(self.uploads.save(file, UploadKind::Resume).await?),
            None => None,
        };
        let resume = uploaded
            .clone()
            .or(input.resume)
            .or_else(|| applicant.resume_url.clone());

        let created = ApplicationRepository::create_and_count(
            &self.pool,
            NewApplication {
                job_id,
                applicant_id: &applicant.id,
                cover_letter: input.cover_letter.as_deref(),
                resume: resume.as_deref(),
                portfolio_url: input.portfolio_url.as_deref(),
                linkedin_url: input.linkedin_url.as_deref(),
                expected_salary: input.expected_salary.as_deref(),
            },
        )
        .await;

        let outcome = match created {
            Ok(Some(application)) => Ok(application),
            Ok(None) => Err(ApiError::not_found("Job not found")),
            Err(e) => match ApiError::from(e) {
                ApiError::Conflict(_) => Err(ApiError::conflict(DUPLICATE_APPLICATION)),
                other => Err(other),
            },
        };

        match outcome {
            Ok(application) => {
                info!("Service: Application id={} created", application.id);
                Ok(application)
            }
            Err(err) => {
                if let Some(path) = uploaded {
                    self.uploads.remove(&path).await;
                }
                Err(err)
            }
        }
    }

    pub async fn my_applications(&self, applicant: &UserRow) -> ApiResult<Vec<ApplicationView>> {
        Ok(ApplicationRepository::list_for_applicant(&self.pool, &applicant.id).await?)
    }

    pub async fn for_job(&self, job_id: &RecordId) -> ApiResult<Vec<ApplicationView>> {
        if JobRepository::find_by_id(&self.pool, job_id).await?.is_none() {
            return Err(ApiError::not_found("Job not found"));
        }
        Ok(ApplicationRepository::list_for_job(&self.pool, job_id).await?)
    }

    pub async fn get(&self, actor: &UserRow, id: &RecordId) -> ApiResult<ApplicationView> {
        let view = ApplicationRepository::find_view_by_id(&self.pool, id)
            .await?
            .ok_or_else(|| ApiError::not_found("Application not found"))?;

        if !can_access(actor, &view.application) {
            return Err(ApiError::forbidden("Not authorized to view this application"));
        }
        Ok(view)
    }

    /// Admin-only; any status may follow any other
    pub async fn update_status(&self, id: &RecordId, status: ApplicationStatus) -> ApiResult<ApplicationRow> {
        let application = ApplicationRepository::update_status(&self.pool, id, status)
            .await?
            .ok_or_else(|| ApiError::not_found("Application not found"))?;

        info!("Service: Application id={} moved to {:?}", id, status);
        Ok(application)
    }

    /// Withdraw (owner) or remove (admin) an application
    pub async fn delete(&self, actor: &UserRow, id: &RecordId) -> ApiResult<()> {
        let application = ApplicationRepository::find_by_id(&self.pool, id)
            .await?
            .ok_or_else(|| ApiError::not_found("Application not found"))?;

        if !can_access(actor, &application) {
            warn!("Service: User id={} may not delete application id={}", actor.id, id);
            return Err(ApiError::forbidden("Not authorized to delete this application"));
        }

        ApplicationRepository::delete_and_count(&self.pool, id)
            .await?
            .ok_or_else(|| ApiError::not_found("Application not found"))?;

        info!("Service: Application id={} deleted by user id={}", id, actor.id);
        Ok(())
    }

    pub async fn search(
        &self,
        status: Option<ApplicationStatus>,
        search: &Option<String>,
        page: Page,
    ) -> ApiResult<Paginated<ApplicationView>> {
        let filter = ApplicationFilter {
            status,
            search: non_empty(search),
        };
        let (applications, total) = ApplicationRepository::search(&self.pool, filter, page).await?;
        Ok(Paginated::new(applications, page, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures::{account, counts, new_job, posting};
    use chrono::Utc;

    fn user(role: Role) -> UserRow {
        let now = Utc::now();
        UserRow {
            id: RecordId::generate(),
            name: "Someone".into(),
            email: "someone@example.com".into(),
            password_hash: String::new(),
            role,
            phone: None,
            location: None,
            bio: None,
            skills: vec![],
            resume_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn application_of(applicant: &UserRow) -> ApplicationRow {
        let now = Utc::now();
        ApplicationRow {
            id: RecordId::generate(),
            job_id: RecordId::generate(),
            applicant_id: applicant.id.clone(),
            status: ApplicationStatus::Pending,
            cover_letter: None,
            resume: None,
            portfolio_url: None,
            linkedin_url: None,
            expected_salary: None,
            applied_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn owner_and_admins_may_access_others_may_not() {
        let owner = user(Role::User);
        let stranger = user(Role::User);
        let admin = user(Role::Admin);
        let application = application_of(&owner);

        assert!(can_access(&owner, &application));
        assert!(can_access(&admin, &application));
        assert!(!can_access(&stranger, &application));
    }

    fn service(pool: Pool<Postgres>) -> ApplicationService {
        ApplicationService::new(pool, UploadStore::new(std::env::temp_dir(), 1024))
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn applying_twice_leaves_one_application(pool: Pool<Postgres>) {
        let admin = account(&pool, "Boss", Role::Admin).await;
        let ada = account(&pool, "Ada", Role::User).await;
        let job = posting(&pool, &admin, "Rust Engineer").await;
        let applications = service(pool.clone());

        let input = ApplicationInput {
            cover_letter: Some("I like Rust".into()),
            portfolio_url: Some("".into()),
            ..Default::default()
        };
        let created = applications.apply(&ada, &job.id, input, None).await.unwrap();
        assert_eq!(created.portfolio_url, None);
        assert_eq!(counts(&pool, &job.id).await, (1, 1));

        let mine = applications.my_applications(&ada).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].job.id, job.id);

        match applications.apply(&ada, &job.id, ApplicationInput::default(), None).await {
            Err(ApiError::InvalidArgument(msg)) => assert_eq!(msg, DUPLICATE_APPLICATION),
            other => panic!("unexpected: {:?}", other.map(|a| a.id)),
        }
        assert_eq!(counts(&pool, &job.id).await, (1, 1));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn accepted_application_can_still_be_withdrawn(pool: Pool<Postgres>) {
        let admin = account(&pool, "Boss", Role::Admin).await;
        let ada = account(&pool, "Ada", Role::User).await;
        let alan = account(&pool, "Alan", Role::User).await;
        let job = posting(&pool, &admin, "Rust Engineer").await;
        let applications = service(pool.clone());

        let created = applications
            .apply(&ada, &job.id, ApplicationInput::default(), None)
            .await
            .unwrap();
        let accepted = applications
            .update_status(&created.id, ApplicationStatus::Accepted)
            .await
            .unwrap();
        assert_eq!(accepted.status, ApplicationStatus::Accepted);

        assert!(matches!(
            applications.delete(&alan, &created.id).await,
            Err(ApiError::Forbidden(_))
        ));
        assert_eq!(counts(&pool, &job.id).await, (1, 1));

        applications.delete(&ada, &created.id).await.unwrap();
        assert_eq!(counts(&pool, &job.id).await, (0, 0));

        assert!(matches!(
            applications.delete(&ada, &created.id).await,
            Err(ApiError::NotFound(_))
        ));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn closed_jobs_refuse_applications(pool: Pool<Postgres>) {
        let admin = account(&pool, "Boss", Role::Admin).await;
        let ada = account(&pool, "Ada", Role::User).await;
        let mut closed = new_job("Rust Engineer", "No longer hiring");
        closed.is_active = false;
        let job = JobRepository::create(&pool, &closed, None, &admin.id).await.unwrap();

        let result = service(pool.clone())
            .apply(&ada, &job.id, ApplicationInput::default(), None)
            .await;
        assert!(matches!(result, Err(ApiError::InvalidArgument(_))));
        assert_eq!(counts(&pool, &job.id).await, (0, 0));
    }
}

use actix_multipart::form::tempfile::TempFile;
use sqlx::{Pool, Postgres};
use tracing::{info, warn};

use super::dto::{JobDeletedResponse, JobResponse, JobStats};
use super::models::{JobListQuery, JobPatch};
use crate::api::error::{ApiError, ApiResult};
use crate::api::pagination::{non_empty, Page, Paginated};
use crate::api::validation::validate;
use crate::db::application_repository::ApplicationRepository;
use crate::db::id::RecordId;
use crate::db::job_repository::{JobFilter, JobRepository};
use crate::db::models::{JobView, UserRow};
use crate::upload::{UploadKind, UploadStore};

/// Job service containing business logic
pub struct JobService {
    pool: Pool<Postgres>,
    uploads: UploadStore,
}

impl JobService {
    /// Create a new JobService instance
    pub fn new(pool: Pool<Postgres>, uploads: UploadStore) -> Self {
        Self { pool, uploads }
    }

    /// Active jobs matching the query, newest first
    pub async fn list_active(&self, query: &JobListQuery) -> ApiResult<Paginated<JobView>> {
        let page = Page::new(query.page, query.limit);
        let filter = JobFilter {
            search: non_empty(&query.search),
            location: non_empty(&query.location),
            job_type: non_empty(&query.job_type),
            category: non_empty(&query.category),
            active_only: true,
        };

        let (jobs, total) = JobRepository::list(&self.pool, filter, page).await?;
        Ok(Paginated::new(jobs, page, total))
    }

    /// Every job regardless of state, for the admin dashboard
    pub async fn list_all(&self, search: &Option<String>, page: Page) -> ApiResult<Paginated<JobView>> {
        let filter = JobFilter {
            search: non_empty(search),
            ..Default::default()
        };

        let (jobs, total) = JobRepository::list(&self.pool, filter, page).await?;
        Ok(Paginated::new(jobs, page, total))
    }

    pub async fn get(&self, id: &RecordId) -> ApiResult<JobView> {
        JobRepository::find_view_by_id(&self.pool, id)
            .await?
            .ok_or_else(|| ApiError::not_found("Job not found"))
    }

    pub async fn stats(&self) -> ApiResult<JobStats> {
        let counts = JobRepository::counts(&self.pool).await?;
        let total_applications = ApplicationRepository::count(&self.pool).await?;

        Ok(JobStats {
            total_jobs: counts.active_jobs,
            total_companies: counts.total_companies,
            total_applications,
        })
    }

    /// Create a job owned by `admin`
    ///
    /// # Business Logic
    /// - Requires title, company, location, type and description
    /// - Stores the optional logo before inserting the row
    /// - Removes the stored logo again if the insert fails
    pub async fn create(&self, admin: &UserRow, patch: JobPatch, logo: Option<TempFile>) -> ApiResult<JobResponse> {
        let patch = patch.normalized();
        validate(&patch)?;
        let job = patch.into_new_job()?;
        info!("Service: Creating job title={} by admin id={}", job.title, admin.id);

        let logo_path = match logo {
            Some(file) => Some(self.uploads.save(file, UploadKind::CompanyLogo).await?),
            None => None,
        };

        match JobRepository::create(&self.pool, &job, logo_path.as_deref(), &admin.id).await {
            Ok(job_row) => {
                info!("Service: Job created successfully with id={}", job_row.id);
                Ok(JobResponse {
                    message: "Job created successfully".to_string(),
                    job: job_row,
                })
            }
            Err(e) => {
                if let Some(path) = logo_path {
                    self.uploads.remove(&path).await;
                }
                Err(e.into())
            }
        }
    }

    /// Replace the supplied fields; the logo only when a new file is sent
    pub async fn update(&self, id: &RecordId, patch: JobPatch, logo: Option<TempFile>) -> ApiResult<JobResponse> {
        let patch = patch.normalized();
        validate(&patch)?;

        let existing = JobRepository::find_by_id(&self.pool, id)
            .await?
            .ok_or_else(|| ApiError::not_found("Job not found"))?;

        let logo_path = match logo {
            Some(file) => Some(self.uploads.save(file, UploadKind::CompanyLogo).await?),
            None => None,
        };

        let updated = match JobRepository::update(&self.pool, id, &patch, logo_path.as_deref()).await {
            Ok(Some(job)) => Ok(job),
            Ok(None) => Err(ApiError::not_found("Job not found")),
            Err(e) => Err(ApiError::from(e)),
        };

        let updated = match updated {
            Ok(job) => job,
            Err(err) => {
                if let Some(path) = logo_path.as_deref() {
                    warn!("Service: Update of job id={} failed, discarding new logo", id);
                    self.uploads.remove(path).await;
                }
                return Err(err);
            }
        };

        if let (Some(_), Some(old)) = (logo_path.as_deref(), existing.company_logo.as_deref()) {
            self.uploads.remove(old).await;
        }

        info!("Service: Job id={} updated", id);
        Ok(JobResponse {
            message: "Job updated successfully".to_string(),
            job: updated,
        })
    }

    /// Delete a job; its applications go with it in the same transaction
    pub async fn delete(&self, id: &RecordId) -> ApiResult<JobDeletedResponse> {
        let (job, removed) = JobRepository::delete_with_applications(&self.pool, id)
            .await?
            .ok_or_else(|| ApiError::not_found("Job not found"))?;

        if let Some(logo) = job.company_logo.as_deref() {
            self.uploads.remove(logo).await;
        }

        info!("Service: Job id={} deleted with {} applications", id, removed);
        Ok(JobDeletedResponse {
            message: "Job deleted successfully".to_string(),
            removed_applications: removed,
        })
    }
}

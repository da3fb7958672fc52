use sqlx::{Pool, Postgres};
use tracing::{info, warn};

use super::models::{AdminStats, StatusCounts};
use crate::api::error::{ApiError, ApiResult};
use crate::api::pagination::{non_empty, Page, Paginated};
use crate::db::application_repository::ApplicationRepository;
use crate::db::id::RecordId;
use crate::db::job_repository::JobRepository;
use crate::db::models::{Role, UserRow};
use crate::db::user_repository::UserRepository;

const RECENT_APPLICATIONS: i64 = 5;

/// Admin accounts cannot be deleted; that could leave nobody able to administer
pub fn ensure_deletable(target: &UserRow) -> ApiResult<()> {
    if target.role == Role::Admin {
        Err(ApiError::invalid("Cannot delete admin users"))
    } else {
        Ok(())
    }
}

/// An admin cannot change their own role
pub fn ensure_role_change_allowed(actor: &UserRow, target_id: &RecordId) -> ApiResult<()> {
    if &actor.id == target_id {
        Err(ApiError::invalid("You cannot change your own role"))
    } else {
        Ok(())
    }
}

/// User administration and dashboard statistics
pub struct AdminService {
    pool: Pool<Postgres>,
}

impl AdminService {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn list_users(&self, search: &Option<String>, page: Page) -> ApiResult<Paginated<UserRow>> {
        let (users, total) = UserRepository::list(&self.pool, non_empty(search), page).await?;
        Ok(Paginated::new(users, page, total))
    }

    pub async fn change_role(&self, actor: &UserRow, target_id: &RecordId, role: Role) -> ApiResult<UserRow> {
        ensure_role_change_allowed(actor, target_id)?;

        let user = UserRepository::update_role(&self.pool, target_id, role)
            .await?
            .ok_or_else(|| ApiError::not_found("User not found"))?;

        info!("Service: Admin id={} set role of user id={} to {:?}", actor.id, user.id, role);
        Ok(user)
    }

    /// Delete a non-admin account and cascade to its applications
    pub async fn delete_user(&self, actor: &UserRow, target_id: &RecordId) -> ApiResult<()> {
        let target = UserRepository::find_by_id(&self.pool, target_id)
            .await?
            .ok_or_else(|| ApiError::not_found("User not found"))?;

        if let Err(err) = ensure_deletable(&target) {
            warn!("Service: Admin id={} tried to delete admin id={}", actor.id, target.id);
            return Err(err);
        }

        // The repository re-checks the role, so a concurrent promotion wins
        if !UserRepository::delete_with_applications(&self.pool, target_id).await? {
            return Err(ApiError::invalid("Cannot delete admin users"));
        }

        info!("Service: Admin id={} deleted user id={}", actor.id, target_id);
        Ok(())
    }

    pub async fn stats(&self) -> ApiResult<AdminStats> {
        let total_users = UserRepository::count(&self.pool).await?;
        let total_admins = UserRepository::count_by_role(&self.pool, Role::Admin).await?;
        let jobs = JobRepository::counts(&self.pool).await?;
        let total_applications = ApplicationRepository::count(&self.pool).await?;
        let by_status = ApplicationRepository::count_by_status(&self.pool).await?;
        let recent_applications = ApplicationRepository::recent(&self.pool, RECENT_APPLICATIONS).await?;

        Ok(AdminStats {
            total_users,
            total_admins,
            total_jobs: jobs.total_jobs,
            active_jobs: jobs.active_jobs,
            total_applications,
            applications_by_status: StatusCounts::from_pairs(&by_status),
            recent_applications,
        })
    }
}

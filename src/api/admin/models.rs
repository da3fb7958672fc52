use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::db::models::{ApplicationStatus, ApplicationView, Role, UserRow};

/// `?page=&limit=&search=` for the user and job listings
#[derive(Debug, Default, Deserialize, Validate)]
pub struct SearchQuery {
    #[validate(range(min = 1, message = "Page must be at least 1"))]
    pub page: Option<i64>,
    #[validate(range(min = 1, max = 100, message = "Limit must be between 1 and 100"))]
    pub limit: Option<i64>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RoleUpdate {
    pub role: Role,
}

#[derive(Serialize)]
pub struct UserResponse {
    pub message: String,
    pub user: UserRow,
}

#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub pending: i64,
    pub reviewed: i64,
    pub accepted: i64,
    pub rejected: i64,
}

impl StatusCounts {
    pub fn from_pairs(pairs: &[(ApplicationStatus, i64)]) -> Self {
        let mut counts = StatusCounts::default();
        for (status, n) in pairs {
            let slot = match status {
                ApplicationStatus::Pending => &mut counts.pending,
                ApplicationStatus::Reviewed => &mut counts.reviewed,
                ApplicationStatus::Accepted => &mut counts.accepted,
                ApplicationStatus::Rejected => &mut counts.rejected,
            };
            *slot += n;
        }
        counts
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub total_users: i64,
    pub total_admins: i64,
    pub total_jobs: i64,
    pub active_jobs: i64,
    pub total_applications: i64,
    pub applications_by_status: StatusCounts,
    pub recent_applications: Vec<ApplicationView>,
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::id::RecordId;

/// Account role; the only two privilege levels the API knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, sqlx::Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(type_name = "job_type", rename_all = "kebab-case")]
pub enum JobType {
    FullTime,
    PartTime,
    Contract,
    Freelance,
    Internship,
}

/// Review state of an application
///
/// Admins may move an application between any two states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "application_status", rename_all = "lowercase")]
pub enum ApplicationStatus {
    #[default]
    Pending,
    Reviewed,
    Accepted,
    Rejected,
}

/// Database representation of a user
///
/// The password hash never leaves the process.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRow {
    pub id: RecordId,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub skills: Vec<String>,
    pub resume_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRow {
    pub id: RecordId,
    pub title: String,
    pub company: String,
    pub location: String,
    #[serde(rename = "type")]
    pub job_type: JobType,
    pub description: String,
    pub requirements: Vec<String>,
    pub salary: Option<String>,
    pub category: Option<String>,
    pub experience: Option<String>,
    pub company_logo: Option<String>,
    pub posted_by: Option<RecordId>,
    pub is_active: bool,
    pub application_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationRow {
    pub id: RecordId,
    pub job_id: RecordId,
    pub applicant_id: RecordId,
    pub status: ApplicationStatus,
    pub cover_letter: Option<String>,
    pub resume: Option<String>,
    pub portfolio_url: Option<String>,
    pub linkedin_url: Option<String>,
    pub expected_salary: Option<String>,
    pub applied_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Minimal public view of an account, used when populating references
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: RecordId,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Job joined with the account that posted it
#[derive(Debug, Clone, FromRow)]
pub struct JobViewRow {
    #[sqlx(flatten)]
    pub job: JobRow,
    pub poster_name: Option<String>,
    pub poster_email: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobView {
    #[serde(flatten)]
    pub job: JobRow,
    pub poster: Option<UserSummary>,
}

impl From<JobViewRow> for JobView {
    fn from(row: JobViewRow) -> Self {
        let poster = match (row.job.posted_by.clone(), row.poster_name, row.poster_email) {
            (Some(id), Some(name), Some(email)) => Some(UserSummary {
                id,
                name,
                email,
                phone: None,
            }),
            _ => None,
        };
        JobView { job: row.job, poster }
    }
}

/// Application joined with its job, the job's poster and the applicant
#[derive(Debug, Clone, FromRow)]
pub struct ApplicationViewRow {
    #[sqlx(flatten)]
    pub application: ApplicationRow,
    pub job_title: String,
    pub job_company: String,
    pub job_location: String,
    pub job_type: JobType,
    pub job_company_logo: Option<String>,
    pub job_is_active: bool,
    pub job_salary: Option<String>,
    pub poster_id: Option<RecordId>,
    pub poster_name: Option<String>,
    pub poster_email: Option<String>,
    pub applicant_name: String,
    pub applicant_email: String,
    pub applicant_phone: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub id: RecordId,
    pub title: String,
    pub company: String,
    pub location: String,
    #[serde(rename = "type")]
    pub job_type: JobType,
    pub company_logo: Option<String>,
    pub is_active: bool,
    pub salary: Option<String>,
    pub posted_by: Option<UserSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplicationView {
    #[serde(flatten)]
    pub application: ApplicationRow,
    pub job: JobSummary,
    pub applicant: UserSummary,
}

impl From<ApplicationViewRow> for ApplicationView {
    fn from(row: ApplicationViewRow) -> Self {
        let posted_by = match (row.poster_id, row.poster_name, row.poster_email) {
            (Some(id), Some(name), Some(email)) => Some(UserSummary {
                id,
                name,
                email,
                phone: None,
            }),
            _ => None,
        };

        let job = JobSummary {
            id: row.application.job_id.clone(),
            title: row.job_title,
            company: row.job_company,
            location: row.job_location,
            job_type: row.job_type,
            company_logo: row.job_company_logo,
            is_active: row.job_is_active,
            salary: row.job_salary,
            posted_by,
        };

        let applicant = UserSummary {
            id: row.application.applicant_id.clone(),
            name: row.applicant_name,
            email: row.applicant_email,
            phone: row.applicant_phone,
        };

        ApplicationView {
            application: row.application,
            job,
            applicant,
        }
    }
}

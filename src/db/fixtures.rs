//! Seed data for database-backed tests

use sqlx::{Pool, Postgres};

use crate::api::job::models::NewJob;
use crate::db::application_repository::{ApplicationRepository, NewApplication};
use crate::db::id::RecordId;
use crate::db::job_repository::JobRepository;
use crate::db::models::{ApplicationRow, JobRow, JobType, Role, UserRow};
use crate::db::user_repository::{NewUser, UserRepository};

pub async fn account(pool: &Pool<Postgres>, name: &str, role: Role) -> UserRow {
    let email = format!("{}@example.com", name.to_lowercase());
    UserRepository::create(
        pool,
        NewUser {
            name,
            email: &email,
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$unused$unused",
            role,
        },
    )
    .await
    .unwrap()
}

pub fn new_job(title: &str, description: &str) -> NewJob {
    NewJob {
        title: title.to_string(),
        company: "Acme".to_string(),
        location: "Remote".to_string(),
        job_type: JobType::FullTime,
        description: description.to_string(),
        requirements: vec![],
        salary: None,
        category: None,
        experience: None,
        is_active: true,
    }
}

pub async fn posting(pool: &Pool<Postgres>, poster: &UserRow, title: &str) -> JobRow {
    JobRepository::create(pool, &new_job(title, "A role worth applying for"), None, &poster.id)
        .await
        .unwrap()
}

pub async fn apply(pool: &Pool<Postgres>, job: &JobRow, applicant: &UserRow) -> ApplicationRow {
    ApplicationRepository::create_and_count(
        pool,
        NewApplication {
            job_id: &job.id,
            applicant_id: &applicant.id,
            cover_letter: None,
            resume: None,
            portfolio_url: None,
            linkedin_url: None,
            expected_salary: None,
        },
    )
    .await
    .unwrap()
    .unwrap()
}

/// Stored counter next to the live number of application rows
pub async fn counts(pool: &Pool<Postgres>, job_id: &RecordId) -> (i32, i64) {
    let stored = JobRepository::find_by_id(pool, job_id)
        .await
        .unwrap()
        .map(|job| job.application_count)
        .unwrap_or_default();
    let live: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM applications WHERE job_id = $1")
        .bind(job_id)
        .fetch_one(pool)
        .await
        .unwrap();
    (stored, live)
}

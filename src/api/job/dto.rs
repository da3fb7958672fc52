use serde::Serialize;

use crate::db::models::JobRow;

/// Response for a created or updated job
#[derive(Serialize)]
pub struct JobResponse {
    pub message: String,
    pub job: JobRow,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDeletedResponse {
    pub message: String,
    pub removed_applications: u64,
}

/// Public landing-page counters
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStats {
    pub total_jobs: i64,
    pub total_companies: i64,
    pub total_applications: i64,
}

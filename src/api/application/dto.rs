use serde::Serialize;

use crate::db::models::{ApplicationRow, ApplicationView};

/// Response for a created or updated application
#[derive(Serialize)]
pub struct ApplicationResponse {
    pub message: String,
    pub application: ApplicationRow,
}

#[derive(Serialize)]
pub struct ApplicationListResponse {
    pub applications: Vec<ApplicationView>,
    pub count: usize,
}

impl From<Vec<ApplicationView>> for ApplicationListResponse {
    fn from(applications: Vec<ApplicationView>) -> Self {
        Self {
            count: applications.len(),
            applications,
        }
    }
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

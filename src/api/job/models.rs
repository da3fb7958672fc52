use actix_multipart::form::{MultipartForm, tempfile::TempFile, text::Text};
use serde::Deserialize;
use validator::Validate;

use crate::api::error::{ApiError, ApiResult};
use crate::db::models::JobType;

/// Fields of a job posting as submitted by an admin
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct JobPatch {
    #[validate(length(min = 3, max = 200, message = "Title must be between 3 and 200 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 2, max = 200, message = "Company must be between 2 and 200 characters"))]
    pub company: Option<String>,
    #[validate(length(min = 2, max = 200, message = "Location must be between 2 and 200 characters"))]
    pub location: Option<String>,
    #[serde(rename = "type")]
    pub job_type: Option<JobType>,
    #[validate(length(min = 10, max = 10000, message = "Description must be between 10 and 10000 characters"))]
    pub description: Option<String>,
    pub requirements: Option<Vec<String>>,
    #[validate(length(max = 100, message = "Salary cannot exceed 100 characters"))]
    pub salary: Option<String>,
    #[validate(length(max = 100, message = "Category cannot exceed 100 characters"))]
    pub category: Option<String>,
    #[validate(length(max = 100, message = "Experience cannot exceed 100 characters"))]
    pub experience: Option<String>,
    pub is_active: Option<bool>,
}

/// A complete job posting, ready to insert
#[derive(Debug)]
pub struct NewJob {
    pub title: String,
    pub company: String,
    pub location: String,
    pub job_type: JobType,
    pub description: String,
    pub requirements: Vec<String>,
    pub salary: Option<String>,
    pub category: Option<String>,
    pub experience: Option<String>,
    pub is_active: bool,
}

impl JobPatch {
    /// Require the mandatory fields for a new posting
    pub fn into_new_job(self) -> ApiResult<NewJob> {
        let missing = |field: &str| ApiError::invalid(format!("{} is required", field));

        Ok(NewJob {
            title: self.title.ok_or_else(|| missing("title"))?,
            company: self.company.ok_or_else(|| missing("company"))?,
            location: self.location.ok_or_else(|| missing("location"))?,
            job_type: self.job_type.ok_or_else(|| missing("type"))?,
            description: self.description.ok_or_else(|| missing("description"))?,
            requirements: self.requirements.unwrap_or_default(),
            salary: self.salary,
            category: self.category,
            experience: self.experience,
            is_active: self.is_active.unwrap_or(true),
        })
    }

    /// Trim text fields and normalise the requirement list
    pub fn normalized(mut self) -> Self {
        let trim = |v: Option<String>| v.map(|s| s.trim().to_string());
        self.title = trim(self.title);
        self.company = trim(self.company);
        self.location = trim(self.location);
        self.description = trim(self.description);
        self.salary = trim(self.salary).filter(|s| !s.is_empty());
        self.category = trim(self.category).filter(|s| !s.is_empty());
        self.experience = trim(self.experience).filter(|s| !s.is_empty());
        self.requirements = self.requirements.map(normalize_requirements);
        self
    }
}

/// Accept requirements as repeated values, a JSON array string, or lines
pub fn normalize_requirements(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .flat_map(|value| {
            let trimmed = value.trim();
            if trimmed.starts_with('[') {
                if let Ok(list) = serde_json::from_str::<Vec<String>>(trimmed) {
                    return list;
                }
            }
            trimmed.lines().map(str::to_string).collect()
        })
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Multipart variant of [`JobPatch`] with an optional company logo
#[derive(MultipartForm)]
pub struct JobForm {
    pub title: Option<Text<String>>,
    pub company: Option<Text<String>>,
    pub location: Option<Text<String>>,
    #[multipart(rename = "type")]
    pub job_type: Option<Text<JobType>>,
    pub description: Option<Text<String>>,
    pub requirements: Vec<Text<String>>,
    pub salary: Option<Text<String>>,
    pub category: Option<Text<String>>,
    pub experience: Option<Text<String>>,
    #[multipart(rename = "isActive")]
    pub is_active: Option<Text<bool>>,
    #[multipart(rename = "companyLogo")]
    pub company_logo: Option<TempFile>,
}

impl JobForm {
    pub fn into_parts(self) -> (JobPatch, Option<TempFile>) {
        let requirements = if self.requirements.is_empty() {
            None
        } else {
            Some(self.requirements.into_iter().map(Text::into_inner).collect())
        };

        let patch = JobPatch {
            title: self.title.map(Text::into_inner),
            company: self.company.map(Text::into_inner),
            location: self.location.map(Text::into_inner),
            job_type: self.job_type.map(Text::into_inner),
            description: self.description.map(Text::into_inner),
            requirements,
            salary: self.salary.map(Text::into_inner),
            category: self.category.map(Text::into_inner),
            experience: self.experience.map(Text::into_inner),
            is_active: self.is_active.map(Text::into_inner),
        };

        // An empty file input still arrives as a part
        let logo = self.company_logo.filter(|f| f.size > 0);
        (patch, logo)
    }
}

/// `GET /api/jobs` filters
#[derive(Debug, Default, Deserialize, Validate)]
pub struct JobListQuery {
    #[validate(range(min = 1, message = "Page must be at least 1"))]
    pub page: Option<i64>,
    #[validate(range(min = 1, max = 100, message = "Limit must be between 1 and 100"))]
    pub limit: Option<i64>,
    pub search: Option<String>,
    pub location: Option<String>,
    #[serde(rename = "type")]
    pub job_type: Option<String>,
    pub category: Option<String>,
}

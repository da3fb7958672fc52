use actix_multipart::form::{MultipartForm, tempfile::TempFile, text::Text};
use actix_web::{Either, web::Json};
use serde::Deserialize;
use validator::Validate;

use crate::db::models::ApplicationStatus;

/// Free-text parts of an application
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationInput {
    /// Only read by `POST /api/applications`; the apply route takes it from the path
    pub job_id: Option<String>,
    #[validate(length(max = 5000, message = "Cover letter cannot exceed 5000 characters"))]
    pub cover_letter: Option<String>,
    /// Link to an already hosted resume
    #[validate(length(max = 2048, message = "Resume link is too long"))]
    pub resume: Option<String>,
    #[validate(url(message = "Portfolio URL must be a valid URL"))]
    pub portfolio_url: Option<String>,
    #[validate(url(message = "LinkedIn URL must be a valid URL"))]
    pub linkedin_url: Option<String>,
    #[validate(length(max = 100, message = "Expected salary cannot exceed 100 characters"))]
    pub expected_salary: Option<String>,
}

impl ApplicationInput {
    /// Drop blank values so they are stored as NULL
    pub fn normalized(self) -> Self {
        let clean = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        ApplicationInput {
            job_id: clean(self.job_id),
            cover_letter: clean(self.cover_letter),
            resume: clean(self.resume),
            portfolio_url: clean(self.portfolio_url),
            linkedin_url: clean(self.linkedin_url),
            expected_salary: clean(self.expected_salary),
        }
    }
}

/// Multipart variant of [`ApplicationInput`] with an optional resume file
#[derive(MultipartForm)]
pub struct ApplicationForm {
    #[multipart(rename = "jobId")]
    pub job_id: Option<Text<String>>,
    #[multipart(rename = "coverLetter")]
    pub cover_letter: Option<Text<String>>,
    #[multipart(rename = "portfolioUrl")]
    pub portfolio_url: Option<Text<String>>,
    #[multipart(rename = "linkedinUrl")]
    pub linkedin_url: Option<Text<String>>,
    #[multipart(rename = "expectedSalary")]
    pub expected_salary: Option<Text<String>>,
    pub resume: Option<TempFile>,
}

impl ApplicationForm {
    pub fn into_parts(self) -> (ApplicationInput, Option<TempFile>) {
        let input = ApplicationInput {
            job_id: self.job_id.map(Text::into_inner),
            cover_letter: self.cover_letter.map(Text::into_inner),
            resume: None,
            portfolio_url: self.portfolio_url.map(Text::into_inner),
            linkedin_url: self.linkedin_url.map(Text::into_inner),
            expected_salary: self.expected_salary.map(Text::into_inner),
        };
        (input, self.resume.filter(|f| f.size > 0))
    }
}

/// Body of an apply request: JSON, or multipart carrying a resume
///
/// Rules run in the service after [`ApplicationInput::normalized`].
pub type ApplicationSubmission = Either<Json<ApplicationInput>, MultipartForm<ApplicationForm>>;

pub fn submission_parts(body: ApplicationSubmission) -> (ApplicationInput, Option<TempFile>) {
    match body {
        Either::Left(json) => (json.into_inner(), None),
        Either::Right(form) => form.into_inner().into_parts(),
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct StatusUpdate {
    pub status: ApplicationStatus,
}

/// `GET /api/admin/applications` filters
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ApplicationListQuery {
    #[validate(range(min = 1, message = "Page must be at least 1"))]
    pub page: Option<i64>,
    #[validate(range(min = 1, max = 100, message = "Limit must be between 1 and 100"))]
    pub limit: Option<i64>,
    pub status: Option<ApplicationStatus>,
    /// Matches applicant name/email and job title/company
    pub search: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::error::ApiError;
    use crate::api::validation::validate;
    use actix_web::test::{call_service, init_service, TestRequest};
    use actix_web::{App, HttpResponse, http::StatusCode, post};

    #[post("/submit")]
    async fn submit(body: ApplicationSubmission) -> Result<HttpResponse, ApiError> {
        let (input, _) = submission_parts(body);
        validate(&input.normalized())?;
        Ok(HttpResponse::Ok().finish())
    }

    #[actix_web::test]
    async fn json_submission_with_blank_url_is_accepted() {
        let app = init_service(App::new().service(submit)).await;

        let req = TestRequest::post()
            .uri("/submit")
            .set_json(serde_json::json!({ "coverLetter": "hi", "portfolioUrl": "" }))
            .to_request();
        assert_eq!(call_service(&app, req).await.status(), StatusCode::OK);

        let req = TestRequest::post()
            .uri("/submit")
            .set_json(serde_json::json!({ "portfolioUrl": "not a url" }))
            .to_request();
        assert_eq!(call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn blank_fields_are_dropped() {
        let input = ApplicationInput {
            cover_letter: Some("   ".into()),
            expected_salary: Some(" 90k ".into()),
            ..Default::default()
        }
        .normalized();

        assert_eq!(input.cover_letter, None);
        assert_eq!(input.expected_salary.as_deref(), Some("90k"));
    }

    #[test]
    fn status_update_rejects_unknown_values() {
        assert!(serde_json::from_str::<StatusUpdate>(r#"{"status":"accepted"}"#).is_ok());
        assert!(serde_json::from_str::<StatusUpdate>(r#"{"status":"hired"}"#).is_err());
    }

    #[test]
    fn blank_links_are_accepted_once_normalized() {
        let input: ApplicationInput = serde_json::from_value(serde_json::json!({
            "coverLetter": "hi",
            "portfolioUrl": "",
            "linkedinUrl": "  "
        }))
        .unwrap();

        let input = input.normalized();
        assert!(input.validate().is_ok());
        assert_eq!(input.portfolio_url, None);
        assert_eq!(input.cover_letter.as_deref(), Some("hi"));
    }

    #[test]
    fn bad_portfolio_url_fails_validation() {
        let input = ApplicationInput {
            portfolio_url: Some("not a url".into()),
            ..Default::default()
        };
        assert!(input.validate().is_err());
    }
}

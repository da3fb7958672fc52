use actix_multipart::form::{MultipartForm, tempfile::TempFile};
use actix_web::{
    Either, HttpResponse, delete, get, post, put,
    web::{self, Data, Path, ServiceConfig, scope},
};
use actix_web_validator::Query;

use super::models::{JobForm, JobListQuery, JobPatch};
use super::service::JobService;
use crate::api::application::dto::ApplicationResponse;
use crate::api::application::models::{submission_parts, ApplicationSubmission};
use crate::api::application::ApplicationService;
use crate::api::auth::{AdminUser, AuthUser};
use crate::api::error::ApiResult;
use crate::db::id::RecordId;

/// JSON body, or multipart carrying a company logo
///
/// Validated by the service once blank fields have been normalised.
type JobSubmission = Either<web::Json<JobPatch>, MultipartForm<JobForm>>;

fn job_parts(body: JobSubmission) -> (JobPatch, Option<TempFile>) {
    match body {
        Either::Left(json) => (json.into_inner(), None),
        Either::Right(form) => form.into_inner().into_parts(),
    }
}

#[get("")]
async fn list_jobs(service: Data<JobService>, query: Query<JobListQuery>) -> ApiResult<HttpResponse> {
    let page = service.list_active(&query).await?;
    Ok(HttpResponse::Ok().json(page.into_json("jobs")))
}

#[get("/stats")]
async fn job_stats(service: Data<JobService>) -> ApiResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(service.stats().await?))
}

#[get("/{id}")]
async fn get_job(service: Data<JobService>, path: Path<String>) -> ApiResult<HttpResponse> {
    let id: RecordId = path.into_inner().parse()?;
    Ok(HttpResponse::Ok().json(service.get(&id).await?))
}

#[post("")]
async fn create_job(
    service: Data<JobService>,
    AdminUser(admin): AdminUser,
    body: JobSubmission,
) -> ApiResult<HttpResponse> {
    let (patch, logo) = job_parts(body);
    let response = service.create(&admin, patch, logo).await?;
    Ok(HttpResponse::Created().json(response))
}

#[put("/{id}")]
async fn update_job(
    service: Data<JobService>,
    _admin: AdminUser,
    path: Path<String>,
    body: JobSubmission,
) -> ApiResult<HttpResponse> {
    let id: RecordId = path.into_inner().parse()?;
    let (patch, logo) = job_parts(body);
    let response = service.update(&id, patch, logo).await?;
    Ok(HttpResponse::Ok().json(response))
}

#[delete("/{id}")]
async fn delete_job(service: Data<JobService>, _admin: AdminUser, path: Path<String>) -> ApiResult<HttpResponse> {
    let id: RecordId = path.into_inner().parse()?;
    Ok(HttpResponse::Ok().json(service.delete(&id).await?))
}

#[post("/{id}/apply")]
async fn apply_to_job(
    applications: Data<ApplicationService>,
    AuthUser(user): AuthUser,
    path: Path<String>,
    body: ApplicationSubmission,
) -> ApiResult<HttpResponse> {
    let job_id: RecordId = path.into_inner().parse()?;
    let (input, resume) = submission_parts(body);

    let application = applications.apply(&user, &job_id, input, resume).await?;
    Ok(HttpResponse::Created().json(ApplicationResponse {
        message: "Application submitted successfully".to_string(),
        application,
    }))
}

pub fn job_config(config: &mut ServiceConfig) {
    // `/stats` must be registered ahead of `/{id}`
    config.service(
        scope("/jobs")
            .service(list_jobs)
            .service(job_stats)
            .service(get_job)
            .service(create_job)
            .service(update_job)
            .service(delete_job)
            .service(apply_to_job),
    );
}

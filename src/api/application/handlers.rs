use actix_web::{
    HttpResponse, delete, get, post, put,
    web::{Data, Path, ServiceConfig, scope},
};
use actix_web_validator::Json;

use super::dto::{ApplicationListResponse, ApplicationResponse, MessageResponse};
use super::models::{submission_parts, ApplicationSubmission, StatusUpdate};
use super::service::ApplicationService;
use crate::api::auth::{AdminUser, AuthUser};
use crate::api::error::{ApiError, ApiResult};
use crate::db::id::RecordId;

#[get("/my-applications")]
async fn my_applications(
    service: Data<ApplicationService>,
    AuthUser(user): AuthUser,
) -> ApiResult<HttpResponse> {
    let applications = service.my_applications(&user).await?;
    Ok(HttpResponse::Ok().json(ApplicationListResponse::from(applications)))
}

#[get("/job/{job_id}")]
async fn job_applications(
    service: Data<ApplicationService>,
    _admin: AdminUser,
    path: Path<String>,
) -> ApiResult<HttpResponse> {
    let job_id: RecordId = path.into_inner().parse()?;
    let applications = service.for_job(&job_id).await?;
    Ok(HttpResponse::Ok().json(ApplicationListResponse::from(applications)))
}

#[post("")]
async fn create_application(
    service: Data<ApplicationService>,
    AuthUser(user): AuthUser,
    body: ApplicationSubmission,
) -> ApiResult<HttpResponse> {
    let (mut input, resume) = submission_parts(body);

    let job_id: RecordId = input
        .job_id
        .take()
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::invalid("jobId is required"))?
        .trim()
        .parse()?;

    let application = service.apply(&user, &job_id, input, resume).await?;
    Ok(HttpResponse::Created().json(ApplicationResponse {
        message: "Application submitted successfully".to_string(),
        application,
    }))
}

#[get("/{id}")]
async fn get_application(
    service: Data<ApplicationService>,
    AuthUser(user): AuthUser,
    path: Path<String>,
) -> ApiResult<HttpResponse> {
    let id: RecordId = path.into_inner().parse()?;
    let application = service.get(&user, &id).await?;
    Ok(HttpResponse::Ok().json(application))
}

#[put("/{id}/status")]
async fn update_status(
    service: Data<ApplicationService>,
    _admin: AdminUser,
    path: Path<String>,
    body: Json<StatusUpdate>,
) -> ApiResult<HttpResponse> {
    let id: RecordId = path.into_inner().parse()?;
    let application = service.update_status(&id, body.status).await?;
    Ok(HttpResponse::Ok().json(ApplicationResponse {
        message: "Application status updated".to_string(),
        application,
    }))
}

#[delete("/{id}")]
async fn delete_application(
    service: Data<ApplicationService>,
    AuthUser(user): AuthUser,
    path: Path<String>,
) -> ApiResult<HttpResponse> {
    let id: RecordId = path.into_inner().parse()?;
    service.delete(&user, &id).await?;
    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "Application deleted successfully".to_string(),
    }))
}

pub fn application_config(config: &mut ServiceConfig) {
    // Literal segments before `/{id}`
    config.service(
        scope("/applications")
            .service(my_applications)
            .service(job_applications)
            .service(create_application)
            .service(update_status)
            .service(get_application)
            .service(delete_application),
    );
}

use actix_web::{
    HttpResponse, delete, get, put,
    web::{Data, Path, ServiceConfig, scope},
};
use actix_web_validator::{Json, Query};

use super::models::{RoleUpdate, SearchQuery, UserResponse};
use super::service::AdminService;
use crate::api::application::dto::MessageResponse;
use crate::api::application::models::ApplicationListQuery;
use crate::api::application::ApplicationService;
use crate::api::auth::AdminUser;
use crate::api::error::ApiResult;
use crate::api::job::JobService;
use crate::api::pagination::Page;
use crate::db::id::RecordId;

#[get("/users")]
async fn list_users(
    service: Data<AdminService>,
    _admin: AdminUser,
    query: Query<SearchQuery>,
) -> ApiResult<HttpResponse> {
    let page = Page::new(query.page, query.limit);
    let users = service.list_users(&query.search, page).await?;
    Ok(HttpResponse::Ok().json(users.into_json("users")))
}

#[put("/users/{id}/role")]
async fn update_user_role(
    service: Data<AdminService>,
    AdminUser(admin): AdminUser,
    path: Path<String>,
    body: Json<RoleUpdate>,
) -> ApiResult<HttpResponse> {
    let id: RecordId = path.into_inner().parse()?;
    let user = service.change_role(&admin, &id, body.role).await?;
    Ok(HttpResponse::Ok().json(UserResponse {
        message: "User role updated successfully".to_string(),
        user,
    }))
}

#[delete("/users/{id}")]
async fn delete_user(
    service: Data<AdminService>,
    AdminUser(admin): AdminUser,
    path: Path<String>,
) -> ApiResult<HttpResponse> {
    let id: RecordId = path.into_inner().parse()?;
    service.delete_user(&admin, &id).await?;
    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "User and their applications deleted successfully".to_string(),
    }))
}

#[get("/jobs")]
async fn list_all_jobs(
    jobs: Data<JobService>,
    _admin: AdminUser,
    query: Query<SearchQuery>,
) -> ApiResult<HttpResponse> {
    let page = Page::new(query.page, query.limit);
    let jobs = jobs.list_all(&query.search, page).await?;
    Ok(HttpResponse::Ok().json(jobs.into_json("jobs")))
}

#[get("/applications")]
async fn list_all_applications(
    applications: Data<ApplicationService>,
    _admin: AdminUser,
    query: Query<ApplicationListQuery>,
) -> ApiResult<HttpResponse> {
    let page = Page::new(query.page, query.limit);
    let applications = applications.search(query.status, &query.search, page).await?;
    Ok(HttpResponse::Ok().json(applications.into_json("applications")))
}

#[get("/stats")]
async fn dashboard_stats(service: Data<AdminService>, _admin: AdminUser) -> ApiResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(service.stats().await?))
}

pub fn admin_config(config: &mut ServiceConfig) {
    config.service(
        scope("/admin")
            .service(list_users)
            .service(update_user_role)
            .service(delete_user)
            .service(list_all_jobs)
            .service(list_all_applications)
            .service(dashboard_stats),
    );
}

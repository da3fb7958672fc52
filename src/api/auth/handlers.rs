use actix_web::{
    HttpResponse, get, post, put,
    web::{Data, Json, ServiceConfig, scope},
};

use super::extractor::AuthUser;
use super::models::{LoginRequest, ProfileResponse, RegisterRequest, UpdateProfileRequest};
use super::service::AuthService;
use crate::api::error::ApiResult;

#[post("/register")]
async fn register(service: Data<AuthService>, body: Json<RegisterRequest>) -> ApiResult<HttpResponse> {
    let response = service.register(body.into_inner()).await?;
    Ok(HttpResponse::Created().json(response))
}

#[post("/login")]
async fn login(service: Data<AuthService>, body: Json<LoginRequest>) -> ApiResult<HttpResponse> {
    let response = service.login(body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(response))
}

#[get("/profile")]
async fn get_profile(AuthUser(user): AuthUser) -> ApiResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(user))
}

#[put("/profile")]
async fn update_profile(
    service: Data<AuthService>,
    AuthUser(user): AuthUser,
    body: Json<UpdateProfileRequest>,
) -> ApiResult<HttpResponse> {
    let user = service.update_profile(&user, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ProfileResponse {
        message: "Profile updated successfully".to_string(),
        user,
    }))
}

pub fn auth_config(config: &mut ServiceConfig) {
    config.service(
        scope("/auth")
            .service(register)
            .service(login)
            .service(get_profile)
            .service(update_profile),
    );
}

use actix_web::{FromRequest, HttpRequest, dev::Payload, web};
use futures_util::future::LocalBoxFuture;
use sqlx::{Pool, Postgres};

use super::token::{bearer_token, TokenKeys};
use crate::api::error::ApiError;
use crate::db::id::RecordId;
use crate::db::models::{Role, UserRow};
use crate::db::user_repository::UserRepository;

/// The account behind a valid bearer token
pub struct AuthUser(pub UserRow);

/// An authenticated account holding the admin role
pub struct AdminUser(pub UserRow);

/// Permit the request only if the account's role is in `allowed`
pub fn require_role(user: &UserRow, allowed: &[Role]) -> Result<(), ApiError> {
    if allowed.contains(&user.role) {
        Ok(())
    } else {
        Err(ApiError::forbidden("Access denied: insufficient permissions"))
    }
}

async fn resolve_user(
    token: Result<String, ApiError>,
    keys: Option<web::Data<TokenKeys>>,
    pool: Option<web::Data<Pool<Postgres>>>,
) -> Result<UserRow, ApiError> {
    let token = token?;
    let keys = keys.ok_or_else(|| ApiError::internal("Token keys are not registered"))?;
    let claims = keys.verify(&token)?;

    let id: RecordId = claims
        .sub
        .parse()
        .map_err(|_| ApiError::unauthenticated("Token is not valid"))?;

    let pool = pool.ok_or_else(|| ApiError::internal("Database pool is not registered"))?;
    UserRepository::find_by_id(&pool, &id)
        .await?
        .ok_or_else(|| ApiError::unauthenticated("Token is not valid"))
}

impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let token = bearer_token(req);
        let keys = req.app_data::<web::Data<TokenKeys>>().cloned();
        let pool = req.app_data::<web::Data<Pool<Postgres>>>().cloned();

        Box::pin(async move { resolve_user(token, keys, pool).await.map(AuthUser) })
    }
}

impl FromRequest for AdminUser {
    type Error = ApiError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let user = AuthUser::from_request(req, payload);

        Box::pin(async move {
            let AuthUser(user) = user.await?;
            require_role(&user, &[Role::Admin])?;
            Ok(AdminUser(user))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures::account;
    use actix_web::test::{call_service, init_service, TestRequest};
    use actix_web::{App, HttpResponse, get, http::StatusCode};
    use chrono::Utc;
    use sqlx::postgres::PgPoolOptions;

    fn user_with(role: Role) -> UserRow {
        let now = Utc::now();
        UserRow {
            id: RecordId::generate(),
            name: "Test".into(),
            email: "test@example.com".into(),
            password_hash: String::new(),
            role,
            phone: None,
            location: None,
            bio: None,
            skills: vec![],
            resume_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn role_check_permits_listed_roles_only() {
        assert!(require_role(&user_with(Role::Admin), &[Role::Admin]).is_ok());
        assert!(require_role(&user_with(Role::User), &[Role::User, Role::Admin]).is_ok());
        assert!(matches!(
            require_role(&user_with(Role::User), &[Role::Admin]),
            Err(ApiError::Forbidden(_))
        ));
    }

    #[get("/me")]
    async fn me(AuthUser(user): AuthUser) -> HttpResponse {
        HttpResponse::Ok().body(user.name)
    }

    #[get("/admin")]
    async fn admin_only(AdminUser(user): AdminUser) -> HttpResponse {
        HttpResponse::Ok().body(user.name)
    }

    #[actix_web::test]
    async fn requests_without_valid_token_are_unauthenticated() {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .unwrap();
        let app = init_service(
            App::new()
                .app_data(web::Data::new(TokenKeys::new("secret", 1)))
                .app_data(web::Data::new(pool))
                .service(me)
                .service(admin_only),
        )
        .await;

        let resp = call_service(&app, TestRequest::get().uri("/me").to_request()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let resp = call_service(&app, TestRequest::get().uri("/admin").to_request()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let forged = TokenKeys::new("other-secret", 1)
            .issue(&RecordId::generate())
            .unwrap();
        let req = TestRequest::get()
            .uri("/me")
            .insert_header(("Authorization", format!("Bearer {}", forged)))
            .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    fn bearer(keys: &TokenKeys, user: &UserRow) -> (&'static str, String) {
        ("Authorization", format!("Bearer {}", keys.issue(&user.id).unwrap()))
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn admin_routes_check_the_stored_role(pool: Pool<Postgres>) {
        let keys = TokenKeys::new("secret", 1);
        let ada = account(&pool, "Ada", Role::User).await;
        let boss = account(&pool, "Boss", Role::Admin).await;
        let gone = account(&pool, "Gone", Role::User).await;
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(&gone.id)
            .execute(&pool)
            .await
            .unwrap();

        let app = init_service(
            App::new()
                .app_data(web::Data::new(keys.clone()))
                .app_data(web::Data::new(pool.clone()))
                .service(me)
                .service(admin_only),
        )
        .await;

        let req = TestRequest::get().uri("/admin").insert_header(bearer(&keys, &ada)).to_request();
        assert_eq!(call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        let req = TestRequest::get().uri("/me").insert_header(bearer(&keys, &ada)).to_request();
        assert_eq!(call_service(&app, req).await.status(), StatusCode::OK);

        let req = TestRequest::get().uri("/admin").insert_header(bearer(&keys, &boss)).to_request();
        assert_eq!(call_service(&app, req).await.status(), StatusCode::OK);

        // A valid signature is not enough once the account is gone
        let req = TestRequest::get().uri("/me").insert_header(bearer(&keys, &gone)).to_request();
        assert_eq!(call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
    }
}

use actix_web::web;
use sqlx::{Pool, Postgres};
use tracing::{info, warn};

use super::models::{AuthResponse, LoginRequest, RegisterRequest, UpdateProfileRequest};
use super::password::{hash_password, verify_password};
use super::token::TokenKeys;
use crate::api::error::{ApiError, ApiResult};
use crate::api::validation::validate;
use crate::db::models::UserRow;
use crate::db::user_repository::{NewUser, ProfileChanges, UserRepository};

/// Registration, login and self-service profile logic
pub struct AuthService {
    pool: Pool<Postgres>,
    keys: TokenKeys,
}

impl AuthService {
    pub fn new(pool: Pool<Postgres>, keys: TokenKeys) -> Self {
        Self { pool, keys }
    }

    /// Create an account and sign a token for it
    pub async fn register(&self, req: RegisterRequest) -> ApiResult<AuthResponse> {
        let user = self.create_account(req).await?;
        let token = self.keys.issue(&user.id)?;

        Ok(AuthResponse { token, user })
    }

    /// Shared by registration and the `create-admin` command
    ///
    /// The password is hashed here, before the record reaches the store.
    pub async fn create_account(&self, req: RegisterRequest) -> ApiResult<UserRow> {
        let req = req.normalized();
        validate(&req)?;

        let role = req.role.unwrap_or_default();
        info!("Service: Registering user email={} role={:?}", req.email, role);

        if UserRepository::find_by_email(&self.pool, &req.email).await?.is_some() {
            warn!("Service: Registration rejected, email {} already in use", req.email);
            return Err(ApiError::invalid("User already exists with this email"));
        }

        let password = req.password;
        let password_hash = web::block(move || hash_password(&password)).await??;

        let user = UserRepository::create(
            &self.pool,
            NewUser {
                name: &req.name,
                email: &req.email,
                password_hash: &password_hash,
                role,
            },
        )
        .await?;

        info!("Service: User registered with id={}", user.id);
        Ok(user)
    }

    pub async fn login(&self, req: LoginRequest) -> ApiResult<AuthResponse> {
        let req = req.normalized();
        validate(&req)?;
        let invalid = || ApiError::invalid("Invalid credentials");

        let user = UserRepository::find_by_email(&self.pool, &req.email)
            .await?
            .ok_or_else(invalid)?;

        let hash = user.password_hash.clone();
        let password = req.password;
        let matches = web::block(move || verify_password(&password, &hash)).await??;

        if !matches {
            warn!("Service: Failed login for user id={}", user.id);
            return Err(invalid());
        }

        let token = self.keys.issue(&user.id)?;
        info!("Service: User id={} logged in", user.id);
        Ok(AuthResponse { token, user })
    }

    pub async fn update_profile(&self, user: &UserRow, req: UpdateProfileRequest) -> ApiResult<UserRow> {
        let req = req.normalized();
        validate(&req)?;

        let changes = ProfileChanges {
            name: req.name,
            phone: req.phone,
            location: req.location,
            bio: req.bio,
            skills: req.skills,
            resume_url: req.resume_url,
        };

        let updated = UserRepository::update_profile(&self.pool, &user.id, &changes)
            .await?
            .ok_or_else(|| ApiError::not_found("User not found"))?;

        info!("Service: Profile updated for user id={}", updated.id);
        Ok(updated)
    }
}

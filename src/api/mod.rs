pub mod admin;
pub mod application;
pub mod auth;
pub mod error;
pub mod health;
pub mod job;
pub mod pagination;
pub mod validation;

use actix_web::web;

/// Every route under `/api`
pub fn api_config(config: &mut web::ServiceConfig) {
    config.service(
        web::scope("/api")
            .configure(health::health_config)
            .configure(auth::handlers::auth_config)
            .configure(job::handlers::job_config)
            .configure(application::handlers::application_config)
            .configure(admin::handlers::admin_config),
    );
}

use actix_web::{HttpResponse, Responder, get, web};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Pool, Postgres};
use tracing::error;

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    timestamp: DateTime<Utc>,
    database: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl HealthResponse {
    fn new(status: &str, database: &str, error: Option<String>) -> Self {
        Self {
            status: status.to_string(),
            timestamp: Utc::now(),
            database: database.to_string(),
            error,
        }
    }
}

async fn ping(pool: &Pool<Postgres>) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await.map(|_| ())
}

/// Health check endpoint
///
/// Reports liveness with a timestamp plus database connectivity. The
/// process is up even when the database is not, so this always returns 200.
#[get("/health")]
async fn health_check(pool: web::Data<Pool<Postgres>>) -> impl Responder {
    match ping(pool.get_ref()).await {
        Ok(_) => HttpResponse::Ok().json(HealthResponse::new("ok", "connected", None)),
        Err(e) => {
            error!("Health check: database unreachable: {:?}", e);
            HttpResponse::Ok().json(HealthResponse::new(
                "ok",
                "disconnected",
                Some(format!("Database error: {}", e)),
            ))
        }
    }
}

/// Readiness check endpoint
///
/// Returns 503 while the database is unavailable; the process recovers on
/// its own when it comes back.
#[get("/health/ready")]
async fn readiness_check(pool: web::Data<Pool<Postgres>>) -> impl Responder {
    match ping(pool.get_ref()).await {
        Ok(_) => HttpResponse::Ok().json(HealthResponse::new("ready", "connected", None)),
        Err(e) => {
            error!("Readiness check failed: database unavailable: {:?}", e);
            HttpResponse::ServiceUnavailable().json(HealthResponse::new(
                "not_ready",
                "disconnected",
                Some(format!("Database unavailable: {}", e)),
            ))
        }
    }
}

/// Liveness check endpoint
///
/// Simple check that the process is alive. Does not check dependencies.
#[get("/health/live")]
async fn liveness_check() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse::new("alive", "not_checked", None))
}

pub fn health_config(config: &mut web::ServiceConfig) {
    config
        .service(health_check)
        .service(readiness_check)
        .service(liveness_check);
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::{call_service, init_service, read_body_json, TestRequest};
    use actix_web::{App, http::StatusCode};

    #[actix_web::test]
    async fn liveness_reports_alive_with_timestamp() {
        let app = init_service(App::new().configure(health_config)).await;

        let resp = call_service(&app, TestRequest::get().uri("/health/live").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: serde_json::Value = read_body_json(resp).await;
        assert_eq!(body["status"], "alive");
        assert!(body["timestamp"].as_str().is_some());
    }
}

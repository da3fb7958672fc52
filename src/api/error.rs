use actix_web::{
    HttpResponse, ResponseError,
    dev::ServiceResponse,
    http::StatusCode,
    middleware::{Condition, ErrorHandlerResponse, ErrorHandlers},
};
use std::fmt;
use tracing::{error, warn};

use crate::api::validation::ErrorResponse;
use crate::db::id::InvalidRecordId;

const INTERNAL_MESSAGE: &str = "Internal server error";

/// Errors surfaced by every route handler
#[derive(Debug)]
pub enum ApiError {
    /// Missing, malformed or expired bearer token, or its account is gone
    Unauthenticated(String),

    /// Authenticated but lacking the role or ownership required
    Forbidden(String),

    /// Referenced record does not exist
    NotFound(String),

    /// Bad enum value, malformed identifier, missing field, duplicate submission
    InvalidArgument(String),

    /// Unique constraint rejected the write
    Conflict(String),

    /// Anything unexpected
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn unauthenticated(msg: impl Into<String>) -> Self {
        ApiError::Unauthenticated(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        ApiError::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        ApiError::NotFound(msg.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        ApiError::InvalidArgument(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        ApiError::Conflict(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        ApiError::Internal(msg.into())
    }

    fn summary(&self) -> &'static str {
        match self {
            ApiError::Unauthenticated(_) => "Unauthorized",
            ApiError::Forbidden(_) => "Forbidden",
            ApiError::NotFound(_) => "Not found",
            ApiError::InvalidArgument(_) => "Invalid request",
            ApiError::Conflict(_) => "Duplicate entry",
            ApiError::Internal(_) => "Failed to process request",
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Unauthenticated(msg) => write!(f, "Unauthenticated: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidArgument(_) | ApiError::Conflict(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let (message, detail) = match self {
            ApiError::Internal(msg) => {
                error!("Internal error: {}", msg);
                (INTERNAL_MESSAGE.to_string(), Some(msg.clone()))
            }
            ApiError::Unauthenticated(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::InvalidArgument(msg)
            | ApiError::Conflict(msg) => {
                warn!("{}", self);
                (msg.clone(), None)
            }
        };

        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.summary().to_string(),
            fields: serde_json::json!({ "message": message }),
            detail,
        })
    }
}

fn redact_detail<B>(res: ServiceResponse<B>) -> actix_web::Result<ErrorHandlerResponse<B>> {
    let (req, _) = res.into_parts();
    let response = HttpResponse::InternalServerError().json(ErrorResponse {
        error: ApiError::Internal(String::new()).summary().to_string(),
        fields: serde_json::json!({ "message": INTERNAL_MESSAGE }),
        detail: None,
    });
    Ok(ErrorHandlerResponse::Response(
        ServiceResponse::new(req, response).map_into_right_body(),
    ))
}

/// Rewrite 500 responses to the bare envelope when `enabled`
///
/// Registered in production so internal detail never reaches clients.
pub fn redact_internal_errors<B: 'static>(enabled: bool) -> Condition<ErrorHandlers<B>> {
    Condition::new(
        enabled,
        ErrorHandlers::new().handler(StatusCode::INTERNAL_SERVER_ERROR, redact_detail),
    )
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => ApiError::not_found("Resource not found"),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                ApiError::conflict("A record with the same unique fields already exists")
            }
            sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                ApiError::not_found("Referenced record not found")
            }
            _ => ApiError::internal(format!("Database error: {}", err)),
        }
    }
}

impl From<InvalidRecordId> for ApiError {
    fn from(err: InvalidRecordId) -> Self {
        ApiError::invalid(err.to_string())
    }
}

impl From<actix_web::error::BlockingError> for ApiError {
    fn from(err: actix_web::error::BlockingError) -> Self {
        ApiError::internal(format!("Blocking task failed: {}", err))
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::internal(format!("I/O error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use actix_web::test::{call_service, init_service, read_body_json, TestRequest};
    use actix_web::{App, web};

    async fn failing() -> Result<HttpResponse, ApiError> {
        Err(ApiError::internal("connection pool exhausted"))
    }

    #[test]
    fn taxonomy_maps_to_status_codes() {
        assert_eq!(ApiError::unauthenticated("x").status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::forbidden("x").status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::not_found("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::invalid("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::conflict("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::internal("x").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn row_not_found_becomes_not_found() {
        let err: ApiError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[test]
    fn malformed_identifier_is_invalid_argument() {
        let err: ApiError = "zzz".parse::<crate::db::id::RecordId>().unwrap_err().into();
        assert!(matches!(err, ApiError::InvalidArgument(_)));
    }

    #[actix_web::test]
    async fn error_body_carries_message() {
        let resp = ApiError::forbidden("Admin access required").error_response();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let body = to_bytes(resp.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Forbidden");
        assert_eq!(json["fields"]["message"], "Admin access required");
        assert!(json.get("detail").is_none());
    }

    #[actix_web::test]
    async fn internal_detail_is_hidden_only_when_redacting() {
        for (production, expect_detail) in [(true, false), (false, true)] {
            let app = init_service(
                App::new()
                    .wrap(redact_internal_errors(production))
                    .route("/fail", web::get().to(failing)),
            )
            .await;

            let resp = call_service(&app, TestRequest::get().uri("/fail").to_request()).await;
            assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

            let json: serde_json::Value = read_body_json(resp).await;
            assert_eq!(json["fields"]["message"], "Internal server error");
            assert_eq!(json.get("detail").is_some(), expect_detail);
        }
    }
}

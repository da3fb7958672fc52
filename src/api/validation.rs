use actix_web::{HttpResponse, error::JsonPayloadError, web};
use serde::Serialize;
use validator::ValidationErrors;

use crate::api::error::ApiError;

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub fields: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Per-field messages keyed by field name
fn field_messages(validation_errors: &ValidationErrors) -> serde_json::Map<String, serde_json::Value> {
    let mut fields = serde_json::Map::new();
    for (field, errors) in validation_errors.field_errors() {
        let messages: Vec<String> = errors
            .iter()
            .map(|e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Validation error in field: {}", field))
            })
            .collect();
        fields.insert(field.to_string(), serde_json::json!({ "errors": messages }));
    }
    fields
}

/// Flatten validation errors into one human readable line
pub fn summarize(validation_errors: &ValidationErrors) -> String {
    let mut messages: Vec<String> = validation_errors
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value for {}", field))
            })
        })
        .collect();
    messages.sort();
    messages.join("; ")
}

/// Run `validator` rules on a value built outside a validating extractor
pub fn validate<T: validator::Validate>(value: &T) -> Result<(), ApiError> {
    value
        .validate()
        .map_err(|errors| ApiError::invalid(summarize(&errors)))
}

fn bad_request(error: &str, fields: serde_json::Map<String, serde_json::Value>) -> actix_web::Error {
    let error_response = ErrorResponse {
        error: error.to_string(),
        fields: serde_json::Value::Object(fields),
        detail: None,
    };
    actix_web::error::InternalError::from_response("", HttpResponse::BadRequest().json(error_response))
        .into()
}

/// Map a body that failed to deserialize to a readable message
fn deserialize_failure(err_string: String) -> actix_web::Error {
    let message = if err_string.contains("EOF while parsing") {
        "Request body is empty. Expected JSON payload".to_string()
    } else if err_string.contains("unknown variant") {
        "Invalid enum value. Check allowed values for this field".to_string()
    } else if err_string.contains("Invalid ID format") {
        "Invalid ID format".to_string()
    } else {
        err_string
    };

    let mut fields = serde_json::Map::new();
    fields.insert("message".to_string(), serde_json::json!(message));
    bad_request("Request validation failed", fields)
}

fn handle_validator_error(err: actix_web_validator::Error) -> actix_web::Error {
    match err {
        actix_web_validator::Error::Validate(validation_errors) => {
            bad_request("Validation failed", field_messages(&validation_errors))
        }
        actix_web_validator::Error::Deserialize(de_err) => deserialize_failure(de_err.to_string()),
        other => {
            let mut fields = serde_json::Map::new();
            fields.insert("message".to_string(), serde_json::json!(other.to_string()));
            bad_request("Validation failed", fields)
        }
    }
}

/// Creates a configured JsonConfig with standardized error handling for the entire project
pub fn json_config(limit: usize) -> actix_web_validator::JsonConfig {
    actix_web_validator::JsonConfig::default()
        .limit(limit)
        .error_handler(|err, _req| handle_validator_error(err))
}

/// Config for plain `web::Json` bodies that are normalised before validation
pub fn body_config(limit: usize) -> web::JsonConfig {
    web::JsonConfig::default().limit(limit).error_handler(|err, _req| match err {
        JsonPayloadError::Deserialize(de_err) => deserialize_failure(de_err.to_string()),
        other => {
            let mut fields = serde_json::Map::new();
            fields.insert("message".to_string(), serde_json::json!(other.to_string()));
            bad_request("Request validation failed", fields)
        }
    })
}

/// Query-string counterpart of [`json_config`]
pub fn query_config() -> actix_web_validator::QueryConfig {
    actix_web_validator::QueryConfig::default().error_handler(|err, _req| handle_validator_error(err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::{call_service, init_service, read_body_json, TestRequest};
    use actix_web::{App, HttpResponse, http::StatusCode, post};
    use serde::Deserialize;
    use validator::Validate;

    #[derive(Debug, Deserialize, Validate)]
    struct NameBody {
        #[validate(length(min = 2, message = "Name must be at least 2 characters"))]
        name: String,
    }

    #[post("/names")]
    async fn create_name(body: actix_web_validator::Json<NameBody>) -> HttpResponse {
        HttpResponse::Ok().body(body.name.clone())
    }

    #[post("/plain")]
    async fn create_plain(body: web::Json<NameBody>) -> HttpResponse {
        HttpResponse::Ok().body(body.name.clone())
    }

    #[actix_web::test]
    async fn invalid_field_is_reported_per_field() {
        let app = init_service(App::new().app_data(json_config(1024)).service(create_name)).await;

        let req = TestRequest::post()
            .uri("/names")
            .set_json(serde_json::json!({ "name": "a" }))
            .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: serde_json::Value = read_body_json(resp).await;
        assert_eq!(body["error"], "Validation failed");
        assert_eq!(
            body["fields"]["name"]["errors"][0],
            "Name must be at least 2 characters"
        );
    }

    #[actix_web::test]
    async fn valid_body_passes_through() {
        let app = init_service(App::new().app_data(json_config(1024)).service(create_name)).await;

        let req = TestRequest::post()
            .uri("/names")
            .set_json(serde_json::json!({ "name": "Ada" }))
            .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn plain_json_errors_use_the_same_envelope() {
        let app = init_service(App::new().app_data(body_config(1024)).service(create_plain)).await;

        let req = TestRequest::post()
            .uri("/plain")
            .insert_header(("Content-Type", "application/json"))
            .set_payload("{\"nom\": 1}")
            .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: serde_json::Value = read_body_json(resp).await;
        assert_eq!(body["error"], "Request validation failed");
        assert!(body["fields"]["message"].as_str().is_some());

        // Rules are not applied by the plain extractor
        let req = TestRequest::post()
            .uri("/plain")
            .set_json(serde_json::json!({ "name": "a" }))
            .to_request();
        assert_eq!(call_service(&app, req).await.status(), StatusCode::OK);
    }

    #[test]
    fn summarize_joins_messages() {
        let body = NameBody { name: "x".into() };
        let errors = body.validate().unwrap_err();
        assert_eq!(summarize(&errors), "Name must be at least 2 characters");
    }
}

//! Error envelopes returned by every endpoint

use axum::{
    extract::{rejection::JsonRejection, FromRequest},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error};

use med_records_domain::auth::AuthFailure;
use med_records_domain::services::{ServiceError, ValidationFailure};

/// Errors that handlers turn into HTTP responses
#[derive(Debug, Error)]
pub enum ApiError {
    /// 400 with `{"error": <field errors>}`
    #[error("Validation failed")]
    Validation(ValidationFailure),

    /// 400 with `{"error": {"non_field_errors": [..]}}`
    #[error("Malformed request body: {0}")]
    MalformedBody(String),

    /// 401 with `{"detail", "code"}`
    #[error("Unauthorized: {}", .0.detail)]
    Unauthorized(AuthFailure),

    /// 403 with `{"detail"}`
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// 404 with `{"detail": "Not found."}`
    #[error("Not found")]
    NotFound,

    /// 500 with `{"error": "Something went wrong", "details"}`
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(failure) => ApiError::Validation(failure),
            ServiceError::Authentication(failure) => ApiError::Unauthorized(failure),
            ServiceError::Forbidden(detail) => ApiError::Forbidden(detail),
            ServiceError::NotFound(what) => {
                debug!("Not found: {}", what);
                ApiError::NotFound
            }
            ServiceError::Unexpected(details) => ApiError::Internal(details),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::MalformedBody(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(failure) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": failure }))).into_response()
            }
            ApiError::MalformedBody(message) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": { "non_field_errors": [message] } })),
            )
                .into_response(),
            ApiError::Unauthorized(failure) => failure.into_response(),
            ApiError::Forbidden(detail) => {
                (StatusCode::FORBIDDEN, Json(json!({ "detail": detail }))).into_response()
            }
            ApiError::NotFound => {
                (StatusCode::NOT_FOUND, Json(json!({ "detail": "Not found." }))).into_response()
            }
            ApiError::Internal(details) => {
                error!("Request failed: {}", details);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Something went wrong", "details": details })),
                )
                    .into_response()
            }
        }
    }
}

/// `axum::Json` whose rejections use the [`ApiError`] envelope
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Fallback for unmatched routes
pub async fn not_found() -> ApiError {
    ApiError::NotFound
}

#[cfg(test)]
mod tests {
    use super::*;
    use med_records_domain::services::FieldErrors;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_batch_validation_envelope() {
        let mut second = FieldErrors::new();
        second.insert("age".to_string(), vec!["This field is required.".to_string()]);
        let failure = ValidationFailure::Batch(vec![FieldErrors::new(), second]);

        let response = ApiError::Validation(failure).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({ "error": [{}, { "age": ["This field is required."] }] })
        );
    }

    #[tokio::test]
    async fn test_unexpected_error_envelope() {
        let response = ApiError::from(ServiceError::Unexpected("disk full".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await,
            json!({ "error": "Something went wrong", "details": "disk full" })
        );
    }

    #[tokio::test]
    async fn test_not_found_and_forbidden_envelopes() {
        let response = ApiError::from(ServiceError::NotFound("Patient 7".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await, json!({ "detail": "Not found." }));

        let response = ApiError::from(ServiceError::permission_denied()).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            body_json(response).await,
            json!({ "detail": "You do not have permission to perform this action." })
        );
    }
}

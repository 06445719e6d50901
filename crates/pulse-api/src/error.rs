use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::provider::ProviderError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Every failure a handler can produce. Converted into a status code and a
/// JSON body at the handler boundary; nothing escapes past it.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Authentication provider error: {0}")]
    AuthProvider(#[from] ProviderError),

    #[error("You have already responded to this request")]
    DuplicateResponse,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Not authorized")]
    Forbidden,

    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    #[error("{0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        ApiError::Validation(vec![FieldError::new(field, message)])
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotAuthenticated => StatusCode::UNAUTHORIZED,
            ApiError::AuthProvider(_) => StatusCode::BAD_GATEWAY,
            ApiError::DuplicateResponse => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::NotAuthenticated => "not_authenticated",
            ApiError::AuthProvider(_) => "auth_provider_error",
            ApiError::DuplicateResponse => "duplicate_response",
            ApiError::NotFound(_) => "not_found",
            ApiError::Forbidden => "forbidden",
            ApiError::Validation(_) => "validation_error",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Internal(_) => "internal_error",
        }
    }
}

/// A body that parsed as JSON but not as the expected shape is a validation
/// failure; anything else (bad syntax, wrong content type) is a bad request.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(e) => {
                ApiError::Validation(vec![FieldError::new("body", e.body_text())])
            }
            other => ApiError::BadRequest(other.body_text()),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    fields: Vec<FieldError>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        // Internal details are logged, never sent to the client.
        let (message, fields) = match self {
            ApiError::Internal(e) => {
                error!("Internal error: {:#}", e);
                ("Internal server error".to_string(), Vec::new())
            }
            ApiError::AuthProvider(e) => {
                warn!("Auth provider error: {}", e);
                (
                    "Login could not be completed, please try again".to_string(),
                    Vec::new(),
                )
            }
            ApiError::Validation(fields) => {
                debug!("Validation failed: {:?}", fields);
                ("Validation failed".to_string(), fields)
            }
            other => {
                debug!("Request failed: {}", other);
                (other.to_string(), Vec::new())
            }
        };

        let body = ErrorBody {
            error: code,
            message,
            fields,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn validation_errors_list_fields() {
        let (status, body) = body_json(ApiError::Validation(vec![
            FieldError::new("units_needed", "must be between 1 and 10"),
            FieldError::new("city", "is required"),
        ]))
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "validation_error");
        assert_eq!(body["fields"][0]["field"], "units_needed");
        assert_eq!(body["fields"][1]["message"], "is required");
    }

    #[tokio::test]
    async fn internal_errors_hide_details() {
        let (status, body) =
            body_json(ApiError::Internal(anyhow::anyhow!("disk on fire at /var/db"))).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Internal server error");
        assert!(body.get("fields").is_none());
    }

    #[tokio::test]
    async fn bad_request_keeps_its_message() {
        let message = "Expected request with `Content-Type: application/json`";
        let (status, body) = body_json(ApiError::BadRequest(message.into())).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "bad_request");
        assert_eq!(body["message"], message);
    }

    #[test]
    fn taxonomy_maps_to_statuses() {
        assert_eq!(ApiError::NotAuthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::DuplicateResponse.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::NotFound("Request").status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::AuthProvider(ProviderError::Rejected(401)).status(),
            StatusCode::BAD_GATEWAY
        );
    }
}

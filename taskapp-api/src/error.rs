/// Error handling for the API server
///
/// All handlers return `Result<T, ApiError>`; the error turns itself into a
/// status code and a JSON body of the form
///
/// ```json
/// { "error": "Validation failed", "details": [{ "field": "email", "message": "Email is invalid" }] }
/// ```
///
/// where `details` is present only for validation failures.
///
/// # Example
///
/// ```
/// use taskapp_api::error::{ApiError, ApiResult};
/// use axum::Json;
/// use serde_json::{json, Value};
///
/// async fn handler(found: bool) -> ApiResult<Json<Value>> {
///     if !found {
///         return Err(ApiError::NotFound("Task not found".to_string()));
///     }
///     Ok(Json(json!({ "ok": true })))
/// }
/// ```

use axum::{
    extract::multipart::{MultipartError, MultipartRejection},
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use taskapp_shared::auth::middleware::{AuthError, UNAUTHENTICATED_MESSAGE};
use taskapp_shared::error::{FieldError, ServiceError};
use taskapp_shared::store::StoreError;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Malformed or missing field (400)
    ValidationError(Vec<FieldError>),

    /// Unparseable request (400)
    BadRequest(String),

    /// Patch with a key outside the allow-list (400)
    InvalidUpdateProperty,

    /// Wrong email or password (401)
    AuthenticationFailed,

    /// Missing, invalid or revoked session (401)
    Unauthenticated,

    /// Absent or not owned by the caller (404)
    NotFound(String),

    /// Avatar rejected by the file filter (400)
    UnsupportedMediaType(String),

    /// Upload over the size limit (413)
    PayloadTooLarge(String),

    /// Persistence failure (500)
    StoreUnavailable(String),

    /// Anything else (500)
    InternalError(String),
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub error: String,

    /// Field-level validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::ValidationError(_)
            | ApiError::BadRequest(_)
            | ApiError::InvalidUpdateProperty
            | ApiError::UnsupportedMediaType(_) => StatusCode::BAD_REQUEST,
            ApiError::AuthenticationFailed | ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::StoreUnavailable(_) | ApiError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::InvalidUpdateProperty => write!(f, "Invalid update property"),
            ApiError::AuthenticationFailed => write!(f, "Unable to login"),
            ApiError::Unauthenticated => write!(f, "{}", UNAUTHENTICATED_MESSAGE),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::UnsupportedMediaType(msg) => write!(f, "Unsupported media type: {}", msg),
            ApiError::PayloadTooLarge(msg) => write!(f, "Payload too large: {}", msg),
            ApiError::StoreUnavailable(msg) => write!(f, "Store unavailable: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let (message, details) = match self {
            ApiError::ValidationError(errors) => ("Validation failed".to_string(), Some(errors)),
            ApiError::BadRequest(msg) => (msg, None),
            ApiError::InvalidUpdateProperty => ("Invalid update property".to_string(), None),
            ApiError::AuthenticationFailed => ("Unable to login".to_string(), None),
            ApiError::Unauthenticated => (UNAUTHENTICATED_MESSAGE.to_string(), None),
            ApiError::NotFound(msg) => (msg, None),
            ApiError::UnsupportedMediaType(msg) => (msg, None),
            ApiError::PayloadTooLarge(msg) => (msg, None),
            ApiError::StoreUnavailable(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!("Store unavailable: {}", msg);
                ("Internal server error".to_string(), None)
            }
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                ("Internal server error".to_string(), None)
            }
        };

        let body = Json(ErrorResponse {
            error: message,
            details,
        });

        (status, body).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(details) => ApiError::ValidationError(details),
            ServiceError::InvalidUpdateProperty => ApiError::InvalidUpdateProperty,
            ServiceError::AuthenticationFailed => ApiError::AuthenticationFailed,
            ServiceError::NotFound => ApiError::NotFound("Not found".to_string()),
            ServiceError::UnsupportedMediaType(msg) => ApiError::UnsupportedMediaType(msg),
            ServiceError::PayloadTooLarge => ApiError::PayloadTooLarge("File too large".to_string()),
            ServiceError::Store(err) => err.into(),
            ServiceError::Password(err) => {
                ApiError::InternalError(format!("Password operation failed: {}", err))
            }
            ServiceError::Token(err) => {
                ApiError::InternalError(format!("Token operation failed: {}", err))
            }
            ServiceError::Internal(msg) => ApiError::InternalError(msg),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail => ApiError::ValidationError(vec![FieldError::new(
                "email",
                "Email is already in use",
            )]),
            StoreError::Database(err) => ApiError::StoreUnavailable(err.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Store(err) => ApiError::StoreUnavailable(err.to_string()),
            _ => ApiError::Unauthenticated,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(format!("Invalid request: {}", rejection.body_text()))
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge("File too large".to_string())
        } else {
            ApiError::BadRequest(format!("Invalid upload: {}", err.body_text()))
        }
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::BadRequest(format!("Invalid upload: {}", rejection.body_text()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskapp_shared::auth::jwt::JwtError;

    #[test]
    fn test_error_display() {
        let err = ApiError::BadRequest("Invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: Invalid input");

        assert_eq!(ApiError::AuthenticationFailed.to_string(), "Unable to login");
        assert_eq!(ApiError::Unauthenticated.to_string(), "Please authenticate");
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::ValidationError(vec![]).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::InvalidUpdateProperty.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::UnsupportedMediaType("x".to_string()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::AuthenticationFailed.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::NotFound("x".to_string()).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::PayloadTooLarge("x".to_string()).status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            ApiError::StoreUnavailable("x".to_string()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_service_error_conversion() {
        let err: ApiError = ServiceError::AuthenticationFailed.into();
        assert!(matches!(err, ApiError::AuthenticationFailed));

        let err: ApiError = ServiceError::Store(StoreError::DuplicateEmail).into();
        match err {
            ApiError::ValidationError(details) => assert_eq!(details[0].field, "email"),
            other => panic!("unexpected error: {:?}", other),
        }

        let err: ApiError = ServiceError::PayloadTooLarge.into();
        assert_eq!(err.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn test_auth_errors_collapse_to_unauthenticated() {
        let err: ApiError = AuthError::UnknownSession.into();
        assert!(matches!(err, ApiError::Unauthenticated));

        let err: ApiError = AuthError::InvalidToken(JwtError::Expired).into();
        assert!(matches!(err, ApiError::Unauthenticated));
    }

    #[test]
    fn test_error_body_shape() {
        let body = serde_json::to_value(ErrorResponse {
            error: "Invalid update property".to_string(),
            details: None,
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({ "error": "Invalid update property" }));
    }
}

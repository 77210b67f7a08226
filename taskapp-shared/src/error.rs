/// Common error types for the domain services
///
/// Every operation in [`crate::accounts`] and [`crate::tasks`] returns a
/// [`ServiceError`]. The lower-level modules keep their own error enums and
/// are folded into this one with `From` conversions, so the HTTP layer only
/// has a single type to translate into status codes.

use serde::{Deserialize, Serialize};
use validator::ValidationErrors;

use crate::auth::jwt::JwtError;
use crate::auth::password::PasswordError;
use crate::avatar::AvatarError;
use crate::models::patch::PatchError;
use crate::store::StoreError;

/// Result alias for domain service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

/// A single field-level validation failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Field that failed validation
    pub field: String,

    /// Human-readable message
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Error returned by the account lifecycle and task access services
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Malformed or missing field
    #[error("Validation failed: {} errors", .0.len())]
    Validation(Vec<FieldError>),

    /// Patch contains a key outside the entity's updatable fields
    #[error("Invalid update property")]
    InvalidUpdateProperty,

    /// Unknown email or wrong password
    #[error("Unable to login")]
    AuthenticationFailed,

    /// Resource absent, or not owned by the caller
    #[error("Not found")]
    NotFound,

    /// Avatar upload rejected by the file filter or the decoder
    #[error("{0}")]
    UnsupportedMediaType(String),

    /// Avatar upload exceeds the size limit
    #[error("File too large")]
    PayloadTooLarge,

    /// Persistence failure
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Password hashing failure
    #[error(transparent)]
    Password(#[from] PasswordError),

    /// Token signing failure
    #[error(transparent)]
    Token(#[from] JwtError),

    /// Anything else that should surface as a 500
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Shorthand for a single-field validation error
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        ServiceError::Validation(vec![FieldError::new(field, message)])
    }
}

impl From<ValidationErrors> for ServiceError {
    fn from(errors: ValidationErrors) -> Self {
        let mut details: Vec<FieldError> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| {
                    FieldError::new(
                        field.to_string(),
                        error
                            .message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| "Validation failed".to_string()),
                    )
                })
            })
            .collect();

        // HashMap iteration order is unstable
        details.sort_by(|a, b| a.field.cmp(&b.field));
        ServiceError::Validation(details)
    }
}

impl From<PatchError> for ServiceError {
    fn from(err: PatchError) -> Self {
        match err {
            PatchError::InvalidProperty(_) => ServiceError::InvalidUpdateProperty,
            PatchError::NotAnObject => {
                ServiceError::invalid("body", "Request body must be a JSON object")
            }
            PatchError::NullValue(field) => {
                ServiceError::invalid(field, "Value cannot be null")
            }
            PatchError::Malformed(msg) => ServiceError::invalid("body", msg),
        }
    }
}

impl From<AvatarError> for ServiceError {
    fn from(err: AvatarError) -> Self {
        match err {
            AvatarError::TooLarge { .. } => ServiceError::PayloadTooLarge,
            AvatarError::UnsupportedType | AvatarError::Decode(_) => {
                ServiceError::UnsupportedMediaType(err.to_string())
            }
            AvatarError::Encode(msg) => ServiceError::Internal(msg),
        }
    }
}

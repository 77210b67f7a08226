/// Allow-listed partial updates
///
/// PATCH bodies arrive as arbitrary JSON objects. Each patchable entity
/// declares the exact set of keys a client may touch; the body is checked
/// against that set before anything is deserialized, so a single stray key
/// rejects the whole update and no field is applied.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Error produced while checking a patch body
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatchError {
    /// Body is not a JSON object
    #[error("Patch body must be a JSON object")]
    NotAnObject,

    /// Key outside the allow-list
    #[error("Invalid update property: {0}")]
    InvalidProperty(String),

    /// An allowed key was explicitly set to null
    #[error("Field {0} cannot be null")]
    NullValue(String),

    /// Allowed keys with values of the wrong type
    #[error("{0}")]
    Malformed(String),
}

/// An entity patch with a statically declared set of mutable fields
pub trait Patch: DeserializeOwned {
    /// Keys a client is allowed to send
    const FIELDS: &'static [&'static str];

    /// Checks `body` against [`Patch::FIELDS`] and deserializes it
    fn from_json(body: Value) -> Result<Self, PatchError> {
        let object = match body {
            Value::Object(object) => object,
            _ => return Err(PatchError::NotAnObject),
        };

        check_keys(&object, Self::FIELDS)?;

        serde_json::from_value(Value::Object(object))
            .map_err(|e| PatchError::Malformed(e.to_string()))
    }
}

/// Rejects the body if any key is outside `allowed` or set to null
pub fn check_keys(object: &Map<String, Value>, allowed: &[&str]) -> Result<(), PatchError> {
    if let Some(key) = object.keys().find(|key| !allowed.contains(&key.as_str())) {
        return Err(PatchError::InvalidProperty(key.clone()));
    }

    if let Some((key, _)) = object.iter().find(|(_, value)| value.is_null()) {
        return Err(PatchError::NullValue(key.clone()));
    }

    Ok(())
}

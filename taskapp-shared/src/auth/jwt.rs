/// Signed session tokens
///
/// Tokens are HS256 JWTs whose subject is the user's ID. Every token carries a
/// random `jti`, so two tokens issued in the same second for the same user are
/// still distinct strings. `exp` is only present when sessions are configured
/// to expire; without it a token stays valid until it is revoked (removed from
/// the user's active session list).
///
/// A valid signature is necessary but not sufficient: the session layer also
/// requires the token to be in the user's active list.
///
/// # Example
///
/// ```
/// use taskapp_shared::auth::jwt::{create_token, validate_token, Claims};
/// use uuid::Uuid;
///
/// let secret = "a-test-secret-that-is-at-least-32-chars";
/// let claims = Claims::new(Uuid::new_v4(), None);
///
/// let token = create_token(&claims, secret).unwrap();
/// let decoded = validate_token(&token, secret).unwrap();
/// assert_eq!(decoded.sub, claims.sub);
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Issuer claim stamped on every token
pub const ISSUER: &str = "taskapp";

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Bad signature, malformed token, wrong issuer, missing claims
    #[error("Invalid token: {0}")]
    Invalid(String),

    #[error("Token has expired")]
    Expired,
}

/// Session token claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: Uuid,

    /// Always [`ISSUER`]
    pub iss: String,

    /// Issued at (Unix seconds)
    pub iat: i64,

    /// Expiry (Unix seconds); absent when sessions never expire
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    /// Unique token ID
    pub jti: Uuid,
}

impl Claims {
    /// Claims for `user_id`, expiring after `ttl` if one is given
    pub fn new(user_id: Uuid, ttl: Option<Duration>) -> Self {
        let now = Utc::now();

        Self {
            sub: user_id,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: ttl.map(|ttl| (now + ttl).timestamp()),
            jti: Uuid::new_v4(),
        }
    }
}

/// Signs `claims` with HS256
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&Header::new(Algorithm::HS256), claims, &key)
        .map_err(|e| JwtError::CreateError(e.to_string()))
}

/// Checks signature, issuer and (if present) expiry, and returns the claims
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.set_required_spec_claims(&["sub", "iss"]);
    validation.validate_exp = true;
    validation.leeway = 0;

    let data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => JwtError::Expired,
        _ => JwtError::Invalid(e.to_string()),
    })?;

    Ok(data.claims)
}

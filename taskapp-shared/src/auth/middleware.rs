/// Authorization gate for Axum
///
/// Guards every route that needs a logged-in user. The gate reads the
/// `Authorization: Bearer <token>` header, resolves the token through the
/// [`SessionManager`], and on success inserts an [`AuthContext`] (the user
/// record plus the exact token presented) into the request extensions.
///
/// Every failure (no header, wrong scheme, bad signature, expired token,
/// deleted user, revoked token) produces the same response:
///
/// ```text
/// 401 {"error":"Please authenticate"}
/// ```
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use axum::{middleware, routing::get, Extension, Router};
/// use taskapp_shared::auth::middleware::{session_auth_middleware, AuthContext};
/// use taskapp_shared::auth::session::SessionManager;
///
/// async fn me(Extension(auth): Extension<AuthContext>) -> String {
///     auth.user.name
/// }
///
/// # fn build(sessions: Arc<SessionManager>) -> Router {
/// Router::new()
///     .route("/users/me", get(me))
///     .layer(middleware::from_fn_with_state(sessions, session_auth_middleware))
/// # }
/// ```

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error};

use super::jwt::JwtError;
use super::session::SessionManager;
use crate::models::user::User;
use crate::store::StoreError;

/// Message returned for every authentication failure
pub const UNAUTHENTICATED_MESSAGE: &str = "Please authenticate";

/// Authenticated caller, added to request extensions by the gate
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// The caller's user record
    pub user: User,

    /// The exact token that authenticated this request
    pub token: String,
}

/// Why the gate rejected a request
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing authorization header")]
    MissingCredentials,

    #[error("Invalid authorization header: {0}")]
    InvalidFormat(String),

    #[error(transparent)]
    InvalidToken(JwtError),

    /// Signature fine, but the user is gone or the token was revoked
    #[error("Session is not active")]
    UnknownSession,

    #[error(transparent)]
    Store(StoreError),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AuthError::Store(e) => {
                error!(error = %e, "Store failure during authentication");
                "Internal server error"
            }
            other => {
                debug!(reason = %other, "Rejected unauthenticated request");
                UNAUTHENTICATED_MESSAGE
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingCredentials)?
        .to_str()
        .map_err(|_| AuthError::InvalidFormat("Header is not valid ASCII".to_string()))?;

    let token = value
        .strip_prefix("Bearer ")
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))?
        .trim();

    if token.is_empty() {
        return Err(AuthError::InvalidFormat("Empty bearer token".to_string()));
    }

    Ok(token)
}

/// Session authentication middleware
///
/// Use with `axum::middleware::from_fn_with_state`.
pub async fn session_auth_middleware(
    State(sessions): State<Arc<SessionManager>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = bearer_token(req.headers())?.to_string();
    let context = sessions.authenticate(&token).await?;

    req.extensions_mut().insert(context);

    Ok(next.run(req).await)
}

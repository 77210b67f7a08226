/// Account endpoints
///
/// # Endpoints
///
/// - `POST /users` - Sign up and get a first session token
/// - `POST /users/login` - Log in and get an additional session token
/// - `POST /users/logout` - End the current session
/// - `POST /users/logoutAll` - End every session of the caller
/// - `GET /users/me` - Own profile
/// - `PATCH /users/me` - Update own profile
/// - `DELETE /users/me` - Delete own account and all its tasks
/// - `POST /users/me/avatar` - Upload an avatar (multipart field `avatar`)
/// - `DELETE /users/me/avatar` - Remove the avatar
/// - `GET /users/:id/avatar` - Anyone's avatar as PNG
///
/// Users are always serialized as [`UserProfile`]; password hashes, session
/// tokens and avatar bytes never appear in a JSON response.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{
        multipart::MultipartRejection,
        rejection::JsonRejection,
        Multipart, Path, State,
    },
    http::{header, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use taskapp_shared::{
    auth::middleware::AuthContext,
    avatar::AVATAR_CONTENT_TYPE,
    models::user::{Credentials, NewUser, UserProfile},
};
use uuid::Uuid;

/// Multipart field carrying the avatar file
pub const AVATAR_FIELD: &str = "avatar";

/// Signup and login response
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub user: UserProfile,

    /// Bearer token for the new session
    pub token: String,
}

/// Sign up
///
/// # Endpoint
///
/// ```text
/// POST /users
/// Content-Type: application/json
///
/// { "name": "Ann", "email": "a@x.com", "password": "longenough1", "age": 30 }
/// ```
///
/// # Response
///
/// `201 Created` with `{ "user": {...}, "token": "eyJ..." }`.
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed or email already in use
pub async fn signup(
    State(state): State<AppState>,
    body: Result<Json<NewUser>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(data) = body?;

    let (user, token) = state.accounts.signup(data).await?;

    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            user: user.into(),
            token,
        }),
    ))
}

/// Log in
///
/// Each successful login opens a new session next to the existing ones.
///
/// # Errors
///
/// - `401 Unauthorized`: `{"error":"Unable to login"}` for an unknown email
///   or a wrong password alike
pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<Credentials>, JsonRejection>,
) -> ApiResult<Json<SessionResponse>> {
    let Json(credentials) = body?;

    let (user, token) = state
        .accounts
        .login(&credentials.email, &credentials.password)
        .await?;

    Ok(Json(SessionResponse {
        user: user.into(),
        token,
    }))
}

/// End the session whose token authenticated this request
pub async fn logout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<StatusCode> {
    state.accounts.logout(auth.user.id, &auth.token).await?;
    Ok(StatusCode::OK)
}

/// End every session of the caller, including the current one
pub async fn logout_all(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<StatusCode> {
    state.accounts.logout_all(auth.user.id).await?;
    Ok(StatusCode::OK)
}

pub async fn me(Extension(auth): Extension<AuthContext>) -> Json<UserProfile> {
    Json(UserProfile::from(&auth.user))
}

/// Update own profile
///
/// Allowed keys: `name`, `age`, `email`, `password`. Any other key fails the
/// whole request with `{"error":"Invalid update property"}` and nothing is
/// changed.
pub async fn update_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<UserProfile>> {
    let Json(patch) = body?;

    let user = state.accounts.update_profile(auth.user.id, patch).await?;

    Ok(Json(user.into()))
}

/// Delete own account
///
/// Removes every task the caller owns together with the account and
/// returns the deleted profile.
pub async fn delete_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<UserProfile>> {
    let user = state.accounts.delete_account(auth.user.id).await?;
    Ok(Json(user.into()))
}

/// Upload an avatar
///
/// # Endpoint
///
/// ```text
/// POST /users/me/avatar
/// Content-Type: multipart/form-data; boundary=...
/// ```
///
/// The file must be in the `avatar` field, named `*.jpg`, `*.jpeg` or
/// `*.png`, and at most 1 MB. It is stored as a 250×250 PNG.
///
/// # Errors
///
/// - `400 Bad Request`: No `avatar` field, unsupported file type or an
///   unreadable image
/// - `413 Payload Too Large`: File over the size limit
pub async fn upload_avatar(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<StatusCode> {
    let mut multipart = multipart?;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(AVATAR_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await?;

        state
            .accounts
            .set_avatar(auth.user.id, &filename, bytes.to_vec())
            .await?;

        return Ok(StatusCode::OK);
    }

    Err(ApiError::BadRequest("Please upload an image".to_string()))
}

pub async fn delete_avatar(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<StatusCode> {
    state.accounts.remove_avatar(auth.user.id).await?;
    Ok(StatusCode::OK)
}

/// `GET /users/me/avatar`
///
/// "me" is not a user ID, so this answers like any other malformed ID.
pub async fn get_avatar_of_me() -> ApiError {
    ApiError::NotFound("Not found".to_string())
}

/// Fetch a user's avatar
///
/// Public. A malformed ID, an unknown user and a user without an avatar
/// all answer `404`.
pub async fn get_avatar(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = Uuid::parse_str(&id).map_err(|_| ApiError::NotFound("Not found".to_string()))?;

    let png = state.accounts.avatar(id).await?;

    Ok(([(header::CONTENT_TYPE, AVATAR_CONTENT_TYPE)], png))
}

/// Task endpoints
///
/// Every route requires a session. Tasks of other users are invisible: they
/// answer `404` exactly like tasks that do not exist.
///
/// # Endpoints
///
/// - `POST /tasks` - Create a task owned by the caller
/// - `GET /tasks?completed=&limit=&skip=&sortBy=field:asc|desc` - List own tasks
/// - `GET /tasks/:id` - Fetch one task
/// - `PATCH /tasks/:id` - Update `description` and/or `completed`
/// - `DELETE /tasks/:id` - Delete a task

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde_json::Value;
use taskapp_shared::{
    auth::middleware::AuthContext,
    models::task::{NewTask, Task, TaskQuery},
};
use uuid::Uuid;

fn parse_task_id(id: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(id).map_err(|_| ApiError::BadRequest("Invalid task id".to_string()))
}

/// Create a task
///
/// # Endpoint
///
/// ```text
/// POST /tasks
/// Content-Type: application/json
///
/// { "description": "buy milk", "completed": false }
/// ```
///
/// The owner is always the caller; an `owner` key in the body is ignored.
///
/// # Response
///
/// `201 Created` with the task.
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    body: Result<Json<NewTask>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(data) = body?;

    let task = state.tasks.create(auth.user.id, data).await?;

    Ok((StatusCode::CREATED, Json(task)))
}

/// List own tasks
///
/// Query parameters:
///
/// - `completed`: keep tasks whose flag equals `value == "true"`
/// - `limit`: at most this many (0 or unparseable means no limit)
/// - `skip`: skip this many first (unparseable means 0)
/// - `sortBy`: `createdAt`, `updatedAt`, `description` or `completed`,
///   optionally suffixed `:asc` or `:desc`; unknown fields are ignored
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<TaskQuery>,
) -> ApiResult<Json<Vec<Task>>> {
    let filter = query.into_filter();
    let tasks = state.tasks.list(auth.user.id, &filter).await?;
    Ok(Json(tasks))
}

pub async fn get_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<Task>> {
    let id = parse_task_id(&id)?;
    let task = state.tasks.get(auth.user.id, id).await?;
    Ok(Json(task))
}

/// Update a task
///
/// Allowed keys: `description`, `completed`. Any other key, `owner` included,
/// fails with `{"error":"Invalid update property"}` and nothing is changed.
pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Task>> {
    let id = parse_task_id(&id)?;
    let Json(patch) = body?;

    let task = state.tasks.update(auth.user.id, id, patch).await?;

    Ok(Json(task))
}

/// Delete a task and return it
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<Task>> {
    let id = parse_task_id(&id)?;
    let task = state.tasks.delete(auth.user.id, id).await?;
    Ok(Json(task))
}

/// Task model and database operations
///
/// A task is a to-do item owned by exactly one user. Every query in this
/// module takes the owner's id, so a task that belongs to someone else is
/// indistinguishable from one that does not exist.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     description TEXT NOT NULL CHECK (length(description) > 0),
///     completed BOOLEAN NOT NULL DEFAULT FALSE,
///     owner_id UUID NOT NULL REFERENCES users(id),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// `owner_id` intentionally has no `ON DELETE CASCADE`; tasks are removed by
/// [`super::user::User::delete_with_tasks`].
///
/// # Example
///
/// ```no_run
/// use taskapp_shared::models::task::{Task, TaskQuery};
/// use taskapp_shared::db::pool::{create_pool, DatabaseConfig};
/// use uuid::Uuid;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
/// let owner = Uuid::new_v4();
///
/// let query = TaskQuery {
///     completed: Some("false".to_string()),
///     sort_by: Some("createdAt:desc".to_string()),
///     ..Default::default()
/// };
/// let open_tasks = Task::list_by_owner(&pool, owner, &query.into_filter()).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::cmp::Ordering;
use uuid::Uuid;
use validator::Validate;

use super::patch::Patch;

/// Task record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique task ID
    pub id: Uuid,

    /// What needs doing (trimmed, non-empty)
    pub description: String,

    /// Whether it is done
    pub completed: bool,

    /// Owning user's ID
    #[sqlx(rename = "owner_id")]
    pub owner: Uuid,

    /// When the task was created
    pub created_at: DateTime<Utc>,

    /// When the task was last updated
    pub updated_at: DateTime<Utc>,
}

/// Create-task payload as sent by a client
///
/// Any `owner` (or other unknown) key is ignored; the owner is always the
/// authenticated caller.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct NewTask {
    #[serde(default)]
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,

    #[serde(default)]
    pub completed: bool,
}

impl NewTask {
    pub fn normalize(&mut self) {
        self.description = self.description.trim().to_string();
    }
}

/// Input for inserting a task row
#[derive(Debug, Clone)]
pub struct CreateTask {
    pub owner: Uuid,
    pub description: String,
    pub completed: bool,
}

/// Task patch: `description`, `completed`
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct TaskPatch {
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: Option<String>,

    pub completed: Option<bool>,
}

impl Patch for TaskPatch {
    const FIELDS: &'static [&'static str] = &["description", "completed"];
}

impl TaskPatch {
    pub fn normalize(&mut self) {
        if let Some(description) = self.description.as_mut() {
            *description = description.trim().to_string();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.description.is_none() && self.completed.is_none()
    }
}

/// Raw list query (`?completed=&limit=&skip=&sortBy=field:asc|desc`)
///
/// Values are kept as strings so that unparseable ones can be ignored instead
/// of failing the request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskQuery {
    pub completed: Option<String>,
    pub limit: Option<String>,
    pub skip: Option<String>,
    pub sort_by: Option<String>,
}

/// Sortable task columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskSortField {
    CreatedAt,
    UpdatedAt,
    Description,
    Completed,
}

impl TaskSortField {
    pub fn parse(field: &str) -> Option<Self> {
        match field {
            "createdAt" | "created_at" => Some(TaskSortField::CreatedAt),
            "updatedAt" | "updated_at" => Some(TaskSortField::UpdatedAt),
            "description" => Some(TaskSortField::Description),
            "completed" => Some(TaskSortField::Completed),
            _ => None,
        }
    }

    /// Column name in the `tasks` table
    pub fn column(&self) -> &'static str {
        match self {
            TaskSortField::CreatedAt => "created_at",
            TaskSortField::UpdatedAt => "updated_at",
            TaskSortField::Description => "description",
            TaskSortField::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSort {
    pub field: TaskSortField,
    pub direction: SortDirection,
}

/// Parsed list query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    /// Exact match on completion state
    pub completed: Option<bool>,

    /// Maximum number of tasks; None means all
    pub limit: Option<u64>,

    /// Number of tasks to skip
    pub skip: u64,

    /// None keeps creation order
    pub sort: Option<TaskSort>,
}

impl TaskQuery {
    pub fn into_filter(self) -> TaskFilter {
        let completed = self
            .completed
            .filter(|value| !value.is_empty())
            .map(|value| value == "true");

        let limit = self
            .limit
            .and_then(|value| value.trim().parse::<u64>().ok())
            .filter(|limit| *limit > 0);

        let skip = self
            .skip
            .and_then(|value| value.trim().parse::<u64>().ok())
            .unwrap_or(0);

        let sort = self.sort_by.and_then(|value| {
            let mut parts = value.splitn(2, ':');
            let field = TaskSortField::parse(parts.next()?.trim())?;
            let direction = match parts.next().map(str::trim) {
                Some("desc") => SortDirection::Desc,
                _ => SortDirection::Asc,
            };
            Some(TaskSort { field, direction })
        });

        TaskFilter {
            completed,
            limit,
            skip,
            sort,
        }
    }
}

impl TaskFilter {
    /// Applies the filter to tasks given in creation order
    ///
    /// Sorting is stable, so ties keep creation order (the same tiebreak the
    /// SQL query uses).
    pub fn apply(&self, tasks: impl IntoIterator<Item = Task>) -> Vec<Task> {
        let mut tasks: Vec<Task> = tasks
            .into_iter()
            .filter(|task| self.completed.map_or(true, |c| task.completed == c))
            .collect();

        if let Some(sort) = self.sort {
            tasks.sort_by(|a, b| {
                let ordering = compare_by(a, b, sort.field);
                match sort.direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            });
        }

        let skip = usize::try_from(self.skip).unwrap_or(usize::MAX);
        let limit = self
            .limit
            .map(|l| usize::try_from(l).unwrap_or(usize::MAX))
            .unwrap_or(usize::MAX);

        tasks.into_iter().skip(skip).take(limit).collect()
    }
}

fn compare_by(a: &Task, b: &Task, field: TaskSortField) -> Ordering {
    match field {
        TaskSortField::CreatedAt => a.created_at.cmp(&b.created_at),
        TaskSortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        TaskSortField::Description => a.description.cmp(&b.description),
        TaskSortField::Completed => a.completed.cmp(&b.completed),
    }
}

const TASK_COLUMNS: &str = "id, description, completed, owner_id, created_at, updated_at";

impl Task {
    /// Creates a new task
    pub async fn create(pool: &PgPool, data: CreateTask) -> Result<Self, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (description, completed, owner_id)
            VALUES ($1, $2, $3)
            RETURNING id, description, completed, owner_id, created_at, updated_at
            "#,
        )
        .bind(data.description)
        .bind(data.completed)
        .bind(data.owner)
        .fetch_one(pool)
        .await?;

        Ok(task)
    }

    /// Finds a task by ID, scoped to its owner
    pub async fn find_by_id_and_owner(
        pool: &PgPool,
        id: Uuid,
        owner: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, description, completed, owner_id, created_at, updated_at
            FROM tasks
            WHERE id = $1 AND owner_id = $2
            "#,
        )
        .bind(id)
        .bind(owner)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    /// Lists an owner's tasks with filtering, sorting and pagination
    pub async fn list_by_owner(
        pool: &PgPool,
        owner: Uuid,
        filter: &TaskFilter,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut query = format!("SELECT {} FROM tasks WHERE owner_id = $1", TASK_COLUMNS);
        let mut bind_count = 1;

        if filter.completed.is_some() {
            bind_count += 1;
            query.push_str(&format!(" AND completed = ${}", bind_count));
        }

        // Column and direction come from closed enums, never from user input
        query.push_str(" ORDER BY ");
        if let Some(sort) = filter.sort {
            query.push_str(&format!("{} {}, ", sort.field.column(), sort.direction.as_sql()));
        }
        query.push_str("created_at ASC, id ASC");

        // LIMIT NULL is LIMIT ALL
        query.push_str(&format!(" LIMIT ${} OFFSET ${}", bind_count + 1, bind_count + 2));

        let mut q = sqlx::query_as::<_, Task>(&query).bind(owner);
        if let Some(completed) = filter.completed {
            q = q.bind(completed);
        }

        let limit = filter.limit.map(|l| i64::try_from(l).unwrap_or(i64::MAX));
        let skip = i64::try_from(filter.skip).unwrap_or(i64::MAX);

        let tasks = q.bind(limit).bind(skip).fetch_all(pool).await?;

        Ok(tasks)
    }

    /// Applies a patch to an owned task
    ///
    /// Returns None if the task does not exist or belongs to someone else.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        owner: Uuid,
        patch: TaskPatch,
    ) -> Result<Option<Self>, sqlx::Error> {
        if patch.is_empty() {
            return Self::find_by_id_and_owner(pool, id, owner).await;
        }

        let mut query = String::from("UPDATE tasks SET updated_at = NOW()");
        let mut bind_count = 2;

        if patch.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${}", bind_count));
        }
        if patch.completed.is_some() {
            bind_count += 1;
            query.push_str(&format!(", completed = ${}", bind_count));
        }

        query.push_str(&format!(
            " WHERE id = $1 AND owner_id = $2 RETURNING {}",
            TASK_COLUMNS
        ));

        let mut q = sqlx::query_as::<_, Task>(&query).bind(id).bind(owner);

        if let Some(description) = patch.description {
            q = q.bind(description);
        }
        if let Some(completed) = patch.completed {
            q = q.bind(completed);
        }

        let task = q.fetch_optional(pool).await?;

        Ok(task)
    }

    /// Deletes an owned task, returning it
    pub async fn delete(pool: &PgPool, id: Uuid, owner: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            DELETE FROM tasks
            WHERE id = $1 AND owner_id = $2
            RETURNING id, description, completed, owner_id, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(owner)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    /// Counts an owner's tasks
    pub async fn count_by_owner(pool: &PgPool, owner: Uuid) -> Result<i64, sqlx::Error> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tasks WHERE owner_id = $1")
            .bind(owner)
            .fetch_one(pool)
            .await?;

        Ok(count)
    }
}

/// Persistence seam
///
/// The account and task services talk to storage only through the traits in
/// this module. [`postgres::PgStore`] backs the running server;
/// [`memory::MemoryStore`] keeps everything in process and is used by the
/// test suites and for local runs without a database.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use taskapp_shared::models::user::CreateUser;
/// use taskapp_shared::store::{memory::MemoryStore, Store, UserStore};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
///
/// let user = store.create_user(CreateUser {
///     name: "Ann".to_string(),
///     email: "a@x.com".to_string(),
///     age: 18,
///     password_hash: "$argon2id$...".to_string(),
/// }).await?;
///
/// assert!(store.find_user_by_email("a@x.com").await?.is_some());
/// # let _ = user;
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::session::SessionToken;
use crate::models::task::{CreateTask, Task, TaskFilter, TaskPatch};
use crate::models::user::{CreateUser, DeletedAccount, UpdateUser, User};

pub mod memory;
pub mod postgres;

/// Persistence error
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Another user already has this email
    #[error("Email is already in use")]
    DuplicateEmail,

    /// Backing database failed
    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation()
                && db.constraint().map_or(false, |c| c.contains("email"))
            {
                return StoreError::DuplicateEmail;
            }
        }
        StoreError::Database(err)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// User accounts, their session lists and avatars
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Inserts a user; fails with [`StoreError::DuplicateEmail`] on a taken email
    async fn create_user(&self, data: CreateUser) -> StoreResult<User>;

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Finds a user only if `token` is in its active session list and unexpired
    async fn find_user_with_token(&self, id: Uuid, token: &str) -> StoreResult<Option<User>>;

    async fn update_user(&self, id: Uuid, data: UpdateUser) -> StoreResult<Option<User>>;

    /// Removes the user and every task it owns, atomically
    async fn delete_user_and_tasks(&self, id: Uuid) -> StoreResult<Option<DeletedAccount>>;

    /// Appends to the active session list; false if the user is gone
    async fn add_token(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> StoreResult<bool>;

    /// Removes exactly one token from the active list
    async fn remove_token(&self, user_id: Uuid, token: &str) -> StoreResult<bool>;

    /// Empties the active list
    async fn clear_tokens(&self, user_id: Uuid) -> StoreResult<u64>;

    async fn prune_expired_tokens(&self, user_id: Uuid, now: DateTime<Utc>) -> StoreResult<u64>;

    async fn list_tokens(&self, user_id: Uuid) -> StoreResult<Vec<SessionToken>>;

    /// Replaces or clears the avatar; false if the user is gone
    async fn set_avatar(&self, user_id: Uuid, avatar: Option<Vec<u8>>) -> StoreResult<bool>;

    async fn find_avatar(&self, user_id: Uuid) -> StoreResult<Option<Vec<u8>>>;
}

/// Owner-scoped task storage
///
/// Every lookup takes the owner, so a task owned by someone else reads as
/// absent.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn create_task(&self, data: CreateTask) -> StoreResult<Task>;

    async fn list_tasks(&self, owner: Uuid, filter: &TaskFilter) -> StoreResult<Vec<Task>>;

    async fn find_task(&self, id: Uuid, owner: Uuid) -> StoreResult<Option<Task>>;

    async fn update_task(&self, id: Uuid, owner: Uuid, patch: TaskPatch)
        -> StoreResult<Option<Task>>;

    async fn delete_task(&self, id: Uuid, owner: Uuid) -> StoreResult<Option<Task>>;

    async fn count_tasks(&self, owner: Uuid) -> StoreResult<u64>;
}

/// Everything the services need from storage
#[async_trait]
pub trait Store: UserStore + TaskStore {
    /// Backend name for logs and the health endpoint
    fn backend(&self) -> &'static str;

    /// Checks the backend is reachable
    async fn ping(&self) -> StoreResult<()>;
}

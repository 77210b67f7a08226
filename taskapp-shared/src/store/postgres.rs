/// PostgreSQL-backed store
///
/// A thin delegation layer over the model queries in [`crate::models`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{Store, StoreResult, TaskStore, UserStore};
use crate::db::pool::health_check;
use crate::models::session::SessionToken;
use crate::models::task::{CreateTask, Task, TaskFilter, TaskPatch};
use crate::models::user::{CreateUser, DeletedAccount, UpdateUser, User};

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, data: CreateUser) -> StoreResult<User> {
        Ok(User::create(&self.pool, data).await?)
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(User::find_by_id(&self.pool, id).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(User::find_by_email(&self.pool, email).await?)
    }

    async fn find_user_with_token(&self, id: Uuid, token: &str) -> StoreResult<Option<User>> {
        Ok(User::find_by_session(&self.pool, id, token).await?)
    }

    async fn update_user(&self, id: Uuid, data: UpdateUser) -> StoreResult<Option<User>> {
        Ok(User::update(&self.pool, id, data).await?)
    }

    async fn delete_user_and_tasks(&self, id: Uuid) -> StoreResult<Option<DeletedAccount>> {
        Ok(User::delete_with_tasks(&self.pool, id).await?)
    }

    async fn add_token(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> StoreResult<bool> {
        Ok(SessionToken::add(&self.pool, user_id, token, expires_at).await?)
    }

    async fn remove_token(&self, user_id: Uuid, token: &str) -> StoreResult<bool> {
        Ok(SessionToken::remove(&self.pool, user_id, token).await?)
    }

    async fn clear_tokens(&self, user_id: Uuid) -> StoreResult<u64> {
        Ok(SessionToken::clear(&self.pool, user_id).await?)
    }

    async fn prune_expired_tokens(&self, user_id: Uuid, now: DateTime<Utc>) -> StoreResult<u64> {
        Ok(SessionToken::prune_expired(&self.pool, user_id, now).await?)
    }

    async fn list_tokens(&self, user_id: Uuid) -> StoreResult<Vec<SessionToken>> {
        Ok(SessionToken::list(&self.pool, user_id).await?)
    }

    async fn set_avatar(&self, user_id: Uuid, avatar: Option<Vec<u8>>) -> StoreResult<bool> {
        Ok(User::set_avatar(&self.pool, user_id, avatar).await?)
    }

    async fn find_avatar(&self, user_id: Uuid) -> StoreResult<Option<Vec<u8>>> {
        Ok(User::find_avatar(&self.pool, user_id).await?)
    }
}

#[async_trait]
impl TaskStore for PgStore {
    async fn create_task(&self, data: CreateTask) -> StoreResult<Task> {
        Ok(Task::create(&self.pool, data).await?)
    }

    async fn list_tasks(&self, owner: Uuid, filter: &TaskFilter) -> StoreResult<Vec<Task>> {
        Ok(Task::list_by_owner(&self.pool, owner, filter).await?)
    }

    async fn find_task(&self, id: Uuid, owner: Uuid) -> StoreResult<Option<Task>> {
        Ok(Task::find_by_id_and_owner(&self.pool, id, owner).await?)
    }

    async fn update_task(
        &self,
        id: Uuid,
        owner: Uuid,
        patch: TaskPatch,
    ) -> StoreResult<Option<Task>> {
        Ok(Task::update(&self.pool, id, owner, patch).await?)
    }

    async fn delete_task(&self, id: Uuid, owner: Uuid) -> StoreResult<Option<Task>> {
        Ok(Task::delete(&self.pool, id, owner).await?)
    }

    async fn count_tasks(&self, owner: Uuid) -> StoreResult<u64> {
        let count = Task::count_by_owner(&self.pool, owner).await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}

#[async_trait]
impl Store for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(health_check(&self.pool).await?)
    }
}

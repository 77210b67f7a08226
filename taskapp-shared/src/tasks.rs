/// Owner-scoped task access
///
/// Every operation takes the caller's user ID. A task that exists but belongs
/// to someone else produces exactly the same [`ServiceError::NotFound`] as a
/// task that does not exist.

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

use crate::error::{ServiceError, ServiceResult};
use crate::models::patch::Patch;
use crate::models::task::{CreateTask, NewTask, Task, TaskFilter, TaskPatch};
use crate::store::Store;

pub struct TaskService {
    store: Arc<dyn Store>,
}

impl TaskService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Creates a task owned by `owner`, whatever the payload says
    pub async fn create(&self, owner: Uuid, mut data: NewTask) -> ServiceResult<Task> {
        data.normalize();
        data.validate()?;

        let task = self
            .store
            .create_task(CreateTask {
                owner,
                description: data.description,
                completed: data.completed,
            })
            .await?;

        info!(task_id = %task.id, user_id = %owner, "Task created");
        Ok(task)
    }

    pub async fn list(&self, owner: Uuid, filter: &TaskFilter) -> ServiceResult<Vec<Task>> {
        let tasks = self.store.list_tasks(owner, filter).await?;
        debug!(user_id = %owner, count = tasks.len(), "Listed tasks");
        Ok(tasks)
    }

    pub async fn get(&self, owner: Uuid, id: Uuid) -> ServiceResult<Task> {
        self.store
            .find_task(id, owner)
            .await?
            .ok_or(ServiceError::NotFound)
    }

    /// Applies a patch (`description`, `completed`)
    ///
    /// Any other key rejects the whole patch before anything is written.
    pub async fn update(&self, owner: Uuid, id: Uuid, body: Value) -> ServiceResult<Task> {
        let mut patch = TaskPatch::from_json(body)?;
        patch.normalize();
        patch.validate()?;

        let task = self
            .store
            .update_task(id, owner, patch)
            .await?
            .ok_or(ServiceError::NotFound)?;

        info!(task_id = %id, user_id = %owner, "Task updated");
        Ok(task)
    }

    /// Deletes a task and returns it
    pub async fn delete(&self, owner: Uuid, id: Uuid) -> ServiceResult<Task> {
        let task = self
            .store
            .delete_task(id, owner)
            .await?
            .ok_or(ServiceError::NotFound)?;

        info!(task_id = %id, user_id = %owner, "Task deleted");
        Ok(task)
    }
}

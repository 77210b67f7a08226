/// In-process store
///
/// All state sits behind a single `RwLock`, so multi-step operations such as
/// the account cascade are atomic. Tasks are kept in insertion order, which is
/// the default list order.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Store, StoreError, StoreResult, TaskStore, UserStore};
use crate::models::session::SessionToken;
use crate::models::task::{CreateTask, Task, TaskFilter, TaskPatch};
use crate::models::user::{CreateUser, DeletedAccount, UpdateUser, User};

#[derive(Debug)]
struct UserEntry {
    user: User,
    tokens: Vec<SessionToken>,
    avatar: Option<Vec<u8>>,
}

#[derive(Debug, Default)]
struct State {
    users: HashMap<Uuid, UserEntry>,
    tasks: Vec<Task>,
}

impl State {
    fn email_taken(&self, email: &str, except: Option<Uuid>) -> bool {
        self.users
            .values()
            .any(|entry| entry.user.email == email && Some(entry.user.id) != except)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn is_live(token: &SessionToken, now: DateTime<Utc>) -> bool {
    token.expires_at.map_or(true, |expires_at| expires_at > now)
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, data: CreateUser) -> StoreResult<User> {
        let mut state = self.state.write().await;
        if state.email_taken(&data.email, None) {
            return Err(StoreError::DuplicateEmail);
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: data.name,
            email: data.email,
            age: data.age,
            password_hash: data.password_hash,
            created_at: now,
            updated_at: now,
        };

        state.users.insert(
            user.id,
            UserEntry {
                user: user.clone(),
                tokens: Vec::new(),
                avatar: None,
            },
        );

        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.get(&id).map(|entry| entry.user.clone()))
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .find(|entry| entry.user.email == email)
            .map(|entry| entry.user.clone()))
    }

    async fn find_user_with_token(&self, id: Uuid, token: &str) -> StoreResult<Option<User>> {
        let state = self.state.read().await;
        let now = Utc::now();
        Ok(state.users.get(&id).and_then(|entry| {
            entry
                .tokens
                .iter()
                .any(|t| t.token == token && is_live(t, now))
                .then(|| entry.user.clone())
        }))
    }

    async fn update_user(&self, id: Uuid, data: UpdateUser) -> StoreResult<Option<User>> {
        let mut state = self.state.write().await;

        if let Some(email) = data.email.as_deref() {
            if state.email_taken(email, Some(id)) {
                return Err(StoreError::DuplicateEmail);
            }
        }

        let Some(entry) = state.users.get_mut(&id) else {
            return Ok(None);
        };

        let changed = !data.is_empty();
        let user = &mut entry.user;
        if let Some(name) = data.name {
            user.name = name;
        }
        if let Some(email) = data.email {
            user.email = email;
        }
        if let Some(age) = data.age {
            user.age = age;
        }
        if let Some(password_hash) = data.password_hash {
            user.password_hash = password_hash;
        }
        if changed {
            user.updated_at = Utc::now();
        }

        Ok(Some(user.clone()))
    }

    async fn delete_user_and_tasks(&self, id: Uuid) -> StoreResult<Option<DeletedAccount>> {
        let mut state = self.state.write().await;

        let Some(entry) = state.users.remove(&id) else {
            return Ok(None);
        };

        let before = state.tasks.len();
        state.tasks.retain(|task| task.owner != id);
        let tasks_deleted = (before - state.tasks.len()) as u64;

        Ok(Some(DeletedAccount {
            user: entry.user,
            tasks_deleted,
        }))
    }

    async fn add_token(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        let Some(entry) = state.users.get_mut(&user_id) else {
            return Ok(false);
        };

        if entry.tokens.iter().any(|t| t.token == token) {
            return Ok(false);
        }

        entry.tokens.push(SessionToken {
            token: token.to_string(),
            expires_at,
            created_at: Utc::now(),
        });
        Ok(true)
    }

    async fn remove_token(&self, user_id: Uuid, token: &str) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        let Some(entry) = state.users.get_mut(&user_id) else {
            return Ok(false);
        };

        let before = entry.tokens.len();
        entry.tokens.retain(|t| t.token != token);
        Ok(entry.tokens.len() < before)
    }

    async fn clear_tokens(&self, user_id: Uuid) -> StoreResult<u64> {
        let mut state = self.state.write().await;
        Ok(state
            .users
            .get_mut(&user_id)
            .map(|entry| entry.tokens.drain(..).count() as u64)
            .unwrap_or(0))
    }

    async fn prune_expired_tokens(&self, user_id: Uuid, now: DateTime<Utc>) -> StoreResult<u64> {
        let mut state = self.state.write().await;
        let Some(entry) = state.users.get_mut(&user_id) else {
            return Ok(0);
        };

        let before = entry.tokens.len();
        entry.tokens.retain(|t| is_live(t, now));
        Ok((before - entry.tokens.len()) as u64)
    }

    async fn list_tokens(&self, user_id: Uuid) -> StoreResult<Vec<SessionToken>> {
        let state = self.state.read().await;
        Ok(state
            .users
            .get(&user_id)
            .map(|entry| entry.tokens.clone())
            .unwrap_or_default())
    }

    async fn set_avatar(&self, user_id: Uuid, avatar: Option<Vec<u8>>) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        let Some(entry) = state.users.get_mut(&user_id) else {
            return Ok(false);
        };

        entry.avatar = avatar;
        entry.user.updated_at = Utc::now();
        Ok(true)
    }

    async fn find_avatar(&self, user_id: Uuid) -> StoreResult<Option<Vec<u8>>> {
        let state = self.state.read().await;
        Ok(state
            .users
            .get(&user_id)
            .and_then(|entry| entry.avatar.clone()))
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn create_task(&self, data: CreateTask) -> StoreResult<Task> {
        let mut state = self.state.write().await;
        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4(),
            description: data.description,
            completed: data.completed,
            owner: data.owner,
            created_at: now,
            updated_at: now,
        };
        state.tasks.push(task.clone());
        Ok(task)
    }

    async fn list_tasks(&self, owner: Uuid, filter: &TaskFilter) -> StoreResult<Vec<Task>> {
        let state = self.state.read().await;
        let owned = state.tasks.iter().filter(|t| t.owner == owner).cloned();
        Ok(filter.apply(owned))
    }

    async fn find_task(&self, id: Uuid, owner: Uuid) -> StoreResult<Option<Task>> {
        let state = self.state.read().await;
        Ok(state
            .tasks
            .iter()
            .find(|t| t.id == id && t.owner == owner)
            .cloned())
    }

    async fn update_task(
        &self,
        id: Uuid,
        owner: Uuid,
        patch: TaskPatch,
    ) -> StoreResult<Option<Task>> {
        let mut state = self.state.write().await;
        let Some(task) = state
            .tasks
            .iter_mut()
            .find(|t| t.id == id && t.owner == owner)
        else {
            return Ok(None);
        };

        if patch.is_empty() {
            return Ok(Some(task.clone()));
        }

        if let Some(description) = patch.description {
            task.description = description;
        }
        if let Some(completed) = patch.completed {
            task.completed = completed;
        }
        task.updated_at = Utc::now();

        Ok(Some(task.clone()))
    }

    async fn delete_task(&self, id: Uuid, owner: Uuid) -> StoreResult<Option<Task>> {
        let mut state = self.state.write().await;
        let position = state
            .tasks
            .iter()
            .position(|t| t.id == id && t.owner == owner);
        Ok(position.map(|index| state.tasks.remove(index)))
    }

    async fn count_tasks(&self, owner: Uuid) -> StoreResult<u64> {
        let state = self.state.read().await;
        Ok(state.tasks.iter().filter(|t| t.owner == owner).count() as u64)
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn new_user(email: &str) -> CreateUser {
        CreateUser {
            name: "Ann".to_string(),
            email: email.to_string(),
            age: 18,
            password_hash: "hash".to_string(),
        }
    }

    fn new_task(owner: Uuid, description: &str) -> CreateTask {
        CreateTask {
            owner,
            description: description.to_string(),
            completed: false,
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let store = MemoryStore::new();
        store.create_user(new_user("a@x.com")).await.unwrap();

        let err = store.create_user(new_user("a@x.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail));
    }

    #[tokio::test]
    async fn test_update_to_taken_email_rejected() {
        let store = MemoryStore::new();
        store.create_user(new_user("a@x.com")).await.unwrap();
        let bob = store.create_user(new_user("b@x.com")).await.unwrap();

        let err = store
            .update_user(
                bob.id,
                UpdateUser {
                    email: Some("a@x.com".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail));

        // Keeping one's own email is fine
        let same = store
            .update_user(
                bob.id,
                UpdateUser {
                    email: Some("b@x.com".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(same.is_some());
    }

    #[tokio::test]
    async fn test_token_lifecycle() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("a@x.com")).await.unwrap();

        assert!(store.add_token(user.id, "t1", None).await.unwrap());
        assert!(store.add_token(user.id, "t2", None).await.unwrap());
        assert!(store.find_user_with_token(user.id, "t1").await.unwrap().is_some());

        assert!(store.remove_token(user.id, "t1").await.unwrap());
        assert!(store.find_user_with_token(user.id, "t1").await.unwrap().is_none());
        assert!(store.find_user_with_token(user.id, "t2").await.unwrap().is_some());

        assert_eq!(store.clear_tokens(user.id).await.unwrap(), 1);
        assert!(store.list_tokens(user.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_expired_tokens_do_not_authenticate_and_are_pruned() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("a@x.com")).await.unwrap();
        let past = Utc::now() - Duration::hours(1);

        store.add_token(user.id, "old", Some(past)).await.unwrap();
        store.add_token(user.id, "new", None).await.unwrap();

        assert!(store.find_user_with_token(user.id, "old").await.unwrap().is_none());
        assert_eq!(store.prune_expired_tokens(user.id, Utc::now()).await.unwrap(), 1);

        let tokens = store.list_tokens(user.id).await.unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].token, "new");
    }

    #[tokio::test]
    async fn test_tasks_are_owner_scoped() {
        let store = MemoryStore::new();
        let ann = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let task = store.create_task(new_task(ann, "buy milk")).await.unwrap();

        assert!(store.find_task(task.id, bob).await.unwrap().is_none());
        assert!(store
            .update_task(task.id, bob, TaskPatch::default())
            .await
            .unwrap()
            .is_none());
        assert!(store.delete_task(task.id, bob).await.unwrap().is_none());
        assert!(store.find_task(task.id, ann).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_user_cascades_tasks_only_for_owner() {
        let store = MemoryStore::new();
        let ann = store.create_user(new_user("a@x.com")).await.unwrap();
        let bob = store.create_user(new_user("b@x.com")).await.unwrap();

        for n in 0..3 {
            store.create_task(new_task(ann.id, &format!("ann {}", n))).await.unwrap();
        }
        store.create_task(new_task(bob.id, "bob")).await.unwrap();

        let deleted = store.delete_user_and_tasks(ann.id).await.unwrap().unwrap();
        assert_eq!(deleted.user.id, ann.id);
        assert_eq!(deleted.tasks_deleted, 3);

        assert_eq!(store.count_tasks(ann.id).await.unwrap(), 0);
        assert_eq!(store.count_tasks(bob.id).await.unwrap(), 1);
        assert!(store.find_user(ann.id).await.unwrap().is_none());
        assert!(store.delete_user_and_tasks(ann.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_avatar_roundtrip() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("a@x.com")).await.unwrap();

        assert!(store.find_avatar(user.id).await.unwrap().is_none());
        assert!(store.set_avatar(user.id, Some(vec![1, 2, 3])).await.unwrap());
        assert_eq!(store.find_avatar(user.id).await.unwrap(), Some(vec![1, 2, 3]));

        assert!(store.set_avatar(user.id, None).await.unwrap());
        assert!(store.find_avatar(user.id).await.unwrap().is_none());
        assert!(!store.set_avatar(Uuid::new_v4(), Some(vec![1])).await.unwrap());
    }
}

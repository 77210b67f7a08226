/// Database models for Task App
///
/// # Models
///
/// - `user`: User accounts, signup/login/patch payloads
/// - `session`: Active session tokens per user
/// - `task`: To-do items owned by a single user
/// - `patch`: Allow-listed partial updates shared by users and tasks
///
/// # Example
///
/// ```no_run
/// use taskapp_shared::models::task::{Task, CreateTask};
/// use taskapp_shared::db::pool::{create_pool, DatabaseConfig};
/// use uuid::Uuid;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let task = Task::create(&pool, CreateTask {
///     owner: Uuid::new_v4(),
///     description: "buy milk".to_string(),
///     completed: false,
/// }).await?;
/// # Ok(())
/// # }
/// ```

pub mod patch;
pub mod session;
pub mod task;
pub mod user;

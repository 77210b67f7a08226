/// User model and database operations
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(255) NOT NULL,
///     email VARCHAR(320) NOT NULL,
///     age INTEGER NOT NULL DEFAULT 18 CHECK (age >= 0),
///     password_hash VARCHAR(255) NOT NULL,
///     avatar BYTEA,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// CREATE UNIQUE INDEX users_email_key ON users (email);
/// ```
///
/// The avatar column is never part of [`User`]; it is read and written
/// through [`User::find_avatar`] and [`User::set_avatar`] only. Session tokens
/// live in `user_tokens` (see [`super::session`]).
///
/// # Example
///
/// ```no_run
/// use taskapp_shared::models::user::{User, CreateUser};
/// use taskapp_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let user = User::create(&pool, CreateUser {
///     name: "Ann".to_string(),
///     email: "ann@example.com".to_string(),
///     age: 18,
///     password_hash: "$argon2id$...".to_string(),
/// }).await?;
///
/// let found = User::find_by_email(&pool, "ann@example.com").await?;
/// assert_eq!(found.map(|u| u.id), Some(user.id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::fmt;
use uuid::Uuid;
use validator::Validate;

use super::patch::Patch;
use crate::auth::password::validate_password_content;

/// Age assigned when signup omits it
pub const DEFAULT_AGE: i32 = 18;

/// Minimum password length, counted after trimming
pub const MIN_PASSWORD_LENGTH: u64 = 7;

/// User account as stored
///
/// Deliberately not `Serialize`: responses go through [`UserProfile`].
#[derive(Clone, sqlx::FromRow)]
pub struct User {
    /// Unique user ID
    pub id: Uuid,

    /// Display name (trimmed)
    pub name: String,

    /// Email address, trimmed and lowercased, unique across users
    pub email: String,

    /// Age in years
    pub age: i32,

    /// Argon2id password hash
    pub password_hash: String,

    /// When the account was created
    pub created_at: DateTime<Utc>,

    /// When the account was last updated
    pub updated_at: DateTime<Utc>,
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("age", &self.age)
            .field("password_hash", &"<redacted>")
            .finish()
    }
}

/// Sanitized user, the only user shape that is ever serialized
///
/// Password hash, session tokens and avatar bytes have no field here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub age: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            age: user.age,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        UserProfile::from(&user)
    }
}

/// Input for inserting a user row
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
    pub age: i32,

    /// Argon2id hash, never the plaintext
    pub password_hash: String,
}

/// Input for updating a user row
///
/// Only non-None fields are written.
#[derive(Debug, Clone, Default)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub email: Option<String>,
    pub age: Option<i32>,
    pub password_hash: Option<String>,
}

impl UpdateUser {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.age.is_none()
            && self.password_hash.is_none()
    }
}

/// Signup payload
///
/// Missing fields default to empty so that they are reported as field-level
/// validation errors rather than a body parse failure.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewUser {
    #[serde(default)]
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,

    #[serde(default)]
    #[validate(email(message = "Email is invalid"))]
    pub email: String,

    #[serde(default = "default_age")]
    #[validate(range(min = 0, message = "Invalid age. Age can't be negative."))]
    pub age: i32,

    #[serde(default)]
    #[validate(
        length(min = 7, message = "Password must be at least 7 characters"),
        custom(function = "validate_password_content")
    )]
    pub password: String,
}

fn default_age() -> i32 {
    DEFAULT_AGE
}

impl NewUser {
    /// Trims every field and lowercases the email
    pub fn normalize(&mut self) {
        self.name = self.name.trim().to_string();
        self.email = normalize_email(&self.email);
        self.password = self.password.trim().to_string();
    }
}

/// Login payload
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub password: String,
}

/// Profile update payload: `name`, `age`, `email`, `password`
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UserPatch {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: Option<String>,

    #[validate(range(min = 0, message = "Invalid age. Age can't be negative."))]
    pub age: Option<i32>,

    #[validate(email(message = "Email is invalid"))]
    pub email: Option<String>,

    #[validate(
        length(min = 7, message = "Password must be at least 7 characters"),
        custom(function = "validate_password_content")
    )]
    pub password: Option<String>,
}

impl Patch for UserPatch {
    const FIELDS: &'static [&'static str] = &["name", "age", "email", "password"];
}

impl UserPatch {
    pub fn normalize(&mut self) {
        if let Some(name) = self.name.as_mut() {
            *name = name.trim().to_string();
        }
        if let Some(email) = self.email.as_mut() {
            *email = normalize_email(email);
        }
        if let Some(password) = self.password.as_mut() {
            *password = password.trim().to_string();
        }
    }
}

/// Trims and lowercases an email address
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Outcome of deleting an account together with its tasks
#[derive(Debug, Clone)]
pub struct DeletedAccount {
    /// The user row as it was before deletion
    pub user: User,

    /// Number of tasks removed with it
    pub tasks_deleted: u64,
}

impl User {
    /// Inserts a new user
    ///
    /// # Errors
    ///
    /// Fails on a duplicate email (unique index `users_email_key`) or if the
    /// database is unreachable.
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, age, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, email, age, password_hash, created_at, updated_at
            "#,
        )
        .bind(data.name)
        .bind(data.email)
        .bind(data.age)
        .bind(data.password_hash)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, age, password_hash, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by (already normalized) email
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, age, password_hash, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by ID, only if `token` is one of its live sessions
    pub async fn find_by_session(
        pool: &PgPool,
        id: Uuid,
        token: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT u.id, u.name, u.email, u.age, u.password_hash, u.created_at, u.updated_at
            FROM users u
            JOIN user_tokens t ON t.user_id = u.id
            WHERE u.id = $1
              AND t.token = $2
              AND (t.expires_at IS NULL OR t.expires_at > NOW())
            LIMIT 1
            "#,
        )
        .bind(id)
        .bind(token)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Updates an existing user
    ///
    /// Only non-None fields in `data` are written, and `updated_at` is bumped
    /// only when there is one. Returns None if the user does not exist.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateUser,
    ) -> Result<Option<Self>, sqlx::Error> {
        if data.is_empty() {
            return Self::find_by_id(pool, id).await;
        }

        let mut query = String::from("UPDATE users SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", name = ${}", bind_count));
        }
        if data.email.is_some() {
            bind_count += 1;
            query.push_str(&format!(", email = ${}", bind_count));
        }
        if data.age.is_some() {
            bind_count += 1;
            query.push_str(&format!(", age = ${}", bind_count));
        }
        if data.password_hash.is_some() {
            bind_count += 1;
            query.push_str(&format!(", password_hash = ${}", bind_count));
        }

        query.push_str(
            " WHERE id = $1 RETURNING id, name, email, age, password_hash, created_at, updated_at",
        );

        let mut q = sqlx::query_as::<_, User>(&query).bind(id);

        if let Some(name) = data.name {
            q = q.bind(name);
        }
        if let Some(email) = data.email {
            q = q.bind(email);
        }
        if let Some(age) = data.age {
            q = q.bind(age);
        }
        if let Some(password_hash) = data.password_hash {
            q = q.bind(password_hash);
        }

        let user = q.fetch_optional(pool).await?;

        Ok(user)
    }

    /// Deletes a user and every task it owns in one transaction
    ///
    /// Session tokens go with the user row (`ON DELETE CASCADE` on
    /// `user_tokens`). Tasks are deleted explicitly first because
    /// `tasks.owner_id` does not cascade.
    pub async fn delete_with_tasks(
        pool: &PgPool,
        id: Uuid,
    ) -> Result<Option<DeletedAccount>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let tasks_deleted = sqlx::query("DELETE FROM tasks WHERE owner_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let user = sqlx::query_as::<_, User>(
            r#"
            DELETE FROM users
            WHERE id = $1
            RETURNING id, name, email, age, password_hash, created_at, updated_at
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        match user {
            Some(user) => {
                tx.commit().await?;
                Ok(Some(DeletedAccount {
                    user,
                    tasks_deleted,
                }))
            }
            None => {
                tx.rollback().await?;
                Ok(None)
            }
        }
    }

    /// Replaces (or clears, with None) the stored avatar
    ///
    /// Returns false if the user does not exist.
    pub async fn set_avatar(
        pool: &PgPool,
        id: Uuid,
        avatar: Option<Vec<u8>>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET avatar = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(avatar)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Reads the stored avatar bytes
    ///
    /// None when the user does not exist or has no avatar.
    pub async fn find_avatar(pool: &PgPool, id: Uuid) -> Result<Option<Vec<u8>>, sqlx::Error> {
        let avatar: Option<Option<Vec<u8>>> =
            sqlx::query_scalar("SELECT avatar FROM users WHERE id = $1")
                .bind(id)
                .fetch_optional(pool)
                .await?;

        Ok(avatar.flatten())
    }
}

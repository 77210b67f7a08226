/// Active session tokens
///
/// A user's active session list is the set of rows in `user_tokens` for that
/// user. A token authenticates only while its row exists, so deleting the row
/// is how a session is revoked.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE user_tokens (
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     token TEXT NOT NULL,
///     expires_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (user_id, token)
/// );
/// ```

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// One entry in a user's active session list
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct SessionToken {
    pub token: String,

    /// None when sessions never expire
    pub expires_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
}

impl SessionToken {
    /// Appends a token to the user's active list
    ///
    /// Returns false if the user does not exist.
    pub async fn add(
        pool: &PgPool,
        user_id: Uuid,
        token: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO user_tokens (user_id, token, expires_at)
            SELECT id, $2, $3 FROM users WHERE id = $1
            ON CONFLICT (user_id, token) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(token)
        .bind(expires_at)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Removes exactly one token; returns whether it was present
    pub async fn remove(pool: &PgPool, user_id: Uuid, token: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM user_tokens WHERE user_id = $1 AND token = $2")
            .bind(user_id)
            .bind(token)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Empties the user's active list; returns how many tokens were dropped
    pub async fn clear(pool: &PgPool, user_id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM user_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Drops the user's tokens whose expiry has passed
    pub async fn prune_expired(
        pool: &PgPool,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM user_tokens
            WHERE user_id = $1 AND expires_at IS NOT NULL AND expires_at <= $2
            "#,
        )
        .bind(user_id)
        .bind(now)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Lists the user's active tokens, oldest first
    pub async fn list(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let tokens = sqlx::query_as::<_, SessionToken>(
            r#"
            SELECT token, expires_at, created_at
            FROM user_tokens
            WHERE user_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(tokens)
    }
}

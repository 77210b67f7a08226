/// Session token service
///
/// Issues signed tokens, records them in the user's active session list and
/// checks presented tokens against both the signature and that list. Logging
/// out removes a token from the list, so a revoked token fails authentication
/// even though its signature is still valid.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use taskapp_shared::auth::session::SessionManager;
/// use taskapp_shared::models::user::CreateUser;
/// use taskapp_shared::store::{memory::MemoryStore, Store, UserStore};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
/// let sessions = SessionManager::new(store.clone(), "a-secret-that-is-at-least-32-chars!!", None);
///
/// let user = store.create_user(CreateUser {
///     name: "Ann".into(),
///     email: "a@x.com".into(),
///     age: 18,
///     password_hash: "$argon2id$...".into(),
/// }).await?;
///
/// let token = sessions.issue(user.id).await?;
/// let auth = sessions.authenticate(&token).await?;
/// assert_eq!(auth.user.id, user.id);
///
/// sessions.revoke(user.id, &token).await?;
/// assert!(sessions.authenticate(&token).await.is_err());
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use super::jwt::{create_token, validate_token, Claims, JwtError};
use super::middleware::{AuthContext, AuthError};
use crate::error::{ServiceError, ServiceResult};
use crate::store::{Store, StoreResult};

pub struct SessionManager {
    store: Arc<dyn Store>,
    secret: String,
    ttl: Option<Duration>,
}

impl SessionManager {
    /// `ttl` of None means tokens stay valid until revoked
    pub fn new(store: Arc<dyn Store>, secret: impl Into<String>, ttl: Option<Duration>) -> Self {
        Self {
            store,
            secret: secret.into(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Signs a new token for `user_id` and appends it to the active list
    ///
    /// Expired entries are pruned from the list first, so the list cannot grow
    /// without bound when sessions expire.
    pub async fn issue(&self, user_id: Uuid) -> ServiceResult<String> {
        let now = Utc::now();
        if self.ttl.is_some() {
            let pruned = self.store.prune_expired_tokens(user_id, now).await?;
            if pruned > 0 {
                debug!(user_id = %user_id, pruned, "Pruned expired sessions");
            }
        }

        let claims = Claims::new(user_id, self.ttl);
        let token = create_token(&claims, &self.secret)?;
        let expires_at = self.ttl.map(|ttl| now + ttl);

        if !self.store.add_token(user_id, &token, expires_at).await? {
            return Err(ServiceError::NotFound);
        }

        debug!(user_id = %user_id, "Issued session token");
        Ok(token)
    }

    /// Checks the signature (and expiry, if any) and returns the user ID
    ///
    /// Says nothing about whether the session is still active.
    pub fn verify(&self, token: &str) -> Result<Uuid, JwtError> {
        Ok(validate_token(token, &self.secret)?.sub)
    }

    /// Resolves a presented token to its user
    ///
    /// Fails if the signature is bad, the token expired, the user no longer
    /// exists, or the token is not in the user's active list.
    pub async fn authenticate(&self, token: &str) -> Result<AuthContext, AuthError> {
        let user_id = self.verify(token).map_err(AuthError::InvalidToken)?;

        let user = self
            .store
            .find_user_with_token(user_id, token)
            .await
            .map_err(AuthError::Store)?
            .ok_or(AuthError::UnknownSession)?;

        Ok(AuthContext {
            user,
            token: token.to_string(),
        })
    }

    /// Removes exactly one token from the user's active list
    pub async fn revoke(&self, user_id: Uuid, token: &str) -> StoreResult<bool> {
        self.store.remove_token(user_id, token).await
    }

    /// Empties the user's active list
    pub async fn revoke_all(&self, user_id: Uuid) -> StoreResult<u64> {
        self.store.clear_tokens(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::{CreateUser, User};
    use crate::store::memory::MemoryStore;

    const SECRET: &str = "test-secret-key-at-least-32-characters-long";

    async fn setup(ttl: Option<Duration>) -> (Arc<dyn Store>, SessionManager, User) {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let sessions = SessionManager::new(store.clone(), SECRET, ttl);
        let user = store
            .create_user(CreateUser {
                name: "Ann".to_string(),
                email: "a@x.com".to_string(),
                age: 18,
                password_hash: "hash".to_string(),
            })
            .await
            .unwrap();
        (store, sessions, user)
    }

    #[tokio::test]
    async fn test_issue_and_authenticate() {
        let (store, sessions, user) = setup(None).await;

        let token = sessions.issue(user.id).await.unwrap();
        let auth = sessions.authenticate(&token).await.unwrap();

        assert_eq!(auth.user.id, user.id);
        assert_eq!(auth.token, token);
        assert_eq!(sessions.verify(&token).unwrap(), user.id);
        assert_eq!(store.list_tokens(user.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_revoke_one_keeps_others() {
        let (_, sessions, user) = setup(None).await;
        let a = sessions.issue(user.id).await.unwrap();
        let b = sessions.issue(user.id).await.unwrap();
        assert_ne!(a, b);

        assert!(sessions.revoke(user.id, &a).await.unwrap());
        assert!(matches!(
            sessions.authenticate(&a).await,
            Err(AuthError::UnknownSession)
        ));
        assert!(sessions.authenticate(&b).await.is_ok());
    }

    #[tokio::test]
    async fn test_revoke_all() {
        let (_, sessions, user) = setup(None).await;
        let a = sessions.issue(user.id).await.unwrap();
        let b = sessions.issue(user.id).await.unwrap();

        assert_eq!(sessions.revoke_all(user.id).await.unwrap(), 2);
        assert!(sessions.authenticate(&a).await.is_err());
        assert!(sessions.authenticate(&b).await.is_err());
    }

    #[tokio::test]
    async fn test_token_signed_elsewhere_rejected() {
        let (_, sessions, user) = setup(None).await;
        let forged = create_token(
            &Claims::new(user.id, None),
            "a-different-secret-of-at-least-32-chars",
        )
        .unwrap();

        assert!(matches!(
            sessions.authenticate(&forged).await,
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[tokio::test]
    async fn test_issue_for_missing_user() {
        let (_, sessions, _) = setup(None).await;
        assert!(matches!(
            sessions.issue(Uuid::new_v4()).await,
            Err(ServiceError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_expiring_sessions_prune_on_issue() {
        let (store, sessions, user) = setup(Some(Duration::hours(1))).await;

        let stale = Utc::now() - Duration::minutes(5);
        store.add_token(user.id, "stale", Some(stale)).await.unwrap();

        let token = sessions.issue(user.id).await.unwrap();
        let tokens = store.list_tokens(user.id).await.unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].token, token);
        assert!(tokens[0].expires_at.is_some());
    }
}

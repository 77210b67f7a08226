/// Account lifecycle
///
/// Signup, login, logout, profile updates, account deletion and avatar
/// management, each as one explicit operation. Password hashing and the
/// user-to-tasks cascade happen here, in named steps, rather than as hooks
/// inside the persistence layer.
///
/// # Example
///
/// ```no_run
/// use taskapp_shared::accounts::AccountService;
/// use taskapp_shared::models::user::NewUser;
///
/// # async fn example(accounts: AccountService) -> Result<(), Box<dyn std::error::Error>> {
/// let signup: NewUser = serde_json::from_value(serde_json::json!({
///     "name": "Ann",
///     "email": "a@x.com",
///     "password": "longenough1"
/// }))?;
///
/// let (user, token) = accounts.signup(signup).await?;
/// let (_, second) = accounts.login("a@x.com", "longenough1").await?;
/// assert_ne!(token, second);
///
/// accounts.logout(user.id, &token).await?;
/// # Ok(())
/// # }
/// ```

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

use crate::auth::password::{hash_password, verify_password, HashParams};
use crate::auth::session::SessionManager;
use crate::avatar;
use crate::email::{dispatch, Email, Mailer};
use crate::error::{ServiceError, ServiceResult};
use crate::models::patch::Patch;
use crate::models::user::{normalize_email, CreateUser, NewUser, UpdateUser, User, UserPatch};
use crate::store::Store;

pub struct AccountService {
    store: Arc<dyn Store>,
    sessions: Arc<SessionManager>,
    mailer: Arc<dyn Mailer>,
    hash_params: HashParams,
    email_from: String,
}

impl AccountService {
    pub fn new(
        store: Arc<dyn Store>,
        sessions: Arc<SessionManager>,
        mailer: Arc<dyn Mailer>,
        hash_params: HashParams,
        email_from: impl Into<String>,
    ) -> Self {
        Self {
            store,
            sessions,
            mailer,
            hash_params,
            email_from: email_from.into(),
        }
    }

    /// Creates an account and its first session
    ///
    /// Sends the welcome email in the background.
    pub async fn signup(&self, mut data: NewUser) -> ServiceResult<(User, String)> {
        data.normalize();
        data.validate()?;

        let password_hash = self.hash(data.password).await?;
        let user = self
            .store
            .create_user(CreateUser {
                name: data.name,
                email: data.email,
                age: data.age,
                password_hash,
            })
            .await?;

        let token = self.sessions.issue(user.id).await?;

        info!(user_id = %user.id, "User signed up");
        dispatch(
            self.mailer.clone(),
            Email::welcome(&self.email_from, &user.email, &user.name),
        );

        Ok((user, token))
    }

    /// Verifies credentials and opens an additional session
    ///
    /// Unknown email and wrong password fail identically.
    pub async fn login(&self, email: &str, password: &str) -> ServiceResult<(User, String)> {
        let email = normalize_email(email);
        let password = password.trim().to_string();

        let Some(user) = self.store.find_user_by_email(&email).await? else {
            debug!("Login attempt for unknown email");
            return Err(ServiceError::AuthenticationFailed);
        };

        let hash = user.password_hash.clone();
        let matches = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| ServiceError::Internal(e.to_string()))??;

        if !matches {
            debug!(user_id = %user.id, "Login attempt with wrong password");
            return Err(ServiceError::AuthenticationFailed);
        }

        let token = self.sessions.issue(user.id).await?;
        info!(user_id = %user.id, "User logged in");

        Ok((user, token))
    }

    /// Ends exactly the session identified by `token`
    pub async fn logout(&self, user_id: Uuid, token: &str) -> ServiceResult<()> {
        self.sessions.revoke(user_id, token).await?;
        info!(user_id = %user_id, "User logged out");
        Ok(())
    }

    /// Ends every session of the user
    pub async fn logout_all(&self, user_id: Uuid) -> ServiceResult<()> {
        let revoked = self.sessions.revoke_all(user_id).await?;
        info!(user_id = %user_id, revoked, "User logged out of all sessions");
        Ok(())
    }

    pub async fn profile(&self, user_id: Uuid) -> ServiceResult<User> {
        self.store
            .find_user(user_id)
            .await?
            .ok_or(ServiceError::NotFound)
    }

    /// Applies a profile patch (`name`, `age`, `email`, `password`)
    ///
    /// Any other key rejects the whole patch. The password is rehashed only
    /// when the patch contains one.
    pub async fn update_profile(&self, user_id: Uuid, body: Value) -> ServiceResult<User> {
        let mut patch = UserPatch::from_json(body)?;
        patch.normalize();
        patch.validate()?;

        let password_hash = match patch.password {
            Some(password) => Some(self.hash(password).await?),
            None => None,
        };

        let update = UpdateUser {
            name: patch.name,
            email: patch.email,
            age: patch.age,
            password_hash,
        };

        let user = self
            .store
            .update_user(user_id, update)
            .await?
            .ok_or(ServiceError::NotFound)?;

        info!(user_id = %user_id, "Profile updated");
        Ok(user)
    }

    /// Deletes the account and every task it owns
    ///
    /// Sends the cancellation email in the background once the deletion has
    /// been committed.
    pub async fn delete_account(&self, user_id: Uuid) -> ServiceResult<User> {
        let deleted = self
            .store
            .delete_user_and_tasks(user_id)
            .await?
            .ok_or(ServiceError::NotFound)?;

        info!(
            user_id = %user_id,
            tasks_deleted = deleted.tasks_deleted,
            "Account deleted"
        );
        dispatch(
            self.mailer.clone(),
            Email::cancellation(&self.email_from, &deleted.user.email, &deleted.user.name),
        );

        Ok(deleted.user)
    }

    /// Validates, normalizes and stores an uploaded avatar
    pub async fn set_avatar(&self, user_id: Uuid, filename: &str, bytes: Vec<u8>) -> ServiceResult<()> {
        avatar::check_upload(filename, bytes.len())?;

        let png = tokio::task::spawn_blocking(move || avatar::normalize(&bytes))
            .await
            .map_err(|e| ServiceError::Internal(e.to_string()))??;

        if !self.store.set_avatar(user_id, Some(png)).await? {
            return Err(ServiceError::NotFound);
        }

        debug!(user_id = %user_id, "Avatar stored");
        Ok(())
    }

    pub async fn remove_avatar(&self, user_id: Uuid) -> ServiceResult<()> {
        if !self.store.set_avatar(user_id, None).await? {
            return Err(ServiceError::NotFound);
        }
        Ok(())
    }

    /// Stored PNG bytes; NotFound if the user or the avatar is missing
    pub async fn avatar(&self, user_id: Uuid) -> ServiceResult<Vec<u8>> {
        self.store
            .find_avatar(user_id)
            .await?
            .ok_or(ServiceError::NotFound)
    }

    async fn hash(&self, password: String) -> ServiceResult<String> {
        let params = self.hash_params;
        let hash = tokio::task::spawn_blocking(move || hash_password(&password, &params))
            .await
            .map_err(|e| ServiceError::Internal(e.to_string()))??;
        Ok(hash)
    }
}

/// Argon2id password hashing
///
/// Passwords are only ever stored as PHC strings
/// (`$argon2id$v=19$m=...,t=...,p=...$salt$hash`). Verification reads the cost
/// parameters back out of the stored hash, so changing [`HashParams`] only
/// affects newly hashed passwords.
///
/// # Example
///
/// ```
/// use taskapp_shared::auth::password::{hash_password, verify_password, HashParams};
///
/// // Cheap parameters for the example; production uses HashParams::default()
/// let params = HashParams { m_cost: 1024, t_cost: 1, p_cost: 1 };
///
/// let hash = hash_password("longenough1", &params).unwrap();
/// assert!(verify_password("longenough1", &hash).unwrap());
/// assert!(!verify_password("wrong", &hash).unwrap());
/// ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder, Version,
};
use std::borrow::Cow;
use validator::ValidationError;

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("Failed to hash password: {0}")]
    HashError(String),

    #[error("Failed to verify password: {0}")]
    VerifyError(String),

    #[error("Invalid password hash format: {0}")]
    InvalidHash(String),
}

/// Argon2id cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashParams {
    /// Memory in KiB
    pub m_cost: u32,

    /// Iterations
    pub t_cost: u32,

    /// Parallel lanes
    pub p_cost: u32,
}

impl Default for HashParams {
    /// 64 MiB, 3 iterations, 4 lanes
    fn default() -> Self {
        Self {
            m_cost: 65536,
            t_cost: 3,
            p_cost: 4,
        }
    }
}

/// Hashes `password` with a fresh random salt
pub fn hash_password(password: &str, params: &HashParams) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let argon_params = ParamsBuilder::new()
        .m_cost(params.m_cost)
        .t_cost(params.t_cost)
        .p_cost(params.p_cost)
        .output_len(32)
        .build()
        .map_err(|e| PasswordError::HashError(format!("Invalid parameters: {}", e)))?;

    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, argon_params);

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashError(e.to_string()))?;

    Ok(hash.to_string())
}

/// Constant-time check of `password` against a stored PHC hash
///
/// Returns `Ok(false)` for a wrong password and an error only if the stored
/// hash itself is unusable.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(hash).map_err(|e| PasswordError::InvalidHash(e.to_string()))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerifyError(e.to_string())),
    }
}

/// Rejects passwords containing the word "password" in any letter case
///
/// Used as a `validator` custom rule on signup and profile updates.
pub fn validate_password_content(password: &str) -> Result<(), ValidationError> {
    if password.to_lowercase().contains("password") {
        let mut error = ValidationError::new("password_content");
        error.message = Some(Cow::Borrowed("Password can't contain \"password\""));
        return Err(error);
    }

    Ok(())
}

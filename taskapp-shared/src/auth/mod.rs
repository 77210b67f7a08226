/// Authentication and authorization
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and the password content rule
/// - [`jwt`]: HS256 session token signing and validation
/// - [`session`]: Issuing, resolving and revoking session tokens
/// - [`middleware`]: The Axum authorization gate
///
/// # Example
///
/// ```
/// use taskapp_shared::auth::password::{hash_password, verify_password, HashParams};
/// use taskapp_shared::auth::jwt::{create_token, validate_token, Claims};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let params = HashParams { m_cost: 1024, t_cost: 1, p_cost: 1 };
/// let hash = hash_password("longenough1", &params)?;
/// assert!(verify_password("longenough1", &hash)?);
///
/// let secret = "a-secret-that-is-at-least-32-chars!!";
/// let token = create_token(&Claims::new(Uuid::new_v4(), None), secret)?;
/// validate_token(&token, secret)?;
/// # Ok(())
/// # }
/// ```

pub mod jwt;
pub mod middleware;
pub mod password;
pub mod session;

/// Configuration management for the API server
///
/// Configuration comes from environment variables (a `.env` file is loaded
/// first when present).
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `DATABASE_CREATE_IF_MISSING`: Create the database on boot (default: false)
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `PORT` / `API_PORT`: Port to bind to (default: 3000, `PORT` wins)
/// - `JWT_SECRET`: Token signing secret, at least 32 characters (required)
/// - `SESSION_TTL_HOURS`: Session lifetime; 0 means sessions never expire (default: 0)
/// - `SENDGRID_API_KEY`: Enables outbound email (optional)
/// - `EMAIL_FROM`: Sender address (default: noreply@taskapp.local)
/// - `CORS_ORIGINS`: Comma-separated allowed origins, or `*` (default: *)
/// - `PRODUCTION`: Enables HSTS (default: false)
/// - `PASSWORD_HASH_MEMORY_KIB`, `PASSWORD_HASH_ITERATIONS`,
///   `PASSWORD_HASH_PARALLELISM`: Argon2id cost (default: 65536, 3, 4)
/// - `RUST_LOG`, `LOG_FORMAT`: Read by the binary's tracing setup
///
/// # Example
///
/// ```no_run
/// use taskapp_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use taskapp_shared::auth::password::HashParams;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub email: EmailConfig,
    pub password: PasswordConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Allowed CORS origins; `["*"]` allows any
    pub cors_origins: Vec<String>,

    /// Production mode (adds HSTS)
    pub production: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(skip_serializing)]
    pub url: String,

    pub max_connections: u32,

    pub create_if_missing: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Signing secret, at least 32 characters
    ///
    /// Generate with: `openssl rand -hex 32`
    #[serde(skip_serializing)]
    pub secret: String,

    /// Session lifetime in hours; 0 means tokens live until revoked
    pub session_ttl_hours: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    /// None disables delivery; messages are only logged
    #[serde(skip_serializing)]
    pub sendgrid_api_key: Option<String>,

    pub from: String,
}

/// Argon2id cost parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        let params = HashParams::default();
        Self {
            memory_kib: params.m_cost,
            iterations: params.t_cost,
            parallelism: params.p_cost,
        }
    }
}

const MIN_SECRET_LENGTH: usize = 32;

/// One hundred years
const MAX_SESSION_TTL_HOURS: u64 = 876_000;

impl Config {
    /// Loads configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value does not
    /// parse.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let host = var("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = match var("PORT").or_else(|| var("API_PORT")) {
            Some(port) => port
                .trim()
                .parse::<u16>()
                .with_context(|| format!("Invalid port: {}", port))?,
            None => 3000,
        };

        let cors_origins = var("CORS_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let production = parse_bool("PRODUCTION", var("PRODUCTION"))?;

        let database_url = var("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;
        let max_connections = parse_or("DATABASE_MAX_CONNECTIONS", var("DATABASE_MAX_CONNECTIONS"), 10)?;
        let create_if_missing =
            parse_bool("DATABASE_CREATE_IF_MISSING", var("DATABASE_CREATE_IF_MISSING"))?;

        let jwt_secret = var("JWT_SECRET")
            .ok_or_else(|| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;
        if jwt_secret.len() < MIN_SECRET_LENGTH {
            anyhow::bail!("JWT_SECRET must be at least {} characters long", MIN_SECRET_LENGTH);
        }
        let session_ttl_hours = parse_or("SESSION_TTL_HOURS", var("SESSION_TTL_HOURS"), 0)?;
        if session_ttl_hours > MAX_SESSION_TTL_HOURS {
            anyhow::bail!("SESSION_TTL_HOURS must be at most {}", MAX_SESSION_TTL_HOURS);
        }

        let defaults = PasswordConfig::default();
        let password = PasswordConfig {
            memory_kib: parse_or("PASSWORD_HASH_MEMORY_KIB", var("PASSWORD_HASH_MEMORY_KIB"), defaults.memory_kib)?,
            iterations: parse_or("PASSWORD_HASH_ITERATIONS", var("PASSWORD_HASH_ITERATIONS"), defaults.iterations)?,
            parallelism: parse_or("PASSWORD_HASH_PARALLELISM", var("PASSWORD_HASH_PARALLELISM"), defaults.parallelism)?,
        };

        Ok(Self {
            api: ApiConfig {
                host,
                port,
                cors_origins,
                production,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
                create_if_missing,
            },
            jwt: JwtConfig {
                secret: jwt_secret,
                session_ttl_hours,
            },
            email: EmailConfig {
                sendgrid_api_key: var("SENDGRID_API_KEY"),
                from: var("EMAIL_FROM").unwrap_or_else(|| "noreply@taskapp.local".to_string()),
            },
            password,
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Session lifetime, or None if sessions never expire
    pub fn session_ttl(&self) -> Option<chrono::Duration> {
        match self.jwt.session_ttl_hours {
            0 => None,
            hours => Some(chrono::Duration::hours(hours as i64)),
        }
    }

    pub fn hash_params(&self) -> HashParams {
        HashParams {
            m_cost: self.password.memory_kib,
            t_cost: self.password.iterations,
            p_cost: self.password.parallelism,
        }
    }

    pub fn allows_any_origin(&self) -> bool {
        self.api.cors_origins.iter().any(|origin| origin == "*")
    }
}

fn parse_or<T>(key: &str, value: Option<String>, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        Some(value) => value
            .trim()
            .parse::<T>()
            .with_context(|| format!("Invalid value for {}: {}", key, value)),
        None => Ok(default),
    }
}

fn parse_bool(key: &str, value: Option<String>) -> anyhow::Result<bool> {
    match value.as_deref().map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(false),
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => Ok(true),
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => Ok(false),
        Some(v) => anyhow::bail!("Invalid boolean for {}: {}", key, v),
    }
}

/// Middleware for the API server
///
/// The session gate itself lives in `taskapp_shared::auth::middleware`.

pub mod security;

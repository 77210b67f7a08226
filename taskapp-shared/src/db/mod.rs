/// Database layer for Task App
///
/// # Modules
///
/// - `pool`: PostgreSQL connection pool with a health check
/// - `migrations`: Embedded migration runner
///
/// Models and their queries are in the crate-level `models` module; the
/// `store` module wraps them behind the persistence traits.

pub mod migrations;
pub mod pool;

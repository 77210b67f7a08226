//! # Task App Shared Library
//!
//! Domain types, persistence and business rules used by the Task App API
//! server.
//!
//! ## Module Organization
//!
//! - `models`: Database models and request payloads
//! - `store`: Persistence seam (PostgreSQL and in-memory implementations)
//! - `db`: Connection pool and migrations
//! - `auth`: Password hashing, session tokens and the authorization gate
//! - `accounts`: Account lifecycle (signup, login, profile, deletion, avatar)
//! - `tasks`: Owner-scoped task access
//! - `avatar`: Upload checks and image normalization
//! - `email`: Transactional notification sink
//! - `error`: Common error types

pub mod accounts;
pub mod auth;
pub mod avatar;
pub mod db;
pub mod email;
pub mod error;
pub mod models;
pub mod store;
pub mod tasks;

/// Current version of the Task App shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

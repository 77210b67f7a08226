/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `users`: Signup, login, sessions, profile and avatar
/// - `tasks`: Owner-scoped task CRUD

pub mod health;
pub mod tasks;
pub mod users;

/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskapp_api::{app::AppState, config::Config};
/// use taskapp_shared::email::LogMailer;
/// use taskapp_shared::store::memory::MemoryStore;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let state = AppState::new(Arc::new(MemoryStore::new()), Arc::new(LogMailer), config);
/// let app = taskapp_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, middleware::security::SecurityHeadersLayer, routes};
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use taskapp_shared::{
    accounts::AccountService,
    auth::{middleware::session_auth_middleware, session::SessionManager},
    avatar::AVATAR_MAX_BYTES,
    email::Mailer,
    store::Store,
    tasks::TaskService,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Room for multipart boundaries and part headers around the file
const MULTIPART_OVERHEAD: usize = 16 * 1024;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Persistence backend
    pub store: Arc<dyn Store>,

    /// Token issuing and validation
    pub sessions: Arc<SessionManager>,

    pub accounts: Arc<AccountService>,

    pub tasks: Arc<TaskService>,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Wires the services on top of a store and a mail sink
    pub fn new(store: Arc<dyn Store>, mailer: Arc<dyn Mailer>, config: Config) -> Self {
        let sessions = Arc::new(SessionManager::new(
            store.clone(),
            config.jwt.secret.clone(),
            config.session_ttl(),
        ));

        let accounts = Arc::new(AccountService::new(
            store.clone(),
            sessions.clone(),
            mailer,
            config.hash_params(),
            config.email.from.clone(),
        ));

        let tasks = Arc::new(TaskService::new(store.clone()));

        Self {
            store,
            sessions,
            accounts,
            tasks,
            config: Arc::new(config),
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET    /health               # Health check (public)
/// ├── /users
/// │   ├── POST   /                 # Sign up (public)
/// │   ├── POST   /login            # Log in (public)
/// │   ├── GET    /:id/avatar       # Avatar PNG (public)
/// │   ├── GET    /me/avatar        # Always 404 (public)
/// │   ├── POST   /logout           # (session)
/// │   ├── POST   /logoutAll        # (session)
/// │   ├── GET    /me               # (session)
/// │   ├── PATCH  /me               # (session)
/// │   ├── DELETE /me               # (session)
/// │   ├── POST   /me/avatar        # (session, multipart)
/// │   └── DELETE /me/avatar        # (session)
/// └── /tasks                       # (session)
///     ├── POST   /
///     ├── GET    /
///     ├── GET    /:id
///     ├── PATCH  /:id
///     └── DELETE /:id
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Security headers
/// 2. CORS (tower-http CorsLayer)
/// 3. Logging (tower-http TraceLayer)
/// 4. Session gate (protected routes only)
pub fn build_router(state: AppState) -> Router {
    // Public routes
    let public_routes = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/users", post(routes::users::signup))
        .route("/users/login", post(routes::users::login))
        .route("/users/:id/avatar", get(routes::users::get_avatar))
        .route("/users/me/avatar", get(routes::users::get_avatar_of_me));

    // Routes behind the session gate
    let protected_routes = Router::new()
        .route("/users/logout", post(routes::users::logout))
        .route("/users/logoutAll", post(routes::users::logout_all))
        .route(
            "/users/me",
            get(routes::users::me)
                .patch(routes::users::update_me)
                .delete(routes::users::delete_me),
        )
        .route(
            "/users/me/avatar",
            post(routes::users::upload_avatar)
                .layer(DefaultBodyLimit::max(AVATAR_MAX_BYTES + MULTIPART_OVERHEAD))
                .delete(routes::users::delete_avatar),
        )
        .route(
            "/tasks",
            post(routes::tasks::create_task).get(routes::tasks::list_tasks),
        )
        .route(
            "/tasks/:id",
            get(routes::tasks::get_task)
                .patch(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .layer(from_fn_with_state(
            state.sessions.clone(),
            session_auth_middleware,
        ));

    // Configure CORS based on environment
    let cors = if state.config.allows_any_origin() {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .max_age(std::time::Duration::from_secs(3600))
    };

    let security = SecurityHeadersLayer::new(state.config.api.production);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(security)
        .with_state(state)
}

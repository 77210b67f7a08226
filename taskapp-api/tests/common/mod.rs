//! Common test utilities for integration tests
//!
//! Builds the full router on top of an in-memory store and a mail sink that
//! records instead of sending, and provides request helpers.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use taskapp_api::app::{build_router, AppState};
use taskapp_api::config::Config;
use taskapp_shared::email::{Email, MailError, Mailer};
use taskapp_shared::store::memory::MemoryStore;
use taskapp_shared::store::Store;
use tokio::sync::Mutex;
use tower::Service as _;

pub const SECRET: &str = "integration-test-secret-at-least-32-chars";

/// Mail sink that keeps every message
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<Email>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        self.sent.lock().await.push(email.clone());
        Ok(())
    }
}

/// Test context containing all necessary resources
pub struct TestContext {
    pub app: axum::Router,
    pub store: Arc<dyn Store>,
    pub mailer: Arc<RecordingMailer>,
}

/// A signed-up user
pub struct TestUser {
    pub id: String,
    pub token: String,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_env(&[])
    }

    /// Creates a context with extra configuration variables
    pub fn with_env(extra: &[(&str, &str)]) -> Self {
        let mut vars: HashMap<String, String> = [
            ("DATABASE_URL", "postgresql://unused/test"),
            ("JWT_SECRET", SECRET),
            ("PASSWORD_HASH_MEMORY_KIB", "1024"),
            ("PASSWORD_HASH_ITERATIONS", "1"),
            ("PASSWORD_HASH_PARALLELISM", "1"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        for (k, v) in extra {
            vars.insert(k.to_string(), v.to_string());
        }

        let config = Config::from_lookup(|key| vars.get(key).cloned()).unwrap();
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let mailer = Arc::new(RecordingMailer::default());

        let state = AppState::new(store.clone(), mailer.clone(), config);

        Self {
            app: build_router(state),
            store,
            mailer,
        }
    }

    /// Sends a request through the router
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Response<Body>) {
        let response = self.app.clone().call(request).await.unwrap();
        (response.status(), response)
    }

    /// Sends a JSON request (or an empty body) and parses the JSON reply
    pub async fn json(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let (status, response) = self.send(request).await;
        (status, read_json(response).await)
    }

    /// Signs up a user and returns its ID and first token
    pub async fn signup(&self, name: &str, email: &str, password: &str) -> TestUser {
        let (status, body) = self
            .json(
                "POST",
                "/users",
                None,
                Some(json!({ "name": name, "email": email, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "signup failed: {}", body);

        TestUser {
            id: body["user"]["id"].as_str().unwrap().to_string(),
            token: body["token"].as_str().unwrap().to_string(),
        }
    }

    /// Waits until the mail sink holds `count` messages
    pub async fn wait_for_mail(&self, count: usize) -> Vec<Email> {
        for _ in 0..100 {
            {
                let sent = self.mailer.sent.lock().await;
                if sent.len() >= count {
                    return sent.clone();
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("expected {} emails", count);
    }
}

/// Reads a response body as JSON; an empty body reads as `null`
pub async fn read_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).unwrap()
}

/// Builds a `multipart/form-data` body with a single file part
pub fn multipart_body(field: &str, filename: &str, content: &[u8]) -> (String, Vec<u8>) {
    let boundary = "taskapp-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    (format!("multipart/form-data; boundary={}", boundary), body)
}

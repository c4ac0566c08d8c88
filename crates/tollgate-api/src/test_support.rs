//! Shared fixtures for router tests

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

use tollgate_auth::{CredentialHasher, DEFAULT_ISSUER, HashingConfig, TokenManager};
use tollgate_core::{
    AccountService, AuthorizationGuard, LivenessCheck, SessionManager, SessionPolicy,
};
use tollgate_db::Database;
use tollgate_revocation::MemoryRevocationStore;

use crate::routes::create_router;
use crate::state::AppState;

pub(crate) async fn test_state() -> AppState {
    let db = Database::in_memory().await.unwrap();
    let hasher = Arc::new(
        CredentialHasher::new(HashingConfig {
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
        })
        .unwrap(),
    );
    let tokens = Arc::new(TokenManager::new(
        b"0123456789abcdef0123456789abcdef",
        chrono::Duration::minutes(15),
        DEFAULT_ISSUER,
    ));

    let sessions = SessionManager::new(
        Arc::clone(&hasher),
        tokens,
        Arc::new(MemoryRevocationStore::new()),
        Arc::new(db.clone()),
        SessionPolicy {
            liveness: LivenessCheck::Latest,
            ..Default::default()
        },
    );
    let accounts = AccountService::new(db, hasher, AuthorizationGuard::default());

    AppState::new(Arc::new(sessions), accounts)
}

pub(crate) async fn test_app() -> Router {
    create_router(test_state().await, None)
}

/// Send a request and decode the JSON body (`Null` when empty)
pub(crate) async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    authorization: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let request = builder.body(body).unwrap();
    decode(app, request).await
}

/// Send a raw body with an explicit content type
pub(crate) async fn send_raw(
    app: &Router,
    method: &str,
    uri: &str,
    content_type: &str,
    body: &str,
) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body.to_string()))
        .unwrap();
    decode(app, request).await
}

async fn decode(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    (status, value)
}

/// Sign up and log in, returning the user ID and a bearer header value
pub(crate) async fn signup_and_login(app: &Router, email: &str) -> (i64, String) {
    let credentials = serde_json::json!({ "email": email, "password": "pw-123456" });

    let (status, user) = send(app, "POST", "/api/users/signup", None, Some(credentials.clone())).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, login) = send(app, "POST", "/api/users/login", None, Some(credentials)).await;
    assert_eq!(status, StatusCode::OK);

    let token = login["token"].as_str().unwrap();
    (user["id"].as_i64().unwrap(), format!("Bearer {}", token))
}

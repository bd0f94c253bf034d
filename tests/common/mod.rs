// SPDX-License-Identifier: MIT

use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use santa_exchange::config::Config;
use santa_exchange::middleware::auth::{create_jwt, hash_password};
use santa_exchange::routes::create_router;
use santa_exchange::services::MailService;
use santa_exchange::store::{NewUser, UserStore};
use santa_exchange::AppState;
use std::sync::Arc;
use tempfile::TempDir;

/// Create a test app backed by a temp data directory.
///
/// The returned `TempDir` must be kept alive for the duration of the
/// test; dropping it removes the store files.
#[allow(dead_code)]
pub async fn create_test_app() -> (axum::Router, Arc<AppState>, TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = Config {
        data_dir: dir.path().to_string_lossy().to_string(),
        ..Config::default()
    };

    let store = UserStore::open(&config.data_dir);
    let admin_hash = hash_password(&config.admin_password).expect("hash");
    store.initialize(&admin_hash).await.expect("initialize");

    let state = Arc::new(AppState {
        config: config.clone(),
        store,
        mail: MailService::disabled(),
    });

    (create_router(state.clone()), state, dir)
}

/// Mint a session token the same way the login route does.
#[allow(dead_code)]
pub fn test_jwt(state: &AppState, user_id: u64) -> String {
    create_jwt(user_id, &state.config.jwt_signing_key).expect("jwt")
}

/// Seed a participant directly through the store.
///
/// The password hash is a placeholder; tests authenticate with JWTs.
#[allow(dead_code)]
pub async fn seed_participant(state: &AppState, username: &str, ready: bool) -> u64 {
    let user = state
        .store
        .add_user(NewUser {
            username: username.to_string(),
            email: Some(format!("{}@example.com", username)),
            password_hash: "$argon2id$placeholder".to_string(),
            is_admin: false,
        })
        .await
        .expect("add_user");

    if ready {
        state
            .store
            .update_user(user.id, |u| {
                let mut u = u.clone();
                u.ready = true;
                u
            })
            .await
            .expect("update_user");
    }

    user.id
}

/// Build an authenticated request with a JSON body.
#[allow(dead_code)]
pub fn json_request(method: &str, uri: &str, token: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Build an authenticated request with an empty body.
#[allow(dead_code)]
pub fn empty_request(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn json_body(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}

/// Id of the seeded admin account (always the first user created).
#[allow(dead_code)]
pub const ADMIN_ID: u64 = 1;

//! Common test utilities for API tests
//!
//! Every context gets its own in-memory store, so tests run in parallel
//! without a database:
//! - Router over fresh repositories
//! - Test user creation
//! - JWT token generation
//! - Request helpers returning status and JSON body

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use taskboard_api::app::{build_router, AppState};
use taskboard_api::config::Config;
use taskboard_shared::auth::jwt::{create_token, Claims};
use taskboard_shared::models::user::{ExternalIdentity, User};
use taskboard_shared::repository::Repositories;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_SECRET: &str = "test-secret-key-at-least-32-bytes-long";

/// Test context containing all necessary resources
pub struct TestContext {
    pub repos: Repositories,
    pub app: axum::Router,
    pub config: Config,
    pub user: User,
    pub jwt_token: String,
}

impl TestContext {
    /// Creates a context with one signed-in user
    pub async fn new() -> anyhow::Result<Self> {
        let config = Config::from_lookup(|key| match key {
            "JWT_SECRET" => Some(TEST_SECRET.to_string()),
            _ => None,
        })?;

        let repos = Repositories::in_memory();
        let user = create_user(&repos, "ada").await?;
        let jwt_token = token_for(&user)?;

        let state = AppState::new(repos.clone(), config.clone());
        let app = build_router(state);

        Ok(TestContext {
            repos,
            app,
            config,
            user,
            jwt_token,
        })
    }

    /// Returns authorization header value
    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.jwt_token)
    }

    /// Sends a request as the context's user
    pub async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.send_as(&self.jwt_token, method, uri, body).await
    }

    /// Sends a request with an arbitrary token
    pub async fn send_as(
        &self,
        token: &str,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", format!("Bearer {}", token));
        send(&self.app, builder, body).await
    }

    /// Creates a board and returns its ID
    pub async fn create_board(&self, name: &str) -> Uuid {
        let (status, body) = self
            .send("POST", "/v1/boards", Some(serde_json::json!({ "name": name })))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        id_of(&body)
    }

    /// Appends a list to a board and returns its ID
    pub async fn create_list(&self, board_id: Uuid, name: &str) -> Uuid {
        let (status, body) = self
            .send(
                "POST",
                &format!("/v1/boards/{}/lists", board_id),
                Some(serde_json::json!({ "name": name })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        id_of(&body)
    }

    /// Creates a task and returns its ID
    pub async fn create_task(&self, list_id: Uuid, body: Value) -> Uuid {
        let (status, body) = self
            .send("POST", &format!("/v1/lists/{}/tasks", list_id), Some(body))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        id_of(&body)
    }
}

/// Creates a user through the identity sync path
pub async fn create_user(repos: &Repositories, handle: &str) -> anyhow::Result<User> {
    let user = repos
        .users
        .find_or_create_by_external_auth_id(ExternalIdentity {
            external_auth_id: format!("test|{}-{}", handle, Uuid::new_v4()),
            email: format!("{}-{}@example.com", handle, Uuid::new_v4()),
            name: Some(handle.to_string()),
        })
        .await?;
    Ok(user)
}

/// Access token carrying an existing user's identity
pub fn token_for(user: &User) -> anyhow::Result<String> {
    token_for_identity(ExternalIdentity {
        external_auth_id: user.external_auth_id.clone(),
        email: user.email.clone(),
        name: Some(user.name.clone()),
    })
}

/// Access token for any identity, seen before or not
pub fn token_for_identity(identity: ExternalIdentity) -> anyhow::Result<String> {
    Ok(create_token(&Claims::new(identity), TEST_SECRET)?)
}

/// Sends a request through the router without a network
pub async fn send(
    app: &axum::Router,
    builder: axum::http::request::Builder,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };

    (status, json)
}

/// Parses the `id` field of a response body
pub fn id_of(body: &Value) -> Uuid {
    body["id"].as_str().and_then(|id| id.parse().ok()).unwrap()
}

//! Shared harness: in-memory stores, a router, and request helpers.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::Utc;
use gatekeep_api::config::ApiConfig;
use gatekeep_api::{AppState, cached_user_store, router};
use gatekeep_core::auth::TokenIssuer;
use gatekeep_core::models::{NewUser, User};
use gatekeep_core::resets::memory::MemoryResetStore;
use gatekeep_core::role::Role;
use gatekeep_core::users::UserBus;
use gatekeep_core::users::memory::MemoryUserStore;
use serde_json::Value;
use tower::ServiceExt;

pub const PASSWORD: &str = "secret";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

impl TestApp {
    pub fn new() -> Self {
        let config = ApiConfig::with_secret("integration-secret");
        let tokens = Arc::new(TokenIssuer::new(config.keys.clone(), &config.issuer));
        let users = UserBus::new(cached_user_store(MemoryUserStore::new(), &config))
            .with_bcrypt_cost(4);
        let state = AppState::from_parts(config, tokens, users, Arc::new(MemoryResetStore::new()));
        Self {
            router: router(state.clone()),
            state,
        }
    }

    pub async fn seed(&self, email: &str, roles: &[Role]) -> User {
        let nu = NewUser {
            name: "Seeded".into(),
            email: email.into(),
            roles: roles.to_vec(),
            password: PASSWORD.into(),
            password_confirm: PASSWORD.into(),
        };
        self.state.users.create(nu, Utc::now()).await.unwrap()
    }

    pub async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
        let resp = self.router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, json)
    }

    /// Log in and return `(token, refreshToken)`.
    pub async fn login(&self, email: &str) -> (String, String) {
        let (status, body) = self
            .send(post_json(
                "/v1/auth/login",
                None,
                serde_json::json!({ "email": email, "password": PASSWORD }),
            ))
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        (
            body["token"].as_str().unwrap().to_string(),
            body["refreshToken"].as_str().unwrap().to_string(),
        )
    }
}

pub fn post_json(uri: &str, bearer: Option<&str>, body: Value) -> Request<Body> {
    with_json("POST", uri, bearer, body)
}

pub fn put_json(uri: &str, bearer: Option<&str>, body: Value) -> Request<Body> {
    with_json("PUT", uri, bearer, body)
}

fn with_json(method: &str, uri: &str, bearer: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn get(uri: &str, authorization: Option<&str>) -> Request<Body> {
    with_header("GET", uri, authorization)
}

pub fn delete(uri: &str, authorization: Option<&str>) -> Request<Body> {
    with_header("DELETE", uri, authorization)
}

fn with_header(method: &str, uri: &str, authorization: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

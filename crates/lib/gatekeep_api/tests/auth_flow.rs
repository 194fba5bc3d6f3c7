//! Token issuance, refresh rotation and password reset over HTTP.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use common::{PASSWORD, TestApp, bearer, get, post_json};
use gatekeep_core::role::Role;
use gatekeep_core::strategy::api_key::API_KEY_HEADER;
use serde_json::json;

#[tokio::test]
async fn health_is_public() {
    let app = TestApp::new();
    let (status, body) = app.send(get("/v1/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn login_returns_token_and_refresh_secret() {
    let app = TestApp::new();
    let usr = app.seed("a@x.com", &[Role::User]).await;

    let (token, refresh) = app.login("A@X.com").await;
    assert!(!refresh.is_empty());

    let claims = app.state.tokens.verify(&token).unwrap();
    assert_eq!(claims.sub, usr.id.to_string());
    assert_eq!(claims.roles, vec![Role::User]);
}

#[tokio::test]
async fn wrong_password_is_an_opaque_401() {
    let app = TestApp::new();
    app.seed("a@x.com", &[Role::User]).await;

    let (status, body) = app
        .send(post_json(
            "/v1/auth/login",
            None,
            json!({ "email": "a@x.com", "password": "nope" }),
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "kind": "unauthenticated", "message": "unauthorized" }));
}

#[tokio::test]
async fn malformed_login_body_is_a_400() {
    let app = TestApp::new();
    let (status, body) = app
        .send(post_json(
            "/v1/auth/login",
            None,
            json!({ "email": "not-an-email", "password": "x" }),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_argument");
}

#[tokio::test]
async fn refresh_rotates_and_burns_the_old_secret() {
    let app = TestApp::new();
    app.seed("a@x.com", &[Role::User]).await;
    let (token, first) = app.login("a@x.com").await;

    let (status, body) = app
        .send(post_json(
            "/v1/auth/refresh",
            Some(&token),
            json!({ "refreshToken": first }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let second = body["refreshToken"].as_str().unwrap().to_string();
    assert_ne!(second, first);

    let (status, _) = app
        .send(post_json(
            "/v1/auth/refresh",
            Some(&token),
            json!({ "refreshToken": first }),
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .send(post_json(
            "/v1/auth/refresh",
            Some(&token),
            json!({ "refreshToken": second }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn refresh_secret_of_another_principal_is_rejected() {
    let app = TestApp::new();
    app.seed("a@x.com", &[Role::User]).await;
    app.seed("b@x.com", &[Role::User]).await;
    let (token_a, _) = app.login("a@x.com").await;
    let (_, refresh_b) = app.login("b@x.com").await;

    let (status, _) = app
        .send(post_json(
            "/v1/auth/refresh",
            Some(&token_a),
            json!({ "refreshToken": refresh_b }),
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn basic_credentials_buy_a_token_for_a_named_key() {
    let app = TestApp::new();
    app.seed("svc@x.com", &[Role::Staff]).await;
    let basic = format!("Basic {}", STANDARD.encode(format!("svc@x.com:{PASSWORD}")));

    let (status, body) = app.send(get("/v1/auth/token/default", Some(&basic))).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let refresh = body["refreshToken"].as_str().unwrap();
    assert!(!refresh.is_empty());
    assert!(app.state.users.query_by_refresh_secret(refresh).await.is_err());
    let claims = app
        .state
        .tokens
        .verify(body["token"].as_str().unwrap())
        .unwrap();
    assert_eq!(claims.kid.as_deref(), Some("default"));

    let (status, body) = app.send(get("/v1/auth/token/retired", Some(&basic))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "failed_precondition");

    let (status, _) = app.send(get("/v1/auth/token/default", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn authenticate_echoes_the_verified_identity() {
    let app = TestApp::new();
    let usr = app.seed("a@x.com", &[Role::Manager]).await;
    let (token, _) = app.login("a@x.com").await;

    let (status, body) = app
        .send(get("/v1/auth/authenticate", Some(&bearer(&token))))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["userID"], usr.id.to_string());
    assert_eq!(body["claims"]["roles"], json!(["manager"]));

    let (status, _) = app
        .send(get("/v1/auth/authenticate", Some("Bearer not.a.jwt")))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn api_key_route_checks_the_shared_key() {
    let app = TestApp::new();
    let key = app.state.config.api_key.clone();

    let req = |value: &str| {
        Request::builder()
            .uri("/v1/auth/authenticate-api")
            .header(API_KEY_HEADER, value)
            .body(Body::empty())
            .unwrap()
    };

    let (status, _) = app.send(req(&key)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.send(req("wrong")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.send(get("/v1/auth/authenticate-api", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn forgot_for_unknown_email_is_silent() {
    let app = TestApp::new();

    let (status, body) = app
        .send(post_json(
            "/v1/auth/forgot",
            None,
            json!({ "email": "ghost@x.com" }),
        ))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, serde_json::Value::Null);
    assert!(
        app.state
            .resets
            .lookup_by_email("ghost@x.com", Utc::now())
            .await
            .is_err()
    );
}

#[tokio::test]
async fn reset_password_changes_the_password_once() {
    let app = TestApp::new();
    app.seed("a@x.com", &[Role::User]).await;

    let (status, _) = app
        .send(post_json(
            "/v1/auth/forgot",
            None,
            json!({ "email": "a@x.com" }),
        ))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let secret = app
        .state
        .resets
        .lookup_by_email("a@x.com", Utc::now())
        .await
        .unwrap();
    let uri = format!("/v1/auth/reset-password/{}", secret.token);
    let body = json!({ "password": "brand-new", "passwordConfirm": "brand-new" });

    let (status, resp) = app.send(post_json(&uri, None, body.clone())).await;
    assert_eq!(status, StatusCode::NO_CONTENT, "{resp}");

    app.state
        .users
        .authenticate("a@x.com", "brand-new")
        .await
        .unwrap();
    assert!(app.state.users.authenticate("a@x.com", PASSWORD).await.is_err());

    let (status, _) = app.send(post_json(&uri, None, body)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn reset_password_rejects_mismatched_confirmation() {
    let app = TestApp::new();
    app.seed("a@x.com", &[Role::User]).await;
    let secret = app
        .state
        .resets
        .create("a@x.com", Utc::now())
        .await
        .unwrap()
        .unwrap();

    let (status, body) = app
        .send(post_json(
            &format!("/v1/auth/reset-password/{}", secret.token),
            None,
            json!({ "password": "brand-new", "passwordConfirm": "different" }),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_argument");
    assert!(body["fields"].is_array());
}

#[tokio::test]
async fn unknown_reset_secret_is_a_401() {
    let app = TestApp::new();
    let (status, _) = app
        .send(post_json(
            "/v1/auth/reset-password/bogus",
            None,
            json!({ "password": "brand-new", "passwordConfirm": "brand-new" }),
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn authorize_endpoint_decides_rules() {
    let app = TestApp::new();
    let usr = app.seed("a@x.com", &[Role::User]).await;
    let (token, _) = app.login("a@x.com").await;
    let claims = app.state.tokens.verify(&token).unwrap();

    let (status, _) = app
        .send(post_json(
            "/v1/auth/authorize",
            None,
            json!({ "claims": claims, "userID": usr.id, "rule": "admin_or_subject" }),
        ))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .send(post_json(
            "/v1/auth/authorize",
            None,
            json!({ "claims": claims, "rule": "admin_only" }),
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn malformed_authorize_body_uses_the_error_shape() {
    let app = TestApp::new();

    let (status, body) = app
        .send(post_json(
            "/v1/auth/authorize",
            None,
            json!({ "claims": "nope", "rule": "admin_only" }),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_argument");
    assert!(body["message"].is_string());

    let (status, body) = app
        .send(post_json("/v1/auth/authorize", None, json!({ "rule": "sometimes" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_argument");
}

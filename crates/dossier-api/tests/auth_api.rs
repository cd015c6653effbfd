mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::json;

use common::{PASSWORD, TestApp, assert_error};
use dossier_types::Role;

fn registration(email: &str) -> serde_json::Value {
    json!({
        "email": email,
        "password": PASSWORD,
        "firstName": "Ada",
        "lastName": "Lovelace",
        "company": "Analytical Engines",
    })
}

#[tokio::test]
async fn register_verify_then_login() {
    let app = TestApp::new().await;

    let (status, body) = app
        .post_json("/api/auth/register", registration("Ada@Example.com"), None)
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["user"]["email"], "ada@example.com");
    assert_eq!(body["user"]["role"], "buyer");
    assert_eq!(body["user"]["isEmailVerified"], false);
    assert!(body["token"].is_string());

    let sent = app.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "ada@example.com");

    // Unverified accounts cannot log in.
    let login = json!({ "email": "ada@example.com", "password": PASSWORD });
    let (status, body) = app.post_json("/api/auth/login", login.clone(), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_error(&body, "UNAUTHORIZED");

    let token = app.mailer.last_token_for("ada@example.com").unwrap();
    assert_eq!(token.len(), 64);
    let (status, body) = app
        .post_json("/api/auth/verify-email", json!({ "token": token }), None)
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["user"]["isEmailVerified"], true);

    // Tokens are single use.
    let (status, _) = app
        .post_json("/api/auth/verify-email", json!({ "token": token }), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app.post_json("/api/auth/login", login, None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["user"]["lastLogin"].is_string(), true);
}

#[tokio::test]
async fn duplicate_email_conflicts() {
    let app = TestApp::new().await;

    let (status, _) = app
        .post_json("/api/auth/register", registration("dup@example.com"), None)
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .post_json("/api/auth/register", registration("DUP@example.com"), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_error(&body, "CONFLICT");
}

#[tokio::test]
async fn register_rejects_bad_input() {
    let app = TestApp::new().await;

    let mut short = registration("short@example.com");
    short["password"] = json!("short");
    let (status, body) = app.post_json("/api/auth/register", short, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error = assert_error(&body, "VALIDATION_ERROR");
    assert_eq!(error["message"], "Password must be at least 8 characters long");
    assert!(error["details"]["fields"]["password"].is_array());

    let mut admin = registration("sneaky@example.com");
    admin["role"] = json!("admin");
    let (status, body) = app.post_json("/api/auth/register", admin, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_error(&body, "VALIDATION_ERROR");

    let (status, body) = app
        .post_json("/api/auth/register", json!({ "email": "x@example.com" }), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_error(&body, "VALIDATION_ERROR");

    assert!(app.mailer.sent().is_empty());
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let app = TestApp::new().await;
    app.login_as("seller@example.com", Role::Seller).await;

    let (status, body) = app
        .post_json(
            "/api/auth/login",
            json!({ "email": "seller@example.com", "password": "not-the-password" }),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_error(&body, "UNAUTHORIZED");

    let (status, _) = app
        .post_json(
            "/api/auth/login",
            json!({ "email": "nobody@example.com", "password": PASSWORD }),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn verification_link_redirects_to_frontend() {
    let app = TestApp::new().await;
    app.post_json("/api/auth/register", registration("link@example.com"), None)
        .await;
    let token = app.mailer.last_token_for("link@example.com").unwrap();

    let req = Request::builder()
        .uri(format!("/api/auth/verify-email?token={token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.send(req).await;
    assert!(response.status().is_redirection());
    assert_eq!(
        response.headers()[header::LOCATION],
        "http://localhost:3000/verify-email?verified=true"
    );

    let req = Request::builder()
        .uri(format!("/api/auth/verify-email?token={token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.send(req).await;
    assert_eq!(
        response.headers()[header::LOCATION],
        "http://localhost:3000/verify-email?error=verification_failed"
    );
}

#[tokio::test]
async fn resend_verification_issues_a_fresh_token() {
    let app = TestApp::new().await;
    app.post_json("/api/auth/register", registration("again@example.com"), None)
        .await;
    let first = app.mailer.last_token_for("again@example.com").unwrap();

    let (status, body) = app
        .post_json(
            "/api/auth/resend-verification",
            json!({ "email": "again@example.com" }),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let second = app.mailer.last_token_for("again@example.com").unwrap();
    assert_ne!(first, second);

    // The replaced token no longer verifies.
    let (status, _) = app
        .post_json("/api/auth/verify-email", json!({ "token": first }), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app
        .post_json("/api/auth/verify-email", json!({ "token": second }), None)
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn password_reset_flow() {
    let app = TestApp::new().await;
    app.login_as("forgetful@example.com", Role::Buyer).await;

    // Unknown addresses get the same answer and no mail.
    let (status, unknown) = app
        .post_json(
            "/api/auth/forgot-password",
            json!({ "email": "ghost@example.com" }),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(app.mailer.sent().is_empty());

    let (status, known) = app
        .post_json(
            "/api/auth/forgot-password",
            json!({ "email": "forgetful@example.com" }),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(unknown["message"], known["message"]);

    let token = app.mailer.last_token_for("forgetful@example.com").unwrap();
    let (status, body) = app
        .post_json(
            "/api/auth/reset-password",
            json!({ "token": token, "newPassword": "brand-new-password" }),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (status, _) = app
        .post_json(
            "/api/auth/login",
            json!({ "email": "forgetful@example.com", "password": PASSWORD }),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app
        .post_json(
            "/api/auth/login",
            json!({ "email": "forgetful@example.com", "password": "brand-new-password" }),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    // Reset tokens are single use too.
    let (status, body) = app
        .post_json(
            "/api/auth/reset-password",
            json!({ "token": token, "newPassword": "third-password" }),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_error(&body, "VALIDATION_ERROR");
}

#[tokio::test]
async fn profile_requires_a_valid_token() {
    let app = TestApp::new().await;

    let (status, body) = app.get("/api/auth/profile", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_error(&body, "UNAUTHORIZED");

    let (status, _) = app.get("/api/auth/profile", Some("not-a-jwt")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn profile_read_and_update() {
    let app = TestApp::new().await;
    let (token, id) = app.login_as("me@example.com", Role::Seller).await;

    let (status, body) = app.get("/api/auth/profile", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"], id.to_string());
    assert_eq!(body["user"]["role"], "seller");

    let (status, body) = app
        .put_json(
            "/api/auth/profile",
            json!({ "firstName": "Grace", "company": "Navy" }),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["user"]["firstName"], "Grace");
    assert_eq!(body["user"]["lastName"], "User");
    assert_eq!(body["user"]["company"], "Navy");
}

#[tokio::test]
async fn deactivated_account_loses_access() {
    let app = TestApp::new().await;
    let (token, id) = app.login_as("gone@example.com", Role::Buyer).await;

    app.state.db.set_user_active(id, false).unwrap();

    let (status, _) = app.get("/api/auth/profile", Some(&token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .post_json(
            "/api/auth/login",
            json!({ "email": "gone@example.com", "password": PASSWORD }),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

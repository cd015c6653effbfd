mod common;

use axum::http::StatusCode;

use common::{TestApp, assert_error};

#[tokio::test]
async fn health_reports_environment_and_version() {
    let app = TestApp::new().await;

    let (status, body) = app.get("/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["environment"], "test");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn root_banner_points_at_health() {
    let app = TestApp::new().await;

    let (status, body) = app.get("/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["health"], "/api/health");
}

#[tokio::test]
async fn unknown_routes_use_the_error_envelope() {
    let app = TestApp::new().await;

    let (status, body) = app.get("/api/nowhere", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let error = assert_error(&body, "NOT_FOUND");
    assert_eq!(error["message"], "Route not found");
}

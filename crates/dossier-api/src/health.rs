use axum::{Json, extract::State};
use serde_json::{Value, json};

use dossier_types::api::HealthResponse;

use crate::error::AppError;
use crate::state::AppState;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        success: true,
        message: "Dossier API is running".into(),
        timestamp: chrono::Utc::now(),
        environment: state.config.environment.clone(),
        version: VERSION.into(),
    })
}

/// GET /
pub async fn banner() -> Json<Value> {
    Json(json!({
        "success": true,
        "message": "Dossier onboarding and document verification API",
        "version": VERSION,
        "health": "/api/health",
    }))
}

pub async fn not_found() -> AppError {
    AppError::NotFound("Route not found".into())
}

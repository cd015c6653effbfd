pub mod admin;
pub mod auth;
pub mod config;
pub mod documents;
pub mod error;
pub mod extract;
pub mod health;
pub mod mailer;
pub mod middleware;
pub mod onboarding;
pub mod state;
pub mod storage;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, post, put},
};

use crate::middleware::{ADMIN_ONLY, require_auth, require_role};
use crate::state::AppState;

/// Room for multipart framing and the other form fields on top of the file.
const MULTIPART_OVERHEAD: u64 = 64 * 1024;

/// Builds the full route table. Transport layers (CORS, tracing) are added by
/// the binary.
pub fn router(state: AppState) -> Router {
    let upload_limit = usize::try_from(state.config.max_upload_bytes + MULTIPART_OVERHEAD)
        .unwrap_or(usize::MAX);

    let auth_public = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route(
            "/verify-email",
            post(auth::verify_email).get(auth::verify_email_link),
        )
        .route("/resend-verification", post(auth::resend_verification))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/reset-password", post(auth::reset_password));

    let auth_private = Router::new()
        .route("/profile", get(auth::profile).put(auth::update_profile))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    // Role gate sits inside the auth layer so it always sees an AuthUser.
    let admin = Router::new()
        .route("/all", get(admin::list_filtered))
        .route("/submissions", get(admin::list_all))
        .route("/bulk-update", put(admin::bulk_update))
        .route("/{onboarding_id}", get(admin::detail))
        .route("/{onboarding_id}/review", post(admin::review))
        .route("/{onboarding_id}/status", put(admin::set_status))
        .route_layer(from_fn_with_state(ADMIN_ONLY, require_role));

    let onboarding = Router::new()
        .route("/status", get(onboarding::status))
        .route(
            "/upload",
            post(onboarding::upload).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/submit", post(onboarding::submit))
        .route("/documents/{document_id}", get(documents::download))
        .nest("/admin", admin)
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/", get(health::banner))
        .route("/api/health", get(health::health))
        .nest("/api/auth", auth_public.merge(auth_private))
        .nest("/api/onboarding", onboarding)
        .fallback(health::not_found)
        .with_state(state)
}

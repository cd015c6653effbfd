mod bootstrap;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{
    HeaderValue, Method,
    header::{AUTHORIZATION, CONTENT_TYPE},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use dossier_api::config::Config;
use dossier_api::mailer::LogMailer;
use dossier_api::state::AppStateInner;
use dossier_api::storage::Storage;
use dossier_db::Database;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dossier=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    // Init database and storage
    let db = Database::open(&config.db_path)?;
    let storage = Storage::new(config.upload_dir.clone()).await?;

    if let Some(seed) = &config.bootstrap_admin {
        bootstrap::seed_admin(&db, seed)?;
    }

    let cors = match config.cors_origin.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
            .allow_headers([AUTHORIZATION, CONTENT_TYPE])
            .allow_credentials(true),
        Err(_) => {
            warn!("DOSSIER_CORS_ORIGIN '{}' is not a valid origin; CORS disabled", config.cors_origin);
            CorsLayer::new()
        }
    };

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let environment = config.environment.clone();

    let state = AppStateInner::new(db, storage, config, Arc::new(LogMailer));
    let app = dossier_api::router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    info!("Dossier server listening on {} ({})", addr, environment);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(signal) => signal,
                Err(e) => {
                    warn!("Failed to install SIGTERM handler: {}", e);
                    ctrl_c.await.ok();
                    info!("Received Ctrl+C, shutting down...");
                    return;
                }
            };
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}

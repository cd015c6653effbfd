use std::sync::Arc;

use dossier_core::{RequirementRegistry, UploadPolicy};
use dossier_db::Database;

use crate::config::Config;
use crate::error::AppError;
use crate::mailer::Mailer;
use crate::storage::Storage;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub storage: Storage,
    pub config: Config,
    pub mailer: Arc<dyn Mailer>,
    pub registry: RequirementRegistry,
    pub policy: UploadPolicy,
}

impl AppStateInner {
    pub fn new(db: Database, storage: Storage, config: Config, mailer: Arc<dyn Mailer>) -> AppState {
        let policy = UploadPolicy::new(config.max_upload_bytes);
        Arc::new(Self {
            db,
            storage,
            config,
            mailer,
            registry: RequirementRegistry::standard(),
            policy,
        })
    }
}

/// Runs a database call on the blocking pool.
pub async fn with_db<F, T>(state: &AppState, f: F) -> Result<T, AppError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))?
        .map_err(AppError::from)
}

use std::path::{Path, PathBuf};

use axum::{Extension, Json, extract::State};
use tracing::{info, warn};
use uuid::Uuid;

use dossier_core::lifecycle;
use dossier_core::{IntakeError, Progress};
use dossier_db::NewDocument;
use dossier_types::api::{OnboardingStatusResponse, SubmitResponse, UploadResponse};
use dossier_types::{ApplicantRole, OnboardingRecord, Requirement};

use crate::error::{AppError, AppResult};
use crate::extract::{DOCUMENT_FIELD, DocumentUpload};
use crate::middleware::AuthUser;
use crate::state::{AppState, with_db};

/// Loads the caller's onboarding record, creating it on first use.
pub async fn ensure_record(state: &AppState, user: &AuthUser) -> AppResult<OnboardingRecord> {
    let user_id = user.id;
    let role = ApplicantRole::from(user.role);
    let seed = state.registry.seed();

    with_db(state, move |db| {
        if let Some(record) = db.get_onboarding_by_user(user_id)? {
            return Ok(record);
        }
        db.create_onboarding(user_id, role, lifecycle::INITIAL_STATUS, &seed)
    })
    .await
}

/// GET /api/onboarding/status
pub async fn status(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> AppResult<Json<OnboardingStatusResponse>> {
    let mut record = ensure_record(&state, &user).await?;

    let progress = Progress::of(&record.requirements);
    if record.progress != progress.percent {
        let id = record.id;
        with_db(&state, move |db| db.set_progress(id, progress.percent)).await?;
        record.progress = progress.percent;
    }

    Ok(Json(OnboardingStatusResponse {
        onboarding: record,
        progress: progress.percent,
        total_requirements: progress.total,
        completed_requirements: progress.completed,
    }))
}

/// POST /api/onboarding/upload
///
/// Validation happens before anything is written. The new file is stored
/// first, then linked in one transaction that also drops the previous document
/// of the same type; the previous file is removed only after that commit.
pub async fn upload(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    upload: DocumentUpload,
) -> AppResult<Json<UploadResponse>> {
    let document_type = upload
        .document_type
        .as_deref()
        .and_then(|raw| state.registry.resolve(raw))
        .ok_or_else(|| AppError::validation("Invalid document type"))?;
    let file = upload.file.ok_or(IntakeError::Empty)?;
    state.policy.check(&file.mime_type, file.bytes.len() as u64)?;

    let record = ensure_record(&state, &user).await?;

    let stored = state
        .storage
        .store(DOCUMENT_FIELD, &file.original_name, &file.bytes)
        .await?;

    let new_doc = NewDocument {
        id: Uuid::new_v4(),
        user_id: user.id,
        onboarding_id: record.id,
        document_type,
        file_name: stored.file_name.clone(),
        original_name: file.original_name,
        file_size: stored.size,
        mime_type: file.mime_type,
        file_path: stored.path.to_string_lossy().into_owned(),
        sha256: stored.sha256.clone(),
        upload_date: chrono::Utc::now(),
    };

    let swapped = with_db(&state, move |db| {
        db.swap_document(&new_doc, |record| {
            record
                .requirements
                .entry(document_type)
                .or_insert(Requirement {
                    required: true,
                    completed: false,
                })
                .completed = true;
            record.status = lifecycle::after_upload(record.status);
            record.progress = Progress::of(&record.requirements).percent;
        })
    })
    .await;

    let outcome = match swapped {
        Ok(outcome) => outcome,
        Err(err) => {
            discard(&state, &stored.path).await;
            return Err(err);
        }
    };

    if let Some(old) = &outcome.replaced {
        discard(&state, &PathBuf::from(&old.file_path)).await;
    }

    info!(
        user_id = %user.id,
        document_type = %document_type,
        replaced = outcome.replaced.is_some(),
        progress = outcome.record.progress,
        "Document uploaded"
    );

    let message = if outcome.replaced.is_some() {
        "Document updated successfully"
    } else {
        "Document uploaded successfully"
    };

    Ok(Json(UploadResponse {
        message: message.into(),
        progress: outcome.record.progress,
        document: outcome.document,
    }))
}

/// POST /api/onboarding/submit
pub async fn submit(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> AppResult<Json<SubmitResponse>> {
    let user_id = user.id;
    let record = with_db(&state, move |db| db.get_onboarding_by_user(user_id))
        .await?
        .ok_or_else(|| AppError::NotFound("Onboarding record not found".into()))?;
    let target = lifecycle::submit(&record)?;

    let id = record.id;
    let onboarding = with_db(&state, move |db| {
        db.submit_for_review(id, lifecycle::SUBMITTABLE, target)
    })
    .await?
    .ok_or_else(|| AppError::NotFound("Onboarding record not found".into()))?;

    info!(user_id = %user.id, onboarding_id = %id, "Onboarding submitted for review");

    Ok(Json(SubmitResponse {
        message: "Onboarding submitted for review".into(),
        onboarding,
    }))
}

/// Best-effort file removal: failures are logged and swallowed.
async fn discard(state: &AppState, path: &Path) {
    if let Err(e) = state.storage.delete(path).await {
        warn!(path = %path.display(), error = %e, "Failed to remove stored file");
    }
}

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use dossier_core::lifecycle;
use dossier_db::OnboardingFilter;
use dossier_db::models::UserRow;
use dossier_types::{AdminReview, OnboardingRecord, UserSummary};
use dossier_types::api::{
    AdminListQuery, BulkUpdateRequest, BulkUpdateResponse, PaginatedSubmissions, ReviewRequest,
    ReviewResponse, StatusUpdateRequest, Submission, SubmissionDetail, SubmissionsResponse,
};

use crate::error::{AppError, AppResult};
use crate::extract::{ValidJson, ValidQuery};
use crate::middleware::AuthUser;
use crate::state::{AppState, with_db};

const NOT_FOUND: &str = "Onboarding submission not found";

/// GET /api/onboarding/admin/all
pub async fn list_filtered(
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<AdminListQuery>,
) -> AppResult<Json<PaginatedSubmissions>> {
    let filter = OnboardingFilter {
        status: query.status,
        role: query.role,
    };
    let limit = query.limit;
    let offset = u64::from(query.page - 1) * u64::from(limit);

    let (total, rows) = with_db(&state, move |db| {
        let total = db.count_onboarding(filter)?;
        let rows = db.list_onboarding(filter, Some((limit, offset)))?;
        Ok((total, rows))
    })
    .await?;

    Ok(Json(PaginatedSubmissions {
        onboarding_records: rows.into_iter().map(submission).collect(),
        total,
        page: query.page,
        total_pages: total.div_ceil(u64::from(limit)),
    }))
}

/// GET /api/onboarding/admin/submissions
pub async fn list_all(State(state): State<AppState>) -> AppResult<Json<SubmissionsResponse>> {
    let rows = with_db(&state, |db| db.list_onboarding(OnboardingFilter::default(), None)).await?;

    Ok(Json(SubmissionsResponse {
        submissions: rows.into_iter().map(submission).collect(),
    }))
}

/// GET /api/onboarding/admin/{onboarding_id}
pub async fn detail(
    State(state): State<AppState>,
    Path(onboarding_id): Path<String>,
) -> AppResult<Json<SubmissionDetail>> {
    let id = parse_id(&onboarding_id)?;

    let detail = with_db(&state, move |db| {
        let Some(record) = db.get_onboarding(id)? else {
            return Ok(None);
        };
        let user = db
            .get_user_by_id(record.user_id)?
            .map(UserRow::into_summary)
            .transpose()?;
        let documents = db.list_documents(id)?;
        Ok(Some(SubmissionDetail {
            onboarding: Submission {
                onboarding: record,
                user,
            },
            documents,
        }))
    })
    .await?
    .ok_or_else(|| AppError::NotFound(NOT_FOUND.into()))?;

    Ok(Json(detail))
}

/// POST /api/onboarding/admin/{onboarding_id}/review
///
/// The commented review. Only submissions awaiting a decision can be reviewed.
pub async fn review(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthUser>,
    Path(onboarding_id): Path<String>,
    ValidJson(req): ValidJson<ReviewRequest>,
) -> AppResult<Json<ReviewResponse>> {
    let id = parse_id(&onboarding_id)?;

    let current = with_db(&state, move |db| db.get_onboarding(id))
        .await?
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.into()))?;
    let target = lifecycle::review(current.status, req.status.status())?;

    let review = AdminReview {
        reviewed_by: Some(admin.id),
        reviewed_at: Some(Utc::now()),
        comments: req.comments,
        status: req.status.review_status(),
    };
    let onboarding = with_db(&state, move |db| {
        db.record_review(id, Some(lifecycle::AWAITING_REVIEW), target, &review)
    })
    .await?
    .ok_or_else(|| AppError::NotFound(NOT_FOUND.into()))?;

    info!(admin_id = %admin.id, onboarding_id = %id, status = %target, "Submission reviewed");

    Ok(Json(ReviewResponse {
        message: format!("Onboarding {} successfully", target),
        onboarding,
    }))
}

/// PUT /api/onboarding/admin/{submission_id}/status
///
/// Forced status assignment; the current status is not checked.
pub async fn set_status(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthUser>,
    Path(submission_id): Path<String>,
    ValidJson(req): ValidJson<StatusUpdateRequest>,
) -> AppResult<Json<ReviewResponse>> {
    let id = parse_id(&submission_id)?;

    let review = AdminReview {
        reviewed_by: Some(admin.id),
        reviewed_at: Some(Utc::now()),
        comments: Some(req.comments.unwrap_or_default()),
        status: req.status.review_status(),
    };
    let target = req.status.status();
    let onboarding = with_db(&state, move |db| db.record_review(id, None, target, &review))
        .await?
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.into()))?;

    info!(admin_id = %admin.id, onboarding_id = %id, status = %target, "Submission status forced");

    Ok(Json(ReviewResponse {
        message: "Submission status updated successfully".into(),
        onboarding,
    }))
}

/// PUT /api/onboarding/admin/bulk-update
///
/// Applies one status to every listed submission regardless of its current
/// status. Ids that match nothing are skipped and not counted.
pub async fn bulk_update(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthUser>,
    ValidJson(req): ValidJson<BulkUpdateRequest>,
) -> AppResult<Json<BulkUpdateResponse>> {
    let ids: Vec<Uuid> = req
        .submission_ids
        .iter()
        .filter_map(|raw| raw.parse().ok())
        .collect();

    let review = AdminReview {
        reviewed_by: Some(admin.id),
        reviewed_at: Some(Utc::now()),
        comments: None,
        status: req.status.review_status(),
    };
    let target = req.status.status();
    let modified = with_db(&state, move |db| db.record_review_many(&ids, target, &review)).await?;

    info!(
        admin_id = %admin.id,
        requested = req.submission_ids.len(),
        modified,
        status = %target,
        "Bulk status update"
    );

    Ok(Json(BulkUpdateResponse {
        message: format!("{modified} submissions updated successfully"),
        modified_count: modified,
    }))
}

fn submission((onboarding, user): (OnboardingRecord, Option<UserSummary>)) -> Submission {
    Submission { onboarding, user }
}

/// Ids that cannot be parsed cannot exist.
fn parse_id(raw: &str) -> AppResult<Uuid> {
    raw.parse().map_err(|_| AppError::NotFound(NOT_FOUND.into()))
}

use std::path::PathBuf;

use axum::{
    Extension,
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::IntoResponse,
};
use tokio_util::io::ReaderStream;
use tracing::warn;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::state::{AppState, with_db};

const NOT_FOUND: &str = "Document not found";

/// GET /api/onboarding/documents/{document_id}: streams the stored file to
/// its owner or an admin.
pub async fn download(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(document_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let id: Uuid = document_id
        .parse()
        .map_err(|_| AppError::NotFound(NOT_FOUND.into()))?;

    let document = with_db(&state, move |db| db.get_document(id))
        .await?
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.into()))?;

    if document.user_id != user.id && !user.is_admin() {
        return Err(AppError::Authorization("Access denied".into()));
    }

    let path = PathBuf::from(&document.file_path);
    let file = match state.storage.open(&path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(document_id = %id, path = %path.display(), "Document file missing from storage");
            return Err(AppError::NotFound("File not found on server".into()));
        }
        Err(e) => return Err(anyhow::Error::from(e).into()),
    };

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&document.mime_type)
            .unwrap_or(HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(document.file_size));
    if let Ok(value) = HeaderValue::from_str(&content_disposition(&document.original_name)) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    let body = Body::from_stream(ReaderStream::new(file));
    Ok((StatusCode::OK, headers, body))
}

/// `inline; filename="..."` keeping only characters that are safe inside a
/// quoted header value.
fn content_disposition(original_name: &str) -> String {
    let safe: String = original_name
        .chars()
        .filter(|c| c.is_ascii_graphic() || *c == ' ')
        .filter(|c| !matches!(c, '"' | '\\'))
        .collect();
    let name = if safe.trim().is_empty() { "document" } else { safe.trim() };
    format!("inline; filename=\"{name}\"")
}

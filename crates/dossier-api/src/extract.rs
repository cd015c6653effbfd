use axum::Json;
use axum::extract::{FromRequest, FromRequestParts, Multipart, Query, Request};
use axum::http::request::Parts;
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::AppError;

/// Multipart field carrying the file.
pub const DOCUMENT_FIELD: &str = "document";
/// Multipart field naming the requirement the file satisfies.
pub const DOCUMENT_TYPE_FIELD: &str = "documentType";

/// JSON body that has passed its `validator` rules. Malformed bodies and rule
/// violations are both reported as `VALIDATION_ERROR`.
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(ValidJson(value))
    }
}

/// Query-string counterpart of [`ValidJson`].
pub struct ValidQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ValidQuery<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        value.validate()?;
        Ok(ValidQuery(value))
    }
}

pub struct UploadedFile {
    pub original_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// A fully buffered document upload form. Unknown fields are ignored.
pub struct DocumentUpload {
    pub document_type: Option<String>,
    pub file: Option<UploadedFile>,
}

impl<S> FromRequest<S> for DocumentUpload
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let mut multipart = Multipart::from_request(req, state).await?;
        let mut upload = DocumentUpload {
            document_type: None,
            file: None,
        };

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().map(str::to_string);
            match name.as_deref() {
                Some(DOCUMENT_TYPE_FIELD) => {
                    upload.document_type = Some(field.text().await?.trim().to_string());
                }
                Some(DOCUMENT_FIELD) => {
                    let original_name = field.file_name().unwrap_or("document").to_string();
                    let mime_type = field
                        .content_type()
                        .unwrap_or("application/octet-stream")
                        .to_string();
                    let bytes = field.bytes().await?.to_vec();
                    upload.file = Some(UploadedFile {
                        original_name,
                        mime_type,
                        bytes,
                    });
                }
                _ => {}
            }
        }

        Ok(upload)
    }
}

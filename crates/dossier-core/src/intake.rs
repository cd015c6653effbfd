use chrono::{DateTime, Utc};
use thiserror::Error;

/// 10 MB per document.
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "image/jpeg",
    "image/jpg",
    "image/png",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntakeError {
    #[error("No file uploaded")]
    Empty,

    #[error("Invalid file type. Only PDF, JPG, PNG, and DOC files are allowed.")]
    UnsupportedType(String),

    #[error("File too large: {size} bytes exceeds the {max} byte limit")]
    TooLarge { size: u64, max: u64 },
}

/// Acceptance rules for an uploaded compliance document.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    pub max_bytes: u64,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_bytes: MAX_UPLOAD_BYTES,
        }
    }
}

impl UploadPolicy {
    pub fn new(max_bytes: u64) -> Self {
        Self { max_bytes }
    }

    pub fn check(&self, mime_type: &str, size: u64) -> Result<(), IntakeError> {
        if size == 0 {
            return Err(IntakeError::Empty);
        }
        let essence = mime_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        if !ALLOWED_MIME_TYPES.contains(&essence.as_str()) {
            return Err(IntakeError::UnsupportedType(mime_type.to_string()));
        }
        if size > self.max_bytes {
            return Err(IntakeError::TooLarge {
                size,
                max: self.max_bytes,
            });
        }
        Ok(())
    }
}

/// Name for a file on disk: `<field>-<unix millis>-<random>.<ext>`.
///
/// The extension is taken from the client's file name, lower-cased, and
/// dropped unless it is short and alphanumeric so nothing path-like reaches
/// the storage directory.
pub fn stored_file_name(field: &str, original_name: &str, now: DateTime<Utc>) -> String {
    let suffix: u32 = rand::random_range(0..1_000_000_000);
    let base = format!("{}-{}-{}", field, now.timestamp_millis(), suffix);
    match extension(original_name) {
        Some(ext) => format!("{base}.{ext}"),
        None => base,
    }
}

fn extension(original_name: &str) -> Option<String> {
    let (stem, ext) = original_name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() || ext.len() > 8 {
        return None;
    }
    if !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_allowed_types_within_limit() {
        let policy = UploadPolicy::default();
        for mime in ALLOWED_MIME_TYPES {
            assert_eq!(policy.check(mime, 1024), Ok(()));
        }
        assert_eq!(policy.check("application/pdf; charset=binary", 10), Ok(()));
        assert_eq!(policy.check("application/pdf", MAX_UPLOAD_BYTES), Ok(()));
    }

    #[test]
    fn rejects_other_types() {
        let policy = UploadPolicy::default();
        assert_eq!(
            policy.check("text/plain", 10),
            Err(IntakeError::UnsupportedType("text/plain".into()))
        );
        assert!(policy.check("application/zip", 10).is_err());
    }

    #[test]
    fn rejects_oversize_and_empty_files() {
        let policy = UploadPolicy::new(100);
        assert_eq!(
            policy.check("image/png", 101),
            Err(IntakeError::TooLarge { size: 101, max: 100 })
        );
        assert_eq!(policy.check("image/png", 0), Err(IntakeError::Empty));
    }

    #[test]
    fn stored_name_keeps_field_timestamp_and_extension() {
        let now = DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();
        let name = stored_file_name("document", "Tax Return.PDF", now);
        let parts: Vec<&str> = name.split('-').collect();
        assert_eq!(parts[0], "document");
        assert_eq!(parts[1], "1700000000123");
        assert!(parts[2].ends_with(".pdf"));
        let random: u32 = parts[2].trim_end_matches(".pdf").parse().unwrap();
        assert!(random < 1_000_000_000);
    }

    #[test]
    fn suspicious_extensions_are_dropped() {
        let now = Utc::now();
        assert!(!stored_file_name("document", "../../etc/passwd", now).contains('.'));
        assert!(!stored_file_name("document", "noext", now).contains('.'));
        assert!(!stored_file_name("document", ".bashrc", now).contains('.'));
    }
}

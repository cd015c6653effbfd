//! Database row types. These map directly to SQLite rows.
//! Conversions into the shared domain types parse ids, enums and timestamps
//! and fail loudly on corrupt rows.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use dossier_types::{
    AdminReview, ApplicantRole, DocumentType, OnboardingDocument, OnboardingRecord,
    OnboardingStatus, Requirements, Role, UserProfile, UserSummary,
};

use crate::parse_ts;

#[derive(Debug)]
pub struct UserRow {
    pub id: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub company: Option<String>,
    pub role: String,
    pub is_email_verified: bool,
    pub is_active: bool,
    pub last_login: Option<String>,
    pub created_at: String,
}

impl UserRow {
    pub fn user_id(&self) -> Result<Uuid> {
        self.id.parse().with_context(|| format!("Corrupt user id '{}'", self.id))
    }

    pub fn role(&self) -> Result<Role> {
        Ok(self.role.parse()?)
    }

    pub fn into_summary(self) -> Result<UserSummary> {
        Ok(UserSummary {
            id: self.user_id()?,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            company: self.company,
        })
    }

    pub fn to_profile(&self) -> Result<UserProfile> {
        Ok(UserProfile {
            id: self.user_id()?,
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            company: self.company.clone(),
            role: self.role()?,
            is_email_verified: self.is_email_verified,
            is_active: self.is_active,
            last_login: self.last_login.as_deref().map(parse_ts).transpose()?,
            created_at: parse_ts(&self.created_at)?,
        })
    }
}

pub struct NewUser<'a> {
    pub id: Uuid,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub company: Option<&'a str>,
    pub role: Role,
    pub is_email_verified: bool,
    pub verification_token: Option<(&'a str, DateTime<Utc>)>,
}

pub struct OnboardingRow {
    pub id: String,
    pub user_id: String,
    pub user_role: String,
    pub status: String,
    pub progress: i64,
    pub review_status: String,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<String>,
    pub review_comments: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl OnboardingRow {
    pub fn into_record(
        self,
        requirements: Requirements,
        documents: BTreeMap<DocumentType, Uuid>,
    ) -> Result<OnboardingRecord> {
        Ok(OnboardingRecord {
            id: self.id.parse().with_context(|| format!("Corrupt onboarding id '{}'", self.id))?,
            user_id: self.user_id.parse().with_context(|| {
                format!("Corrupt user_id '{}' on onboarding '{}'", self.user_id, self.id)
            })?,
            user_role: self.user_role.parse::<ApplicantRole>()?,
            status: self.status.parse::<OnboardingStatus>()?,
            progress: self.progress.clamp(0, 100) as u8,
            requirements,
            documents,
            admin_review: AdminReview {
                reviewed_by: self.reviewed_by.as_deref().map(str::parse::<Uuid>).transpose()?,
                reviewed_at: self.reviewed_at.as_deref().map(parse_ts).transpose()?,
                comments: self.review_comments,
                status: self.review_status.parse()?,
            },
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
        })
    }
}

pub struct UserSummaryRow {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub company: Option<String>,
}

impl UserSummaryRow {
    pub fn into_summary(self) -> Result<UserSummary> {
        Ok(UserSummary {
            id: self.id.parse()?,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            company: self.company,
        })
    }
}

pub struct DocumentRow {
    pub id: String,
    pub user_id: String,
    pub onboarding_id: String,
    pub document_type: String,
    pub file_name: String,
    pub original_name: String,
    pub file_size: i64,
    pub mime_type: String,
    pub file_path: String,
    pub sha256: String,
    pub upload_date: String,
    pub status: String,
    pub review_status: Option<String>,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<String>,
    pub review_comments: Option<String>,
}

impl DocumentRow {
    pub fn into_document(self) -> Result<OnboardingDocument> {
        let admin_review = match self.review_status {
            Some(status) => Some(AdminReview {
                reviewed_by: self.reviewed_by.as_deref().map(str::parse::<Uuid>).transpose()?,
                reviewed_at: self.reviewed_at.as_deref().map(parse_ts).transpose()?,
                comments: self.review_comments,
                status: status.parse()?,
            }),
            None => None,
        };
        Ok(OnboardingDocument {
            id: self.id.parse().with_context(|| format!("Corrupt document id '{}'", self.id))?,
            user_id: self.user_id.parse()?,
            onboarding_id: self.onboarding_id.parse()?,
            document_type: self.document_type.parse()?,
            file_name: self.file_name,
            original_name: self.original_name,
            file_size: self.file_size.max(0) as u64,
            mime_type: self.mime_type,
            file_path: self.file_path,
            sha256: self.sha256,
            upload_date: parse_ts(&self.upload_date)?,
            status: self.status.parse()?,
            admin_review,
        })
    }
}

/// Metadata for a freshly stored file, ready to be linked into a record.
pub struct NewDocument {
    pub id: Uuid,
    pub user_id: Uuid,
    pub onboarding_id: Uuid,
    pub document_type: DocumentType,
    pub file_name: String,
    pub original_name: String,
    pub file_size: u64,
    pub mime_type: String,
    pub file_path: String,
    pub sha256: String,
    pub upload_date: DateTime<Utc>,
}

/// Result of linking a new document in place of the previous one.
pub struct SwapOutcome {
    pub record: OnboardingRecord,
    pub document: OnboardingDocument,
    /// The superseded document; its file still has to be removed.
    pub replaced: Option<OnboardingDocument>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OnboardingFilter {
    pub status: Option<OnboardingStatus>,
    pub role: Option<ApplicantRole>,
}

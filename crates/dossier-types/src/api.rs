use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{
    ApplicantRole, OnboardingDocument, OnboardingRecord, OnboardingStatus, ReviewStatus, Role,
    UserProfile, UserSummary,
};

// -- JWT Claims --

/// Session token payload shared by the auth handlers and the auth middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    pub is_email_verified: bool,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters long"))]
    pub password: String,
    #[validate(length(min = 1, max = 50, message = "First name is required and must be less than 50 characters"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 50, message = "Last name is required and must be less than 50 characters"))]
    pub last_name: String,
    #[validate(length(max = 100, message = "Company name must be less than 100 characters"))]
    pub company: Option<String>,
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct TokenRequest {
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct TokenQuery {
    pub token: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct EmailRequest {
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters long"))]
    pub new_password: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 50, message = "First name must be less than 50 characters"))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 50, message = "Last name must be less than 50 characters"))]
    pub last_name: Option<String>,
    #[validate(length(max = 100, message = "Company name must be less than 100 characters"))]
    pub company: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub message: String,
    pub token: String,
    pub user: UserProfile,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub user: UserProfile,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

// -- Onboarding --

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingStatusResponse {
    pub onboarding: OnboardingRecord,
    pub progress: u8,
    pub total_requirements: usize,
    pub completed_requirements: usize,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub document: OnboardingDocument,
    pub progress: u8,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub message: String,
    pub onboarding: OnboardingRecord,
}

// -- Admin --

/// Outcome an admin can record when reviewing a pending submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approved,
    Rejected,
}

impl ReviewDecision {
    pub fn status(self) -> OnboardingStatus {
        match self {
            ReviewDecision::Approved => OnboardingStatus::Approved,
            ReviewDecision::Rejected => OnboardingStatus::Rejected,
        }
    }

    pub fn review_status(self) -> ReviewStatus {
        match self {
            ReviewDecision::Approved => ReviewStatus::Approved,
            ReviewDecision::Rejected => ReviewStatus::Rejected,
        }
    }
}

/// Status an admin can force onto one or many submissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForcedStatus {
    Approved,
    Rejected,
    NeedsInfo,
}

impl ForcedStatus {
    pub fn status(self) -> OnboardingStatus {
        match self {
            ForcedStatus::Approved => OnboardingStatus::Approved,
            ForcedStatus::Rejected => OnboardingStatus::Rejected,
            ForcedStatus::NeedsInfo => OnboardingStatus::NeedsInfo,
        }
    }

    pub fn review_status(self) -> ReviewStatus {
        match self {
            ForcedStatus::Approved => ReviewStatus::Approved,
            ForcedStatus::Rejected => ReviewStatus::Rejected,
            ForcedStatus::NeedsInfo => ReviewStatus::NeedsInfo,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ReviewRequest {
    pub status: ReviewDecision,
    #[validate(length(max = 1000, message = "Comments must be less than 1000 characters"))]
    pub comments: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct StatusUpdateRequest {
    pub status: ForcedStatus,
    #[validate(length(max = 1000, message = "Comments must be less than 1000 characters"))]
    pub comments: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BulkUpdateRequest {
    pub submission_ids: Vec<String>,
    pub status: ForcedStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkUpdateResponse {
    pub message: String,
    pub modified_count: usize,
}

#[derive(Debug, Serialize)]
pub struct ReviewResponse {
    pub message: String,
    pub onboarding: OnboardingRecord,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AdminListQuery {
    pub status: Option<OnboardingStatus>,
    pub role: Option<ApplicantRole>,
    #[serde(default = "default_page")]
    #[validate(range(min = 1, message = "page must be at least 1"))]
    pub page: u32,
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 100, message = "limit must be between 1 and 100"))]
    pub limit: u32,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    10
}

/// An onboarding record joined with its owner's display fields.
#[derive(Debug, Serialize)]
pub struct Submission {
    #[serde(flatten)]
    pub onboarding: OnboardingRecord,
    pub user: Option<UserSummary>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedSubmissions {
    pub onboarding_records: Vec<Submission>,
    pub total: u64,
    pub page: u32,
    pub total_pages: u64,
}

#[derive(Debug, Serialize)]
pub struct SubmissionsResponse {
    pub submissions: Vec<Submission>,
}

#[derive(Debug, Serialize)]
pub struct SubmissionDetail {
    pub onboarding: Submission,
    pub documents: Vec<OnboardingDocument>,
}

// -- Misc --

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub success: bool,
    pub message: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub environment: String,
    pub version: String,
}

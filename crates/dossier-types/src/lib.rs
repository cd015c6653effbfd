pub mod api;
pub mod models;

pub use models::{
    AdminReview, ApplicantRole, DocumentStatus, DocumentType, OnboardingDocument,
    OnboardingRecord, OnboardingStatus, Requirement, Requirements, ReviewStatus, Role,
    UnknownVariant, UserProfile, UserSummary,
};

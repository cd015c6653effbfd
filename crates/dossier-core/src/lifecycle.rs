//! Onboarding lifecycle.
//!
//! ```text
//! in_progress --upload--> in_progress
//! in_progress | rejected --submit (all required complete)--> pending
//! pending --review--> approved | rejected
//! any --force--> approved | rejected | needs_info   (admin status update, unchecked)
//! any --upload--> in_progress
//! ```
//!
//! Functions here only decide; persisting the new state is the caller's job.

use dossier_types::{DocumentType, OnboardingRecord, OnboardingStatus};
use thiserror::Error;

use crate::progress::incomplete_required;

/// Status assigned to a record when it is first created.
pub const INITIAL_STATUS: OnboardingStatus = OnboardingStatus::InProgress;

/// Statuses from which an applicant may submit for review.
pub const SUBMITTABLE: &[OnboardingStatus] =
    &[OnboardingStatus::InProgress, OnboardingStatus::Rejected];

/// Statuses that count as awaiting an admin decision. `submitted` is a legacy
/// alias of `pending`.
pub const AWAITING_REVIEW: &[OnboardingStatus] =
    &[OnboardingStatus::Pending, OnboardingStatus::Submitted];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Please complete all required documents before submitting")]
    IncompleteRequirements(Vec<DocumentType>),

    #[error("You cannot submit onboarding at this stage.")]
    NotSubmittable(OnboardingStatus),

    #[error("Submission is not awaiting review (current status: {0})")]
    NotAwaitingReview(OnboardingStatus),
}

/// Status after a document upload. Uploading always reopens the record, which
/// is what lets a rejected applicant fix a document and resubmit.
pub fn after_upload(_current: OnboardingStatus) -> OnboardingStatus {
    OnboardingStatus::InProgress
}

/// Checks the submit guard and returns the status to move to.
///
/// Missing documents are reported before the status check so the applicant
/// always learns what is still outstanding.
pub fn submit(record: &OnboardingRecord) -> Result<OnboardingStatus, TransitionError> {
    let missing = incomplete_required(&record.requirements);
    if !missing.is_empty() {
        return Err(TransitionError::IncompleteRequirements(missing));
    }
    if !SUBMITTABLE.contains(&record.status) {
        return Err(TransitionError::NotSubmittable(record.status));
    }
    Ok(OnboardingStatus::Pending)
}

/// Guard for the commented, single-record review.
pub fn review(
    current: OnboardingStatus,
    decision: OnboardingStatus,
) -> Result<OnboardingStatus, TransitionError> {
    if !AWAITING_REVIEW.contains(&current) {
        return Err(TransitionError::NotAwaitingReview(current));
    }
    Ok(decision)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RequirementRegistry;
    use chrono::Utc;
    use dossier_types::{AdminReview, ApplicantRole};
    use std::collections::BTreeMap;
    use uuid::Uuid;

    fn record(status: OnboardingStatus, completed: usize) -> OnboardingRecord {
        let mut requirements = RequirementRegistry::standard().seed();
        for req in requirements.values_mut().take(completed) {
            req.completed = true;
        }
        OnboardingRecord {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            user_role: ApplicantRole::Seller,
            status,
            progress: 0,
            requirements,
            documents: BTreeMap::new(),
            admin_review: AdminReview::default(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn complete_in_progress_record_submits_to_pending() {
        let rec = record(OnboardingStatus::InProgress, 7);
        assert_eq!(submit(&rec), Ok(OnboardingStatus::Pending));
    }

    #[test]
    fn rejected_record_can_resubmit() {
        let rec = record(OnboardingStatus::Rejected, 7);
        assert_eq!(submit(&rec), Ok(OnboardingStatus::Pending));
    }

    #[test]
    fn incomplete_submit_lists_missing_keys() {
        let rec = record(OnboardingStatus::InProgress, 5);
        assert_eq!(
            submit(&rec),
            Err(TransitionError::IncompleteRequirements(vec![
                DocumentType::InsuranceCertificate,
                DocumentType::FinancialStatement,
            ]))
        );
    }

    #[test]
    fn pending_and_approved_cannot_submit_again() {
        for status in [
            OnboardingStatus::Pending,
            OnboardingStatus::Approved,
            OnboardingStatus::NeedsInfo,
        ] {
            let rec = record(status, 7);
            assert_eq!(submit(&rec), Err(TransitionError::NotSubmittable(status)));
        }
    }

    #[test]
    fn review_requires_a_pending_submission() {
        assert_eq!(
            review(OnboardingStatus::Pending, OnboardingStatus::Rejected),
            Ok(OnboardingStatus::Rejected)
        );
        assert_eq!(
            review(OnboardingStatus::Submitted, OnboardingStatus::Approved),
            Ok(OnboardingStatus::Approved)
        );
        assert_eq!(
            review(OnboardingStatus::InProgress, OnboardingStatus::Approved),
            Err(TransitionError::NotAwaitingReview(OnboardingStatus::InProgress))
        );
    }

    #[test]
    fn upload_reopens_any_state() {
        for status in OnboardingStatus::ALL {
            assert_eq!(after_upload(*status), OnboardingStatus::InProgress);
        }
    }
}

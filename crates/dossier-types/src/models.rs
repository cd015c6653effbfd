use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Returned when a stored or submitted string does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} '{}'", self.kind, self.value)
    }
}

impl std::error::Error for UnknownVariant {}

/// Wire-name table shared by serde, the database columns and `FromStr`.
macro_rules! wire_enum {
    ($name:ident, $kind:literal { $($variant:ident => $wire:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok($name::$variant),)+
                    other => Err(UnknownVariant { kind: $kind, value: other.to_string() }),
                }
            }
        }
    };
}

// -- Identity --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Buyer,
    Seller,
    Analyst,
}

wire_enum!(Role, "role" {
    Admin => "admin",
    Buyer => "buyer",
    Seller => "seller",
    Analyst => "analyst",
});

/// The side of the marketplace an onboarding record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicantRole {
    Buyer,
    Seller,
}

wire_enum!(ApplicantRole, "applicant role" {
    Buyer => "buyer",
    Seller => "seller",
});

impl From<Role> for ApplicantRole {
    /// Buyers onboard as buyers; every other account goes through seller onboarding.
    fn from(role: Role) -> Self {
        match role {
            Role::Buyer => ApplicantRole::Buyer,
            _ => ApplicantRole::Seller,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub company: Option<String>,
    pub role: Role,
    pub is_email_verified: bool,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Display fields joined onto admin listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub company: Option<String>,
}

// -- Onboarding --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStatus {
    Pending,
    InProgress,
    Submitted,
    Approved,
    Rejected,
    NeedsInfo,
}

wire_enum!(OnboardingStatus, "onboarding status" {
    Pending => "pending",
    InProgress => "in_progress",
    Submitted => "submitted",
    Approved => "approved",
    Rejected => "rejected",
    NeedsInfo => "needs_info",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
    NeedsInfo,
}

wire_enum!(ReviewStatus, "review status" {
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
    NeedsInfo => "needs_info",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Pending,
    Approved,
    Rejected,
}

wire_enum!(DocumentStatus, "document status" {
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
});

/// Compliance document kinds. Declaration order is the registry order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DocumentType {
    BusinessLicense,
    TaxCertificate,
    BankStatement,
    IdentityDocument,
    ComplianceCertificate,
    InsuranceCertificate,
    FinancialStatement,
}

wire_enum!(DocumentType, "document type" {
    BusinessLicense => "businessLicense",
    TaxCertificate => "taxCertificate",
    BankStatement => "bankStatement",
    IdentityDocument => "identityDocument",
    ComplianceCertificate => "complianceCertificate",
    InsuranceCertificate => "insuranceCertificate",
    FinancialStatement => "financialStatement",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    pub required: bool,
    pub completed: bool,
}

pub type Requirements = BTreeMap<DocumentType, Requirement>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminReview {
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub comments: Option<String>,
    pub status: ReviewStatus,
}

impl Default for AdminReview {
    fn default() -> Self {
        Self {
            reviewed_by: None,
            reviewed_at: None,
            comments: None,
            status: ReviewStatus::Pending,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_role: ApplicantRole,
    pub status: OnboardingStatus,
    pub progress: u8,
    pub requirements: Requirements,
    /// Current document id per type; derived from the document table.
    pub documents: BTreeMap<DocumentType, Uuid>,
    pub admin_review: AdminReview,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingDocument {
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
    pub status: DocumentStatus,
    pub admin_review: Option<AdminReview>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_type_wire_names_match_serde() {
        for ty in DocumentType::ALL {
            let json = serde_json::to_value(ty).unwrap();
            assert_eq!(json, serde_json::Value::String(ty.as_str().to_string()));
            assert_eq!(ty.as_str().parse::<DocumentType>().unwrap(), *ty);
        }
    }

    #[test]
    fn unknown_status_is_rejected() {
        let err = "archived".parse::<OnboardingStatus>().unwrap_err();
        assert_eq!(err.kind, "onboarding status");
        assert_eq!(err.to_string(), "unknown onboarding status 'archived'");
    }

    #[test]
    fn non_buyers_onboard_as_sellers() {
        assert_eq!(ApplicantRole::from(Role::Buyer), ApplicantRole::Buyer);
        assert_eq!(ApplicantRole::from(Role::Seller), ApplicantRole::Seller);
        assert_eq!(ApplicantRole::from(Role::Analyst), ApplicantRole::Seller);
    }

    #[test]
    fn requirements_serialize_with_camel_case_keys() {
        let mut reqs = Requirements::new();
        reqs.insert(
            DocumentType::BankStatement,
            Requirement { required: true, completed: false },
        );
        let json = serde_json::to_value(&reqs).unwrap();
        assert_eq!(json["bankStatement"]["required"], true);
    }
}

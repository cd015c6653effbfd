use dossier_types::{DocumentType, Requirement, Requirements};

/// One entry of the document checklist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequirementDef {
    pub key: DocumentType,
    pub label: &'static str,
    pub required: bool,
}

/// Ordered checklist every onboarding record is seeded from.
///
/// This is the only place the set of accepted document types is defined:
/// upload validation, progress and the submit check all read from it.
#[derive(Debug, Clone)]
pub struct RequirementRegistry {
    defs: Vec<RequirementDef>,
}

impl RequirementRegistry {
    pub fn standard() -> Self {
        Self {
            defs: standard_requirements(),
        }
    }

    pub fn definitions(&self) -> &[RequirementDef] {
        &self.defs
    }

    pub fn get(&self, key: DocumentType) -> Option<&RequirementDef> {
        self.defs.iter().find(|def| def.key == key)
    }

    /// Parses a submitted document type, accepting only registered keys.
    pub fn resolve(&self, raw: &str) -> Option<DocumentType> {
        let key = raw.parse::<DocumentType>().ok()?;
        self.get(key).map(|def| def.key)
    }

    /// Fresh requirement map with nothing completed.
    pub fn seed(&self) -> Requirements {
        self.defs
            .iter()
            .map(|def| {
                (
                    def.key,
                    Requirement {
                        required: def.required,
                        completed: false,
                    },
                )
            })
            .collect()
    }
}

impl Default for RequirementRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

fn standard_requirements() -> Vec<RequirementDef> {
    vec![
        RequirementDef {
            key: DocumentType::BusinessLicense,
            label: "Business License",
            required: true,
        },
        RequirementDef {
            key: DocumentType::TaxCertificate,
            label: "Tax Certificate",
            required: true,
        },
        RequirementDef {
            key: DocumentType::BankStatement,
            label: "Bank Statement",
            required: true,
        },
        RequirementDef {
            key: DocumentType::IdentityDocument,
            label: "Identity Document",
            required: true,
        },
        RequirementDef {
            key: DocumentType::ComplianceCertificate,
            label: "Compliance Certificate",
            required: true,
        },
        RequirementDef {
            key: DocumentType::InsuranceCertificate,
            label: "Insurance Certificate",
            required: true,
        },
        RequirementDef {
            key: DocumentType::FinancialStatement,
            label: "Financial Statement",
            required: true,
        },
    ]
}

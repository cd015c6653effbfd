use dossier_types::{DocumentType, Requirements};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
    /// Rounded percentage, 0 when there is nothing to complete.
    pub percent: u8,
}

impl Progress {
    pub fn of(requirements: &Requirements) -> Self {
        let total = requirements.len();
        let completed = requirements.values().filter(|r| r.completed).count();
        Self {
            completed,
            total,
            percent: percent(completed, total),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.completed == self.total
    }
}

/// `round(100 * completed / total)` with halves rounded up.
fn percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let completed = completed.min(total);
    ((200 * completed + total) / (2 * total)) as u8
}

/// Required entries that are not completed yet, in registry order.
pub fn incomplete_required(requirements: &Requirements) -> Vec<DocumentType> {
    requirements
        .iter()
        .filter(|(_, r)| r.required && !r.completed)
        .map(|(key, _)| *key)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RequirementRegistry;

    fn with_completed(count: usize) -> Requirements {
        let mut reqs = RequirementRegistry::standard().seed();
        for req in reqs.values_mut().take(count) {
            req.completed = true;
        }
        reqs
    }

    #[test]
    fn progress_matches_rounded_ratio() {
        let expected = [0u8, 14, 29, 43, 57, 71, 86, 100];
        for (k, want) in expected.iter().enumerate() {
            let p = Progress::of(&with_completed(k));
            assert_eq!(p.percent, *want, "k = {k}");
            assert_eq!(p.completed, k);
            assert_eq!(p.total, 7);
        }
    }

    #[test]
    fn halves_round_up() {
        assert_eq!(percent(1, 8), 13);
        assert_eq!(percent(1, 2), 50);
        assert_eq!(percent(1, 200), 1);
    }

    #[test]
    fn empty_requirements_are_zero_percent() {
        let p = Progress::of(&Requirements::new());
        assert_eq!(p.percent, 0);
        assert!(!p.is_complete());
    }

    #[test]
    fn incomplete_lists_only_required_gaps() {
        let mut reqs = with_completed(5);
        reqs.get_mut(&DocumentType::FinancialStatement).unwrap().required = false;
        assert_eq!(
            incomplete_required(&reqs),
            vec![DocumentType::InsuranceCertificate]
        );
    }
}

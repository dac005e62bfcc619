// 🎯 Confidence & Readiness Scorer
//
// Single verdict for external display: quality tier + buyer-review readiness
// with the itemized issue list. Stateless; recomputed from scratch whenever
// any adjustment changes. The rule set is cheap and the aggregate small, so
// there is no caching or incremental state.

use serde::{Deserialize, Serialize};

use crate::normalization::{Adjustment, CustomAdjustment};
use crate::validator::{self, OverallScore};

/// The combined quality verdict consumed by the UI and the save contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceVerdict {
    pub overall_score: OverallScore,
    pub ready: bool,
    pub issues: Vec<String>,
}

impl ConfidenceVerdict {
    /// Numeric projection of the tier on the canonical 0-100 scale.
    pub fn score_percent(&self) -> u8 {
        self.overall_score.as_percent()
    }
}

/// Derive the verdict from the canonical adjustment lists.
pub fn assess(
    adjustments: &[Adjustment],
    custom_adjustments: &[CustomAdjustment],
    reported_ebitda: i64,
) -> ConfidenceVerdict {
    let validation =
        validator::validate_normalization(adjustments, custom_adjustments, reported_ebitda);
    let readiness =
        validator::is_ready_for_buyer_review(adjustments, custom_adjustments, reported_ebitda);

    ConfidenceVerdict {
        overall_score: validation.overall_score,
        ready: readiness.ready,
        issues: readiness.issues,
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalization::{EbitdaNormalization, FieldEdit};
    use crate::registry::NormalizationCategory;

    #[test]
    fn test_clean_normalization_is_excellent_and_ready() {
        let normalization = EbitdaNormalization::new("s", 2024, 1_000_000).apply(
            FieldEdit::SetAdjustment {
                category: NormalizationCategory::OwnerCompensation,
                amount: 70_000,
                note: Some("Owner salary restated to the benchmark market rate".to_string()),
            },
        );

        let verdict = normalization.confidence();

        assert_eq!(verdict.overall_score, OverallScore::Excellent);
        assert!(verdict.ready);
        assert!(verdict.issues.is_empty());
        assert_eq!(verdict.score_percent(), 100);
    }

    #[test]
    fn test_score_and_readiness_are_independent_axes() {
        // Under every warning threshold (score stays excellent) but a 25k
        // adjustment with a thin note is not ready for buyer review.
        let normalization = EbitdaNormalization::new("s", 2024, 1_000_000).apply(
            FieldEdit::SetAdjustment {
                category: NormalizationCategory::OwnerCompensation,
                amount: 25_000,
                note: Some("salary restated".to_string()), // 15 chars
            },
        );

        let verdict = normalization.confidence();

        assert_eq!(verdict.overall_score, OverallScore::Excellent);
        assert!(!verdict.ready);
        assert_eq!(verdict.issues.len(), 1);
    }

    #[test]
    fn test_errors_drive_score_to_poor() {
        let normalization = EbitdaNormalization::new("s", 2024, 500_000).apply(
            FieldEdit::SetAdjustment {
                category: NormalizationCategory::PersonalExpenses,
                amount: 150_000,
                note: None,
            },
        );

        let verdict = normalization.confidence();

        assert_eq!(verdict.overall_score, OverallScore::Poor);
        assert_eq!(verdict.score_percent(), 25);
    }

    #[test]
    fn test_assess_is_deterministic() {
        let normalization = EbitdaNormalization::new("s", 2024, 800_000).apply(
            FieldEdit::SetAdjustment {
                category: NormalizationCategory::DiscretionaryExpenses,
                amount: 45_000,
                note: None,
            },
        );

        let first = normalization.confidence();
        let second = normalization.confidence();

        assert_eq!(first, second);
    }
}

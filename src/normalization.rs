// 📊 EBITDA Normalization - Aggregate root and pure-reducer edit model
//
// An EbitdaNormalization is an immutable snapshot: edits go through
// `apply(FieldEdit)` which returns a new aggregate, and every derived value
// (totals, normalized EBITDA, validation, confidence) is recomputed from the
// canonical adjustment lists. Derived state is never stored, so it cannot
// drift from its inputs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::aggregator;
use crate::registry::NormalizationCategory;
use crate::scorer::{self, ConfidenceVerdict};
use crate::validator::{self, NormalizationValidation, ReadinessReport, ValidationResult};

// ============================================================================
// ADJUSTMENTS
// ============================================================================

/// One categorized adjustment. Amounts are signed whole-euro values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Adjustment {
    pub category: NormalizationCategory,

    /// Signed amount in euros; positive increases normalized EBITDA
    pub amount: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,

    /// Confidence on a 0-100 scale, set when a market-rate suggestion is adopted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<u8>,
}

impl Adjustment {
    pub fn new(category: NormalizationCategory, amount: i64, note: Option<String>) -> Self {
        Adjustment {
            category,
            amount,
            note,
            confidence: None,
        }
    }

    /// Zero-amount placeholder, used when seeding a fresh aggregate.
    pub fn empty(category: NormalizationCategory) -> Self {
        Adjustment::new(category, 0, None)
    }
}

/// Free-text escape hatch for adjustments outside the fixed taxonomy.
///
/// Carries its own documentation rules (5-char description minimum) instead
/// of category bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomAdjustment {
    pub id: String,
    pub description: String,
    pub amount: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl CustomAdjustment {
    pub fn new(description: &str, amount: i64, note: Option<String>) -> Self {
        CustomAdjustment {
            id: uuid::Uuid::new_v4().to_string(),
            description: description.to_string(),
            amount,
            note,
        }
    }
}

// ============================================================================
// MARKET-RATE SUGGESTION (external input, consumed only)
// ============================================================================

/// Suggestion from the pricing-benchmark collaborator.
///
/// Read-only input: the bridge may surface it unmodified and may adopt it
/// into an adjustment, but never validates or mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketRateSuggestion {
    pub category: String,
    pub suggested_amount: i64,
    pub percentile_50: i64,
    pub percentile_75: i64,
    pub rationale: String,
    /// 0-100 scale
    pub confidence: u8,
    pub source: String,
}

// ============================================================================
// INBOUND FORM CONTRACT
// ============================================================================

/// One form entry for a standard category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentEntry {
    pub amount: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// What the form/modal collaborator sends: category id -> entry, plus custom
/// adjustments. Category ids are strings at this boundary; unknown ids fail
/// closed when the form is applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentForm {
    #[serde(default)]
    pub adjustments: BTreeMap<String, AdjustmentEntry>,
    #[serde(default)]
    pub custom_adjustments: Vec<CustomAdjustment>,
}

// ============================================================================
// FIELD EDITS (pure reducer)
// ============================================================================

/// A single user edit. `EbitdaNormalization::apply` folds one edit into a new
/// snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldEdit {
    SetReportedEbitda(i64),
    SetAdjustment {
        category: NormalizationCategory,
        amount: i64,
        note: Option<String>,
    },
    ClearAdjustment(NormalizationCategory),
    AddCustom(CustomAdjustment),
    RemoveCustom {
        id: String,
    },
    AdoptSuggestion(MarketRateSuggestion),
}

// ============================================================================
// AGGREGATE ROOT
// ============================================================================

/// The normalization for one company session and fiscal year.
///
/// Created empty (all 12 categories at zero); the bridge identity
/// `normalized_ebitda == reported_ebitda + total_adjustments` holds by
/// construction because both sides are computed from the same lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EbitdaNormalization {
    pub session_id: String,
    pub year: i32,
    pub reported_ebitda: i64,
    /// Exactly one entry per category, in taxonomy order
    pub adjustments: Vec<Adjustment>,
    pub custom_adjustments: Vec<CustomAdjustment>,
}

impl EbitdaNormalization {
    /// Fresh aggregate with every category seeded at zero.
    pub fn new(session_id: &str, year: i32, reported_ebitda: i64) -> Self {
        EbitdaNormalization {
            session_id: session_id.to_string(),
            year,
            reported_ebitda,
            adjustments: NormalizationCategory::ALL
                .iter()
                .map(|c| Adjustment::empty(*c))
                .collect(),
            custom_adjustments: Vec::new(),
        }
    }

    /// The adjustment entry for a category (always present).
    pub fn adjustment(&self, category: NormalizationCategory) -> &Adjustment {
        self.adjustments
            .iter()
            .find(|a| a.category == category)
            .expect("aggregate seeds every category")
    }

    // ========================================================================
    // DERIVED VALUES (recomputed, never stored)
    // ========================================================================

    pub fn total_adjustments(&self) -> i64 {
        aggregator::total_adjustments(&self.adjustments, &self.custom_adjustments)
    }

    pub fn normalized_ebitda(&self) -> i64 {
        aggregator::normalized_ebitda(self.reported_ebitda, self.total_adjustments())
    }

    pub fn validate(&self) -> NormalizationValidation {
        validator::validate_normalization(
            &self.adjustments,
            &self.custom_adjustments,
            self.reported_ebitda,
        )
    }

    pub fn readiness(&self) -> ReadinessReport {
        validator::is_ready_for_buyer_review(
            &self.adjustments,
            &self.custom_adjustments,
            self.reported_ebitda,
        )
    }

    pub fn confidence(&self) -> ConfidenceVerdict {
        scorer::assess(&self.adjustments, &self.custom_adjustments, self.reported_ebitda)
    }

    // ========================================================================
    // PURE REDUCER
    // ========================================================================

    /// Fold one edit into a new snapshot. The receiver is never mutated.
    pub fn apply(&self, edit: FieldEdit) -> EbitdaNormalization {
        let mut next = self.clone();

        match edit {
            FieldEdit::SetReportedEbitda(amount) => {
                next.reported_ebitda = amount;
            }
            FieldEdit::SetAdjustment {
                category,
                amount,
                note,
            } => {
                for adjustment in &mut next.adjustments {
                    if adjustment.category == category {
                        adjustment.amount = amount;
                        adjustment.note = note;
                        adjustment.confidence = None;
                        break;
                    }
                }
            }
            FieldEdit::ClearAdjustment(category) => {
                for adjustment in &mut next.adjustments {
                    if adjustment.category == category {
                        *adjustment = Adjustment::empty(category);
                        break;
                    }
                }
            }
            FieldEdit::AddCustom(custom) => {
                next.custom_adjustments.push(custom);
            }
            FieldEdit::RemoveCustom { id } => {
                next.custom_adjustments.retain(|c| c.id != id);
            }
            FieldEdit::AdoptSuggestion(suggestion) => {
                // Unknown suggestion categories fail closed: no change.
                if let Some(category) = NormalizationCategory::parse(&suggestion.category) {
                    for adjustment in &mut next.adjustments {
                        if adjustment.category == category {
                            adjustment.amount = suggestion.suggested_amount;
                            adjustment.note = Some(suggestion.rationale.clone());
                            adjustment.confidence = Some(suggestion.confidence);
                            break;
                        }
                    }
                }
            }
        }

        next
    }

    /// Apply a full inbound form.
    ///
    /// Known categories and all custom entries are taken over; unknown
    /// category ids are reported as error results and otherwise ignored
    /// (fail closed at the form boundary).
    pub fn apply_form(&self, form: &AdjustmentForm) -> (EbitdaNormalization, Vec<ValidationResult>) {
        let mut next = self.clone();
        let mut errors = Vec::new();

        for (id, entry) in &form.adjustments {
            match NormalizationCategory::parse(id) {
                Some(category) => {
                    next = next.apply(FieldEdit::SetAdjustment {
                        category,
                        amount: entry.amount,
                        note: entry.note.clone(),
                    });
                }
                None => {
                    errors.push(ValidationResult::unknown_category(id));
                }
            }
        }

        next.custom_adjustments = form.custom_adjustments.clone();

        (next, errors)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::Severity;

    #[test]
    fn test_new_aggregate_seeds_all_categories_at_zero() {
        let normalization = EbitdaNormalization::new("session-1", 2024, 1_000_000);

        assert_eq!(normalization.adjustments.len(), 12);
        assert!(normalization.adjustments.iter().all(|a| a.amount == 0));
        assert_eq!(normalization.total_adjustments(), 0);
        assert_eq!(normalization.normalized_ebitda(), 1_000_000);
    }

    #[test]
    fn test_bridge_identity_holds_for_mixed_signs() {
        let mut normalization = EbitdaNormalization::new("session-1", 2024, 800_000);

        normalization = normalization.apply(FieldEdit::SetAdjustment {
            category: NormalizationCategory::OwnerCompensation,
            amount: 70_000,
            note: Some("Owner salary restated to market rate".to_string()),
        });
        normalization = normalization.apply(FieldEdit::SetAdjustment {
            category: NormalizationCategory::NonRecurringRevenue,
            amount: -120_000,
            note: Some("One-off subsidy removed".to_string()),
        });
        normalization = normalization.apply(FieldEdit::AddCustom(CustomAdjustment::new(
            "ERP migration consultants",
            15_000,
            None,
        )));

        let expected_total = 70_000 - 120_000 + 15_000;
        assert_eq!(normalization.total_adjustments(), expected_total);
        assert_eq!(
            normalization.normalized_ebitda(),
            normalization.reported_ebitda + normalization.total_adjustments()
        );
    }

    #[test]
    fn test_apply_returns_new_snapshot() {
        let original = EbitdaNormalization::new("session-1", 2024, 500_000);
        let edited = original.apply(FieldEdit::SetAdjustment {
            category: NormalizationCategory::PersonalExpenses,
            amount: 20_000,
            note: None,
        });

        assert_eq!(original.adjustment(NormalizationCategory::PersonalExpenses).amount, 0);
        assert_eq!(edited.adjustment(NormalizationCategory::PersonalExpenses).amount, 20_000);
    }

    #[test]
    fn test_set_adjustment_replaces_same_category() {
        let normalization = EbitdaNormalization::new("session-1", 2024, 500_000)
            .apply(FieldEdit::SetAdjustment {
                category: NormalizationCategory::OwnerCompensation,
                amount: 30_000,
                note: None,
            })
            .apply(FieldEdit::SetAdjustment {
                category: NormalizationCategory::OwnerCompensation,
                amount: 45_000,
                note: None,
            });

        // Still exactly one entry per category
        assert_eq!(normalization.adjustments.len(), 12);
        assert_eq!(
            normalization.adjustment(NormalizationCategory::OwnerCompensation).amount,
            45_000
        );
    }

    #[test]
    fn test_clear_adjustment_resets_entry() {
        let normalization = EbitdaNormalization::new("session-1", 2024, 500_000)
            .apply(FieldEdit::SetAdjustment {
                category: NormalizationCategory::FamilyExpenses,
                amount: 12_000,
                note: Some("Spouse payroll".to_string()),
            })
            .apply(FieldEdit::ClearAdjustment(NormalizationCategory::FamilyExpenses));

        let entry = normalization.adjustment(NormalizationCategory::FamilyExpenses);
        assert_eq!(entry.amount, 0);
        assert!(entry.note.is_none());
    }

    #[test]
    fn test_remove_custom_by_id() {
        let custom = CustomAdjustment::new("Trade fair one-off", 8_000, None);
        let id = custom.id.clone();

        let normalization = EbitdaNormalization::new("session-1", 2024, 500_000)
            .apply(FieldEdit::AddCustom(custom))
            .apply(FieldEdit::RemoveCustom { id });

        assert!(normalization.custom_adjustments.is_empty());
    }

    #[test]
    fn test_adopt_suggestion_sets_amount_note_and_confidence() {
        let suggestion = MarketRateSuggestion {
            category: "owner_compensation".to_string(),
            suggested_amount: 85_000,
            percentile_50: 80_000,
            percentile_75: 95_000,
            rationale: "Median managing-director salary for sector and company size".to_string(),
            confidence: 80,
            source: "benchmark-db".to_string(),
        };

        let normalization = EbitdaNormalization::new("session-1", 2024, 500_000)
            .apply(FieldEdit::AdoptSuggestion(suggestion));

        let entry = normalization.adjustment(NormalizationCategory::OwnerCompensation);
        assert_eq!(entry.amount, 85_000);
        assert_eq!(entry.confidence, Some(80));
        assert!(entry.note.as_deref().unwrap().contains("managing-director"));
    }

    #[test]
    fn test_adopt_suggestion_unknown_category_is_noop() {
        let suggestion = MarketRateSuggestion {
            category: "crypto_losses".to_string(),
            suggested_amount: 85_000,
            percentile_50: 0,
            percentile_75: 0,
            rationale: "n/a".to_string(),
            confidence: 10,
            source: "benchmark-db".to_string(),
        };

        let original = EbitdaNormalization::new("session-1", 2024, 500_000);
        let after = original.apply(FieldEdit::AdoptSuggestion(suggestion));

        assert_eq!(original, after);
    }

    #[test]
    fn test_apply_form_reports_unknown_categories() {
        let mut form = AdjustmentForm::default();
        form.adjustments.insert(
            "personal_expenses".to_string(),
            AdjustmentEntry {
                amount: 15_000,
                note: Some("Private car lease booked through the business".to_string()),
            },
        );
        form.adjustments.insert(
            "crypto_losses".to_string(),
            AdjustmentEntry {
                amount: 99_000,
                note: None,
            },
        );

        let base = EbitdaNormalization::new("session-1", 2024, 500_000);
        let (next, errors) = base.apply_form(&form);

        assert_eq!(next.adjustment(NormalizationCategory::PersonalExpenses).amount, 15_000);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].severity, Severity::Error);
        assert!(errors[0].message.contains("crypto_losses"));
        // The unknown entry contributes nothing to the totals
        assert_eq!(next.total_adjustments(), 15_000);
    }
}

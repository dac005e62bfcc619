// ✅ Adjustment Validator - Per-item, aggregate, and cross-item rules
//
// Three severities, never exceptions for control flow:
//   error   - blocks submission (bounds violated, malformed custom
//             description, unknown category)
//   warning - visible before confirmation, never blocks
//   info    - advisory only
//
// Unknown categories fail closed. Validation is pure and cheap; re-running it
// on every keystroke is the intended usage pattern.

use serde::{Deserialize, Serialize};

use crate::normalization::{Adjustment, CustomAdjustment};
use crate::registry::lookup_definition;

// ============================================================================
// THRESHOLDS
// ============================================================================

/// Standard adjustments above this need a note of at least MIN_NOTE_LEN chars
const LARGE_ADJUSTMENT_EUR: i64 = 10_000;
const MIN_NOTE_LEN: usize = 10;

/// Custom adjustments: minimum description length
const CUSTOM_MIN_DESCRIPTION_LEN: usize = 5;
/// Custom adjustments above this need a note of at least CUSTOM_NOTE_LEN chars
const CUSTOM_LARGE_AMOUNT_EUR: i64 = 30_000;
const CUSTOM_NOTE_LEN: usize = 20;

/// Total-adjustment ratio bands relative to reported EBITDA
const RATIO_WARNING_PCT: f64 = 50.0;
const RATIO_INFO_PCT: f64 = 30.0;

/// More custom adjustments than this draws a warning
const MAX_CUSTOM_BEFORE_WARNING: usize = 5;

/// Buyer-review documentation thresholds
const REVIEW_STANDARD_EUR: i64 = 20_000;
const REVIEW_CUSTOM_EUR: i64 = 15_000;
const REVIEW_NOTE_LEN: usize = 20;
const REVIEW_RATIO_PCT: f64 = 40.0;
const REVIEW_STRONG_NOTE_LEN: usize = 30;
const REVIEW_MIN_DOCUMENTED: usize = 3;

// ============================================================================
// VALIDATION RESULT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
}

impl ValidationResult {
    pub fn error(message: &str, category: Option<&str>, suggested_action: Option<&str>) -> Self {
        ValidationResult {
            is_valid: false,
            severity: Severity::Error,
            message: message.to_string(),
            category: category.map(str::to_string),
            suggested_action: suggested_action.map(str::to_string),
        }
    }

    pub fn warning(message: &str, category: Option<&str>, suggested_action: Option<&str>) -> Self {
        ValidationResult {
            is_valid: true,
            severity: Severity::Warning,
            message: message.to_string(),
            category: category.map(str::to_string),
            suggested_action: suggested_action.map(str::to_string),
        }
    }

    pub fn info(message: &str, category: Option<&str>) -> Self {
        ValidationResult {
            is_valid: true,
            severity: Severity::Info,
            message: message.to_string(),
            category: category.map(str::to_string),
            suggested_action: None,
        }
    }

    /// Canonical error for an unregistered category identifier.
    pub fn unknown_category(id: &str) -> Self {
        ValidationResult::error(
            &format!("Unknown adjustment category: {}", id),
            Some(id),
            Some("Use one of the 12 registered categories or a custom adjustment"),
        )
    }
}

// ============================================================================
// OVERALL SCORE
// ============================================================================

/// Quality tier derived from a validation pass.
///
/// Strict ordered tie-break: any error dominates the warning count, which
/// dominates the zero-warning "excellent".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallScore {
    Poor,
    Acceptable,
    Good,
    Excellent,
}

impl OverallScore {
    /// The single numeric projection of the tier, on a canonical 0-100 scale.
    pub fn as_percent(&self) -> u8 {
        match self {
            OverallScore::Poor => 25,
            OverallScore::Acceptable => 50,
            OverallScore::Good => 75,
            OverallScore::Excellent => 100,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OverallScore::Poor => "poor",
            OverallScore::Acceptable => "acceptable",
            OverallScore::Good => "good",
            OverallScore::Excellent => "excellent",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizationValidation {
    pub has_errors: bool,
    pub has_warnings: bool,
    pub results: Vec<ValidationResult>,
    pub overall_score: OverallScore,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadinessReport {
    pub ready: bool,
    pub issues: Vec<String>,
}

// ============================================================================
// PER-ITEM VALIDATION
// ============================================================================

/// Validate one categorized adjustment against the registry.
///
/// A bounds violation is mutually exclusive with the other checks; the
/// threshold warning and the documentation warning can co-occur.
pub fn validate_adjustment(
    category_id: &str,
    amount: i64,
    note: Option<&str>,
) -> Vec<ValidationResult> {
    let Some(def) = lookup_definition(category_id) else {
        return vec![ValidationResult::unknown_category(category_id)];
    };

    if amount < def.min || amount > def.max {
        return vec![ValidationResult::error(
            &format!(
                "{} must be between {} and {}",
                def.label,
                format_eur(def.min),
                format_eur(def.max)
            ),
            Some(category_id),
            Some("Reduce the adjustment or split it across categories"),
        )];
    }

    let mut results = Vec::new();

    if let (Some(threshold), Some(message)) = (def.warning_threshold, def.warning_message) {
        if amount.abs() > threshold {
            results.push(ValidationResult::warning(
                message,
                Some(category_id),
                Some("Strengthen the supporting documentation"),
            ));
        }
    }

    if amount.abs() > LARGE_ADJUSTMENT_EUR && note_chars(note) < MIN_NOTE_LEN {
        results.push(ValidationResult::warning(
            &format!(
                "{} adjustment of {} needs a comprehensive rationale",
                def.label,
                format_eur(amount)
            ),
            Some(category_id),
            Some("Add a note of at least 10 characters explaining the adjustment"),
        ));
    }

    results
}

// ============================================================================
// AGGREGATE VALIDATION
// ============================================================================

/// Validate the full normalization: per-item rules, custom-adjustment rules,
/// magnitude relative to reported EBITDA, offsetting-signs conflict, and
/// custom-adjustment count. Result order is deterministic.
pub fn validate_normalization(
    adjustments: &[Adjustment],
    custom_adjustments: &[CustomAdjustment],
    reported_ebitda: i64,
) -> NormalizationValidation {
    let mut results = Vec::new();

    // 1. Per-item rules for every non-zero standard adjustment
    for adjustment in adjustments.iter().filter(|a| a.amount != 0) {
        results.extend(validate_adjustment(
            adjustment.category.as_str(),
            adjustment.amount,
            adjustment.note.as_deref(),
        ));
    }

    // 2. Custom adjustments carry their own documentation rules
    for custom in custom_adjustments {
        if custom.description.chars().count() < CUSTOM_MIN_DESCRIPTION_LEN {
            results.push(ValidationResult::error(
                &format!(
                    "Custom adjustment '{}' needs a description of at least {} characters",
                    custom.description, CUSTOM_MIN_DESCRIPTION_LEN
                ),
                None,
                Some("Describe what the adjustment corrects"),
            ));
        }

        if custom.amount.abs() > CUSTOM_LARGE_AMOUNT_EUR
            && note_chars(custom.note.as_deref()) < CUSTOM_NOTE_LEN
        {
            results.push(ValidationResult::warning(
                &format!(
                    "Custom adjustment '{}' of {} needs a detailed note",
                    custom.description,
                    format_eur(custom.amount)
                ),
                None,
                Some("Document the rationale in at least 20 characters"),
            ));
        }
    }

    // 3. + 4. Magnitude relative to reported EBITDA
    let total = crate::aggregator::total_adjustments(adjustments, custom_adjustments);

    if reported_ebitda != 0 {
        let pct = (total as f64 / reported_ebitda as f64).abs() * 100.0;

        if pct > RATIO_WARNING_PCT {
            results.push(ValidationResult::warning(
                &format!(
                    "Total adjustments are {:.1}% of reported EBITDA; exceeding 50% may \
                     raise buyer concerns",
                    pct
                ),
                None,
                Some("Re-examine the largest adjustments before sharing the report"),
            ));
        } else if pct > RATIO_INFO_PCT {
            results.push(ValidationResult::info(
                &format!(
                    "Total adjustments are {:.1}% of reported EBITDA; ensure documentation \
                     for each item",
                    pct
                ),
                None,
            ));
        }
    }

    // 5. Offsetting-signs conflict
    let amounts = adjustments
        .iter()
        .map(|a| a.amount)
        .chain(custom_adjustments.iter().map(|c| c.amount));
    let has_positive = amounts.clone().any(|a| a > 0);
    let has_negative = amounts.clone().any(|a| a < 0);

    if has_positive && has_negative && total == 0 {
        results.push(ValidationResult::info(
            "Positive and negative adjustments offset each other exactly; verify the signs \
             and completeness of the entries",
            None,
        ));
    }

    // 6. Excessive custom-adjustment count
    if custom_adjustments.len() > MAX_CUSTOM_BEFORE_WARNING {
        results.push(ValidationResult::warning(
            &format!(
                "{} custom adjustments may be excessive, consider consolidating them into \
                 the standard categories",
                custom_adjustments.len()
            ),
            None,
            Some("Fold related custom items into one entry or a standard category"),
        ));
    }

    let has_errors = results.iter().any(|r| r.severity == Severity::Error);
    let has_warnings = results.iter().any(|r| r.severity == Severity::Warning);
    let warning_count = results.iter().filter(|r| r.severity == Severity::Warning).count();

    let overall_score = if has_errors {
        OverallScore::Poor
    } else if warning_count > 3 {
        OverallScore::Acceptable
    } else if warning_count > 0 {
        OverallScore::Good
    } else {
        OverallScore::Excellent
    };

    NormalizationValidation {
        has_errors,
        has_warnings,
        results,
        overall_score,
    }
}

// ============================================================================
// BUYER-REVIEW READINESS
// ============================================================================

/// Is the documentation strong enough for external (buyer-side) scrutiny?
pub fn is_ready_for_buyer_review(
    adjustments: &[Adjustment],
    custom_adjustments: &[CustomAdjustment],
    reported_ebitda: i64,
) -> ReadinessReport {
    let mut issues = Vec::new();

    for adjustment in adjustments {
        if adjustment.amount.abs() > REVIEW_STANDARD_EUR
            && note_chars(adjustment.note.as_deref()) < REVIEW_NOTE_LEN
        {
            issues.push(format!(
                "{} adjustment of {} is not sufficiently documented for buyer review",
                adjustment.category.label(),
                format_eur(adjustment.amount)
            ));
        }
    }

    for custom in custom_adjustments {
        if custom.amount.abs() > REVIEW_CUSTOM_EUR
            && note_chars(custom.note.as_deref()) < REVIEW_NOTE_LEN
        {
            issues.push(format!(
                "Custom adjustment '{}' of {} is not sufficiently documented for buyer review",
                custom.description,
                format_eur(custom.amount)
            ));
        }
    }

    let total = crate::aggregator::total_adjustments(adjustments, custom_adjustments);
    if reported_ebitda != 0 {
        let pct = (total as f64 / reported_ebitda as f64).abs() * 100.0;
        let well_documented = adjustments
            .iter()
            .map(|a| note_chars(a.note.as_deref()))
            .chain(custom_adjustments.iter().map(|c| note_chars(c.note.as_deref())))
            .filter(|len| *len > REVIEW_STRONG_NOTE_LEN)
            .count();

        if pct > REVIEW_RATIO_PCT && well_documented < REVIEW_MIN_DOCUMENTED {
            issues.push(format!(
                "Total adjustment is {:.1}% of reported EBITDA but only {} entries carry \
                 detailed notes",
                pct, well_documented
            ));
        }
    }

    ReadinessReport {
        ready: issues.is_empty(),
        issues,
    }
}

// ============================================================================
// HELPERS
// ============================================================================

fn note_chars(note: Option<&str>) -> usize {
    note.map_or(0, |n| n.chars().count())
}

/// Euro amount with thousands separators, e.g. -40000 -> "-€40,000".
/// Used for rule messages; display formatting proper is the UI's concern.
pub(crate) fn format_eur(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::new();

    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if amount < 0 {
        format!("-€{}", grouped)
    } else {
        format!("€{}", grouped)
    }
}

// ============================================================================
// TESTS
// ============================================================================

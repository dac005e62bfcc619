// ➕ Aggregator - Exact totals and advisory guidance bands
//
// All amounts are signed whole-euro i64 values, so sums are exact; there is
// no floating-point drift anywhere in the bridge identity.

use crate::normalization::{Adjustment, CustomAdjustment};
use crate::registry::NormalizationCategory;

/// Sum of all standard and custom adjustment amounts.
pub fn total_adjustments(adjustments: &[Adjustment], custom_adjustments: &[CustomAdjustment]) -> i64 {
    let standard: i64 = adjustments.iter().map(|a| a.amount).sum();
    let custom: i64 = custom_adjustments.iter().map(|c| c.amount).sum();
    standard + custom
}

/// The bridge identity: normalized = reported + total.
pub fn normalized_ebitda(reported_ebitda: i64, total_adjustments: i64) -> i64 {
    reported_ebitda + total_adjustments
}

/// Advisory scrutiny band for one adjustment relative to reported EBITDA.
///
/// Four bands (<2%, <10%, <25%, >=25%) of increasing scrutiny. A zero
/// reported EBITDA makes any adjustment maximally material, so it maps to
/// the highest band. Pure function, display use only.
pub fn adjustment_guidance(
    category: NormalizationCategory,
    amount: i64,
    reported_ebitda: i64,
) -> String {
    let band = if reported_ebitda == 0 {
        GUIDANCE_MAJOR
    } else {
        let pct = (amount as f64 / reported_ebitda as f64).abs() * 100.0;
        if pct < 2.0 {
            GUIDANCE_MINOR
        } else if pct < 10.0 {
            GUIDANCE_MODERATE
        } else if pct < 25.0 {
            GUIDANCE_SIGNIFICANT
        } else {
            GUIDANCE_MAJOR
        }
    };

    format!("{}: {}", category.label(), band)
}

const GUIDANCE_MINOR: &str = "minor adjustment, unlikely to attract scrutiny";
const GUIDANCE_MODERATE: &str =
    "moderate adjustment, keep invoices or contracts on file";
const GUIDANCE_SIGNIFICANT: &str =
    "significant adjustment, expect buyer questions and prepare detailed evidence";
const GUIDANCE_MAJOR: &str =
    "major adjustment, will be heavily scrutinized in due diligence; consider third-party \
     substantiation";

// ============================================================================
// TESTS
// ============================================================================

// 📄 Report - Text summary and CSV export of a normalization
//
// Output surfaces for the CLI; the browser report renders from the JSON API
// instead.

use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

use crate::aggregator;
use crate::normalization::EbitdaNormalization;
use crate::validator::format_eur;

/// Render a plain-text summary of the normalization: amounts per category,
/// custom entries, totals, and the confidence verdict.
pub fn render_summary(normalization: &EbitdaNormalization) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "EBITDA Normalization — session {} / {}\n",
        normalization.session_id, normalization.year
    ));
    out.push_str(&format!(
        "Reported EBITDA:    {}\n\n",
        format_eur(normalization.reported_ebitda)
    ));

    for adjustment in &normalization.adjustments {
        if adjustment.amount == 0 {
            continue;
        }
        out.push_str(&format!(
            "  {:<28} {:>14}\n",
            adjustment.category.label(),
            format_eur(adjustment.amount)
        ));
        out.push_str(&format!(
            "    {}\n",
            aggregator::adjustment_guidance(
                adjustment.category,
                adjustment.amount,
                normalization.reported_ebitda
            )
        ));
    }

    for custom in &normalization.custom_adjustments {
        out.push_str(&format!(
            "  {:<28} {:>14}  (custom)\n",
            custom.description,
            format_eur(custom.amount)
        ));
    }

    let verdict = normalization.confidence();
    out.push_str(&format!(
        "\nTotal adjustments:  {}\n",
        format_eur(normalization.total_adjustments())
    ));
    out.push_str(&format!(
        "Normalized EBITDA:  {}\n",
        format_eur(normalization.normalized_ebitda())
    ));
    out.push_str(&format!(
        "Confidence:         {} ({}%)\n",
        verdict.overall_score.as_str(),
        verdict.score_percent()
    ));
    out.push_str(&format!(
        "Buyer review ready: {}\n",
        if verdict.ready { "yes" } else { "no" }
    ));

    for issue in &verdict.issues {
        out.push_str(&format!("  - {}\n", issue));
    }

    out
}

/// One CSV row; standard and custom adjustments share the same columns.
#[derive(Debug, Serialize)]
struct AdjustmentRow<'a> {
    kind: &'a str,
    category: &'a str,
    label: &'a str,
    amount: i64,
    note: &'a str,
}

/// Write all non-zero adjustments as CSV.
pub fn write_adjustments_csv<W: Write>(normalization: &EbitdaNormalization, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    for adjustment in &normalization.adjustments {
        if adjustment.amount == 0 {
            continue;
        }
        wtr.serialize(AdjustmentRow {
            kind: "standard",
            category: adjustment.category.as_str(),
            label: adjustment.category.label(),
            amount: adjustment.amount,
            note: adjustment.note.as_deref().unwrap_or(""),
        })?;
    }

    for custom in &normalization.custom_adjustments {
        wtr.serialize(AdjustmentRow {
            kind: "custom",
            category: "custom",
            label: &custom.description,
            amount: custom.amount,
            note: custom.note.as_deref().unwrap_or(""),
        })?;
    }

    wtr.flush()?;
    Ok(())
}

/// Export the adjustment list to a CSV file.
pub fn export_csv(normalization: &EbitdaNormalization, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create CSV file: {:?}", path))?;
    write_adjustments_csv(normalization, file)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalization::{CustomAdjustment, FieldEdit};
    use crate::registry::NormalizationCategory;

    fn sample() -> EbitdaNormalization {
        EbitdaNormalization::new("session-abc", 2024, 1_000_000)
            .apply(FieldEdit::SetAdjustment {
                category: NormalizationCategory::OwnerCompensation,
                amount: 70_000,
                note: Some("Owner salary restated to the benchmark market rate".to_string()),
            })
            .apply(FieldEdit::AddCustom(CustomAdjustment::new(
                "ERP migration consultants",
                15_000,
                None,
            )))
    }

    #[test]
    fn test_summary_contains_totals_and_verdict() {
        let summary = render_summary(&sample());

        assert!(summary.contains("Reported EBITDA:"));
        assert!(summary.contains("€1,000,000"));
        assert!(summary.contains("Owner compensation"));
        assert!(summary.contains("ERP migration consultants"));
        assert!(summary.contains("€1,085,000"));
        assert!(summary.contains("excellent"));
    }

    #[test]
    fn test_summary_skips_zero_categories() {
        let summary = render_summary(&sample());
        assert!(!summary.contains("Personal expenses"));
    }

    #[test]
    fn test_csv_export_shape() {
        let mut buffer = Vec::new();
        write_adjustments_csv(&sample(), &mut buffer).unwrap();
        let csv_text = String::from_utf8(buffer).unwrap();

        let mut lines = csv_text.lines();
        assert_eq!(lines.next().unwrap(), "kind,category,label,amount,note");
        assert!(csv_text.contains("standard,owner_compensation,Owner compensation,70000,"));
        assert!(csv_text.contains("custom,custom,ERP migration consultants,15000,"));
        // header + one standard + one custom
        assert_eq!(csv_text.lines().count(), 3);
    }
}

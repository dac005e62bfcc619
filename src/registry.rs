// 🏷️ Category Registry - Fixed normalization taxonomy
// 12 adjustment categories, each with bounds, warning threshold, and direction
//
// The registry is the canonical source of bounds and thresholds for the
// validator. It is a static table over a closed enum: adding or removing a
// category is a compile-time-checked change, not a runtime lookup failure.

use serde::{Deserialize, Serialize};

// ============================================================================
// NORMALIZATION CATEGORY
// ============================================================================

/// Closed taxonomy of EBITDA normalization categories.
///
/// String identifiers (serde and `as_str`/`parse`) use snake_case, matching
/// the inbound form contract and the persistence payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationCategory {
    OwnerCompensation,
    OneTimeExpenses,
    PersonalExpenses,
    RelatedParty,
    NonRecurringRevenue,
    NonRecurringCosts,
    Depreciation,
    FamilyExpenses,
    UnusualTransactions,
    TaxOptimization,
    DiscretionaryExpenses,
    Other,
}

impl NormalizationCategory {
    /// All 12 categories in display order.
    pub const ALL: [NormalizationCategory; 12] = [
        NormalizationCategory::OwnerCompensation,
        NormalizationCategory::OneTimeExpenses,
        NormalizationCategory::PersonalExpenses,
        NormalizationCategory::RelatedParty,
        NormalizationCategory::NonRecurringRevenue,
        NormalizationCategory::NonRecurringCosts,
        NormalizationCategory::Depreciation,
        NormalizationCategory::FamilyExpenses,
        NormalizationCategory::UnusualTransactions,
        NormalizationCategory::TaxOptimization,
        NormalizationCategory::DiscretionaryExpenses,
        NormalizationCategory::Other,
    ];

    /// Stable string identifier (snake_case).
    pub fn as_str(&self) -> &'static str {
        match self {
            NormalizationCategory::OwnerCompensation => "owner_compensation",
            NormalizationCategory::OneTimeExpenses => "one_time_expenses",
            NormalizationCategory::PersonalExpenses => "personal_expenses",
            NormalizationCategory::RelatedParty => "related_party",
            NormalizationCategory::NonRecurringRevenue => "non_recurring_revenue",
            NormalizationCategory::NonRecurringCosts => "non_recurring_costs",
            NormalizationCategory::Depreciation => "depreciation",
            NormalizationCategory::FamilyExpenses => "family_expenses",
            NormalizationCategory::UnusualTransactions => "unusual_transactions",
            NormalizationCategory::TaxOptimization => "tax_optimization",
            NormalizationCategory::DiscretionaryExpenses => "discretionary_expenses",
            NormalizationCategory::Other => "other",
        }
    }

    /// Parse a string identifier. Unknown identifiers fail closed (None).
    pub fn parse(id: &str) -> Option<NormalizationCategory> {
        NormalizationCategory::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == id)
    }

    /// Get the static definition for this category (total, exhaustive).
    pub fn definition(&self) -> &'static CategoryDefinition {
        match self {
            NormalizationCategory::OwnerCompensation => &OWNER_COMPENSATION,
            NormalizationCategory::OneTimeExpenses => &ONE_TIME_EXPENSES,
            NormalizationCategory::PersonalExpenses => &PERSONAL_EXPENSES,
            NormalizationCategory::RelatedParty => &RELATED_PARTY,
            NormalizationCategory::NonRecurringRevenue => &NON_RECURRING_REVENUE,
            NormalizationCategory::NonRecurringCosts => &NON_RECURRING_COSTS,
            NormalizationCategory::Depreciation => &DEPRECIATION,
            NormalizationCategory::FamilyExpenses => &FAMILY_EXPENSES,
            NormalizationCategory::UnusualTransactions => &UNUSUAL_TRANSACTIONS,
            NormalizationCategory::TaxOptimization => &TAX_OPTIMIZATION,
            NormalizationCategory::DiscretionaryExpenses => &DISCRETIONARY_EXPENSES,
            NormalizationCategory::Other => &OTHER,
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        self.definition().label
    }
}

// ============================================================================
// CATEGORY DEFINITION
// ============================================================================

/// Direction a category's adjustment normally moves EBITDA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdjustmentDirection {
    /// Adds back costs that depress reported EBITDA
    Add,
    /// Removes revenue that inflates reported EBITDA
    Subtract,
    /// Can legitimately go either way (e.g. market-rate corrections)
    Both,
}

/// Static definition of one normalization category.
///
/// Bounds are whole-euro amounts; `min <= max` holds for every entry.
/// `warning_threshold` compares against the absolute adjustment amount.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryDefinition {
    pub category: NormalizationCategory,
    pub label: &'static str,
    pub short_description: &'static str,
    pub long_description: &'static str,
    pub examples: &'static [&'static str],
    pub min: i64,
    pub max: i64,
    pub warning_threshold: Option<i64>,
    pub warning_message: Option<&'static str>,
    pub direction: AdjustmentDirection,
    pub help_text: &'static str,
}

// ============================================================================
// STATIC TAXONOMY TABLE
// ============================================================================

static OWNER_COMPENSATION: CategoryDefinition = CategoryDefinition {
    category: NormalizationCategory::OwnerCompensation,
    label: "Owner compensation",
    short_description: "Adjust owner salary to market rate",
    long_description: "Corrects above- or below-market owner compensation to the salary an \
                       external manager would earn for the same role, so EBITDA reflects \
                       arm's-length staffing costs.",
    examples: &[
        "Owner salary of €250,000 where market rate is €120,000",
        "Owner drawing no salary at all",
        "Discretionary owner bonuses",
    ],
    min: -500_000,
    max: 500_000,
    warning_threshold: Some(150_000),
    warning_message: Some(
        "Owner compensation adjustments above €150,000 need supporting market salary data",
    ),
    direction: AdjustmentDirection::Both,
    help_text: "Enter the difference between actual owner compensation and a market-rate salary.",
};

static ONE_TIME_EXPENSES: CategoryDefinition = CategoryDefinition {
    category: NormalizationCategory::OneTimeExpenses,
    label: "One-time expenses",
    short_description: "Add back genuinely non-repeating costs",
    long_description: "Removes expenses that will not recur under new ownership, such as \
                       litigation settlements or relocation costs, from the expense base.",
    examples: &[
        "Legal settlement paid once",
        "Office relocation costs",
        "Rebranding project",
    ],
    min: 0,
    max: 250_000,
    warning_threshold: Some(100_000),
    warning_message: Some(
        "One-time expense add-backs above €100,000 are a frequent due-diligence dispute; \
         keep invoices ready",
    ),
    direction: AdjustmentDirection::Add,
    help_text: "Only include costs that are demonstrably non-recurring.",
};

static PERSONAL_EXPENSES: CategoryDefinition = CategoryDefinition {
    category: NormalizationCategory::PersonalExpenses,
    label: "Personal expenses",
    short_description: "Add back owner's private costs run through the business",
    long_description: "Private expenses booked as business costs (cars, travel, insurance) \
                       are added back because a buyer will not carry them.",
    examples: &[
        "Private car lease in company books",
        "Family holidays booked as travel",
        "Personal insurance premiums",
    ],
    min: 0,
    max: 100_000,
    warning_threshold: Some(50_000),
    warning_message: Some(
        "Personal expense add-backs above €50,000 invite tax as well as buyer scrutiny",
    ),
    direction: AdjustmentDirection::Add,
    help_text: "Sum the private costs currently booked through the business per year.",
};

static RELATED_PARTY: CategoryDefinition = CategoryDefinition {
    category: NormalizationCategory::RelatedParty,
    label: "Related-party transactions",
    short_description: "Reprice transactions with related parties to market terms",
    long_description: "Rent, services, or supplies traded with entities the owner controls \
                       are restated at arm's-length prices.",
    examples: &[
        "Below-market rent paid to owner's property company",
        "Management fees to a holding entity",
        "Supplies bought from a sibling company",
    ],
    min: -200_000,
    max: 200_000,
    warning_threshold: Some(75_000),
    warning_message: Some(
        "Related-party adjustments above €75,000 need the underlying contracts documented",
    ),
    direction: AdjustmentDirection::Both,
    help_text: "Enter the difference between the booked price and the market price.",
};

static NON_RECURRING_REVENUE: CategoryDefinition = CategoryDefinition {
    category: NormalizationCategory::NonRecurringRevenue,
    label: "Non-recurring revenue",
    short_description: "Remove one-off revenue a buyer cannot count on",
    long_description: "Windfall revenue (subsidies, asset sales, one-off projects) is \
                       subtracted so normalized EBITDA only reflects repeatable earnings.",
    examples: &[
        "COVID support subsidy",
        "Gain on sale of a company vehicle",
        "Single large non-repeating project",
    ],
    min: -300_000,
    max: 0,
    warning_threshold: Some(100_000),
    warning_message: Some(
        "Removing more than €100,000 of revenue materially changes the earnings story; \
         document each item",
    ),
    direction: AdjustmentDirection::Subtract,
    help_text: "Enter as a negative amount; it reduces normalized EBITDA.",
};

static NON_RECURRING_COSTS: CategoryDefinition = CategoryDefinition {
    category: NormalizationCategory::NonRecurringCosts,
    label: "Non-recurring costs",
    short_description: "Add back exceptional costs outside normal operations",
    long_description: "Exceptional operating costs (disaster recovery, bad-debt spikes, \
                       restructuring) are added back to show the sustainable cost base.",
    examples: &[
        "Flood damage repairs",
        "Exceptional bad-debt write-off",
        "Restructuring severance payments",
    ],
    min: 0,
    max: 300_000,
    warning_threshold: Some(100_000),
    warning_message: Some(
        "Cost add-backs above €100,000 should be traceable to a specific exceptional event",
    ),
    direction: AdjustmentDirection::Add,
    help_text: "Only include costs tied to an identifiable exceptional event.",
};

static DEPRECIATION: CategoryDefinition = CategoryDefinition {
    category: NormalizationCategory::Depreciation,
    label: "Depreciation policy",
    short_description: "Correct aggressive or conservative depreciation choices",
    long_description: "Where depreciation policy deviates from economic reality (fully \
                       written-off assets still in use, accelerated schedules), the effect \
                       on EBITDA-adjacent metrics is corrected.",
    examples: &[
        "Machinery fully depreciated but operational",
        "Accelerated depreciation for tax reasons",
    ],
    min: -250_000,
    max: 250_000,
    warning_threshold: Some(100_000),
    warning_message: Some(
        "Depreciation corrections above €100,000 need the fixed-asset register as evidence",
    ),
    direction: AdjustmentDirection::Both,
    help_text: "Enter the annual effect of restating depreciation to economic useful life.",
};

static FAMILY_EXPENSES: CategoryDefinition = CategoryDefinition {
    category: NormalizationCategory::FamilyExpenses,
    label: "Family member expenses",
    short_description: "Add back compensation of family members not active in the business",
    long_description: "Salaries or benefits paid to family members who do not perform a \
                       market-rate role are added back.",
    examples: &[
        "Spouse on payroll without active role",
        "Children's phones and cars in company books",
    ],
    min: 0,
    max: 150_000,
    warning_threshold: Some(60_000),
    warning_message: Some(
        "Family expense add-backs above €60,000 need payroll records per person",
    ),
    direction: AdjustmentDirection::Add,
    help_text: "Sum the annual cost of family members without a genuine operational role.",
};

static UNUSUAL_TRANSACTIONS: CategoryDefinition = CategoryDefinition {
    category: NormalizationCategory::UnusualTransactions,
    label: "Unusual transactions",
    short_description: "Correct transactions outside the ordinary course of business",
    long_description: "One-off transactions that distort the operating picture in either \
                       direction, such as barter deals or intercompany true-ups.",
    examples: &[
        "Barter arrangement with a supplier",
        "Year-end intercompany true-up",
    ],
    min: -200_000,
    max: 200_000,
    warning_threshold: Some(80_000),
    warning_message: Some(
        "Unusual transaction adjustments above €80,000 need a written explanation of the \
         underlying deal",
    ),
    direction: AdjustmentDirection::Both,
    help_text: "Describe the transaction in the note; the amount is its EBITDA effect.",
};

static TAX_OPTIMIZATION: CategoryDefinition = CategoryDefinition {
    category: NormalizationCategory::TaxOptimization,
    label: "Tax optimization effects",
    short_description: "Add back costs incurred purely to reduce taxable profit",
    long_description: "Structures and bookings chosen for tax minimization rather than \
                       operations (excess pension contributions, accelerated bookings) are \
                       reversed.",
    examples: &[
        "Excess pension contribution in December",
        "Costs pulled forward to reduce taxable profit",
    ],
    min: 0,
    max: 120_000,
    warning_threshold: Some(50_000),
    warning_message: Some(
        "Tax-driven add-backs above €50,000 should be confirmed with the company's tax advisor",
    ),
    direction: AdjustmentDirection::Add,
    help_text: "Enter the annual EBITDA effect of purely tax-motivated bookings.",
};

static DISCRETIONARY_EXPENSES: CategoryDefinition = CategoryDefinition {
    category: NormalizationCategory::DiscretionaryExpenses,
    label: "Discretionary expenses",
    short_description: "Add back optional spending a buyer could stop immediately",
    long_description: "Sponsoring, club memberships, and similar discretionary spending that \
                       is not required to run the business.",
    examples: &[
        "Local sports club sponsoring",
        "Box seats at the stadium",
        "Charitable donations",
    ],
    min: 0,
    max: 80_000,
    warning_threshold: Some(40_000),
    warning_message: Some(
        "Discretionary add-backs above €40,000 are often challenged; itemize them in the note",
    ),
    direction: AdjustmentDirection::Add,
    help_text: "Only include spending with no operational necessity.",
};

static OTHER: CategoryDefinition = CategoryDefinition {
    category: NormalizationCategory::Other,
    label: "Other adjustments",
    short_description: "Catch-all for adjustments that fit no other category",
    long_description: "Small residual adjustments. Larger or unusual items belong in a \
                       custom adjustment with a full description instead.",
    examples: &["Rounding of prior-year corrections", "Minor accounting policy alignment"],
    min: -100_000,
    max: 100_000,
    warning_threshold: Some(25_000),
    warning_message: Some(
        "Large amounts under 'Other' weaken the report; move them to a specific category \
         or a described custom adjustment",
    ),
    direction: AdjustmentDirection::Both,
    help_text: "Prefer a specific category; use this only for small residual items.",
};

// ============================================================================
// STRING-BOUNDARY LOOKUPS
// ============================================================================

/// Look up a definition by string identifier.
///
/// Unknown identifiers return None (fail closed); the validator turns this
/// into an error result.
pub fn lookup_definition(id: &str) -> Option<&'static CategoryDefinition> {
    NormalizationCategory::parse(id).map(|c| c.definition())
}

/// Human-readable label for a category identifier.
///
/// Falls back to the raw identifier for unknown categories - never fails.
pub fn category_label(id: &str) -> String {
    match lookup_definition(id) {
        Some(def) => def.label.to_string(),
        None => id.to_string(),
    }
}

/// All category definitions in display order.
pub fn all_definitions() -> Vec<&'static CategoryDefinition> {
    NormalizationCategory::ALL.iter().map(|c| c.definition()).collect()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_category_has_consistent_bounds() {
        for category in NormalizationCategory::ALL {
            let def = category.definition();
            assert!(def.min <= def.max, "{}: min > max", def.label);
            assert_eq!(def.category, category);

            if let Some(threshold) = def.warning_threshold {
                assert!(threshold > 0, "{}: non-positive warning threshold", def.label);
                assert!(
                    def.warning_message.is_some(),
                    "{}: threshold without message",
                    def.label
                );
            }
        }
    }

    #[test]
    fn test_direction_matches_bounds() {
        for category in NormalizationCategory::ALL {
            let def = category.definition();
            match def.direction {
                AdjustmentDirection::Add => assert!(def.min >= 0, "{}", def.label),
                AdjustmentDirection::Subtract => assert!(def.max <= 0, "{}", def.label),
                AdjustmentDirection::Both => {
                    assert!(def.min < 0 && def.max > 0, "{}", def.label)
                }
            }
        }
    }

    #[test]
    fn test_parse_roundtrip() {
        for category in NormalizationCategory::ALL {
            assert_eq!(NormalizationCategory::parse(category.as_str()), Some(category));
        }

        assert_eq!(NormalizationCategory::parse("crypto_losses"), None);
        assert_eq!(NormalizationCategory::parse(""), None);
    }

    #[test]
    fn test_serde_identifiers_match_as_str() {
        for category in NormalizationCategory::ALL {
            let json = serde_json::to_string(&category).unwrap();
            assert_eq!(json, format!("\"{}\"", category.as_str()));

            let back: NormalizationCategory = serde_json::from_str(&json).unwrap();
            assert_eq!(back, category);
        }
    }

    #[test]
    fn test_lookup_definition() {
        let def = lookup_definition("personal_expenses").unwrap();
        assert_eq!(def.label, "Personal expenses");
        assert_eq!(def.min, 0);
        assert_eq!(def.max, 100_000);

        assert!(lookup_definition("unknown_category").is_none());
    }

    #[test]
    fn test_category_label_falls_back_to_raw_id() {
        assert_eq!(category_label("owner_compensation"), "Owner compensation");
        assert_eq!(category_label("something_else"), "something_else");
    }

    #[test]
    fn test_all_definitions_cover_taxonomy() {
        let defs = all_definitions();
        assert_eq!(defs.len(), 12);
    }
}

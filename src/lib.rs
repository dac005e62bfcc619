// EBITDA Normalization Bridge - Core Library
// Exposes all modules for use in the CLI, API server, and tests

pub mod registry;      // Category taxonomy: bounds, thresholds, directions
pub mod normalization; // Aggregate root + pure-reducer edit model
pub mod validator;     // Per-item, aggregate, and readiness rules
pub mod aggregator;    // Exact totals and guidance bands
pub mod scorer;        // Combined confidence verdict
pub mod store;         // Session persistence collaborator (SQLite)
pub mod report;        // Text summary and CSV export

// Re-export commonly used types
pub use registry::{
    all_definitions, category_label, lookup_definition,
    AdjustmentDirection, CategoryDefinition, NormalizationCategory,
};
pub use normalization::{
    Adjustment, AdjustmentEntry, AdjustmentForm, CustomAdjustment,
    EbitdaNormalization, FieldEdit, MarketRateSuggestion,
};
pub use validator::{
    is_ready_for_buyer_review, validate_adjustment, validate_normalization,
    NormalizationValidation, OverallScore, ReadinessReport, Severity, ValidationResult,
};
pub use aggregator::{adjustment_guidance, normalized_ebitda, total_adjustments};
pub use scorer::{assess, ConfidenceVerdict};
pub use store::{
    get_save_events, is_recognized_api_error, load_normalization, save_normalization,
    setup_database, ApiError, SaveEvent, SavedNormalization, SaveRequest,
};
pub use report::{export_csv, render_summary, write_adjustments_csv};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

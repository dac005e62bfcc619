// 💾 Session Store - Persistence collaborator for normalization aggregates
//
// The bridge itself never persists; this module is the narrow save contract
// it hands a complete, internally consistent aggregate to. SQLite with WAL
// mode, one row per (session_id, year), JSON payload columns, and an
// append-only events table as the audit trail.
//
// Error contract: a request that fails local validation is rejected with a
// recognized, typed ApiError (callers downcast it from anyhow::Error and keep
// the editing surface open); any other failure is an infrastructure error.

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::normalization::{Adjustment, CustomAdjustment, EbitdaNormalization};
use crate::validator::{self, OverallScore};

// ============================================================================
// API ERROR (recognized failure)
// ============================================================================

/// Structured error the save contract returns for recognized failures.
///
/// Distinguished from infrastructure errors: a caller that sees an ApiError
/// keeps the editing state open for correction; anything else is logged and
/// the surface may close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn validation_failed(message: &str) -> Self {
        ApiError {
            code: "validation_failed".to_string(),
            message: message.to_string(),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

/// True when the error is a recognized API error rather than an
/// infrastructure failure.
pub fn is_recognized_api_error(err: &anyhow::Error) -> bool {
    err.downcast_ref::<ApiError>().is_some()
}

// ============================================================================
// SAVE CONTRACT TYPES
// ============================================================================

/// Request shape of the persistence contract.
///
/// Derived totals are recomputed from the lists at save time rather than
/// trusted from the caller, so stored derived state cannot diverge from its
/// inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveRequest {
    pub session_id: String,
    pub year: i32,
    pub reported_ebitda: i64,
    pub adjustments: Vec<Adjustment>,
    pub custom_adjustments: Vec<CustomAdjustment>,
    pub confidence_score: OverallScore,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_rate_source: Option<String>,
}

impl SaveRequest {
    /// Snapshot a normalization into a save request.
    pub fn from_normalization(
        normalization: &EbitdaNormalization,
        market_rate_source: Option<String>,
    ) -> Self {
        SaveRequest {
            session_id: normalization.session_id.clone(),
            year: normalization.year,
            reported_ebitda: normalization.reported_ebitda,
            adjustments: normalization.adjustments.clone(),
            custom_adjustments: normalization.custom_adjustments.clone(),
            confidence_score: normalization.validate().overall_score,
            market_rate_source,
        }
    }

    /// Content fingerprint over everything the caller controls. Two requests
    /// with the same fingerprint describe the same aggregate.
    fn fingerprint(&self) -> Result<String> {
        let payload = serde_json::to_string(self)?;
        let mut hasher = Sha256::new();
        hasher.update(payload.as_bytes());
        Ok(format!("{:x}", hasher.finalize()))
    }
}

/// The saved aggregate, including the server-assigned id and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedNormalization {
    pub id: String,
    pub session_id: String,
    pub year: i32,
    pub reported_ebitda: i64,
    pub adjustments: Vec<Adjustment>,
    pub custom_adjustments: Vec<CustomAdjustment>,
    pub total_adjustments: i64,
    pub normalized_ebitda: i64,
    pub confidence_score: OverallScore,
    pub market_rate_source: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Audit-trail event for a save.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveEvent {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub normalization_id: String,
    pub data: serde_json::Value,
}

// ============================================================================
// SCHEMA
// ============================================================================

pub fn setup_database(conn: &Connection) -> Result<()> {
    // WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS normalizations (
            id TEXT PRIMARY KEY,
            session_id TEXT NOT NULL,
            year INTEGER NOT NULL,
            reported_ebitda INTEGER NOT NULL,
            adjustments TEXT NOT NULL,
            custom_adjustments TEXT NOT NULL,
            total_adjustments INTEGER NOT NULL,
            normalized_ebitda INTEGER NOT NULL,
            confidence_score TEXT NOT NULL,
            market_rate_source TEXT,
            fingerprint TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE(session_id, year)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            event_type TEXT NOT NULL,
            normalization_id TEXT NOT NULL,
            data TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_normalizations_session
         ON normalizations(session_id, year)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_normalization
         ON events(normalization_id)",
        [],
    )?;

    Ok(())
}

// ============================================================================
// SAVE / LOAD
// ============================================================================

/// Persist a normalization snapshot.
///
/// - A request whose validation has errors is rejected with
///   ApiError(validation_failed).
/// - A request with an unchanged fingerprint returns the stored row without
///   writing (idempotent save).
/// - Otherwise the row is inserted or updated and an audit event appended.
pub fn save_normalization(conn: &Connection, request: &SaveRequest) -> Result<SavedNormalization> {
    let validation = validator::validate_normalization(
        &request.adjustments,
        &request.custom_adjustments,
        request.reported_ebitda,
    );

    if validation.has_errors {
        let first_error = validation
            .results
            .iter()
            .find(|r| r.severity == validator::Severity::Error)
            .map(|r| r.message.clone())
            .unwrap_or_else(|| "normalization has validation errors".to_string());
        return Err(ApiError::validation_failed(&first_error).into());
    }

    let fingerprint = request.fingerprint()?;
    let existing = load_normalization_row(conn, &request.session_id, request.year)?;

    if let Some((saved, stored_fingerprint)) = &existing {
        if *stored_fingerprint == fingerprint {
            return Ok(saved.clone());
        }
    }

    let total = crate::aggregator::total_adjustments(&request.adjustments, &request.custom_adjustments);
    let normalized = crate::aggregator::normalized_ebitda(request.reported_ebitda, total);
    let now = Utc::now();
    let adjustments_json = serde_json::to_string(&request.adjustments)?;
    let custom_json = serde_json::to_string(&request.custom_adjustments)?;

    let saved = match existing {
        Some((previous, _)) => {
            conn.execute(
                "UPDATE normalizations SET
                    reported_ebitda = ?1, adjustments = ?2, custom_adjustments = ?3,
                    total_adjustments = ?4, normalized_ebitda = ?5, confidence_score = ?6,
                    market_rate_source = ?7, fingerprint = ?8, updated_at = ?9
                 WHERE id = ?10",
                params![
                    request.reported_ebitda,
                    adjustments_json,
                    custom_json,
                    total,
                    normalized,
                    request.confidence_score.as_str(),
                    request.market_rate_source,
                    fingerprint,
                    now.to_rfc3339(),
                    previous.id,
                ],
            )?;

            record_event(conn, "normalization_updated", &previous.id, request, normalized)?;

            SavedNormalization {
                id: previous.id,
                session_id: request.session_id.clone(),
                year: request.year,
                reported_ebitda: request.reported_ebitda,
                adjustments: request.adjustments.clone(),
                custom_adjustments: request.custom_adjustments.clone(),
                total_adjustments: total,
                normalized_ebitda: normalized,
                confidence_score: request.confidence_score,
                market_rate_source: request.market_rate_source.clone(),
                created_at: previous.created_at,
                updated_at: now,
            }
        }
        None => {
            let id = uuid::Uuid::new_v4().to_string();

            conn.execute(
                "INSERT INTO normalizations (
                    id, session_id, year, reported_ebitda, adjustments, custom_adjustments,
                    total_adjustments, normalized_ebitda, confidence_score,
                    market_rate_source, fingerprint, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    id,
                    request.session_id,
                    request.year,
                    request.reported_ebitda,
                    adjustments_json,
                    custom_json,
                    total,
                    normalized,
                    request.confidence_score.as_str(),
                    request.market_rate_source,
                    fingerprint,
                    now.to_rfc3339(),
                    now.to_rfc3339(),
                ],
            )?;

            record_event(conn, "normalization_saved", &id, request, normalized)?;

            SavedNormalization {
                id,
                session_id: request.session_id.clone(),
                year: request.year,
                reported_ebitda: request.reported_ebitda,
                adjustments: request.adjustments.clone(),
                custom_adjustments: request.custom_adjustments.clone(),
                total_adjustments: total,
                normalized_ebitda: normalized,
                confidence_score: request.confidence_score,
                market_rate_source: request.market_rate_source.clone(),
                created_at: now,
                updated_at: now,
            }
        }
    };

    Ok(saved)
}

/// Load the saved normalization for a session and year, if any.
pub fn load_normalization(
    conn: &Connection,
    session_id: &str,
    year: i32,
) -> Result<Option<SavedNormalization>> {
    Ok(load_normalization_row(conn, session_id, year)?.map(|(saved, _)| saved))
}

/// Audit-trail events for one saved normalization, newest first.
pub fn get_save_events(conn: &Connection, normalization_id: &str) -> Result<Vec<SaveEvent>> {
    let mut stmt = conn.prepare(
        "SELECT event_id, timestamp, event_type, normalization_id, data
         FROM events
         WHERE normalization_id = ?1
         ORDER BY timestamp DESC, id DESC",
    )?;

    let events = stmt
        .query_map(params![normalization_id], |row| {
            let timestamp_str: String = row.get(1)?;
            let data_json: String = row.get(4)?;

            Ok(SaveEvent {
                event_id: row.get(0)?,
                timestamp: DateTime::parse_from_rfc3339(&timestamp_str)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|_| rusqlite::Error::InvalidQuery)?,
                event_type: row.get(2)?,
                normalization_id: row.get(3)?,
                data: serde_json::from_str(&data_json)
                    .map_err(|_| rusqlite::Error::InvalidQuery)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(events)
}

// ============================================================================
// INTERNALS
// ============================================================================

fn record_event(
    conn: &Connection,
    event_type: &str,
    normalization_id: &str,
    request: &SaveRequest,
    normalized_ebitda: i64,
) -> Result<()> {
    conn.execute(
        "INSERT INTO events (event_id, timestamp, event_type, normalization_id, data)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            uuid::Uuid::new_v4().to_string(),
            Utc::now().to_rfc3339(),
            event_type,
            normalization_id,
            serde_json::to_string(&serde_json::json!({
                "session_id": request.session_id,
                "year": request.year,
                "normalized_ebitda": normalized_ebitda,
                "confidence_score": request.confidence_score.as_str(),
            }))?,
        ],
    )?;

    Ok(())
}

fn load_normalization_row(
    conn: &Connection,
    session_id: &str,
    year: i32,
) -> Result<Option<(SavedNormalization, String)>> {
    let mut stmt = conn.prepare(
        "SELECT id, session_id, year, reported_ebitda, adjustments, custom_adjustments,
                total_adjustments, normalized_ebitda, confidence_score,
                market_rate_source, fingerprint, created_at, updated_at
         FROM normalizations
         WHERE session_id = ?1 AND year = ?2",
    )?;

    let row = stmt
        .query_row(params![session_id, year], |row| {
            let adjustments_json: String = row.get(4)?;
            let custom_json: String = row.get(5)?;
            let score_str: String = row.get(8)?;
            let fingerprint: String = row.get(10)?;
            let created_str: String = row.get(11)?;
            let updated_str: String = row.get(12)?;

            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i32>(2)?,
                row.get::<_, i64>(3)?,
                adjustments_json,
                custom_json,
                row.get::<_, i64>(6)?,
                row.get::<_, i64>(7)?,
                score_str,
                row.get::<_, Option<String>>(9)?,
                fingerprint,
                created_str,
                updated_str,
            ))
        })
        .optional()?;

    let Some((
        id,
        session_id,
        year,
        reported_ebitda,
        adjustments_json,
        custom_json,
        total_adjustments,
        normalized_ebitda,
        score_str,
        market_rate_source,
        fingerprint,
        created_str,
        updated_str,
    )) = row
    else {
        return Ok(None);
    };

    let saved = SavedNormalization {
        id,
        session_id,
        year,
        reported_ebitda,
        adjustments: serde_json::from_str(&adjustments_json)?,
        custom_adjustments: serde_json::from_str(&custom_json)?,
        total_adjustments,
        normalized_ebitda,
        confidence_score: parse_score(&score_str)?,
        market_rate_source,
        created_at: DateTime::parse_from_rfc3339(&created_str)?.with_timezone(&Utc),
        updated_at: DateTime::parse_from_rfc3339(&updated_str)?.with_timezone(&Utc),
    };

    Ok(Some((saved, fingerprint)))
}

fn parse_score(s: &str) -> Result<OverallScore> {
    match s {
        "poor" => Ok(OverallScore::Poor),
        "acceptable" => Ok(OverallScore::Acceptable),
        "good" => Ok(OverallScore::Good),
        "excellent" => Ok(OverallScore::Excellent),
        other => Err(anyhow::anyhow!("unknown confidence score in store: {}", other)),
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalization::{CustomAdjustment, EbitdaNormalization, FieldEdit};
    use crate::registry::NormalizationCategory;

    fn sample_normalization() -> EbitdaNormalization {
        EbitdaNormalization::new("session-abc", 2024, 1_000_000).apply(
            FieldEdit::SetAdjustment {
                category: NormalizationCategory::OwnerCompensation,
                amount: 70_000,
                note: Some("Owner salary restated to the benchmark market rate".to_string()),
            },
        )
    }

    fn open_store() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        conn
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let conn = open_store();
        let normalization = sample_normalization();
        let request = SaveRequest::from_normalization(&normalization, Some("benchmark-db".to_string()));

        let saved = save_normalization(&conn, &request).unwrap();

        assert!(!saved.id.is_empty());
        assert_eq!(saved.total_adjustments, 70_000);
        assert_eq!(saved.normalized_ebitda, 1_070_000);
        assert_eq!(saved.confidence_score, OverallScore::Excellent);

        let loaded = load_normalization(&conn, "session-abc", 2024).unwrap().unwrap();
        assert_eq!(loaded, saved);
    }

    #[test]
    fn test_unchanged_save_is_idempotent() {
        let conn = open_store();
        let request = SaveRequest::from_normalization(&sample_normalization(), None);

        let first = save_normalization(&conn, &request).unwrap();
        let second = save_normalization(&conn, &request).unwrap();

        // Same row, untouched timestamps, and no second audit event
        assert_eq!(first, second);
        assert_eq!(get_save_events(&conn, &first.id).unwrap().len(), 1);
    }

    #[test]
    fn test_changed_save_updates_in_place() {
        let conn = open_store();
        let normalization = sample_normalization();

        let first =
            save_normalization(&conn, &SaveRequest::from_normalization(&normalization, None))
                .unwrap();

        let edited = normalization.apply(FieldEdit::AddCustom(CustomAdjustment::new(
            "ERP migration consultants",
            15_000,
            None,
        )));
        let second =
            save_normalization(&conn, &SaveRequest::from_normalization(&edited, None)).unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.created_at, first.created_at);
        assert_eq!(second.total_adjustments, 85_000);
        assert_eq!(second.normalized_ebitda, 1_085_000);
        assert_eq!(get_save_events(&conn, &first.id).unwrap().len(), 2);
    }

    #[test]
    fn test_invalid_request_is_rejected_with_api_error() {
        let conn = open_store();
        let normalization = EbitdaNormalization::new("session-abc", 2024, 500_000).apply(
            FieldEdit::SetAdjustment {
                category: NormalizationCategory::PersonalExpenses,
                amount: 150_000, // above the category maximum
                note: None,
            },
        );
        let request = SaveRequest::from_normalization(&normalization, None);

        let err = save_normalization(&conn, &request).unwrap_err();

        assert!(is_recognized_api_error(&err));
        let api_error = err.downcast_ref::<ApiError>().unwrap();
        assert_eq!(api_error.code, "validation_failed");
        assert!(api_error.message.contains("must be between"));

        // Nothing was written
        assert!(load_normalization(&conn, "session-abc", 2024).unwrap().is_none());
    }

    #[test]
    fn test_load_missing_returns_none() {
        let conn = open_store();
        assert!(load_normalization(&conn, "no-such-session", 2024).unwrap().is_none());
    }

    #[test]
    fn test_separate_years_are_separate_rows() {
        let conn = open_store();
        let year_one = sample_normalization();
        let mut year_two = sample_normalization();
        year_two.year = 2023;

        save_normalization(&conn, &SaveRequest::from_normalization(&year_one, None)).unwrap();
        save_normalization(&conn, &SaveRequest::from_normalization(&year_two, None)).unwrap();

        assert!(load_normalization(&conn, "session-abc", 2024).unwrap().is_some());
        assert!(load_normalization(&conn, "session-abc", 2023).unwrap().is_some());
    }
}

// EBITDA Normalization Bridge - API Server
// REST surface for the browser report: categories, validation, save, load

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;

use ebitda_bridge::{
    all_definitions, is_recognized_api_error, load_normalization, save_normalization,
    setup_database, AdjustmentForm, ApiError, EbitdaNormalization, SaveRequest,
    ValidationResult,
};

/// Shared application state
#[derive(Clone)]
struct AppState {
    db: Arc<Mutex<Connection>>,
}

/// API response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ApiError>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }
}

impl ApiResponse<()> {
    fn err(error: ApiError) -> Self {
        Self {
            success: false,
            data: (),
            error: Some(error),
        }
    }
}

/// POST /api/normalization/validate request body
#[derive(Deserialize)]
struct ValidateRequest {
    session_id: String,
    year: i32,
    reported_ebitda: i64,
    #[serde(flatten)]
    form: AdjustmentForm,
}

/// Validation response consumed by the report UI
#[derive(Serialize)]
struct ValidateResponse {
    has_errors: bool,
    has_warnings: bool,
    results: Vec<ValidationResult>,
    overall_score: &'static str,
    score_percent: u8,
    total_adjustments: i64,
    normalized_ebitda: i64,
    ready: bool,
    issues: Vec<String>,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok(ebitda_bridge::VERSION))
}

/// GET /api/categories - The full category taxonomy
async fn get_categories() -> impl IntoResponse {
    Json(ApiResponse::ok(all_definitions()))
}

/// POST /api/normalization/validate - Validate an inbound form
async fn validate_form(Json(request): Json<ValidateRequest>) -> impl IntoResponse {
    let base = EbitdaNormalization::new(&request.session_id, request.year, request.reported_ebitda);
    let (normalization, mut form_errors) = base.apply_form(&request.form);

    let mut validation = normalization.validate();
    if !form_errors.is_empty() {
        form_errors.extend(validation.results);
        validation.results = form_errors;
        validation.has_errors = true;
        validation.overall_score = ebitda_bridge::OverallScore::Poor;
    }

    let verdict = normalization.confidence();

    Json(ApiResponse::ok(ValidateResponse {
        has_errors: validation.has_errors,
        has_warnings: validation.has_warnings,
        results: validation.results,
        overall_score: validation.overall_score.as_str(),
        score_percent: validation.overall_score.as_percent(),
        total_adjustments: normalization.total_adjustments(),
        normalized_ebitda: normalization.normalized_ebitda(),
        ready: verdict.ready,
        issues: verdict.issues,
    }))
}

/// POST /api/normalization - Persist a normalization snapshot
async fn save(State(state): State<AppState>, Json(request): Json<SaveRequest>) -> impl IntoResponse {
    let conn = state.db.lock().unwrap();

    match save_normalization(&conn, &request) {
        Ok(saved) => (StatusCode::OK, Json(ApiResponse::ok(saved))).into_response(),
        Err(err) if is_recognized_api_error(&err) => {
            let api_error = err.downcast_ref::<ApiError>().unwrap().clone();
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ApiResponse::err(api_error)),
            )
                .into_response()
        }
        Err(err) => {
            eprintln!("Error saving normalization: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::err(ApiError {
                    code: "internal_error".to_string(),
                    message: "Failed to save normalization".to_string(),
                })),
            )
                .into_response()
        }
    }
}

/// GET /api/normalization/:session_id/:year - Load a saved normalization
async fn load(
    State(state): State<AppState>,
    Path((session_id, year)): Path<(String, i32)>,
) -> impl IntoResponse {
    let conn = state.db.lock().unwrap();

    match load_normalization(&conn, &session_id, year) {
        Ok(Some(saved)) => (StatusCode::OK, Json(ApiResponse::ok(saved))).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::err(ApiError {
                code: "not_found".to_string(),
                message: format!("No normalization for session {} / {}", session_id, year),
            })),
        )
            .into_response(),
        Err(err) => {
            eprintln!("Error loading normalization: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::err(ApiError {
                    code: "internal_error".to_string(),
                    message: "Failed to load normalization".to_string(),
                })),
            )
                .into_response()
        }
    }
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() {
    println!("🌐 EBITDA Normalization Bridge - API Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let db_path = std::env::var("EBITDA_DB").unwrap_or_else(|_| "ebitda.db".to_string());
    let conn = Connection::open(&db_path).expect("Failed to open database");
    setup_database(&conn).expect("Failed to initialize database");
    println!("✓ Database opened: {}", db_path);

    let state = AppState {
        db: Arc::new(Mutex::new(conn)),
    };

    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/categories", get(get_categories))
        .route("/normalization/validate", post(validate_form))
        .route("/normalization", post(save))
        .route("/normalization/:session_id/:year", get(load))
        .with_state(state.clone());

    let app = Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive());

    let addr = "0.0.0.0:3000";
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    println!("\n🚀 Server running on http://localhost:3000");
    println!("   Categories: http://localhost:3000/api/categories");
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}

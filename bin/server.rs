// Clinic Analytics - Web Server
// JSON dashboard API with Axum

use anyhow::Context;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use chrono::Utc;
use clinic_analytics::{
    init_logging, load_snapshot, setup_database, upcoming_risks, AppConfig, ClinicSnapshot,
    Dashboard, RevenueAggregator, TrendAggregator,
};
use rusqlite::Connection;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;

/// Shared application state
#[derive(Clone)]
struct AppState {
    db: Arc<Mutex<Connection>>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Response {
        (
            StatusCode::OK,
            Json(ApiResponse {
                success: true,
                data: Some(data),
                error: None,
            }),
        )
            .into_response()
    }
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(message.into()),
        }),
    )
        .into_response()
}

/// Load a fresh snapshot for this request
fn snapshot(state: &AppState) -> Result<ClinicSnapshot, Response> {
    let conn = state.db.lock().map_err(|_| {
        tracing::error!("database mutex poisoned");
        error_response(StatusCode::INTERNAL_SERVER_ERROR, "database unavailable")
    })?;

    load_snapshot(&conn).map_err(|e| {
        tracing::error!("Error loading snapshot: {:?}", e);
        error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to load clinic data")
    })
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> Response {
    ApiResponse::ok("OK")
}

/// GET /api/dashboard - Full analytics pass
async fn get_dashboard(State(state): State<AppState>) -> Response {
    let now = Utc::now();
    match snapshot(&state) {
        Ok(snap) => ApiResponse::ok(Dashboard::build(&snap, now)),
        Err(response) => response,
    }
}

/// GET /api/trends - Appointment trends
async fn get_trends(State(state): State<AppState>) -> Response {
    let now = Utc::now();
    match snapshot(&state) {
        Ok(snap) => ApiResponse::ok(TrendAggregator::new().trends(&snap.appointments, now)),
        Err(response) => response,
    }
}

/// GET /api/revenue - Revenue analytics
async fn get_revenue(State(state): State<AppState>) -> Response {
    let now = Utc::now();
    match snapshot(&state) {
        Ok(snap) => ApiResponse::ok(RevenueAggregator::new().revenue(&snap.billing, now)),
        Err(response) => response,
    }
}

/// GET /api/risks - Scheduled appointments at medium/high no-show risk
async fn get_risks(State(state): State<AppState>) -> Response {
    let now = Utc::now();
    match snapshot(&state) {
        Ok(snap) => ApiResponse::ok(upcoming_risks(&snap, now)),
        Err(response) => response,
    }
}

/// GET /api/appointments/:id/risk - Prediction for one appointment
async fn get_appointment_risk(
    State(state): State<AppState>,
    Path(appointment_id): Path<String>,
) -> Response {
    let now = Utc::now();
    let snap = match snapshot(&state) {
        Ok(snap) => snap,
        Err(response) => return response,
    };

    match snap.predict(&appointment_id, now) {
        Some(prediction) => ApiResponse::ok(prediction),
        None => error_response(
            StatusCode::NOT_FOUND,
            format!("appointment {} or its patient not found", appointment_id),
        ),
    }
}

fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/dashboard", get(get_dashboard))
        .route("/trends", get(get_trends))
        .route("/revenue", get(get_revenue))
        .route("/risks", get(get_risks))
        .route("/appointments/:id/risk", get(get_appointment_risk))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let config = AppConfig::from_env();

    let db_path = config.db_path();
    if !db_path.exists() {
        anyhow::bail!(
            "Database not found at {} (run `clinic-analytics import <dir>` first)",
            db_path.display()
        );
    }

    let conn = Connection::open(db_path)
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;
    setup_database(&conn)?;
    tracing::info!("Database opened: {}", db_path.display());

    let state = AppState {
        db: Arc::new(Mutex::new(conn)),
    };

    let listener = tokio::net::TcpListener::bind(config.server_addr())
        .await
        .with_context(|| format!("Failed to bind to {}", config.server_addr()))?;

    tracing::info!("Clinic analytics API listening on http://{}/api", config.server_addr());

    axum::serve(listener, router(state))
        .await
        .context("Server error")?;

    Ok(())
}

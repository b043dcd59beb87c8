//! Health check handlers

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use sentinel_core::ModelState;
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct IndexResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    algorithm: &'static str,
    timestamp: DateTime<Utc>,
}

/// Service banner
pub async fn index() -> Json<IndexResponse> {
    Json(IndexResponse {
        status: "active",
        service: "Log Sentinel ML Service",
        version: env!("CARGO_PKG_VERSION"),
        algorithm: "Isolation Forest",
        timestamp: Utc::now(),
    })
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    model_status: &'static str,
    version: &'static str,
    timestamp: DateTime<Utc>,
}

/// 200 only when a model is loaded and retraining is not blocked
pub async fn check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let model_status = match state.engine.state() {
        ModelState::Untrained => "not_initialized",
        ModelState::Trained if state.coordinator.is_blocked() => "retrain_blocked",
        ModelState::Trained => "ready",
    };

    let (code, status) = if model_status == "ready" {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
    };

    (
        code,
        Json(HealthResponse {
            status,
            model_status,
            version: env!("CARGO_PKG_VERSION"),
            timestamp: Utc::now(),
        }),
    )
}

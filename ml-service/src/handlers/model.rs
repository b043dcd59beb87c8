//! Model info handler

use axum::{extract::State, Json};
use chrono::Utc;
use serde_json::{json, Value};

use crate::AppState;

pub async fn info(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "success",
        "model": state.engine.info(),
        "stored_logs": state.store.len(),
        "timestamp": Utc::now(),
    }))
}

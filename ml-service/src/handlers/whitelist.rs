//! Whitelist handlers

use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use validator::Validate;

use super::{persist_snapshot, ValidatedJson};
use crate::{AppResult, AppState};

const DEFAULT_REASON: &str = "Added by admin";

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WhitelistAction {
    Add,
    Remove,
}

#[derive(Debug, Deserialize, Validate)]
pub struct WhitelistRequest {
    pub action: WhitelistAction,

    #[validate(ip)]
    pub ip: String,

    #[serde(default)]
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

/// Add or remove a trusted IP
pub async fn update(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<WhitelistRequest>,
) -> AppResult<Json<Value>> {
    let response = match req.action {
        WhitelistAction::Add => {
            let reason = req
                .reason
                .as_deref()
                .filter(|r| !r.trim().is_empty())
                .unwrap_or(DEFAULT_REASON);
            let entry = state.coordinator.add_to_whitelist(&req.ip, reason)?;
            json!({
                "status": "success",
                "message": format!("IP {} added to whitelist", entry.ip),
                "data": entry,
            })
        }
        WhitelistAction::Remove => {
            let removed = state.coordinator.remove_from_whitelist(&req.ip);
            json!({
                "status": "success",
                "message": format!("IP {} removed from whitelist", req.ip.trim()),
                "data": { "removed": removed },
            })
        }
    };

    persist_snapshot(&state).await;
    Ok(Json(response))
}

/// Current whitelist entries
pub async fn list(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "success",
        "data": state.coordinator.whitelist().entries(),
    }))
}

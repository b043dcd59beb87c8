//! Feedback handlers

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use sentinel_core::{FeatureVector, FeedbackContext, Label, LogStore};
use serde::Deserialize;
use serde_json::{json, Value};
use validator::Validate;

use super::{persist_snapshot, ValidatedJson};
use crate::{AppResult, AppState};

#[derive(Debug, Deserialize, Validate)]
pub struct FeedbackRequest {
    /// Caller's id for the log; need not be one this service issued
    pub log_id: u64,

    /// Features the caller scored; authoritative when present
    #[serde(default)]
    #[validate(length(equal = 6))]
    pub features: Option<Vec<f64>>,

    #[serde(default)]
    pub original_prediction: Option<String>,

    pub correct_label: String,

    #[serde(default)]
    #[validate(length(max = 2000))]
    pub analyst_notes: Option<String>,

    /// When the analyst reviewed the log; defaults to now
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl FeedbackRequest {
    fn to_context(&self, state: &AppState) -> AppResult<FeedbackContext> {
        let features = self.features.clone().map(FeatureVector::try_from).transpose()?;
        let mut original_prediction =
            self.original_prediction.as_deref().map(str::parse::<Label>).transpose()?;

        // Caller sent a vector without its prediction and the store cannot
        // vouch for it: score it with the active model
        if let (Some(vector), None) = (features, original_prediction) {
            let stored = state.store.scored_log(self.log_id);
            if stored.map_or(true, |log| log.features.values != vector.values) {
                original_prediction = state.engine.score(&vector, None).ok().map(|v| v.label);
            }
        }

        Ok(FeedbackContext {
            features,
            original_prediction,
            notes: self.analyst_notes.clone().unwrap_or_default(),
            submitted_at: self.timestamp,
        })
    }
}

/// Record an analyst correction; retrains once enough have accumulated
pub async fn submit(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<FeedbackRequest>,
) -> AppResult<Json<Value>> {
    let context = req.to_context(&state)?;
    let record = state
        .coordinator
        .submit_with_context(req.log_id, &req.correct_label, context)?;

    let retrained = retrain_if_due(&state).await;

    Ok(Json(json!({
        "status": "success",
        "message": "Feedback recorded",
        "data": {
            "log_id": record.log_id,
            "original_prediction": record.original_prediction,
            "corrected_label": record.corrected_label,
            "submitted_at": record.submitted_at,
            "pending_corrections": state.coordinator.pending_len(),
            "retrained": retrained,
        },
    })))
}

/// Run `maybe_retrain` on the blocking pool and snapshot a new model.
/// Retrain failures leave the corrections pending for the next trigger.
async fn retrain_if_due(state: &AppState) -> bool {
    if state.coordinator.pending_len() < state.coordinator.config().retrain_batch {
        return false;
    }

    let engine = state.engine.clone();
    let coordinator = state.coordinator.clone();
    let samples = state.training_samples();

    let outcome =
        tokio::task::spawn_blocking(move || coordinator.maybe_retrain(&engine, &samples)).await;

    match outcome {
        Ok(Ok(Some(model))) => {
            tracing::info!("Model retrained from feedback (threshold {:.4})", model.threshold());
            persist_snapshot(state).await;
            true
        }
        Ok(Ok(None)) => false,
        Ok(Err(e)) => {
            tracing::warn!("Retrain failed, corrections kept: {}", e);
            false
        }
        Err(e) => {
            tracing::error!("Retrain task panicked: {}", e);
            false
        }
    }
}

/// Feedback and retraining counters
pub async fn stats(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "success",
        "data": state.coordinator.stats(),
        "retrain_blocked": state.coordinator.is_blocked(),
    }))
}

//! Prediction handlers

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use sentinel_core::{Explanation, Label, LogEvent, RequestWindow, ScoredLog, ThreatLevel};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use validator::Validate;

use super::ValidatedJson;
use crate::{AppError, AppResult, AppState};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PredictRequest {
    /// Dashboard's own id for this log; assigned by the service when absent
    #[serde(default)]
    pub log_id: Option<u64>,

    #[validate(ip)]
    pub ip_address: String,

    #[validate(length(min = 1, max = 16))]
    pub method: String,

    #[validate(length(min = 1, max = 8192))]
    pub url: String,

    #[validate(range(min = 100, max = 599))]
    pub status_code: u16,

    #[serde(default)]
    pub user_agent: Option<String>,

    /// Milliseconds
    #[serde(default = "default_response_time")]
    #[validate(range(min = 0.0))]
    pub response_time: f64,

    /// Event time for replayed logs; defaults to now
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Assumed when the access log carried no timing
fn default_response_time() -> f64 {
    100.0
}

impl PredictRequest {
    fn to_event(&self) -> LogEvent {
        let mut event = LogEvent::new(
            self.ip_address.trim(),
            &self.method,
            self.url.clone(),
            self.status_code,
            self.response_time,
        );
        if let Some(ua) = &self.user_agent {
            event = event.with_user_agent(ua.clone());
        }
        if let Some(at) = self.timestamp {
            event = event.with_timestamp(at);
        }
        event
    }
}

#[derive(Debug, Serialize)]
pub struct Prediction {
    pub log_id: u64,
    pub prediction: String,
    pub threat_level: ThreatLevel,
    pub severity_score: f64,
    pub confidence: f64,
    pub anomaly_score: f64,
    pub timestamp: DateTime<Utc>,
    /// Anomalies only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<Explanation>,
}

impl Prediction {
    fn new(state: &AppState, log: &ScoredLog) -> Self {
        let is_anomaly = log.prediction == Label::Anomaly;
        let explanation = if is_anomaly {
            state.engine.explain(&log.features).ok()
        } else {
            None
        };

        Self {
            log_id: log.id,
            prediction: log.prediction.to_string(),
            threat_level: ThreatLevel::from_confidence(is_anomaly, log.confidence_score),
            severity_score: round_to(log.severity_score, 2),
            confidence: round_to(log.confidence_score, 4),
            anomaly_score: round_to(log.anomaly_score, 4),
            timestamp: log.scored_at,
            explanation,
        }
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Record the request, score it and store the result
fn score_request(state: &AppState, req: &PredictRequest) -> AppResult<ScoredLog> {
    let event = req.to_event();
    event.validate()?;

    state.store.record_request(&event.ip_address, event.timestamp);
    let recent = state.store.requests_in_window(&event.ip_address, event.timestamp);

    let (features, verdict) = state.engine.score_event(&event, recent)?;
    let id = req.log_id.unwrap_or_else(|| state.store.next_id());

    let log = ScoredLog {
        id,
        event,
        features,
        prediction: verdict.label,
        anomaly_score: verdict.anomaly_score,
        severity_score: verdict.severity,
        confidence_score: verdict.confidence,
        scored_at: Utc::now(),
        correction: None,
    };
    state.store.insert(log.clone());

    Ok(log)
}

/// Score a single log event
pub async fn predict(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<PredictRequest>,
) -> AppResult<Json<Value>> {
    let log = score_request(&state, &req)?;
    let prediction = Prediction::new(&state, &log);

    if let Some(explanation) = &prediction.explanation {
        tracing::info!(
            "Anomaly: {} {} {} (severity {:.1}, {:?}) - {}",
            log.event.ip_address,
            log.event.method,
            log.event.url,
            log.severity_score,
            prediction.threat_level,
            explanation.summary
        );
        tracing::debug!("Anomalous features: {}", log.features.to_log_entry());
    }

    Ok(Json(json!({
        "status": "success",
        "data": prediction,
        "input_data": {
            "ip_address": log.event.ip_address,
            "method": log.event.method,
            "url": log.event.url,
            "status_code": log.event.status_code,
        },
    })))
}

#[derive(Debug, Deserialize, Validate)]
pub struct BatchRequest {
    #[serde(default)]
    pub logs: Vec<Value>,
}

#[derive(Debug, Default, Serialize)]
pub struct BatchSummary {
    pub total_processed: usize,
    pub total_normal: usize,
    pub total_anomaly: usize,
    /// Percent
    pub anomaly_rate: f64,
}

/// Score many log events; a bad entry yields a per-entry error
pub async fn predict_batch(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<BatchRequest>,
) -> AppResult<Json<Value>> {
    if req.logs.is_empty() {
        return Err(AppError::ValidationError("logs must not be empty".to_string()));
    }

    let mut summary = BatchSummary {
        total_processed: req.logs.len(),
        ..Default::default()
    };

    let results: Vec<Value> = req
        .logs
        .into_iter()
        .map(|input| {
            let scored = serde_json::from_value::<PredictRequest>(input.clone())
                .map_err(|e| AppError::ValidationError(e.to_string()))
                .and_then(|r| {
                    r.validate()?;
                    score_request(&state, &r)
                });

            match scored {
                Ok(log) => {
                    if log.prediction == Label::Anomaly {
                        summary.total_anomaly += 1;
                    } else {
                        summary.total_normal += 1;
                    }
                    json!({ "input": input, "result": Prediction::new(&state, &log) })
                }
                Err(e) => json!({ "input": input, "error": e.message() }),
            }
        })
        .collect();

    let rate = summary.total_anomaly as f64 / summary.total_processed as f64 * 100.0;
    summary.anomaly_rate = round_to(rate, 2);

    Ok(Json(json!({
        "status": "success",
        "results": results,
        "summary": summary,
        "timestamp": Utc::now(),
    })))
}

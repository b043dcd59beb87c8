use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use sentinel_core::LogStore;
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::config::Config;
use crate::{bootstrap, create_router, AppState};

fn untrained_state() -> AppState {
    let config = Config {
        num_trees: 25,
        bootstrap_samples: 300,
        retrain_batch: 2,
        snapshot_path: None,
        ..Config::default()
    };
    AppState::new(config).unwrap()
}

fn test_state() -> AppState {
    let state = untrained_state();
    bootstrap::initialize_model(&state.engine, &state.corpus, None).unwrap();
    state
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

async fn get(state: &AppState, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(create_router(state.clone()), request).await
}

async fn post(state: &AppState, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(create_router(state.clone()), request).await
}

fn ordinary_log(ip: &str) -> Value {
    json!({
        "ip_address": ip,
        "method": "GET",
        "url": "/products?q=shoes",
        "status_code": 200,
        "user_agent": "Mozilla/5.0",
        "response_time": 180.0,
    })
}

fn attack_log(ip: &str) -> Value {
    json!({
        "ip_address": ip,
        "method": "POST",
        "url": format!("/wp-admin/admin-ajax.php?action={}", "A".repeat(400)),
        "status_code": 503,
        "user_agent": "sqlmap/1.7",
        "response_time": 9500.0,
    })
}

#[tokio::test]
async fn test_index_banner() {
    let (status, body) = get(&test_state(), "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["algorithm"], "Isolation Forest");
}

#[tokio::test]
async fn test_health_reflects_model_state() {
    let (status, body) = get(&untrained_state(), "/health").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["model_status"], "not_initialized");

    let (status, body) = get(&test_state(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["model_status"], "ready");
}

#[tokio::test]
async fn test_predict_contract() {
    let state = test_state();
    let (status, body) = post(&state, "/predict", ordinary_log("192.168.1.20")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");

    let data = &body["data"];
    let prediction = data["prediction"].as_str().unwrap();
    assert!(prediction == "normal" || prediction == "anomaly");
    let severity = data["severity_score"].as_f64().unwrap();
    assert!((0.0..=100.0).contains(&severity));
    let confidence = data["confidence"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&confidence));
    assert_eq!(data["log_id"], 1);
    assert_eq!(state.store.len(), 1);
}

#[tokio::test]
async fn test_predict_flags_attack() {
    let state = test_state();
    let (_, body) = post(&state, "/predict", attack_log("45.33.32.156")).await;
    let data = &body["data"];
    assert_eq!(data["prediction"], "anomaly");
    assert_ne!(data["threat_level"], "normal");

    let contributions = data["explanation"]["contributions"].as_array().unwrap();
    assert_eq!(contributions.len(), 6);
    assert!(data["explanation"]["summary"].is_string());
}

#[tokio::test]
async fn test_predict_counts_current_request() {
    let state = test_state();
    for _ in 0..3 {
        post(&state, "/predict", ordinary_log("10.9.9.9")).await;
    }
    let mut keyed = ordinary_log("10.9.9.9");
    keyed["log_id"] = json!(500);
    let (_, body) = post(&state, "/predict", keyed).await;
    assert_eq!(body["data"]["log_id"], 500);

    let log = state.store.scored_log(500).unwrap();
    assert_eq!(log.features.get_by_name("requests_last_hour"), Some(4.0));
}

#[tokio::test]
async fn test_predict_missing_response_time_defaults() {
    let state = test_state();
    let mut untimed = ordinary_log("10.0.0.3");
    untimed.as_object_mut().unwrap().remove("response_time");

    let (status, body) = post(&state, "/predict", untimed).await;
    assert_eq!(status, StatusCode::OK);

    let log_id = body["data"]["log_id"].as_u64().unwrap();
    let log = state.store.scored_log(log_id).unwrap();
    assert_eq!(log.event.response_time, 100.0);
    assert_eq!(log.features.get_by_name("response_time_ms"), Some(100.0));
}

#[tokio::test]
async fn test_predict_rejects_bad_input() {
    let state = test_state();

    let (status, body) = post(&state, "/predict", ordinary_log("not-an-ip")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");

    let mut bad_status = ordinary_log("10.0.0.1");
    bad_status["status_code"] = json!(42);
    let (status, _) = post(&state, "/predict", bad_status).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = post(&state, "/predict", json!({ "ip_address": "10.0.0.1" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
    assert_eq!(state.store.len(), 0);
}

#[tokio::test]
async fn test_predict_untrained_is_unavailable() {
    let state = untrained_state();
    let (status, body) = post(&state, "/predict", ordinary_log("10.0.0.1")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn test_whitelisted_ip_bypasses_model() {
    let state = test_state();
    let (status, _) = post(
        &state,
        "/whitelist",
        json!({ "action": "add", "ip": "45.33.32.156", "reason": "scheduled pentest" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = post(&state, "/predict", attack_log("45.33.32.156")).await;
    assert_eq!(body["data"]["prediction"], "normal");
    assert_eq!(body["data"]["severity_score"], 0.0);
    assert_eq!(body["data"]["threat_level"], "normal");
    assert!(body["data"].get("explanation").is_none());
}

#[tokio::test]
async fn test_whitelist_add_remove_idempotent() {
    let state = test_state();
    let add = json!({ "action": "add", "ip": "10.0.0.7" });

    post(&state, "/whitelist", add.clone()).await;
    let (_, body) = post(&state, "/whitelist", add).await;
    assert_eq!(body["data"]["reason"], "Added by admin");
    assert_eq!(state.engine.whitelist().len(), 1);

    let remove = json!({ "action": "remove", "ip": "10.0.0.7" });
    let (_, body) = post(&state, "/whitelist", remove.clone()).await;
    assert_eq!(body["data"]["removed"], true);
    let (status, body) = post(&state, "/whitelist", remove).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["removed"], false);

    let block = json!({ "action": "block", "ip": "10.0.0.7" });
    let (status, _) = post(&state, "/whitelist", block).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_feedback_unknown_log() {
    let state = test_state();
    let feedback = json!({ "log_id": 999, "correct_label": "normal" });
    let (status, body) = post(&state, "/feedback", feedback).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], "error");
    assert_eq!(state.coordinator.pending_len(), 0);
}

#[tokio::test]
async fn test_feedback_uses_caller_features_over_service_ids() {
    let state = test_state();
    post(&state, "/predict", attack_log("45.33.32.156")).await;
    post(&state, "/predict", ordinary_log("10.0.0.1")).await;

    // The caller's row 2 is the attack, not the service's log #2
    let attack = [9.5, 1.0, 9500.0, 503.0, 440.0, 1.0];
    let feedback = json!({
        "log_id": 2,
        "features": attack,
        "original_prediction": "anomaly",
        "correct_label": "normal",
        "timestamp": "2026-01-05T10:00:00Z",
    });
    let (status, body) = post(&state, "/feedback", feedback).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["original_prediction"], "anomaly");
    assert_eq!(body["data"]["submitted_at"], "2026-01-05T10:00:00Z");
    assert_eq!(state.coordinator.pending()[0].features.values, attack);
    assert_eq!(state.coordinator.stats().false_positives, 1);
    assert!(state.store.scored_log(2).unwrap().correction.is_none());
}

#[tokio::test]
async fn test_feedback_for_log_the_service_never_issued() {
    let state = test_state();
    let feedback = json!({
        "log_id": 8812,
        "features": [0.18, 0.0, 180.0, 200.0, 17.0, 1.0],
        "original_prediction": "normal",
        "correct_label": "anomaly",
    });
    let (status, body) = post(&state, "/feedback", feedback).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["log_id"], 8812);
    assert_eq!(state.coordinator.stats().false_negatives, 1);

    // Without the prediction the service scores the sent vector itself
    let unlabeled = json!({
        "log_id": 8813,
        "features": [9.5, 1.0, 9500.0, 503.0, 440.0, 30.0],
        "correct_label": "normal",
    });
    let (status, body) = post(&state, "/feedback", unlabeled).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["original_prediction"], "anomaly");

    let bad = json!({ "log_id": 8814, "features": [1.0, 2.0], "correct_label": "normal" });
    let (status, _) = post(&state, "/feedback", bad).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(state.coordinator.stats().total_submitted, 2);
}

#[tokio::test]
async fn test_feedback_invalid_label() {
    let state = test_state();
    post(&state, "/predict", ordinary_log("10.0.0.1")).await;

    let feedback = json!({ "log_id": 1, "correct_label": "maybe" });
    let (status, _) = post(&state, "/feedback", feedback).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(state.coordinator.pending_len(), 0);
}

#[tokio::test]
async fn test_feedback_triggers_retrain_at_batch() {
    let state = test_state();
    post(&state, "/predict", attack_log("45.33.32.156")).await;
    post(&state, "/predict", ordinary_log("10.0.0.1")).await;
    let generation = state.engine.generation();

    let (status, body) = post(
        &state,
        "/feedback",
        json!({
            "log_id": 1,
            "features": [9.5, 1.0, 9500.0, 503.0, 432.0, 1.0],
            "original_prediction": "anomaly",
            "correct_label": "normal",
            "analyst_notes": "load test",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["pending_corrections"], 1);
    assert_eq!(body["data"]["retrained"], false);

    let feedback = json!({ "log_id": 2, "correct_label": "normal" });
    let (_, body) = post(&state, "/feedback", feedback).await;
    assert_eq!(body["data"]["retrained"], true);
    assert_eq!(body["data"]["pending_corrections"], 0);
    assert_eq!(state.engine.generation(), generation + 1);

    let (_, body) = get(&state, "/feedback/stats").await;
    assert_eq!(body["data"]["total_submitted"], 2);
    assert_eq!(body["data"]["retrains"], 1);
    assert_eq!(body["retrain_blocked"], false);
}

#[tokio::test]
async fn test_predict_batch() {
    let state = test_state();

    let (status, _) = post(&state, "/predict/batch", json!({ "logs": [] })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let logs = json!({
        "logs": [ordinary_log("10.0.0.1"), attack_log("45.33.32.156"), { "ip_address": "10.0.0.2" }]
    });
    let (status, body) = post(&state, "/predict/batch", logs).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"]["total_processed"], 3);
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 3);
    assert!(results[2]["error"].is_string());
    let summary = &body["summary"];
    let count = |key: &str| summary[key].as_u64().unwrap();
    assert_eq!(count("total_normal") + count("total_anomaly"), 2);
}

#[tokio::test]
async fn test_model_info() {
    let state = test_state();
    let (status, body) = get(&state, "/model/info").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model"]["algorithm"], "Isolation Forest");
    assert_eq!(body["model"]["num_trees"], 25);
    assert_eq!(body["model"]["state"], "trained");
    assert_eq!(body["model"]["layout"]["feature_names"].as_array().unwrap().len(), 6);
}

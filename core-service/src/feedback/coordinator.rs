//! Feedback Coordinator - Human-in-the-loop retraining
//!
//! Buffers analyst corrections and turns them into a retrain once enough
//! have piled up. The pending buffer has its own lock, independent of the
//! model handle, so feedback ingestion never blocks scoring.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::record::{FeedbackRecord, Label, LogStore};
use super::whitelist::{Whitelist, WhitelistEntry};
use crate::constants::{DEFAULT_MAX_RETRAIN_FAILURES, DEFAULT_RETRAIN_BATCH};
use crate::engine::Engine;
use crate::error::{EngineError, Result};
use crate::features::FeatureVector;
use crate::model::IsolationForest;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Pending corrections needed before `maybe_retrain` fires
    pub retrain_batch: usize,

    /// Consecutive failures after which retraining is reported as blocked
    pub max_retrain_failures: u32,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            retrain_batch: DEFAULT_RETRAIN_BATCH,
            max_retrain_failures: DEFAULT_MAX_RETRAIN_FAILURES,
        }
    }
}

/// Feedback and retraining counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackStats {
    pub total_submitted: u64,
    pub pending: usize,
    pub labeled_normal: u64,
    pub labeled_anomaly: u64,
    pub false_positives: u64,
    pub false_negatives: u64,
    pub retrains: u64,
    pub failed_retrains: u64,
    pub consecutive_failures: u32,
    pub last_retrain_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

/// What the caller knows about the corrected log
#[derive(Debug, Clone, Default)]
pub struct FeedbackContext {
    /// Feature vector the caller scored; authoritative when present
    pub features: Option<FeatureVector>,
    pub original_prediction: Option<Label>,
    pub notes: String,
    pub submitted_at: Option<DateTime<Utc>>,
}

pub struct FeedbackCoordinator {
    store: Arc<dyn LogStore>,
    whitelist: Arc<Whitelist>,
    pending: Mutex<Vec<FeedbackRecord>>,
    /// Held for the whole retrain so two triggers never race
    retrain_lock: Mutex<()>,
    stats: Mutex<FeedbackStats>,
    config: CoordinatorConfig,
}

impl FeedbackCoordinator {
    pub fn new(
        store: Arc<dyn LogStore>,
        whitelist: Arc<Whitelist>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            store,
            whitelist,
            pending: Mutex::new(Vec::new()),
            retrain_lock: Mutex::new(()),
            stats: Mutex::new(FeedbackStats::default()),
            config,
        }
    }

    /// Record an analyst correction for a log this store scored. Does not retrain.
    pub fn submit_feedback(
        &self,
        log_id: u64,
        corrected_label: &str,
        notes: &str,
    ) -> Result<FeedbackRecord> {
        let context = FeedbackContext { notes: notes.to_string(), ..Default::default() };
        self.submit_with_context(log_id, corrected_label, context)
    }

    /// Record an analyst correction. Values in `context` win over the
    /// store; the store only fills what the caller left out.
    pub fn submit_with_context(
        &self,
        log_id: u64,
        corrected_label: &str,
        context: FeedbackContext,
    ) -> Result<FeedbackRecord> {
        let corrected: Label = corrected_label.parse()?;
        if let Some(features) = &context.features {
            features.validate()?;
        }

        // Ids are assigned by whoever keyed the log; a stored log with the
        // same id but other features is a different event
        let stored = self
            .store
            .scored_log(log_id)
            .filter(|log| context.features.map_or(true, |f| f.values == log.features.values));

        let features = context
            .features
            .or_else(|| stored.as_ref().map(|log| log.features))
            .ok_or(EngineError::UnknownLog(log_id))?;
        let original_prediction = context
            .original_prediction
            .or_else(|| stored.as_ref().map(|log| log.prediction))
            .ok_or_else(|| {
                EngineError::InvalidEvent(format!("prediction for log {} is unknown", log_id))
            })?;

        let record = FeedbackRecord {
            log_id,
            features,
            original_prediction,
            corrected_label: corrected,
            notes: context.notes,
            submitted_at: context.submitted_at.unwrap_or_else(Utc::now),
        };

        if stored.is_some() {
            self.store.record_correction(log_id, corrected, record.submitted_at);
        } else {
            log::debug!("Log #{} is not in the store, using caller features", log_id);
        }
        self.pending.lock().push(record.clone());

        {
            let mut stats = self.stats.lock();
            stats.total_submitted += 1;
            match corrected {
                Label::Normal => stats.labeled_normal += 1,
                Label::Anomaly => stats.labeled_anomaly += 1,
            }
            if record.is_false_positive() {
                stats.false_positives += 1;
            } else if record.is_false_negative() {
                stats.false_negatives += 1;
            }
        }

        log::info!(
            "Feedback for log #{}: {} -> {}",
            log_id,
            record.original_prediction,
            record.corrected_label
        );

        Ok(record)
    }

    /// Retrain once the pending buffer reaches `retrain_batch`
    pub fn maybe_retrain(
        &self,
        engine: &Engine,
        samples: &[FeatureVector],
    ) -> Result<Option<Arc<IsolationForest>>> {
        if self.pending_len() < self.config.retrain_batch {
            return Ok(None);
        }
        self.retrain_now(engine, samples)
    }

    /// Retrain with whatever is pending. Returns `Ok(None)` if another
    /// retrain is already running.
    pub fn retrain_now(
        &self,
        engine: &Engine,
        samples: &[FeatureVector],
    ) -> Result<Option<Arc<IsolationForest>>> {
        let Some(_guard) = self.retrain_lock.try_lock() else {
            log::debug!("Retrain already in progress, skipping trigger");
            return Ok(None);
        };

        let batch = self.pending.lock().clone();

        match engine.retrain(samples, &batch) {
            Ok(model) => {
                // Only this batch is consumed; feedback that arrived meanwhile stays
                self.pending.lock().drain(..batch.len());

                let mut stats = self.stats.lock();
                stats.retrains += 1;
                stats.consecutive_failures = 0;
                stats.last_retrain_at = Some(Utc::now());
                stats.last_error = None;

                log::info!("Retrain consumed {} corrections", batch.len());
                Ok(Some(model))
            }
            Err(e) => {
                let mut stats = self.stats.lock();
                stats.failed_retrains += 1;
                stats.consecutive_failures += 1;
                stats.last_error = Some(e.to_string());

                log::warn!(
                    "Retrain failed ({} in a row), keeping {} corrections for retry: {}",
                    stats.consecutive_failures,
                    batch.len(),
                    e
                );
                Err(e)
            }
        }
    }

    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn pending(&self) -> Vec<FeedbackRecord> {
        self.pending.lock().clone()
    }

    pub fn stats(&self) -> FeedbackStats {
        let mut stats = self.stats.lock().clone();
        stats.pending = self.pending_len();
        stats
    }

    /// Too many consecutive retrain failures
    pub fn is_blocked(&self) -> bool {
        self.stats.lock().consecutive_failures >= self.config.max_retrain_failures
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn add_to_whitelist(&self, ip: &str, reason: &str) -> Result<WhitelistEntry> {
        if ip.trim().is_empty() {
            return Err(EngineError::InvalidEvent("ip is empty".to_string()));
        }
        let entry = self.whitelist.add(ip, reason);
        log::info!("IP {} whitelisted: {}", entry.ip, entry.reason);
        Ok(entry)
    }

    /// Returns whether the IP was present
    pub fn remove_from_whitelist(&self, ip: &str) -> bool {
        let removed = self.whitelist.remove(ip).is_some();
        if removed {
            log::info!("IP {} removed from whitelist", ip.trim());
        }
        removed
    }

    pub fn whitelist(&self) -> &Arc<Whitelist> {
        &self.whitelist
    }
}

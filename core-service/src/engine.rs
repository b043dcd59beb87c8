//! Scoring Engine
//!
//! Owns the active model (behind a `ModelHandle`) and reads the shared
//! whitelist. `score` is read-only and can run from any number of threads;
//! `train`/`retrain` build a new forest off to the side and swap it in.

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::features::{self, FeatureVector, LayoutInfo, LogEvent};
use crate::feedback::{FeedbackRecord, Label, Whitelist};
use crate::model::explain::{self, Explanation};
use crate::model::snapshot::{load_snapshot, save_snapshot, ModelSnapshot};
use crate::model::threshold::correction_shift;
use crate::model::{
    ForestConfig, IsolationForest, ModelHandle, ModelState, RetrainConfig, ThreatLevel,
    TrainingSummary,
};

/// Classification of one vector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub label: Label,
    pub anomaly_score: f64,
    /// 0-100
    pub severity: f64,
    /// 0-1
    pub confidence: f64,
    /// Source IP was whitelisted; the model was not consulted
    pub whitelisted: bool,
}

impl Verdict {
    fn whitelisted() -> Self {
        Self {
            label: Label::Normal,
            anomaly_score: 0.0,
            severity: 0.0,
            confidence: 1.0,
            whitelisted: true,
        }
    }

    pub fn is_anomaly(&self) -> bool {
        self.label == Label::Anomaly
    }

    pub fn threat_level(&self) -> ThreatLevel {
        ThreatLevel::from_confidence(self.is_anomaly(), self.confidence)
    }
}

/// Model metadata for status endpoints
#[derive(Debug, Clone, Serialize)]
pub struct EngineInfo {
    pub algorithm: &'static str,
    pub state: ModelState,
    pub generation: u64,
    pub num_trees: usize,
    pub subsample_size: Option<usize>,
    pub contamination: f64,
    pub threshold: Option<f64>,
    pub training: Option<TrainingSummary>,
    pub layout: LayoutInfo,
    pub whitelist_size: usize,
}

pub struct Engine {
    model: ModelHandle,
    whitelist: Arc<Whitelist>,
    forest_config: ForestConfig,
    retrain_config: RetrainConfig,
    /// Serializes snapshot writers; they share one temp file
    snapshot_lock: Mutex<()>,
}

impl Engine {
    pub fn new(forest_config: ForestConfig, retrain_config: RetrainConfig) -> Result<Self> {
        forest_config.validate()?;
        retrain_config.validate()?;
        Ok(Self {
            model: ModelHandle::new(),
            whitelist: Arc::new(Whitelist::new()),
            forest_config,
            retrain_config,
            snapshot_lock: Mutex::new(()),
        })
    }

    /// Share an existing whitelist (e.g. the coordinator's)
    pub fn with_whitelist(mut self, whitelist: Arc<Whitelist>) -> Self {
        self.whitelist = whitelist;
        self
    }

    pub fn whitelist(&self) -> &Arc<Whitelist> {
        &self.whitelist
    }

    pub fn forest_config(&self) -> &ForestConfig {
        &self.forest_config
    }

    pub fn retrain_config(&self) -> &RetrainConfig {
        &self.retrain_config
    }

    pub fn state(&self) -> ModelState {
        self.model.state()
    }

    pub fn current_model(&self) -> Option<Arc<IsolationForest>> {
        self.model.load()
    }

    /// Number of models installed so far
    pub fn generation(&self) -> u64 {
        self.model.generation()
    }

    /// Initial training: untrained → trained
    pub fn train(&self, samples: &[FeatureVector]) -> Result<Arc<IsolationForest>> {
        let forest = IsolationForest::train(samples, &self.forest_config)?;
        Ok(self.install(forest))
    }

    /// Build a fresh forest from `samples` and move its threshold by the
    /// analyst corrections, on top of the shift the active model already
    /// carries. The active model is only replaced on success.
    pub fn retrain(
        &self,
        samples: &[FeatureVector],
        corrections: &[FeedbackRecord],
    ) -> Result<Arc<IsolationForest>> {
        let pool = self.training_pool(samples, corrections);
        if pool.is_empty() {
            return Err(EngineError::InsufficientData { required: 1, available: 0 });
        }

        let carried = self.model.load().map_or(0.0, |m| m.summary().threshold_shift);
        let shift = carried + correction_shift(corrections, self.retrain_config.threshold_step);
        let forest =
            IsolationForest::train(&pool, &self.forest_config)?.with_threshold_shift(shift);

        log::info!(
            "Retrained on {} samples with {} corrections (threshold {:.4}, shift {:+.4})",
            pool.len(),
            corrections.len(),
            forest.threshold(),
            forest.summary().threshold_shift
        );

        Ok(self.install(forest))
    }

    /// With `correction_copies > 0`, confirmed false positives are repeated in
    /// the pool (denser → longer paths) and confirmed false negatives dropped.
    fn training_pool(
        &self,
        samples: &[FeatureVector],
        corrections: &[FeedbackRecord],
    ) -> Vec<FeatureVector> {
        let copies = self.retrain_config.correction_copies;
        if copies == 0 {
            return samples.to_vec();
        }

        let confirmed_anomalies: Vec<&FeatureVector> = corrections
            .iter()
            .filter(|c| c.is_false_negative())
            .map(|c| &c.features)
            .collect();

        let mut pool: Vec<FeatureVector> = samples
            .iter()
            .filter(|s| !confirmed_anomalies.contains(s))
            .copied()
            .collect();

        for correction in corrections.iter().filter(|c| c.is_false_positive()) {
            pool.extend(std::iter::repeat(correction.features).take(copies));
        }
        pool
    }

    /// Swap in a fully built model
    pub fn install(&self, forest: IsolationForest) -> Arc<IsolationForest> {
        let forest = Arc::new(forest);
        self.model.swap(Arc::clone(&forest));
        log::info!("Model generation {} installed", self.model.generation());
        forest
    }

    /// Score a feature vector. A whitelisted `source_ip` short-circuits to
    /// normal with severity 0.
    pub fn score(&self, vector: &FeatureVector, source_ip: Option<&str>) -> Result<Verdict> {
        vector.validate()?;

        if let Some(ip) = source_ip {
            if self.whitelist.contains(ip) {
                log::debug!("{} is whitelisted, skipping model", ip);
                return Ok(Verdict::whitelisted());
            }
        }

        let model = self.model.load().ok_or(EngineError::ModelNotTrained)?;
        let scores = model.score(vector);

        Ok(Verdict {
            label: Label::from_anomaly(scores.is_anomaly),
            anomaly_score: scores.anomaly_score,
            severity: scores.severity,
            confidence: scores.confidence,
            whitelisted: false,
        })
    }

    /// Build features for `event` and score them
    pub fn score_event(
        &self,
        event: &LogEvent,
        requests_last_hour: u64,
    ) -> Result<(FeatureVector, Verdict)> {
        let vector = features::build(event, requests_last_hour)?;
        let verdict = self.score(&vector, Some(event.ip_address.as_str()))?;

        log::debug!(
            "{} {} {} from {} -> {} (score {:.4})",
            event.method,
            event.url,
            event.status_code,
            event.ip_address,
            verdict.label,
            verdict.anomaly_score
        );

        Ok((vector, verdict))
    }

    /// Which features isolated `vector` under the active model
    pub fn explain(&self, vector: &FeatureVector) -> Result<Explanation> {
        vector.validate()?;
        let model = self.model.load().ok_or(EngineError::ModelNotTrained)?;
        Ok(explain::explain(&model, vector))
    }

    pub fn info(&self) -> EngineInfo {
        let model = self.model.load();
        EngineInfo {
            algorithm: "Isolation Forest",
            state: self.state(),
            generation: self.generation(),
            num_trees: self.forest_config.num_trees,
            subsample_size: model.as_ref().map(|m| m.subsample_size()),
            contamination: self.forest_config.contamination,
            threshold: model.as_ref().map(|m| m.threshold()),
            training: model.as_ref().map(|m| m.summary().clone()),
            layout: LayoutInfo::current(),
            whitelist_size: self.whitelist.len(),
        }
    }

    /// Persist the active model and the whitelist
    pub fn save_snapshot(&self, path: &Path) -> Result<()> {
        let model = self.model.load().ok_or(EngineError::ModelNotTrained)?;
        let _guard = self.snapshot_lock.lock();
        let snapshot = ModelSnapshot::new((*model).clone(), self.whitelist.entries());
        save_snapshot(&snapshot, path)
    }

    /// Load a snapshot and make it the active model
    pub fn restore_snapshot(&self, path: &Path) -> Result<Arc<IsolationForest>> {
        let snapshot = load_snapshot(path)?;
        self.whitelist.replace_all(snapshot.whitelist);
        Ok(self.install(snapshot.forest))
    }
}

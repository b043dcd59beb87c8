//! Isolation Forest
//!
//! An immutable trained ensemble: once `train` returns, nothing mutates the
//! trees. Retraining builds a new value and the engine swaps it in.
//!
//! # References
//!
//! Liu, F. T., Ting, K. M., & Zhou, Z. H. (2008). Isolation forest.
//! In 2008 Eighth IEEE International Conference on Data Mining (pp. 413-422).

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use super::config::ForestConfig;
use super::threshold::{clamp_threshold, confidence, contamination_threshold};
use super::tree::{average_path_length, IsolationTree};
use crate::error::{EngineError, Result};
use crate::features::FeatureVector;

/// Output of scoring one vector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scores {
    /// 2^(-E[h(x)] / c(psi)), in (0, 1]; closer to 1 means isolated faster
    pub anomaly_score: f64,
    /// anomaly_score scaled to 0-100
    pub severity: f64,
    pub is_anomaly: bool,
    pub confidence: f64,
}

/// Score distribution over the training sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub samples: usize,
    /// Training samples at or above the contamination threshold
    pub flagged: usize,
    pub min_score: f64,
    pub max_score: f64,
    pub mean_score: f64,
    /// Threshold derived from contamination alone
    pub base_threshold: f64,
    /// Net analyst adjustment applied on top of `base_threshold`
    pub threshold_shift: f64,
    pub trained_at: DateTime<Utc>,
}

impl TrainingSummary {
    fn from_scores(scores: &[f64], threshold: f64) -> Self {
        let n = scores.len().max(1) as f64;
        Self {
            samples: scores.len(),
            flagged: scores.iter().filter(|&&s| s >= threshold).count(),
            min_score: scores.iter().copied().fold(f64::INFINITY, f64::min),
            max_score: scores.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            mean_score: scores.iter().sum::<f64>() / n,
            base_threshold: threshold,
            threshold_shift: 0.0,
            trained_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolationForest {
    trees: Vec<IsolationTree>,
    config: ForestConfig,
    subsample_size: usize,
    threshold: f64,
    summary: TrainingSummary,
}

impl IsolationForest {
    /// Build `num_trees` trees over bootstrap subsamples of `samples` and
    /// derive the decision threshold from `contamination`.
    pub fn train(samples: &[FeatureVector], config: &ForestConfig) -> Result<Self> {
        config.validate()?;

        if samples.is_empty() {
            return Err(EngineError::InsufficientData { required: 1, available: 0 });
        }
        for sample in samples {
            sample.validate()?;
        }

        let subsample_size = config.effective_subsample(samples.len())?;
        let mut rng = StdRng::seed_from_u64(config.seed);

        let trees = (0..config.num_trees)
            .map(|_| IsolationTree::build(samples, subsample_size, &mut rng))
            .collect();

        let mut forest = Self {
            trees,
            config: config.clone(),
            subsample_size,
            threshold: 1.0,
            summary: TrainingSummary::from_scores(&[], 1.0),
        };

        let scores: Vec<f64> = samples.iter().map(|s| forest.anomaly_score(s)).collect();
        let threshold = contamination_threshold(&scores, config.contamination);
        forest.threshold = threshold;
        forest.summary = TrainingSummary::from_scores(&scores, threshold);

        log::info!(
            "Isolation Forest trained: {} trees, psi={}, samples={}, threshold={:.4}, flagged={}",
            config.num_trees,
            subsample_size,
            samples.len(),
            threshold,
            forest.summary.flagged
        );

        Ok(forest)
    }

    /// Same trees, threshold moved by `shift` from the contamination threshold
    pub fn with_threshold_shift(mut self, shift: f64) -> Self {
        self.threshold = clamp_threshold(self.summary.base_threshold + shift);
        self.summary.threshold_shift = self.threshold - self.summary.base_threshold;
        self
    }

    /// Mean path length across the ensemble
    pub fn path_length(&self, vector: &FeatureVector) -> f64 {
        self.trees.iter().map(|t| t.path_length(vector)).sum::<f64>() / self.trees.len() as f64
    }

    pub fn anomaly_score(&self, vector: &FeatureVector) -> f64 {
        let c = average_path_length(self.subsample_size);
        2f64.powf(-self.path_length(vector) / c)
    }

    pub fn score(&self, vector: &FeatureVector) -> Scores {
        let anomaly_score = self.anomaly_score(vector);
        Scores {
            anomaly_score,
            severity: (anomaly_score * 100.0).clamp(0.0, 100.0),
            is_anomaly: anomaly_score >= self.threshold,
            confidence: confidence(anomaly_score, self.threshold),
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn config(&self) -> &ForestConfig {
        &self.config
    }

    pub fn subsample_size(&self) -> usize {
        self.subsample_size
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn trees(&self) -> &[IsolationTree] {
        &self.trees
    }

    pub fn summary(&self) -> &TrainingSummary {
        &self.summary
    }

    /// Check a forest that was deserialized rather than trained
    pub fn validate(&self) -> Result<()> {
        self.config.validate()?;
        if self.trees.is_empty() {
            return Err(EngineError::InvalidConfig("forest has no trees".to_string()));
        }
        if self.subsample_size < 2 {
            return Err(EngineError::InvalidConfig(format!(
                "subsample_size {} is too small",
                self.subsample_size
            )));
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(EngineError::InvalidConfig(format!(
                "threshold {} outside [0, 1]",
                self.threshold
            )));
        }
        self.trees.iter().try_for_each(IsolationTree::validate)
    }
}

//! Configuration module

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use sentinel_core::constants::{
    DEFAULT_CONTAMINATION, DEFAULT_MAX_RETRAIN_FAILURES, DEFAULT_NUM_TREES, DEFAULT_RETRAIN_BATCH,
    DEFAULT_SEED, DEFAULT_THRESHOLD_STEP,
};
use sentinel_core::model::default_snapshot_path;
use sentinel_core::{CoordinatorConfig, ForestConfig, RetrainConfig};

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,

    /// Trees per forest
    pub num_trees: usize,

    /// Bootstrap sample size per tree; `None` = min(256, n)
    pub subsample_size: Option<usize>,

    /// Expected share of anomalies in the training data
    pub contamination: f64,

    /// RNG seed for training and the bootstrap corpus
    pub seed: u64,

    /// Threshold movement per false positive / false negative
    pub threshold_step: f64,

    /// Times a false positive is repeated in the retraining pool
    pub correction_copies: usize,

    /// Pending corrections that trigger a retrain
    pub retrain_batch: usize,

    pub max_retrain_failures: u32,

    /// Size of the synthetic corpus used when no snapshot exists
    pub bootstrap_samples: usize,

    /// Scored logs kept in memory
    pub store_capacity: usize,

    /// Model snapshot location; an empty `SENTINEL_SNAPSHOT_PATH` disables persistence
    pub snapshot_path: Option<PathBuf>,

    /// Environment (development, production)
    pub environment: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 5000,
            num_trees: DEFAULT_NUM_TREES,
            subsample_size: None,
            contamination: DEFAULT_CONTAMINATION,
            seed: DEFAULT_SEED,
            threshold_step: DEFAULT_THRESHOLD_STEP,
            correction_copies: 0,
            retrain_batch: DEFAULT_RETRAIN_BATCH,
            max_retrain_failures: DEFAULT_MAX_RETRAIN_FAILURES,
            bootstrap_samples: 1000,
            store_capacity: 10_000,
            snapshot_path: Some(default_snapshot_path()),
            environment: "development".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            port: parsed("ML_SERVICE_PORT").unwrap_or(defaults.port),
            num_trees: parsed("SENTINEL_NUM_TREES").unwrap_or(defaults.num_trees),
            subsample_size: parsed("SENTINEL_SUBSAMPLE_SIZE").or(defaults.subsample_size),
            contamination: parsed("SENTINEL_CONTAMINATION").unwrap_or(defaults.contamination),
            seed: parsed("SENTINEL_SEED").unwrap_or(defaults.seed),
            threshold_step: parsed("SENTINEL_THRESHOLD_STEP").unwrap_or(defaults.threshold_step),
            correction_copies: parsed("SENTINEL_CORRECTION_COPIES")
                .unwrap_or(defaults.correction_copies),
            retrain_batch: parsed("SENTINEL_RETRAIN_BATCH").unwrap_or(defaults.retrain_batch),
            max_retrain_failures: parsed("SENTINEL_MAX_RETRAIN_FAILURES")
                .unwrap_or(defaults.max_retrain_failures),
            bootstrap_samples: parsed("SENTINEL_BOOTSTRAP_SAMPLES")
                .unwrap_or(defaults.bootstrap_samples),
            store_capacity: parsed("SENTINEL_STORE_CAPACITY").unwrap_or(defaults.store_capacity),
            snapshot_path: match env::var("SENTINEL_SNAPSHOT_PATH") {
                Ok(path) if path.trim().is_empty() => None,
                Ok(path) => Some(PathBuf::from(path)),
                Err(_) => defaults.snapshot_path,
            },
            environment: env::var("ENVIRONMENT").unwrap_or(defaults.environment),
        }
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn forest_config(&self) -> ForestConfig {
        ForestConfig {
            num_trees: self.num_trees,
            subsample_size: self.subsample_size,
            contamination: self.contamination,
            seed: self.seed,
        }
    }

    pub fn retrain_config(&self) -> RetrainConfig {
        RetrainConfig {
            threshold_step: self.threshold_step,
            correction_copies: self.correction_copies,
        }
    }

    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            retrain_batch: self.retrain_batch,
            max_retrain_failures: self.max_retrain_failures,
        }
    }
}

fn parsed<T: FromStr>(key: &str) -> Option<T> {
    let raw = env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring unparsable {}={:?}", key, raw);
            None
        }
    }
}

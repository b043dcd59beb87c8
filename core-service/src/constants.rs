//! Central Configuration Constants
//!
//! Single source of truth for engine defaults.

/// Default number of isolation trees
pub const DEFAULT_NUM_TREES: usize = 100;

/// Upper bound of the "auto" subsample size
pub const AUTO_SUBSAMPLE_CAP: usize = 256;

/// Default expected anomaly fraction
pub const DEFAULT_CONTAMINATION: f64 = 0.1;

/// Contamination must lie in (0, MAX_CONTAMINATION]
pub const MAX_CONTAMINATION: f64 = 0.5;

/// Default random seed
pub const DEFAULT_SEED: u64 = 42;

/// Default threshold nudge per analyst correction
pub const DEFAULT_THRESHOLD_STEP: f64 = 0.01;

/// Default number of pending corrections that triggers a retrain
pub const DEFAULT_RETRAIN_BATCH: usize = 10;

/// Consecutive retrain failures after which retraining counts as blocked
pub const DEFAULT_MAX_RETRAIN_FAILURES: u32 = 3;

/// Trailing window for the per-IP request rate feature (seconds)
pub const REQUEST_RATE_WINDOW_SECS: i64 = 3600;

/// Status codes at or above this are errors
pub const ERROR_STATUS_FLOOR: u16 = 400;

/// Snapshot file format version
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// App name (used for the default data directory)
pub const APP_NAME: &str = "log-sentinel";

/// Engine version
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

//! Log Sentinel Core - Anomaly Scoring Engine
//!
//! Scores HTTP server-log events with an Isolation Forest and keeps the
//! decision threshold calibrated from analyst feedback.
//!
//! # Architecture
//!
//! ```text
//! LogEvent ──► features::build ──► FeatureVector ──► Engine::score ──► Verdict
//!                                                       ▲
//!                     FeedbackCoordinator ──retrain──────┘
//!                     (pending corrections + whitelist)
//! ```
//!
//! - `features/` - Feature layout, vector and builder
//! - `model/`    - Isolation trees, forest, threshold, model handle, snapshot
//! - `feedback/` - Labels, scored logs, whitelist, retraining coordinator
//! - `engine`    - Ties the model handle and whitelist together

pub mod constants;
pub mod engine;
pub mod error;
pub mod features;
pub mod feedback;
pub mod model;

pub use engine::{Engine, EngineInfo, Verdict};
pub use error::{EngineError, Result};
pub use features::{build, FeatureVector, LogEvent, RequestWindow};
pub use feedback::{
    CoordinatorConfig, FeedbackContext, FeedbackCoordinator, FeedbackRecord, FeedbackStats, Label,
    LogStore, ScoredLog, Whitelist, WhitelistEntry,
};
pub use model::{
    Explanation, FeatureContribution, ForestConfig, IsolationForest, ModelState, RetrainConfig,
    Scores, ThreatLevel,
};

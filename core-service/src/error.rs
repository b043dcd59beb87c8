//! Engine errors

use thiserror::Error;

/// Errors raised by the scoring engine and the feedback coordinator
#[derive(Error, Debug)]
pub enum EngineError {
    /// Bad input shape or range; the event must not be scored
    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    /// Scoring requested before the first successful training
    #[error("Model has not been trained yet")]
    ModelNotTrained,

    /// Train/retrain called with too few samples
    #[error("Insufficient training data: need {required}, have {available}")]
    InsufficientData { required: usize, available: usize },

    /// Feedback references a scored log the store does not know
    #[error("Unknown scored log: {0}")]
    UnknownLog(u64),

    /// Feedback label outside {normal, anomaly}
    #[error("Invalid label '{0}': expected 'normal' or 'anomaly'")]
    InvalidLabel(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(
        "Feature layout mismatch: expected v{expected_version} ({expected_hash:08x}), \
         got v{actual_version} ({actual_hash:08x})"
    )]
    LayoutMismatch {
        expected_version: u8,
        expected_hash: u32,
        actual_version: u8,
        actual_hash: u32,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for engine operations
pub type Result<T, E = EngineError> = std::result::Result<T, E>;

//! Labels, scored logs and analyst corrections

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::features::{FeatureVector, LogEvent};

/// Prediction label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Normal,
    Anomaly,
}

impl Label {
    pub fn from_anomaly(is_anomaly: bool) -> Self {
        if is_anomaly {
            Label::Anomaly
        } else {
            Label::Normal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Normal => "normal",
            Label::Anomaly => "anomaly",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Label {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(Label::Normal),
            "anomaly" => Ok(Label::Anomaly),
            _ => Err(EngineError::InvalidLabel(s.to_string())),
        }
    }
}

/// Analyst correction attached to a scored log; the prediction is kept
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Correction {
    pub label: Label,
    pub at: DateTime<Utc>,
}

/// Result of scoring one event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredLog {
    pub id: u64,
    pub event: LogEvent,
    pub features: FeatureVector,
    pub prediction: Label,
    pub anomaly_score: f64,
    /// 0-100
    pub severity_score: f64,
    /// 0-1
    pub confidence_score: f64,
    pub scored_at: DateTime<Utc>,
    pub correction: Option<Correction>,
}

impl ScoredLog {
    /// Label after feedback, falling back to the prediction
    pub fn effective_label(&self) -> Label {
        self.correction.as_ref().map(|c| c.label).unwrap_or(self.prediction)
    }
}

/// One analyst correction, consumed by the next retrain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub log_id: u64,
    pub features: FeatureVector,
    pub original_prediction: Label,
    pub corrected_label: Label,
    pub notes: String,
    pub submitted_at: DateTime<Utc>,
}

impl FeedbackRecord {
    /// Predicted anomaly, analyst says normal
    pub fn is_false_positive(&self) -> bool {
        self.original_prediction == Label::Anomaly && self.corrected_label == Label::Normal
    }

    /// Predicted normal, analyst says anomaly
    pub fn is_false_negative(&self) -> bool {
        self.original_prediction == Label::Normal && self.corrected_label == Label::Anomaly
    }
}

/// Scored-log lookup provided by the storage collaborator
pub trait LogStore: Send + Sync {
    fn scored_log(&self, id: u64) -> Option<ScoredLog>;

    /// Append the analyst's label to a stored log
    fn record_correction(&self, id: u64, label: Label, at: DateTime<Utc>);
}

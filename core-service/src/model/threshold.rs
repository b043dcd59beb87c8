//! Decision Threshold
//!
//! Derives the anomaly-score cut-off from the contamination ratio, applies
//! analyst nudges and maps the distance to the cut-off onto a confidence.

use serde::{Deserialize, Serialize};

use crate::feedback::{FeedbackRecord, Label};

/// Steepness of the confidence curve
pub const CONFIDENCE_GAIN: f64 = 10.0;

/// Confidence bounds for the anomaly tiers
const HIGH_CONFIDENCE: f64 = 0.75;
const CRITICAL_CONFIDENCE: f64 = 0.95;

/// Alert tier of a scored event
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreatLevel {
    Normal,
    Suspicious,
    High,
    Critical,
}

impl ThreatLevel {
    /// Anomalies are tiered by their margin over the threshold, which the
    /// confidence already encodes
    pub fn from_confidence(is_anomaly: bool, confidence: f64) -> Self {
        match confidence {
            _ if !is_anomaly => ThreatLevel::Normal,
            c if c < HIGH_CONFIDENCE => ThreatLevel::Suspicious,
            c if c < CRITICAL_CONFIDENCE => ThreatLevel::High,
            _ => ThreatLevel::Critical,
        }
    }
}

/// Score at or above which the `contamination` share of `scores` is flagged.
///
/// Linear-interpolated (1 - contamination) percentile of the training scores.
pub fn contamination_threshold(scores: &[f64], contamination: f64) -> f64 {
    if scores.is_empty() {
        return 1.0;
    }

    let mut sorted = scores.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = (1.0 - contamination).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;

    clamp_threshold(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// Net threshold shift implied by a batch of corrections.
///
/// False positives (anomaly → normal) push the threshold up, false
/// negatives (normal → anomaly) push it down.
pub fn correction_shift(corrections: &[FeedbackRecord], step: f64) -> f64 {
    corrections
        .iter()
        .map(|c| match (c.original_prediction, c.corrected_label) {
            (Label::Anomaly, Label::Normal) => step,
            (Label::Normal, Label::Anomaly) => -step,
            _ => 0.0,
        })
        .sum()
}

pub fn clamp_threshold(threshold: f64) -> f64 {
    if threshold.is_nan() {
        return 1.0;
    }
    threshold.clamp(0.0, 1.0)
}

/// Confidence in [0.5, 1): 0.5 on the threshold, saturating towards 1
pub fn confidence(anomaly_score: f64, threshold: f64) -> f64 {
    let distance = (anomaly_score - threshold).abs();
    (0.5 + 0.5 * (CONFIDENCE_GAIN * distance).tanh()).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureVector;
    use chrono::Utc;

    fn correction(original: Label, corrected: Label) -> FeedbackRecord {
        FeedbackRecord {
            log_id: 1,
            features: FeatureVector::from_values([0.0; 6]),
            original_prediction: original,
            corrected_label: corrected,
            notes: String::new(),
            submitted_at: Utc::now(),
        }
    }

    #[test]
    fn test_contamination_threshold() {
        let scores: Vec<f64> = (0..=100).map(|i| i as f64 / 100.0).collect();
        let t = contamination_threshold(&scores, 0.1);
        assert!((t - 0.9).abs() < 1e-12);

        let flagged = scores.iter().filter(|&&s| s >= t).count();
        assert!((10..=11).contains(&flagged));
    }

    #[test]
    fn test_threshold_interpolates() {
        let t = contamination_threshold(&[0.2, 0.4], 0.25);
        assert!((t - 0.35).abs() < 1e-12);
        assert_eq!(contamination_threshold(&[], 0.1), 1.0);
    }

    #[test]
    fn test_correction_shift() {
        let batch = vec![
            correction(Label::Anomaly, Label::Normal),
            correction(Label::Anomaly, Label::Normal),
            correction(Label::Normal, Label::Anomaly),
            correction(Label::Normal, Label::Normal),
        ];
        assert!((correction_shift(&batch, 0.01) - 0.01).abs() < 1e-12);
        assert_eq!(correction_shift(&[], 0.01), 0.0);
    }

    #[test]
    fn test_confidence_shape() {
        assert_eq!(confidence(0.6, 0.6), 0.5);
        assert!(confidence(0.9, 0.6) > 0.95);
        assert!(confidence(0.3, 0.6) > 0.95);
        assert!(confidence(0.62, 0.6) < confidence(0.7, 0.6));
        assert!(confidence(1.0, 0.0) <= 1.0);
    }

    #[test]
    fn test_threat_level_tiers() {
        let tier = |score: f64| ThreatLevel::from_confidence(true, confidence(score, 0.6));

        assert_eq!(ThreatLevel::from_confidence(false, 0.99), ThreatLevel::Normal);
        assert_eq!(tier(0.62), ThreatLevel::Suspicious);
        assert_eq!(tier(0.7), ThreatLevel::High);
        assert_eq!(tier(0.9), ThreatLevel::Critical);
    }

    #[test]
    fn test_clamp() {
        assert_eq!(clamp_threshold(1.3), 1.0);
        assert_eq!(clamp_threshold(-0.2), 0.0);
        assert_eq!(clamp_threshold(f64::NAN), 1.0);
    }
}

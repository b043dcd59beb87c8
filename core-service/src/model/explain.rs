//! Anomaly Explanation
//!
//! Attributes an isolation to the features whose splits cut the scored
//! vector away from the training subsample. Every split on the path earns
//! log2(rows before / rows after) for its feature; shares are taken over the
//! credit summed across all trees.

use serde::{Deserialize, Serialize};

use super::forest::IsolationForest;
use crate::features::{FeatureVector, FEATURE_COUNT, FEATURE_LAYOUT};

/// Features listed in the text summary at most
const SUMMARY_FEATURES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContributionStrength {
    Negligible,
    Weak,
    Moderate,
    Strong,
    VeryStrong,
}

impl ContributionStrength {
    pub fn from_share(share: f64) -> Self {
        match share {
            s if s < 0.05 => ContributionStrength::Negligible,
            s if s < 0.15 => ContributionStrength::Weak,
            s if s < 0.30 => ContributionStrength::Moderate,
            s if s < 0.50 => ContributionStrength::Strong,
            _ => ContributionStrength::VeryStrong,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureContribution {
    pub feature: String,
    pub value: f64,
    /// Fraction of the isolation credited to this feature, 0-1
    pub share: f64,
    pub strength: ContributionStrength,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    /// Largest share first
    pub contributions: Vec<FeatureContribution>,
    pub summary: String,
}

impl Explanation {
    pub fn top_feature(&self) -> Option<&FeatureContribution> {
        self.contributions.first().filter(|c| c.share > 0.0)
    }
}

pub fn explain(forest: &IsolationForest, vector: &FeatureVector) -> Explanation {
    let mut credit = [0.0; FEATURE_COUNT];
    for tree in forest.trees() {
        tree.isolation_credit(vector, &mut credit);
    }
    let total: f64 = credit.iter().sum();

    let mut contributions: Vec<FeatureContribution> = FEATURE_LAYOUT
        .iter()
        .zip(credit)
        .zip(vector.values)
        .map(|((name, credit), value)| {
            let share = if total > 0.0 { credit / total } else { 0.0 };
            FeatureContribution {
                feature: name.to_string(),
                value,
                share,
                strength: ContributionStrength::from_share(share),
            }
        })
        .collect();
    contributions.sort_by(|a, b| b.share.total_cmp(&a.share));

    let summary = summarize(&contributions);
    Explanation { contributions, summary }
}

fn summarize(contributions: &[FeatureContribution]) -> String {
    let leading: Vec<String> = contributions
        .iter()
        .take(SUMMARY_FEATURES)
        .filter(|c| c.strength >= ContributionStrength::Moderate)
        .map(|c| format!("{} = {} ({:.0}%)", c.feature, c.value, c.share * 100.0))
        .collect();

    if leading.is_empty() {
        "No single feature stands out; several small deviations add up".to_string()
    } else {
        format!("Isolated mainly by {}", leading.join(", "))
    }
}

//! Forest and retraining configuration

use serde::{Deserialize, Serialize};

use crate::constants::{
    AUTO_SUBSAMPLE_CAP, DEFAULT_CONTAMINATION, DEFAULT_NUM_TREES, DEFAULT_SEED,
    DEFAULT_THRESHOLD_STEP, MAX_CONTAMINATION,
};
use crate::error::{EngineError, Result};

/// Isolation Forest training parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestConfig {
    /// Number of isolation trees
    pub num_trees: usize,

    /// Bootstrap subsample size per tree; `None` means min(256, samples)
    pub subsample_size: Option<usize>,

    /// Expected fraction of anomalies in the training sample
    pub contamination: f64,

    /// Seed for tree construction
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            num_trees: DEFAULT_NUM_TREES,
            subsample_size: None,
            contamination: DEFAULT_CONTAMINATION,
            seed: DEFAULT_SEED,
        }
    }
}

impl ForestConfig {
    pub fn validate(&self) -> Result<()> {
        if self.num_trees == 0 {
            return Err(EngineError::InvalidConfig("num_trees must be at least 1".to_string()));
        }
        if let Some(size) = self.subsample_size {
            if size < 2 {
                return Err(EngineError::InvalidConfig(
                    "subsample_size must be at least 2".to_string(),
                ));
            }
        }
        if !(self.contamination > 0.0 && self.contamination <= MAX_CONTAMINATION) {
            return Err(EngineError::InvalidConfig(format!(
                "contamination {} outside (0, {}]",
                self.contamination, MAX_CONTAMINATION
            )));
        }
        Ok(())
    }

    /// Subsample size actually used for `available` training samples.
    ///
    /// Fails with `InsufficientData` when there is nothing to train on or an
    /// explicit size exceeds what is available.
    pub fn effective_subsample(&self, available: usize) -> Result<usize> {
        match self.subsample_size {
            Some(size) if size > available => Err(EngineError::InsufficientData {
                required: size,
                available,
            }),
            Some(size) => Ok(size),
            None if available < 2 => Err(EngineError::InsufficientData {
                required: 2,
                available,
            }),
            None => Ok(available.min(AUTO_SUBSAMPLE_CAP)),
        }
    }
}

/// How analyst corrections are folded into a retrain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrainConfig {
    /// Threshold nudge per correction
    pub threshold_step: f64,

    /// Extra copies of each confirmed false positive added to the training
    /// pool; 0 keeps retrain a pure function of the new samples
    pub correction_copies: usize,
}

impl Default for RetrainConfig {
    fn default() -> Self {
        Self {
            threshold_step: DEFAULT_THRESHOLD_STEP,
            correction_copies: 0,
        }
    }
}

impl RetrainConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.threshold_step) {
            return Err(EngineError::InvalidConfig(format!(
                "threshold_step {} outside [0, 1]",
                self.threshold_step
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(ForestConfig::default().validate().is_ok());
        assert!(RetrainConfig::default().validate().is_ok());
    }

    #[test]
    fn test_reject_bad_contamination() {
        for contamination in [0.0, -0.1, 0.6, f64::NAN] {
            let config = ForestConfig { contamination, ..Default::default() };
            assert!(matches!(config.validate(), Err(EngineError::InvalidConfig(_))));
        }
    }

    #[test]
    fn test_effective_subsample() {
        let auto = ForestConfig::default();
        assert_eq!(auto.effective_subsample(1000).unwrap(), 256);
        assert_eq!(auto.effective_subsample(110).unwrap(), 110);
        assert!(matches!(
            auto.effective_subsample(0),
            Err(EngineError::InsufficientData { available: 0, .. })
        ));

        let fixed = ForestConfig { subsample_size: Some(64), ..Default::default() };
        assert_eq!(fixed.effective_subsample(64).unwrap(), 64);
        assert!(matches!(
            fixed.effective_subsample(63),
            Err(EngineError::InsufficientData { required: 64, available: 63 })
        ));
    }
}

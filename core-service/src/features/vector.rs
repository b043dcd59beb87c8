//! Feature Vector - the six numeric columns the forest scores
//!
//! Versioned so that vectors built against an older layout are rejected
//! instead of silently scored against the wrong feature order.

use serde::{Deserialize, Serialize};

use super::layout::{
    feature_index, layout_hash, validate_layout, FEATURE_COUNT, FEATURE_LAYOUT, FEATURE_VERSION,
};
use crate::error::{EngineError, Result};

/// One scored row, stamped with the layout it was built under
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// `FEATURE_VERSION` at build time
    pub version: u8,
    /// `layout_hash()` at build time
    pub layout_hash: u32,
    /// Column values, `FEATURE_LAYOUT` order
    pub values: [f64; FEATURE_COUNT],
}

impl FeatureVector {
    /// Stamp raw values with the current layout
    pub fn from_values(values: [f64; FEATURE_COUNT]) -> Self {
        Self {
            version: FEATURE_VERSION,
            layout_hash: layout_hash(),
            values,
        }
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied()
    }

    pub fn get_by_name(&self, name: &str) -> Option<f64> {
        feature_index(name).and_then(|i| self.get(i))
    }

    /// Layout must match and every value must be finite
    pub fn validate(&self) -> Result<()> {
        validate_layout(self.version, self.layout_hash)?;
        if let Some(i) = self.values.iter().position(|v| !v.is_finite()) {
            return Err(EngineError::InvalidEvent(format!(
                "feature '{}' is not finite",
                FEATURE_LAYOUT[i]
            )));
        }
        Ok(())
    }

    /// Named values for debug logging
    pub fn to_log_entry(&self) -> serde_json::Value {
        serde_json::json!({
            "feature_version": self.version,
            "layout_hash": self.layout_hash,
            "named_values": FEATURE_LAYOUT.iter()
                .zip(self.values.iter())
                .map(|(name, value)| (name.to_string(), *value))
                .collect::<std::collections::BTreeMap<_, _>>(),
        })
    }
}

impl From<[f64; FEATURE_COUNT]> for FeatureVector {
    fn from(values: [f64; FEATURE_COUNT]) -> Self {
        Self::from_values(values)
    }
}

impl TryFrom<Vec<f64>> for FeatureVector {
    type Error = EngineError;

    fn try_from(values: Vec<f64>) -> Result<Self> {
        let array: [f64; FEATURE_COUNT] = values.try_into().map_err(|v: Vec<f64>| {
            EngineError::InvalidEvent(format!(
                "expected {} features, got {}",
                FEATURE_COUNT,
                v.len()
            ))
        })?;
        let vector = Self::from_values(array);
        vector.validate()?;
        Ok(vector)
    }
}

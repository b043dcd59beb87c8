//! Model Snapshot - persistence of the trained model and whitelist
//!
//! A snapshot is only accepted when its format version, feature layout and
//! tree structure all check out; otherwise the caller retrains from scratch.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::forest::IsolationForest;
use crate::constants::{APP_NAME, ENGINE_VERSION, SNAPSHOT_FORMAT_VERSION};
use crate::error::{EngineError, Result};
use crate::features::layout::{layout_hash, validate_layout, FEATURE_VERSION};
use crate::feedback::WhitelistEntry;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSnapshot {
    pub format_version: u32,
    pub feature_version: u8,
    pub layout_hash: u32,
    pub engine_version: String,
    pub saved_at: DateTime<Utc>,
    pub forest: IsolationForest,
    pub whitelist: Vec<WhitelistEntry>,
}

impl ModelSnapshot {
    pub fn new(forest: IsolationForest, whitelist: Vec<WhitelistEntry>) -> Self {
        Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            feature_version: FEATURE_VERSION,
            layout_hash: layout_hash(),
            engine_version: ENGINE_VERSION.to_string(),
            saved_at: Utc::now(),
            forest,
            whitelist,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(EngineError::InvalidConfig(format!(
                "snapshot format v{} not supported (expected v{})",
                self.format_version, SNAPSHOT_FORMAT_VERSION
            )));
        }
        validate_layout(self.feature_version, self.layout_hash)?;
        self.forest.validate()
    }
}

/// Get default snapshot path
pub fn default_snapshot_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
        .join("model_v1.json")
}

/// Save snapshot to disk (written to a temp file, then renamed into place)
pub fn save_snapshot(snapshot: &ModelSnapshot, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_vec(snapshot)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;

    log::info!(
        "Model snapshot saved to {} ({} trees, {} whitelisted IPs)",
        path.display(),
        snapshot.forest.num_trees(),
        snapshot.whitelist.len()
    );
    Ok(())
}

/// Load snapshot from disk with validation
pub fn load_snapshot(path: &Path) -> Result<ModelSnapshot> {
    if !path.exists() {
        return Err(EngineError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Snapshot file not found",
        )));
    }

    let data = fs::read(path)?;
    let snapshot: ModelSnapshot = serde_json::from_slice(&data)?;

    snapshot.validate()?;

    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureVector;
    use crate::model::ForestConfig;

    fn trained() -> IsolationForest {
        let samples: Vec<_> = (0..64)
            .map(|i| {
                let rt = 90.0 + (i % 17) as f64 * 1.7;
                let url_length = 20.0 + (i % 3) as f64;
                FeatureVector::from_values([rt / 1000.0, 0.0, rt, 200.0, url_length, 1.0])
            })
            .collect();
        let config = ForestConfig { num_trees: 20, ..Default::default() };
        IsolationForest::train(&samples, &config).unwrap()
    }

    #[test]
    fn test_save_load_scores_identically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("model.json");

        let forest = trained().with_threshold_shift(0.013);
        let whitelist = vec![WhitelistEntry::new("10.0.0.1", "office")];
        save_snapshot(&ModelSnapshot::new(forest.clone(), whitelist.clone()), &path).unwrap();

        let loaded = load_snapshot(&path).unwrap();
        assert_eq!(loaded.forest, forest);
        assert_eq!(loaded.whitelist, whitelist);

        let query = FeatureVector::from_values([0.731, 1.0, 731.0, 500.0, 33.0, 12.0]);
        assert_eq!(loaded.forest.score(&query), forest.score(&query));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_snapshot(&dir.path().join("absent.json"));
        assert!(matches!(result, Err(EngineError::Io(_))));
    }

    #[test]
    fn test_reject_layout_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");

        let mut snapshot = ModelSnapshot::new(trained(), vec![]);
        snapshot.layout_hash = !layout_hash();
        save_snapshot(&snapshot, &path).unwrap();

        assert!(matches!(load_snapshot(&path), Err(EngineError::LayoutMismatch { .. })));
    }

    #[test]
    fn test_reject_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        fs::write(&path, b"{not json").unwrap();

        assert!(matches!(load_snapshot(&path), Err(EngineError::Serialization(_))));
    }
}

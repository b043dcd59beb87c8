//! Model Module - Isolation Forest scoring
//!
//! - `tree`      - arena-backed isolation trees
//! - `forest`    - immutable trained ensemble + scoring
//! - `threshold` - contamination threshold, analyst nudges, confidence, threat tiers
//! - `explain`   - per-feature attribution of an isolation
//! - `handle`    - atomically swapped reference to the active forest
//! - `snapshot`  - on-disk persistence

pub mod config;
pub mod explain;
pub mod forest;
pub mod handle;
pub mod snapshot;
pub mod threshold;
pub mod tree;

pub use config::{ForestConfig, RetrainConfig};
pub use explain::{ContributionStrength, Explanation, FeatureContribution};
pub use forest::{IsolationForest, Scores, TrainingSummary};
pub use handle::{ModelHandle, ModelState};
pub use snapshot::{default_snapshot_path, load_snapshot, save_snapshot, ModelSnapshot};
pub use threshold::ThreatLevel;
pub use tree::IsolationTree;

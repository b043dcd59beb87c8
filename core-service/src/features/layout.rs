//! Feature Layout
//!
//! The order below is the column order of every `FeatureVector` and of the
//! split indices stored inside trained trees. Bump `FEATURE_VERSION` on any
//! add, remove or reorder; saved models with a different version or hash
//! are refused at load time.

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

pub const FEATURE_VERSION: u8 = 1;

/// Column names, in vector order
pub const FEATURE_LAYOUT: [&str; 6] = [
    "response_time_secs", // response_time / 1000
    "is_error",           // status >= 400
    "response_time_ms",
    "status_code",
    "url_length",         // characters, not bytes
    "requests_last_hour", // same source IP, trailing hour
];

pub const FEATURE_COUNT: usize = FEATURE_LAYOUT.len();

/// CRC32 over the version byte and the NUL-terminated column names
pub fn layout_hash() -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(&[FEATURE_VERSION]);
    FEATURE_LAYOUT.iter().for_each(|name| {
        hasher.update(name.as_bytes());
        hasher.update(&[0]);
    });
    hasher.finalize()
}

/// Layout description exposed by `/model/info` and stored in snapshots
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutInfo {
    pub version: u8,
    pub hash: u32,
    pub feature_count: usize,
    pub feature_names: Vec<String>,
}

impl LayoutInfo {
    pub fn current() -> Self {
        LayoutInfo {
            version: FEATURE_VERSION,
            hash: layout_hash(),
            feature_count: FEATURE_COUNT,
            feature_names: FEATURE_LAYOUT.map(String::from).to_vec(),
        }
    }
}

/// Accept only data produced under the current version and column order
pub fn validate_layout(version: u8, hash: u32) -> Result<(), EngineError> {
    let expected = layout_hash();
    if version == FEATURE_VERSION && hash == expected {
        return Ok(());
    }
    Err(EngineError::LayoutMismatch {
        expected_version: FEATURE_VERSION,
        expected_hash: expected,
        actual_version: version,
        actual_hash: hash,
    })
}

pub fn feature_index(name: &str) -> Option<usize> {
    FEATURE_LAYOUT.iter().position(|n| *n == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_stable() {
        assert_eq!(layout_hash(), layout_hash());
        assert_ne!(layout_hash(), 0);
        assert_eq!(LayoutInfo::current().feature_names.len(), FEATURE_COUNT);
    }

    #[test]
    fn test_validate_layout() {
        assert!(validate_layout(FEATURE_VERSION, layout_hash()).is_ok());
        assert!(validate_layout(FEATURE_VERSION + 1, layout_hash()).is_err());

        match validate_layout(FEATURE_VERSION, layout_hash().wrapping_add(1)) {
            Err(EngineError::LayoutMismatch { expected_hash, actual_hash, .. }) => {
                assert_eq!(expected_hash, layout_hash());
                assert_ne!(actual_hash, layout_hash());
            }
            other => panic!("Expected LayoutMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_feature_lookup() {
        assert_eq!(feature_index("response_time_secs"), Some(0));
        assert_eq!(feature_index("requests_last_hour"), Some(5));
        assert_eq!(feature_index("cpu_percent"), None);
        assert_eq!(FEATURE_LAYOUT[feature_index("status_code").unwrap()], "status_code");
    }
}

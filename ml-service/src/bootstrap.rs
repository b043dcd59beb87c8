//! Startup model bootstrap
//!
//! Restores the last snapshot when one is usable; otherwise trains on a
//! seeded synthetic corpus of ordinary traffic so the service can score
//! from the first request.

use std::path::Path;

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sentinel_core::{features, Engine, EngineError, FeatureVector, LogEvent};

const METHODS: [(&str, u32); 4] = [("GET", 60), ("POST", 25), ("PUT", 10), ("DELETE", 5)];

const STATUSES: [(u16, u32); 7] = [
    (200, 70),
    (201, 10),
    (301, 5),
    (302, 5),
    (400, 5),
    (404, 3),
    (500, 2),
];

const PATHS: [&str; 6] = ["/", "/products", "/cart", "/api/orders", "/account/settings", "/search"];

/// Synthetic normal traffic, reproducible from `seed`
pub fn synthetic_corpus(samples: usize, seed: u64) -> Result<Vec<FeatureVector>, EngineError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let methods = weighted(&METHODS)?;
    let statuses = weighted(&STATUSES)?;

    (0..samples)
        .map(|_| {
            let path = PATHS[rng.gen_range(0..PATHS.len())];
            let url_length = rng.gen_range(10..100usize);
            let padding = "x".repeat(url_length.saturating_sub(path.len() + 3));
            let url = format!("{}?q={}", path, padding);

            let event = LogEvent::new(
                format!("192.168.1.{}", rng.gen_range(1..255)),
                METHODS[methods.sample(&mut rng)].0,
                url,
                STATUSES[statuses.sample(&mut rng)].0,
                rng.gen_range(50.0..500.0),
            );
            features::build(&event, rng.gen_range(1..30))
        })
        .collect()
}

fn weighted<T>(table: &[(T, u32)]) -> Result<WeightedIndex<u32>, EngineError> {
    WeightedIndex::new(table.iter().map(|(_, w)| *w))
        .map_err(|e| EngineError::InvalidConfig(format!("bad weight table: {}", e)))
}

/// How the active model came to be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelSource {
    Snapshot,
    Bootstrap,
}

/// Restore from `snapshot_path` if possible, else train on `corpus` and
/// write a fresh snapshot.
pub fn initialize_model(
    engine: &Engine,
    corpus: &[FeatureVector],
    snapshot_path: Option<&Path>,
) -> Result<ModelSource, EngineError> {
    if let Some(path) = snapshot_path {
        if path.exists() {
            match engine.restore_snapshot(path) {
                Ok(model) => {
                    tracing::info!(
                        "Restored model from {} (threshold {:.4})",
                        path.display(),
                        model.threshold()
                    );
                    return Ok(ModelSource::Snapshot);
                }
                Err(e) => tracing::warn!("Ignoring unusable snapshot {}: {}", path.display(), e),
            }
        }
    }

    let model = engine.train(corpus)?;
    tracing::info!(
        "Trained bootstrap model on {} samples (threshold {:.4})",
        corpus.len(),
        model.threshold()
    );

    if let Some(path) = snapshot_path {
        if let Err(e) = engine.save_snapshot(path) {
            tracing::warn!("Could not write snapshot {}: {}", path.display(), e);
        }
    }

    Ok(ModelSource::Bootstrap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_core::{ForestConfig, RetrainConfig};

    fn engine() -> Engine {
        let config = ForestConfig { num_trees: 20, ..Default::default() };
        Engine::new(config, RetrainConfig::default()).unwrap()
    }

    #[test]
    fn test_corpus_is_reproducible() {
        let a = synthetic_corpus(50, 42).unwrap();
        let b = synthetic_corpus(50, 42).unwrap();
        let c = synthetic_corpus(50, 43).unwrap();

        assert_eq!(a.len(), 50);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_corpus_values_in_range() {
        for v in synthetic_corpus(200, 7).unwrap() {
            let rt_ms = v.get_by_name("response_time_ms").unwrap();
            let status = v.get_by_name("status_code").unwrap();
            assert!((50.0..500.0).contains(&rt_ms));
            assert!((200.0..=500.0).contains(&status));
            assert!((10.0..100.0).contains(&v.get_by_name("url_length").unwrap()));
        }
    }

    #[test]
    fn test_bootstrap_then_restore() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let corpus = synthetic_corpus(300, 42).unwrap();

        let first = engine();
        assert_eq!(initialize_model(&first, &corpus, Some(&path)).unwrap(), ModelSource::Bootstrap);
        assert!(path.exists());

        let second = engine();
        assert_eq!(initialize_model(&second, &corpus, Some(&path)).unwrap(), ModelSource::Snapshot);
        assert_eq!(
            second.current_model().unwrap().threshold(),
            first.current_model().unwrap().threshold()
        );
    }

    #[test]
    fn test_corrupt_snapshot_falls_back_to_training() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(&path, b"not a model").unwrap();

        let engine = engine();
        let corpus = synthetic_corpus(100, 1).unwrap();
        let source = initialize_model(&engine, &corpus, Some(&path)).unwrap();
        assert_eq!(source, ModelSource::Bootstrap);
    }
}

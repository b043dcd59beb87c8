//! Model Handle - the single shared reference to the active forest
//!
//! Readers clone the `Arc` under a read lock and score without holding it.
//! Writers build a complete forest first and only take the write lock for
//! the pointer swap, so nobody ever sees a half-built ensemble.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::forest::IsolationForest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelState {
    /// Scoring is refused
    Untrained,
    Trained,
}

#[derive(Debug, Default)]
pub struct ModelHandle {
    current: RwLock<Option<Arc<IsolationForest>>>,
    generation: AtomicU64,
}

impl ModelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current model, if any
    pub fn load(&self) -> Option<Arc<IsolationForest>> {
        self.current.read().clone()
    }

    /// Install a fully built model; returns the one it replaced
    pub fn swap(&self, model: Arc<IsolationForest>) -> Option<Arc<IsolationForest>> {
        let previous = self.current.write().replace(model);
        self.generation.fetch_add(1, Ordering::SeqCst);
        previous
    }

    pub fn state(&self) -> ModelState {
        if self.current.read().is_some() {
            ModelState::Trained
        } else {
            ModelState::Untrained
        }
    }

    /// Number of swaps so far
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}

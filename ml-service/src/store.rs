//! In-memory log store
//!
//! Keeps the most recent scored logs (bounded, oldest evicted first) and
//! per-IP request timestamps for the trailing-hour rate feature. It also
//! doubles as the growing training corpus.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use sentinel_core::constants::REQUEST_RATE_WINDOW_SECS;
use sentinel_core::feedback::Correction;
use sentinel_core::{FeatureVector, Label, LogStore, RequestWindow, ScoredLog};

/// Minimum gap between sweeps of idle source IPs
const SWEEP_INTERVAL_SECS: i64 = 60;

#[derive(Default)]
struct Inner {
    logs: HashMap<u64, ScoredLog>,
    /// Insertion order, for eviction
    order: VecDeque<u64>,
    hits: HashMap<String, VecDeque<DateTime<Utc>>>,
    last_sweep: Option<DateTime<Utc>>,
    next_id: u64,
}

pub struct MemoryLogStore {
    inner: RwLock<Inner>,
    capacity: usize,
}

impl MemoryLogStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: RwLock::new(Inner {
                next_id: 1,
                ..Default::default()
            }),
            capacity: capacity.max(1),
        }
    }

    /// Count one request from `ip` at `at`
    pub fn record_request(&self, ip: &str, at: DateTime<Utc>) {
        let cutoff = at - window();
        let mut inner = self.inner.write();
        let hits = inner.hits.entry(ip.to_string()).or_default();
        hits.push_back(at);
        prune(hits, cutoff);

        let due = inner
            .last_sweep
            .map_or(true, |last| at - last >= Duration::seconds(SWEEP_INTERVAL_SECS));
        if due {
            let before = inner.hits.len();
            inner.hits.retain(|_, hits| {
                prune(hits, cutoff);
                !hits.is_empty()
            });
            inner.last_sweep = Some(at);

            let dropped = before - inner.hits.len();
            if dropped > 0 {
                tracing::debug!("Dropped {} idle source IPs from the rate window", dropped);
            }
        }
    }

    /// Reserve an id for a log the caller did not key itself
    pub fn next_id(&self) -> u64 {
        let mut inner = self.inner.write();
        let id = inner.next_id;
        inner.next_id += 1;
        id
    }

    /// Store a scored log, replacing any log with the same id
    pub fn insert(&self, log: ScoredLog) {
        let mut inner = self.inner.write();
        let id = log.id;
        if id >= inner.next_id {
            inner.next_id = id + 1;
        }

        if inner.logs.insert(id, log).is_none() {
            inner.order.push_back(id);
        }

        while inner.order.len() > self.capacity {
            if let Some(oldest) = inner.order.pop_front() {
                inner.logs.remove(&oldest);
            }
        }
    }

    /// Feature vectors of every stored log, oldest first
    pub fn training_samples(&self) -> Vec<FeatureVector> {
        let inner = self.inner.read();
        inner
            .order
            .iter()
            .filter_map(|id| inner.logs.get(id))
            .map(|log| log.features)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().logs.len()
    }
}

fn window() -> Duration {
    Duration::seconds(REQUEST_RATE_WINDOW_SECS)
}

/// Drop hits at or before `cutoff`; queues are in arrival order
fn prune(hits: &mut VecDeque<DateTime<Utc>>, cutoff: DateTime<Utc>) {
    while hits.front().is_some_and(|t| *t <= cutoff) {
        hits.pop_front();
    }
}

impl LogStore for MemoryLogStore {
    fn scored_log(&self, id: u64) -> Option<ScoredLog> {
        self.inner.read().logs.get(&id).cloned()
    }

    fn record_correction(&self, id: u64, label: Label, at: DateTime<Utc>) {
        if let Some(log) = self.inner.write().logs.get_mut(&id) {
            log.correction = Some(Correction { label, at });
        }
    }
}

impl RequestWindow for MemoryLogStore {
    fn requests_in_window(&self, ip: &str, now: DateTime<Utc>) -> u64 {
        let cutoff = now - window();
        self.inner
            .read()
            .hits
            .get(ip)
            .map(|hits| hits.iter().filter(|t| **t > cutoff && **t <= now).count() as u64)
            .unwrap_or(0)
    }
}

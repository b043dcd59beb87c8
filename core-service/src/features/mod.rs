//! Features Module - Feature Extraction
//!
//! Turns a validated `LogEvent` plus the caller-supplied request rate into
//! the fixed-order `FeatureVector` the forest is trained on.

pub mod event;
pub mod layout;
pub mod vector;


use chrono::{DateTime, Utc};

use crate::error::Result;

pub use event::LogEvent;
pub use layout::{LayoutInfo, FEATURE_COUNT, FEATURE_LAYOUT, FEATURE_VERSION};
pub use vector::FeatureVector;

/// Request-rate lookup provided by the storage collaborator
pub trait RequestWindow: Send + Sync {
    /// Number of events from `ip` in the trailing hour ending at `now`
    fn requests_in_window(&self, ip: &str, now: DateTime<Utc>) -> u64;
}

/// Build the feature vector for one event.
///
/// `requests_last_hour` is the number of events seen from the same source IP
/// in the trailing hour; computing it is the caller's job.
pub fn build(event: &LogEvent, requests_last_hour: u64) -> Result<FeatureVector> {
    event.validate()?;

    let response_time = event.response_time;
    Ok(FeatureVector::from_values([
        response_time / 1000.0,
        if event.is_error() { 1.0 } else { 0.0 },
        response_time,
        f64::from(event.status_code),
        event.url.chars().count() as f64,
        requests_last_hour as f64,
    ]))
}

/// Build using a `RequestWindow` for the rate feature
pub fn build_with_window(event: &LogEvent, window: &dyn RequestWindow) -> Result<FeatureVector> {
    let recent = window.requests_in_window(&event.ip_address, event.timestamp);
    build(event, recent)
}

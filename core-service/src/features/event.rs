//! Log Event - one incoming HTTP request as recorded by the web layer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Immutable HTTP request-log record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    pub ip_address: String,
    pub method: String,
    pub url: String,
    pub status_code: u16,
    pub user_agent: Option<String>,
    /// Response time in milliseconds
    pub response_time: f64,
    pub timestamp: DateTime<Utc>,
}

impl LogEvent {
    pub fn new(
        ip_address: impl Into<String>,
        method: impl AsRef<str>,
        url: impl Into<String>,
        status_code: u16,
        response_time: f64,
    ) -> Self {
        Self {
            ip_address: ip_address.into(),
            method: method.as_ref().trim().to_ascii_uppercase(),
            url: url.into(),
            status_code,
            user_agent: None,
            response_time,
            timestamp: Utc::now(),
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Check shape and ranges before the event is turned into features
    pub fn validate(&self) -> Result<()> {
        if self.ip_address.trim().is_empty() {
            return Err(EngineError::InvalidEvent("ip_address is empty".to_string()));
        }
        if self.url.is_empty() {
            return Err(EngineError::InvalidEvent("url is empty".to_string()));
        }
        if !(100..=599).contains(&self.status_code) {
            return Err(EngineError::InvalidEvent(format!(
                "status_code {} outside 100-599",
                self.status_code
            )));
        }
        if !self.response_time.is_finite() || self.response_time < 0.0 {
            return Err(EngineError::InvalidEvent(format!(
                "response_time {} must be a non-negative number",
                self.response_time
            )));
        }
        Ok(())
    }

    pub fn is_error(&self) -> bool {
        self.status_code >= crate::constants::ERROR_STATUS_FLOOR
    }
}

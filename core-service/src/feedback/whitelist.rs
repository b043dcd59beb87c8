//! IP Whitelist
//!
//! Trusted source IPs bypass scoring. Changes take effect on the next
//! `score` call; there is no cache to invalidate.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhitelistEntry {
    pub ip: String,
    pub reason: String,
    pub added_at: DateTime<Utc>,
}

impl WhitelistEntry {
    pub fn new(ip: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            ip: normalize(&ip.into()),
            reason: reason.into(),
            added_at: Utc::now(),
        }
    }
}

fn normalize(ip: &str) -> String {
    ip.trim().to_ascii_lowercase()
}

#[derive(Debug, Default)]
pub struct Whitelist {
    entries: RwLock<HashMap<String, WhitelistEntry>>,
}

impl Whitelist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `ip`, or update the reason if it is already present
    pub fn add(&self, ip: &str, reason: &str) -> WhitelistEntry {
        let key = normalize(ip);
        let mut entries = self.entries.write();
        let entry = entries
            .entry(key.clone())
            .and_modify(|e| e.reason = reason.to_string())
            .or_insert_with(|| WhitelistEntry::new(key, reason));
        entry.clone()
    }

    /// Remove `ip`; absent IPs are a no-op
    pub fn remove(&self, ip: &str) -> Option<WhitelistEntry> {
        self.entries.write().remove(&normalize(ip))
    }

    pub fn contains(&self, ip: &str) -> bool {
        self.entries.read().contains_key(&normalize(ip))
    }

    pub fn get(&self, ip: &str) -> Option<WhitelistEntry> {
        self.entries.read().get(&normalize(ip)).cloned()
    }

    /// Entries sorted by IP
    pub fn entries(&self) -> Vec<WhitelistEntry> {
        let mut list: Vec<_> = self.entries.read().values().cloned().collect();
        list.sort_by(|a, b| a.ip.cmp(&b.ip));
        list
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Replace the whole set (snapshot restore)
    pub fn replace_all(&self, entries: Vec<WhitelistEntry>) {
        let map = entries.into_iter().map(|e| (normalize(&e.ip), e)).collect();
        *self.entries.write() = map;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_is_idempotent() {
        let wl = Whitelist::new();
        wl.add("192.168.1.10", "office");
        let updated = wl.add("192.168.1.10", "office gateway");

        assert_eq!(wl.len(), 1);
        assert_eq!(updated.reason, "office gateway");
        assert_eq!(wl.get("192.168.1.10").unwrap().reason, "office gateway");
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let wl = Whitelist::new();
        assert!(wl.remove("10.0.0.1").is_none());

        wl.add("10.0.0.1", "monitor");
        assert!(wl.remove("10.0.0.1").is_some());
        assert!(!wl.contains("10.0.0.1"));
        assert!(wl.is_empty());
    }

    #[test]
    fn test_normalized_lookup() {
        let wl = Whitelist::new();
        wl.add(" 2001:DB8::1 ", "ipv6 monitor");
        assert!(wl.contains("2001:db8::1"));
    }

    #[test]
    fn test_replace_all() {
        let wl = Whitelist::new();
        wl.add("10.0.0.1", "old");
        wl.replace_all(vec![
            WhitelistEntry::new("10.0.0.3", "b"),
            WhitelistEntry::new("10.0.0.2", "a"),
        ]);

        let ips: Vec<_> = wl.entries().into_iter().map(|e| e.ip).collect();
        assert_eq!(ips, vec!["10.0.0.2", "10.0.0.3"]);
    }
}

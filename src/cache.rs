//! Last-known-good result cache.
//!
//! Holds the most recent consolidated scan per job kind. Reads are
//! non-blocking and never trigger a scan; staleness is advisory metadata the
//! caller uses to decide whether a fresh scan is worth requesting. Writes
//! are unconditional overwrites, linearized by completion order.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::jobs::JobKind;
use crate::wifi::AccessPoint;

/// A cached consolidated scan plus freshness metadata.
#[derive(Debug, Clone, Serialize)]
pub struct CachedScan {
    pub access_points: Vec<AccessPoint>,
    pub stored_at: DateTime<Utc>,
    #[serde(skip)]
    pub ttl: Duration,
}

impl CachedScan {
    /// Advisory only: a stale entry is still served.
    pub fn is_stale(&self) -> bool {
        Utc::now()
            .signed_duration_since(self.stored_at)
            .to_std()
            .map(|age| age > self.ttl)
            .unwrap_or(false)
    }
}

pub struct ResultCache {
    entries: RwLock<HashMap<JobKind, CachedScan>>,
    ttl: Duration,
}

impl ResultCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Read the last stored result, if any. Never blocks on an in-flight
    /// aggregation; a concurrent writer only holds the map lock for the
    /// final insert, so readers see the previous value until then.
    pub fn get(&self, kind: JobKind) -> Option<CachedScan> {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&kind)
            .cloned()
    }

    /// Unconditional overwrite. Last completed write wins.
    pub fn set(&self, kind: JobKind, access_points: Vec<AccessPoint>) {
        let entry = CachedScan {
            access_points,
            stored_at: Utc::now(),
            ttl: self.ttl,
        };
        self.entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(kind, entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aps() -> Vec<AccessPoint> {
        vec![
            AccessPoint::new("net1", -40.0),
            AccessPoint::new("net2", -60.0),
        ]
    }

    #[test]
    fn test_set_then_get_round_trip() {
        let cache = ResultCache::new(Duration::from_secs(300));
        cache.set(JobKind::Scan, aps());
        let entry = cache.get(JobKind::Scan).expect("entry should exist");
        assert_eq!(entry.access_points, aps());
        assert!(!entry.is_stale());
    }

    #[test]
    fn test_get_unset_key_is_absent() {
        let cache = ResultCache::new(Duration::from_secs(300));
        assert!(cache.get(JobKind::Scan).is_none());
    }

    #[test]
    fn test_set_overwrites_previous_value() {
        let cache = ResultCache::new(Duration::from_secs(300));
        cache.set(JobKind::Scan, aps());
        cache.set(JobKind::Scan, vec![AccessPoint::new("only", -50.0)]);
        let entry = cache.get(JobKind::Scan).unwrap();
        assert_eq!(entry.access_points, vec![AccessPoint::new("only", -50.0)]);
    }

    #[test]
    fn test_zero_ttl_entry_reports_stale_but_is_served() {
        let cache = ResultCache::new(Duration::ZERO);
        cache.set(JobKind::Scan, aps());
        // Entry age is nonzero by the time we read it back on any real clock,
        // and stale entries are still returned.
        std::thread::sleep(Duration::from_millis(5));
        let entry = cache.get(JobKind::Scan).expect("stale entries are served");
        assert!(entry.is_stale());
    }
}

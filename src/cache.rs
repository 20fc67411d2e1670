//! Time-bounded cache of the last full status

use crate::types::StatusSnapshot;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// How long a fetched status may be reused
pub const DEFAULT_MAX_AGE: Duration = Duration::from_millis(30_000);

/// Last fetched status and when it was fetched
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub snapshot: StatusSnapshot,
    pub fetched_at: Instant,
}

impl CacheEntry {
    pub fn age(&self) -> Duration {
        Instant::now().saturating_duration_since(self.fetched_at)
    }
}

/// Holds at most one [`CacheEntry`]
///
/// The snapshot and its timestamp are stored and replaced together, so a
/// reader never sees one without the other.
pub struct StatusCache {
    entry: Mutex<Option<CacheEntry>>,
    max_age: Duration,
}

impl StatusCache {
    pub fn new(max_age: Duration) -> Self {
        Self {
            entry: Mutex::new(None),
            max_age,
        }
    }

    /// Cached snapshot if one exists and is not older than `max_age`
    pub fn fresh(&self) -> Option<StatusSnapshot> {
        let entry = self.entry.lock().unwrap_or_else(|e| e.into_inner());
        entry
            .as_ref()
            .filter(|entry| entry.age() <= self.max_age)
            .map(|entry| entry.snapshot.clone())
    }

    /// Replace the cached entry with a freshly fetched snapshot
    pub fn store(&self, snapshot: StatusSnapshot) {
        let mut entry = self.entry.lock().unwrap_or_else(|e| e.into_inner());
        *entry = Some(CacheEntry {
            snapshot,
            fetched_at: Instant::now(),
        });
    }

    /// Last entry regardless of age
    pub fn last(&self) -> Option<CacheEntry> {
        self.entry.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Default for StatusCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_AGE)
    }
}

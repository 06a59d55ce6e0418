//! Location-translation history.
//!
//! Every non-identity translation performed while bulk-copy planning is
//! enabled lands here. Transfer tasks append concurrently, so the map is
//! shared behind a mutex and keyed by (database, side).

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::domain::side::Side;

#[derive(Debug, Clone, Serialize)]
pub struct LocationHistoryEntry {
    pub database: String,
    pub side: Side,
    pub original: String,
    pub translated: String,
    /// Consolidation level recorded at translation time.
    pub level: usize,
}

/// Concurrency-safe append-only collection of translation history.
#[derive(Clone, Default)]
pub struct LocationHistory {
    inner: Arc<Mutex<BTreeMap<(String, Side), Vec<LocationHistoryEntry>>>>,
}

impl LocationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a translation. At most one entry is kept per
    /// (database, side, original location); later duplicates are dropped.
    pub fn record(&self, entry: LocationHistoryEntry) {
        if let Ok(mut map) = self.inner.lock() {
            let entries = map
                .entry((entry.database.clone(), entry.side))
                .or_default();
            if !entries.iter().any(|e| e.original == entry.original) {
                entries.push(entry);
            }
        }
    }

    pub fn entries(&self, database: &str, side: Side) -> Vec<LocationHistoryEntry> {
        self.inner
            .lock()
            .map(|map| {
                map.get(&(database.to_string(), side))
                    .cloned()
                    .unwrap_or_default()
            })
            .unwrap_or_default()
    }

    /// All (database, side) keys with recorded history.
    pub fn keys(&self) -> Vec<(String, Side)> {
        self.inner
            .lock()
            .map(|map| map.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().map(|map| map.is_empty()).unwrap_or(true)
    }
}

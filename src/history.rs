//! Recent render requests.
//!
//! The store is a bounded, deduplicated list keyed by the full canonical request. Recording a
//! request that is already present moves it to the front instead of adding a second entry;
//! going over capacity drops the least recently recorded entry.
use std::time::{SystemTime, UNIX_EPOCH};

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::Serialize;

use crate::request::RenderRequest;

/// Default number of entries kept.
pub const DEFAULT_CAPACITY: usize = 50;

/// One remembered request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub request: RenderRequest,
    /// Position in recording order; larger is more recent.
    pub sequence: u64,
    /// Unix time in milliseconds of the most recent recording.
    pub recorded_at: u64,
}

/// Bookkeeping of recent requests. Implementations must never fail a caller.
pub trait HistoryStore: Send + Sync {
    /// Inserts `request` as the most recent entry, or moves an equal entry there.
    fn record(&self, request: RenderRequest);

    /// Returns up to `limit` entries, most recent first.
    fn list(&self, limit: usize) -> Vec<HistoryEntry>;
}

#[derive(Debug, Clone, Copy)]
struct Stamp {
    sequence: u64,
    recorded_at: u64,
}

#[derive(Debug, Default)]
struct Inner {
    // Insertion order is recency order: oldest first.
    entries: IndexMap<RenderRequest, Stamp>,
    next_sequence: u64,
}

/// Process-local [`HistoryStore`]; every operation runs under a single lock.
#[derive(Debug)]
pub struct MemoryHistory {
    capacity: usize,
    inner: Mutex<Inner>,
}

impl MemoryHistory {
    /// Creates an empty store holding at most `capacity` entries (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            inner: Mutex::new(Inner {
                entries: IndexMap::with_capacity(capacity + 1),
                next_sequence: 0,
            }),
        }
    }

    /// Largest number of entries kept; also the cap applied to history listings.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of entries currently held, never more than [`capacity`](Self::capacity).
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Whether nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryHistory {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl HistoryStore for MemoryHistory {
    fn record(&self, request: RenderRequest) {
        let recorded_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();

        let mut inner = self.inner.lock();
        let sequence = inner.next_sequence;
        inner.next_sequence += 1;

        inner.entries.shift_remove(&request);
        inner.entries.insert(request, Stamp { sequence, recorded_at });
        while inner.entries.len() > self.capacity {
            inner.entries.shift_remove_index(0);
        }
    }

    fn list(&self, limit: usize) -> Vec<HistoryEntry> {
        let inner = self.inner.lock();
        inner
            .entries
            .iter()
            .rev()
            .take(limit)
            .map(|(request, stamp)| HistoryEntry {
                request: request.clone(),
                sequence: stamp.sequence,
                recorded_at: stamp.recorded_at,
            })
            .collect()
    }
}

//! # Index Registry
//!
//! Owns one [`SimilarityIndex`] per event and arbitrates readers and writers.
//!
//! ```text
//!   search ──► snapshot(event) ──► Arc<SimilarityIndex> ──► scan (no lock held)
//!
//!   ingest ──► writer.lock() ──► clone-on-write ──► mutate ──► publish
//! ```
//!
//! Readers clone the current `Arc` under a brief read lock and keep scanning
//! that snapshot even if a batch is published meanwhile. Writers of the same
//! event serialize on a per-event mutex; different events never contend.
//! Indexes are created lazily on the first write for an event.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};

use facematch_core::EventId;

use crate::similarity::{IndexStats, SimilarityIndex};

struct EventSlot {
    current: RwLock<Arc<SimilarityIndex>>,
    writer: Mutex<()>,
}

impl EventSlot {
    fn new(event_id: EventId) -> Self {
        Self {
            current: RwLock::new(Arc::new(SimilarityIndex::new(event_id))),
            writer: Mutex::new(()),
        }
    }

    fn snapshot(&self) -> Arc<SimilarityIndex> {
        Arc::clone(&*self.current.read())
    }

    fn update<R>(&self, f: impl FnOnce(&mut SimilarityIndex) -> R) -> R {
        let _writer = self.writer.lock();
        let mut next = self.snapshot();
        // `current` still holds a reference, so this always copies; record
        // embeddings are shared Arcs and only the group vectors are cloned.
        let result = f(Arc::make_mut(&mut next));
        *self.current.write() = next;
        result
    }
}

/// Event id -> copy-on-write index handle
#[derive(Default)]
pub struct IndexRegistry {
    events: DashMap<EventId, Arc<EventSlot>>,
}

impl IndexRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, event_id: EventId) -> Option<Arc<EventSlot>> {
        self.events.get(&event_id).map(|entry| Arc::clone(entry.value()))
    }

    fn slot_or_create(&self, event_id: EventId) -> Arc<EventSlot> {
        Arc::clone(
            self.events
                .entry(event_id)
                .or_insert_with(|| Arc::new(EventSlot::new(event_id)))
                .value(),
        )
    }

    /// Read-only view of an event's index as of now
    pub fn snapshot(&self, event_id: EventId) -> Option<Arc<SimilarityIndex>> {
        self.slot(event_id).map(|slot| slot.snapshot())
    }

    /// Apply one write batch to an event's index, creating it if needed.
    /// The batch becomes visible to readers atomically when `f` returns.
    pub fn update<R>(&self, event_id: EventId, f: impl FnOnce(&mut SimilarityIndex) -> R) -> R {
        self.slot_or_create(event_id).update(f)
    }

    /// Like [`update`](Self::update) but never creates an index
    pub fn update_existing<R>(
        &self,
        event_id: EventId,
        f: impl FnOnce(&mut SimilarityIndex) -> R,
    ) -> Option<R> {
        self.slot(event_id).map(|slot| slot.update(f))
    }

    /// Replace an event's index wholesale (e.g. after an offline rebuild)
    pub fn publish(&self, index: SimilarityIndex) {
        let event_id = index.event_id();
        let slot = self.slot_or_create(event_id);
        let _writer = slot.writer.lock();
        *slot.current.write() = Arc::new(index);
    }

    /// Forget an event entirely. Outstanding snapshots stay valid.
    pub fn remove_event(&self, event_id: EventId) -> bool {
        self.events.remove(&event_id).is_some()
    }

    pub fn contains(&self, event_id: EventId) -> bool {
        self.events.contains_key(&event_id)
    }

    /// Known events, ascending
    pub fn events(&self) -> Vec<EventId> {
        let mut events: Vec<EventId> = self.events.iter().map(|entry| *entry.key()).collect();
        events.sort_unstable();
        events
    }

    pub fn stats(&self, event_id: EventId) -> Option<IndexStats> {
        self.snapshot(event_id).map(|index| index.stats())
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

//! # Metrics and Monitoring
//!
//! Lock-free counters for ingestion and search activity.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Metrics collector
#[derive(Clone, Default)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

#[derive(Default)]
struct MetricsInner {
    // Ingestion metrics
    photos_ingested: AtomicU64,
    faces_indexed: AtomicU64,
    faces_rejected: AtomicU64,
    duplicates_skipped: AtomicU64,
    photos_removed: AtomicU64,

    // Query metrics
    queries_executed: AtomicU64,
    query_errors: AtomicU64,
    query_timeouts: AtomicU64,
    matches_returned: AtomicU64,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one ingested photo and the faces it contributed
    pub fn record_photo(&self, faces: u64) {
        self.inner.photos_ingested.fetch_add(1, Ordering::Relaxed);
        self.inner.faces_indexed.fetch_add(faces, Ordering::Relaxed);
    }

    /// Record a descriptor that failed validation
    pub fn record_rejected_face(&self) {
        self.inner.faces_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a descriptor skipped because its (photo, slot) was indexed already
    pub fn record_duplicate(&self) {
        self.inner.duplicates_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_photo_removed(&self) {
        self.inner.photos_removed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed search and its result count
    pub fn record_query(&self, matches: u64) {
        self.inner.queries_executed.fetch_add(1, Ordering::Relaxed);
        self.inner.matches_returned.fetch_add(matches, Ordering::Relaxed);
    }

    pub fn record_query_error(&self) {
        self.inner.query_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_query_timeout(&self) {
        self.inner.query_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            photos_ingested: self.inner.photos_ingested.load(Ordering::Relaxed),
            faces_indexed: self.inner.faces_indexed.load(Ordering::Relaxed),
            faces_rejected: self.inner.faces_rejected.load(Ordering::Relaxed),
            duplicates_skipped: self.inner.duplicates_skipped.load(Ordering::Relaxed),
            photos_removed: self.inner.photos_removed.load(Ordering::Relaxed),
            queries_executed: self.inner.queries_executed.load(Ordering::Relaxed),
            query_errors: self.inner.query_errors.load(Ordering::Relaxed),
            query_timeouts: self.inner.query_timeouts.load(Ordering::Relaxed),
            matches_returned: self.inner.matches_returned.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub photos_ingested: u64,
    pub faces_indexed: u64,
    pub faces_rejected: u64,
    pub duplicates_skipped: u64,
    pub photos_removed: u64,
    pub queries_executed: u64,
    pub query_errors: u64,
    pub query_timeouts: u64,
    pub matches_returned: u64,
}

/// Timer for measuring operation duration
pub struct Timer {
    start: Instant,
    name: &'static str,
}

impl Timer {
    /// Start new timer
    pub fn new(name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            name,
        }
    }

    /// Get elapsed time
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop timer and log duration
    pub fn stop(self) -> Duration {
        let duration = self.elapsed();
        tracing::debug!(
            name = self.name,
            duration_us = duration.as_micros() as u64,
            "Operation completed"
        );
        duration
    }
}

//! # Ingestion Gateway
//!
//! Boundary between the external face-extraction pipeline and the
//! per-event indexes.
//!
//! ## Write Path
//!
//! ```text
//! PhotoSubmission ──► validate each descriptor ──► FaceRecord per valid slot
//!        │                     │
//!        │                     └──► rejected: logged, counted, reported
//!        │
//!        └──► registry.update(event) ──► skip (photo, slot) already indexed
//!                                   └──► insert the rest, publish once
//! ```
//!
//! A malformed descriptor never aborts its batch. Validation happens here,
//! once per write, so the query path never re-checks stored embeddings.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use facematch_core::config::IngestionConfig;
use facematch_core::{
    EmbeddingVector, Error, EventId, FaceRecord, FaceSlot, Metrics, PhotoId, Result,
};

use crate::registry::IndexRegistry;

/// Descriptors the pipeline produced for one photo.
///
/// Descriptors stay as raw JSON until validated, since the pipeline may hand
/// over anything (short arrays, strings, nulls) and each one is judged alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoSubmission {
    pub photo_id: PhotoId,
    #[serde(default)]
    pub descriptors: Vec<serde_json::Value>,
}

impl PhotoSubmission {
    pub fn new(photo_id: PhotoId, descriptors: Vec<serde_json::Value>) -> Self {
        Self {
            photo_id,
            descriptors,
        }
    }

    /// Submission from already-decoded float vectors
    pub fn from_vectors(photo_id: PhotoId, vectors: Vec<Vec<f32>>) -> Self {
        let descriptors = vectors.into_iter().map(serde_json::Value::from).collect();
        Self::new(photo_id, descriptors)
    }
}

/// A descriptor that was skipped
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedDescriptor {
    pub photo_id: PhotoId,
    pub face_slot: FaceSlot,
    pub code: String,
    pub reason: String,
}

/// Outcome of one ingestion batch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestReport {
    pub photos_received: usize,
    pub faces_indexed: usize,
    pub duplicates_skipped: usize,
    pub rejected: Vec<RejectedDescriptor>,
}

/// Validates pipeline output and populates the registry
#[derive(Clone)]
pub struct IngestionGateway {
    registry: Arc<IndexRegistry>,
    config: IngestionConfig,
    metrics: Metrics,
}

impl IngestionGateway {
    pub fn new(registry: Arc<IndexRegistry>, config: IngestionConfig, metrics: Metrics) -> Self {
        Self {
            registry,
            config,
            metrics,
        }
    }

    pub fn registry(&self) -> &Arc<IndexRegistry> {
        &self.registry
    }

    /// Largest batch [`ingest`](Self::ingest) accepts
    pub fn max_photos_per_batch(&self) -> usize {
        self.config.max_photos_per_batch
    }

    /// Ingest a single photo
    pub fn ingest_photo(&self, event_id: EventId, photo: PhotoSubmission) -> Result<IngestReport> {
        self.ingest(event_id, vec![photo])
    }

    /// Ingest a batch of photos for one event. The whole batch is published
    /// to readers at once.
    ///
    /// Fails only when the batch itself is oversized; per-descriptor
    /// problems are reported in [`IngestReport::rejected`].
    pub fn ingest(&self, event_id: EventId, photos: Vec<PhotoSubmission>) -> Result<IngestReport> {
        if photos.len() > self.config.max_photos_per_batch {
            return Err(Error::validation(format!(
                "batch of {} photos exceeds limit of {}",
                photos.len(),
                self.config.max_photos_per_batch
            )));
        }

        let mut report = IngestReport {
            photos_received: photos.len(),
            ..IngestReport::default()
        };

        let mut accepted: Vec<Vec<FaceRecord>> = Vec::with_capacity(photos.len());
        for photo in &photos {
            accepted.push(self.validate_photo(event_id, photo, &mut report));
        }

        let metrics = &self.metrics;
        let (indexed, duplicates) = self.registry.update(event_id, |index| {
            let mut indexed = 0;
            let mut duplicates = 0;
            for records in accepted {
                let mut photo_faces = 0;
                for record in records {
                    if index.contains_face(record.photo_id, record.face_slot) {
                        metrics.record_duplicate();
                        duplicates += 1;
                        continue;
                    }
                    index.insert(record);
                    photo_faces += 1;
                }
                metrics.record_photo(photo_faces);
                indexed += photo_faces as usize;
            }
            (indexed, duplicates)
        });

        report.faces_indexed = indexed;
        report.duplicates_skipped = duplicates;

        info!(
            event_id = %event_id,
            photos = report.photos_received,
            faces = report.faces_indexed,
            duplicates = report.duplicates_skipped,
            rejected = report.rejected.len(),
            "ingestion batch applied"
        );

        Ok(report)
    }

    fn validate_photo(
        &self,
        event_id: EventId,
        photo: &PhotoSubmission,
        report: &mut IngestReport,
    ) -> Vec<FaceRecord> {
        let mut records = Vec::with_capacity(photo.descriptors.len());

        for (slot, descriptor) in photo.descriptors.iter().enumerate() {
            let face_slot = slot as FaceSlot;
            let parsed = if slot >= self.config.max_faces_per_photo {
                Err(Error::validation(format!(
                    "photo exceeds {} faces",
                    self.config.max_faces_per_photo
                )))
            } else {
                EmbeddingVector::from_json(descriptor)
            };

            match parsed {
                Ok(embedding) => {
                    records.push(FaceRecord::new(photo.photo_id, face_slot, embedding))
                }
                Err(e) => {
                    warn!(
                        event_id = %event_id,
                        photo_id = %photo.photo_id,
                        face_slot,
                        error = %e,
                        "skipping malformed face descriptor"
                    );
                    self.metrics.record_rejected_face();
                    report.rejected.push(RejectedDescriptor {
                        photo_id: photo.photo_id,
                        face_slot,
                        code: e.error_code().to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        records
    }

    /// Remove every face of a deleted or deactivated photo.
    /// Returns the number of records removed.
    pub fn remove_photo(&self, event_id: EventId, photo_id: PhotoId) -> Result<usize> {
        let removed = self
            .registry
            .update_existing(event_id, |index| index.remove_photo(photo_id))
            .ok_or(Error::EventNotFound { event_id: event_id.0 })?;

        if removed > 0 {
            self.metrics.record_photo_removed();
            info!(event_id = %event_id, photo_id = %photo_id, faces = removed, "photo removed");
        }
        Ok(removed)
    }
}

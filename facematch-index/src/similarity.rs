//! # Similarity Index (Exhaustive, Per Event)
//!
//! Holds every [`FaceRecord`] of one event. Queries are answered by a full
//! linear scan (see [`crate::search`]); there is no approximate structure.
//! Event galleries run from tens to a few thousand photos with a handful of
//! faces each, and exact answers matter more than scale here.
//!
//! ## Layout
//! - One [`PhotoFaces`] group per photo, stored contiguously in a `Vec`, so
//!   the scan walks memory linearly and dedup-by-photo is a per-group min.
//! - `positions` maps `photo_id` to its group for O(1) insert and removal.
//! - Removal is whole-photo only (`swap_remove` + position fix-up).

use std::collections::HashMap;

use facematch_core::{EventId, FaceRecord, FaceSlot, PhotoId};

/// All faces of one photo, in insertion order
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoFaces {
    photo_id: PhotoId,
    faces: Vec<FaceRecord>,
}

impl PhotoFaces {
    pub fn photo_id(&self) -> PhotoId {
        self.photo_id
    }

    pub fn faces(&self) -> &[FaceRecord] {
        &self.faces
    }
}

/// In-memory face corpus of exactly one event
#[derive(Debug, Clone)]
pub struct SimilarityIndex {
    event_id: EventId,
    photos: Vec<PhotoFaces>,
    positions: HashMap<PhotoId, usize>,
    face_count: usize,
}

impl SimilarityIndex {
    /// Create an empty index for `event_id`
    pub fn new(event_id: EventId) -> Self {
        Self {
            event_id,
            photos: Vec::new(),
            positions: HashMap::new(),
            face_count: 0,
        }
    }

    /// Build an index from a batch of records in one go
    pub fn from_records(event_id: EventId, records: impl IntoIterator<Item = FaceRecord>) -> Self {
        let mut index = Self::new(event_id);
        index.bulk_load(records);
        index
    }

    pub fn event_id(&self) -> EventId {
        self.event_id
    }

    /// Append a record to its photo's group. O(1) amortized.
    ///
    /// No uniqueness check on `(photo_id, face_slot)`: keeping re-runs
    /// idempotent is the ingestion gateway's job.
    pub fn insert(&mut self, record: FaceRecord) {
        let position = match self.positions.get(&record.photo_id) {
            Some(&position) => position,
            None => {
                let position = self.photos.len();
                self.photos.push(PhotoFaces {
                    photo_id: record.photo_id,
                    faces: Vec::new(),
                });
                self.positions.insert(record.photo_id, position);
                position
            }
        };
        self.photos[position].faces.push(record);
        self.face_count += 1;
    }

    /// Insert every record of `records`
    pub fn bulk_load(&mut self, records: impl IntoIterator<Item = FaceRecord>) {
        let records = records.into_iter();
        self.photos.reserve(records.size_hint().0);
        for record in records {
            self.insert(record);
        }
    }

    /// Drop every face of `photo_id`. Returns how many records were removed.
    pub fn remove_photo(&mut self, photo_id: PhotoId) -> usize {
        let Some(position) = self.positions.remove(&photo_id) else {
            return 0;
        };

        let removed = self.photos.swap_remove(position);
        if let Some(moved) = self.photos.get(position) {
            self.positions.insert(moved.photo_id, position);
        }

        self.face_count -= removed.faces.len();
        removed.faces.len()
    }

    /// Lazy sequence over every record. Call again to restart.
    pub fn all_records(&self) -> impl Iterator<Item = &FaceRecord> + Clone + '_ {
        self.photos.iter().flat_map(|group| group.faces.iter())
    }

    /// Per-photo record groups, the unit of dedup and of parallel partitioning
    pub fn photos(&self) -> &[PhotoFaces] {
        &self.photos
    }

    /// Faces recorded for one photo (empty if unknown)
    pub fn faces_of(&self, photo_id: PhotoId) -> &[FaceRecord] {
        self.positions
            .get(&photo_id)
            .map(|&position| self.photos[position].faces.as_slice())
            .unwrap_or(&[])
    }

    /// Whether `(photo_id, face_slot)` is already indexed
    pub fn contains_face(&self, photo_id: PhotoId, face_slot: FaceSlot) -> bool {
        self.faces_of(photo_id).iter().any(|f| f.face_slot == face_slot)
    }

    pub fn contains_photo(&self, photo_id: PhotoId) -> bool {
        self.positions.contains_key(&photo_id)
    }

    pub fn photo_count(&self) -> usize {
        self.photos.len()
    }

    pub fn face_count(&self) -> usize {
        self.face_count
    }

    pub fn is_empty(&self) -> bool {
        self.face_count == 0
    }

    /// Counts for monitoring and the stats endpoint
    pub fn stats(&self) -> IndexStats {
        IndexStats {
            event_id: self.event_id,
            photos: self.photo_count(),
            faces: self.face_count,
        }
    }
}

/// Size summary of one event index
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct IndexStats {
    pub event_id: EventId,
    pub photos: usize,
    pub faces: usize,
}

//! # Search Engine
//!
//! Executes one similarity query against one [`SimilarityIndex`].
//!
//! ## Algorithm
//! 1. For every photo group, take the face with the smallest squared
//!    distance to the query (ties go to the lower face slot).
//! 2. The photo matches when that face's euclidean distance is strictly
//!    below the threshold. Since sqrt is monotonic, the minimum squared
//!    distance picks the same face as the minimum distance, and only one
//!    root per photo is taken.
//! 3. Sort ascending by distance, then by photo id; truncate to
//!    `max_results` only after sorting.
//!
//! Large indexes are scanned on the rayon pool, one task per photo group.
//! Each group is reduced independently and the final sort is total, so the
//! parallel and sequential paths return identical results.

use std::cmp::Ordering;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use facematch_core::config::{SearchConfig, DEFAULT_THRESHOLD};
use facematch_core::metrics::Timer;
use facematch_core::{EmbeddingVector, Error, FaceSlot, PhotoId, Result};

use crate::similarity::{PhotoFaces, SimilarityIndex};

/// Caller-controlled query parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchParams {
    /// Euclidean distance cutoff in `[0, 1]`; a face matches when strictly below
    pub threshold: f32,
    /// Cap on returned photos, applied after ranking (None = unbounded)
    pub max_results: Option<usize>,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            max_results: None,
        }
    }
}

impl SearchParams {
    pub fn new(threshold: f32, max_results: Option<usize>) -> Self {
        Self {
            threshold,
            max_results,
        }
    }

    /// Fill missing request fields from the configured defaults
    pub fn resolve(
        threshold: Option<f32>,
        max_results: Option<usize>,
        config: &SearchConfig,
    ) -> Self {
        Self {
            threshold: threshold.unwrap_or(config.default_threshold),
            max_results: max_results.or(config.default_max_results),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.threshold.is_finite() || !(0.0..=1.0).contains(&self.threshold) {
            return Err(Error::validation(format!(
                "threshold must be a number within [0, 1], got {}",
                self.threshold
            )));
        }
        if self.max_results == Some(0) {
            return Err(Error::validation("max_results must be positive when set"));
        }
        Ok(())
    }
}

/// One matching photo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchMatch {
    pub photo_id: PhotoId,
    /// Slot of the best-matching face within the photo
    pub face_slot: FaceSlot,
    pub distance: f32,
    /// `max(0, 1 - distance)`
    pub similarity: f32,
}

impl SearchMatch {
    fn new(photo_id: PhotoId, face_slot: FaceSlot, distance: f32) -> Self {
        Self {
            photo_id,
            face_slot,
            distance,
            similarity: (1.0 - distance).max(0.0),
        }
    }

    /// Ascending distance, then ascending photo id
    fn rank(a: &SearchMatch, b: &SearchMatch) -> Ordering {
        a.distance
            .total_cmp(&b.distance)
            .then_with(|| a.photo_id.cmp(&b.photo_id))
    }
}

/// Ranked query result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub count: usize,
    pub results: Vec<SearchMatch>,
}

impl SearchResponse {
    fn from_matches(results: Vec<SearchMatch>) -> Self {
        Self {
            count: results.len(),
            results,
        }
    }
}

/// Stateless, reentrant query executor
#[derive(Debug, Clone)]
pub struct SearchEngine {
    parallel_threshold: usize,
}

impl Default for SearchEngine {
    fn default() -> Self {
        Self::new(&SearchConfig::default())
    }
}

impl SearchEngine {
    pub fn new(config: &SearchConfig) -> Self {
        Self {
            parallel_threshold: config.parallel_threshold,
        }
    }

    /// Engine that always scans sequentially
    pub fn sequential() -> Self {
        Self {
            parallel_threshold: usize::MAX,
        }
    }

    /// Engine that scans on the rayon pool whenever the index is non-empty
    pub fn parallel() -> Self {
        Self {
            parallel_threshold: 1,
        }
    }

    /// Run a query given a raw JSON embedding, as received from a client.
    /// Any malformed embedding is reported as [`Error::Validation`].
    pub fn search_json(
        &self,
        index: &SimilarityIndex,
        query: &serde_json::Value,
        params: &SearchParams,
    ) -> Result<SearchResponse> {
        let query = EmbeddingVector::from_json(query).map_err(Error::into_validation)?;
        self.search(index, &query, params)
    }

    /// Rank the photos of `index` whose best face lies within the threshold
    pub fn search(
        &self,
        index: &SimilarityIndex,
        query: &EmbeddingVector,
        params: &SearchParams,
    ) -> Result<SearchResponse> {
        params.validate()?;

        if index.is_empty() {
            return Ok(SearchResponse::default());
        }

        let timer = Timer::new("search");
        let threshold = params.threshold;

        let mut matches: Vec<SearchMatch> = if index.face_count() >= self.parallel_threshold {
            index
                .photos()
                .par_iter()
                .filter_map(|group| best_match(group, query, threshold))
                .collect()
        } else {
            index
                .photos()
                .iter()
                .filter_map(|group| best_match(group, query, threshold))
                .collect()
        };

        matches.sort_unstable_by(SearchMatch::rank);
        if let Some(limit) = params.max_results {
            matches.truncate(limit);
        }

        let elapsed = timer.stop();
        debug!(
            event_id = %index.event_id(),
            faces = index.face_count(),
            matches = matches.len(),
            threshold,
            elapsed_us = elapsed.as_micros() as u64,
            "search completed"
        );

        Ok(SearchResponse::from_matches(matches))
    }
}

/// Best face of one photo, if it passes the threshold
fn best_match(group: &PhotoFaces, query: &EmbeddingVector, threshold: f32) -> Option<SearchMatch> {
    let (slot, squared) = group
        .faces()
        .iter()
        .map(|face| (face.face_slot, face.squared_distance_to(query)))
        .min_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)))?;

    let distance = squared.sqrt();
    (distance < threshold).then(|| SearchMatch::new(group.photo_id(), slot, distance))
}

#[cfg(test)]
mod tests {
    use super::*;
    use facematch_core::{EventId, FaceRecord};

    /// Embedding at euclidean distance `d` from the zero vector
    fn at_distance(d: f32) -> EmbeddingVector {
        let mut v = [0.0f32; 128];
        v[0] = d;
        EmbeddingVector::new(v).unwrap()
    }

    fn origin() -> EmbeddingVector {
        EmbeddingVector::new([0.0f32; 128]).unwrap()
    }

    #[test]
    fn test_best_face_wins() {
        let index = SimilarityIndex::from_records(
            EventId(1),
            vec![
                FaceRecord::new(PhotoId(7), 0, at_distance(0.5)),
                FaceRecord::new(PhotoId(7), 1, at_distance(0.25)),
                FaceRecord::new(PhotoId(7), 2, at_distance(0.375)),
            ],
        );
        let response = SearchEngine::sequential()
            .search(&index, &origin(), &SearchParams::new(0.6, None))
            .unwrap();
        assert_eq!(response.count, 1);
        assert_eq!(response.results[0].face_slot, 1);
        assert_eq!(response.results[0].distance, 0.25);
        assert_eq!(response.results[0].similarity, 0.75);
    }

    #[test]
    fn test_threshold_is_strict() {
        let index = SimilarityIndex::from_records(
            EventId(1),
            vec![FaceRecord::new(PhotoId(1), 0, at_distance(0.5))],
        );
        let engine = SearchEngine::sequential();
        let at = engine.search(&index, &origin(), &SearchParams::new(0.5, None)).unwrap();
        assert_eq!(at.count, 0);
        let above = engine.search(&index, &origin(), &SearchParams::new(0.5000001, None)).unwrap();
        assert_eq!(above.count, 1);
    }

    #[test]
    fn test_params_validation() {
        assert!(SearchParams::new(-0.1, None).validate().is_err());
        assert!(SearchParams::new(1.1, None).validate().is_err());
        assert!(SearchParams::new(f32::NAN, None).validate().is_err());
        assert!(SearchParams::new(0.6, Some(0)).validate().is_err());
        assert!(SearchParams::new(0.0, Some(1)).validate().is_ok());
        assert!(SearchParams::new(1.0, None).validate().is_ok());
    }

    #[test]
    fn test_resolve_uses_config_defaults() {
        let config = SearchConfig {
            default_threshold: 0.4,
            default_max_results: Some(5),
            ..SearchConfig::default()
        };
        let params = SearchParams::resolve(None, None, &config);
        assert_eq!(params, SearchParams::new(0.4, Some(5)));
        let params = SearchParams::resolve(Some(0.7), Some(2), &config);
        assert_eq!(params, SearchParams::new(0.7, Some(2)));
    }

    #[test]
    fn test_search_json_maps_to_validation() {
        let index = SimilarityIndex::new(EventId(1));
        let engine = SearchEngine::default();
        let short = serde_json::Value::from(vec![0.0f64; 127]);
        let err = engine.search_json(&index, &short, &SearchParams::default()).unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }
}

//! Search behaviour tests: ranking, dedup, thresholds, concurrency

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::thread;

use facematch_core::config::IngestionConfig;
use facematch_core::{EmbeddingVector, EventId, FaceRecord, Metrics, PhotoId, EMBEDDING_DIMENSION};
use facematch_index::{
    IndexRegistry, IngestionGateway, PhotoSubmission, SearchEngine, SearchMatch, SearchParams,
    SimilarityIndex,
};
use rand::Rng;

fn origin() -> EmbeddingVector {
    EmbeddingVector::new([0.0f32; EMBEDDING_DIMENSION]).unwrap()
}

/// Embedding at euclidean distance `d` from the origin
fn at_distance(d: f32) -> EmbeddingVector {
    let mut v = [0.0f32; EMBEDDING_DIMENSION];
    v[0] = d;
    EmbeddingVector::new(v).unwrap()
}

fn random_embedding(rng: &mut impl Rng) -> EmbeddingVector {
    let data: Vec<f32> = (0..EMBEDDING_DIMENSION).map(|_| rng.gen_range(-0.05..0.05)).collect();
    EmbeddingVector::new(data).unwrap()
}

fn random_index(event: u64, photos: u64, max_faces: u32) -> SimilarityIndex {
    let mut rng = rand::thread_rng();
    let mut records = Vec::new();
    for photo in 0..photos {
        let faces = rng.gen_range(0..=max_faces);
        for slot in 0..faces {
            records.push(FaceRecord::new(PhotoId(photo), slot, random_embedding(&mut rng)));
        }
    }
    SimilarityIndex::from_records(EventId(event), records)
}

/// Brute-force reference: min distance per photo, filter, sort
fn oracle(index: &SimilarityIndex, query: &EmbeddingVector, threshold: f32) -> Vec<(PhotoId, f32)> {
    let mut best: BTreeMap<PhotoId, f32> = BTreeMap::new();
    for record in index.all_records() {
        let d = record.embedding.euclidean_distance(query).unwrap();
        let entry = best.entry(record.photo_id).or_insert(f32::INFINITY);
        if d < *entry {
            *entry = d;
        }
    }
    let mut out: Vec<_> = best.into_iter().filter(|(_, d)| *d < threshold).collect();
    out.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
    out
}

fn assert_close(actual: f32, expected: f32) {
    assert!((actual - expected).abs() < 1e-6, "{actual} != {expected}");
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_best_face_of_photo_a_only_match() {
    let index = SimilarityIndex::from_records(
        EventId(1),
        vec![
            FaceRecord::new(PhotoId(1), 0, at_distance(0.7)), // A, worse face first
            FaceRecord::new(PhotoId(2), 0, at_distance(0.5)), // B
            FaceRecord::new(PhotoId(1), 1, at_distance(0.3)), // A, better face
        ],
    );
    let engine = SearchEngine::default();

    let strict = engine.search(&index, &origin(), &SearchParams::new(0.4, None)).unwrap();
    assert_eq!(strict.count, 1);
    let a = &strict.results[0];
    assert_eq!(a.photo_id, PhotoId(1));
    assert_eq!(a.face_slot, 1);
    assert_close(a.distance, 0.3);
    assert_close(a.similarity, 0.7);

    let loose = engine.search(&index, &origin(), &SearchParams::new(0.6, None)).unwrap();
    let ids: Vec<_> = loose.results.iter().map(|m| m.photo_id).collect();
    assert_eq!(ids, vec![PhotoId(1), PhotoId(2)]);
}

#[test]
fn test_empty_index_returns_empty_response() {
    let index = SimilarityIndex::new(EventId(1));
    let response = SearchEngine::default()
        .search(&index, &origin(), &SearchParams::default())
        .unwrap();
    assert_eq!(response.count, 0);
    assert!(response.results.is_empty());
    assert_eq!(
        serde_json::to_value(&response).unwrap(),
        serde_json::json!({"count": 0, "results": []})
    );
}

#[test]
fn test_no_match_returns_empty() {
    let index = SimilarityIndex::from_records(
        EventId(1),
        vec![FaceRecord::new(PhotoId(1), 0, at_distance(0.9))],
    );
    let response = SearchEngine::default()
        .search(&index, &origin(), &SearchParams::new(0.6, None))
        .unwrap();
    assert_eq!(response.count, 0);
}

#[test]
fn test_max_results_returns_true_top_k() {
    // Scan order is worst-first: photo 1 is farthest, photo 9 closest.
    let records: Vec<_> = (1..=9u64)
        .map(|p| FaceRecord::new(PhotoId(p), 0, at_distance(1.0 - p as f32 / 10.0)))
        .collect();
    let index = SimilarityIndex::from_records(EventId(1), records);

    let response = SearchEngine::default()
        .search(&index, &origin(), &SearchParams::new(1.0, Some(3)))
        .unwrap();
    let ids: Vec<_> = response.results.iter().map(|m| m.photo_id.0).collect();
    assert_eq!(ids, vec![9, 8, 7]);
    assert_eq!(response.count, 3);
}

#[test]
fn test_ties_break_by_photo_id() {
    let index = SimilarityIndex::from_records(
        EventId(1),
        vec![
            FaceRecord::new(PhotoId(5), 0, at_distance(0.25)),
            FaceRecord::new(PhotoId(3), 0, at_distance(0.25)),
            FaceRecord::new(PhotoId(4), 0, at_distance(0.25)),
            FaceRecord::new(PhotoId(1), 0, at_distance(0.5)),
        ],
    );
    let response = SearchEngine::default()
        .search(&index, &origin(), &SearchParams::new(0.6, None))
        .unwrap();
    let ids: Vec<_> = response.results.iter().map(|m| m.photo_id.0).collect();
    assert_eq!(ids, vec![3, 4, 5, 1]);
}

#[test]
fn test_zero_face_photo_never_returned() {
    let gateway = IngestionGateway::new(
        Arc::new(IndexRegistry::new()),
        IngestionConfig::default(),
        Metrics::new(),
    );
    gateway
        .ingest(
            EventId(1),
            vec![
                PhotoSubmission::from_vectors(PhotoId(1), vec![]),
                PhotoSubmission::from_vectors(PhotoId(2), vec![vec![0.0; EMBEDDING_DIMENSION]]),
            ],
        )
        .unwrap();

    let index = gateway.registry().snapshot(EventId(1)).unwrap();
    let response = SearchEngine::default()
        .search(&index, &origin(), &SearchParams::new(1.0, None))
        .unwrap();
    assert!(response.results.iter().all(|m| m.photo_id != PhotoId(1)));
    assert_eq!(response.count, 1);
}

#[test]
fn test_removed_photo_not_returned() {
    let registry = Arc::new(IndexRegistry::new());
    let gateway =
        IngestionGateway::new(registry.clone(), IngestionConfig::default(), Metrics::new());
    gateway
        .ingest(
            EventId(1),
            vec![
                PhotoSubmission::from_vectors(PhotoId(1), vec![vec![0.0; EMBEDDING_DIMENSION]]),
                PhotoSubmission::from_vectors(PhotoId(2), vec![vec![0.01; EMBEDDING_DIMENSION]]),
            ],
        )
        .unwrap();

    assert_eq!(gateway.remove_photo(EventId(1), PhotoId(1)).unwrap(), 1);

    let index = registry.snapshot(EventId(1)).unwrap();
    let response = SearchEngine::default()
        .search(&index, &origin(), &SearchParams::new(0.6, None))
        .unwrap();
    let ids: Vec<_> = response.results.iter().map(|m| m.photo_id).collect();
    assert_eq!(ids, vec![PhotoId(2)]);
}

// ============================================================================
// Properties on random corpora
// ============================================================================

fn check_invariants(results: &[SearchMatch], threshold: f32) {
    let mut seen = HashSet::new();
    for m in results {
        assert!(seen.insert(m.photo_id), "photo {} returned twice", m.photo_id);
        assert!(m.distance < threshold);
        assert!((0.0..=1.0).contains(&m.similarity));
        assert_eq!(m.similarity, (1.0 - m.distance).max(0.0));
    }
    for pair in results.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        assert!(
            a.distance < b.distance || (a.distance == b.distance && a.photo_id < b.photo_id),
            "out of order: {a:?} then {b:?}"
        );
    }
}

#[test]
fn test_random_corpus_matches_oracle() {
    let mut rng = rand::thread_rng();
    for round in 0..10 {
        let index = random_index(round, 300, 4);
        let query = random_embedding(&mut rng);
        let threshold = rng.gen_range(0.3..0.6);

        let response = SearchEngine::sequential()
            .search(&index, &query, &SearchParams::new(threshold, None))
            .unwrap();
        check_invariants(&response.results, threshold);

        let got: Vec<_> = response.results.iter().map(|m| (m.photo_id, m.distance)).collect();
        assert_eq!(got, oracle(&index, &query, threshold));
    }
}

#[test]
fn test_parallel_scan_matches_sequential() {
    let mut rng = rand::thread_rng();
    let index = random_index(1, 2000, 3);
    for _ in 0..5 {
        let query = random_embedding(&mut rng);
        let params = SearchParams::new(0.5, Some(50));
        let seq = SearchEngine::sequential().search(&index, &query, &params).unwrap();
        let par = SearchEngine::parallel().search(&index, &query, &params).unwrap();
        assert_eq!(seq, par);
        check_invariants(&par.results, 0.5);
    }
}

#[test]
fn test_top_k_is_prefix_of_full_ranking() {
    let mut rng = rand::thread_rng();
    let index = random_index(1, 500, 2);
    let query = random_embedding(&mut rng);

    let full = SearchEngine::default()
        .search(&index, &query, &SearchParams::new(1.0, None))
        .unwrap();
    let top = SearchEngine::default()
        .search(&index, &query, &SearchParams::new(1.0, Some(10)))
        .unwrap();
    let k = full.results.len().min(10);
    assert_eq!(top.results, full.results[..k].to_vec());
}

// ============================================================================
// Concurrency
// ============================================================================

#[test]
fn test_concurrent_search_during_ingestion() {
    let registry = Arc::new(IndexRegistry::new());
    let gateway =
        IngestionGateway::new(registry.clone(), IngestionConfig::default(), Metrics::new());
    gateway
        .ingest_photo(
            EventId(1),
            PhotoSubmission::from_vectors(PhotoId(0), vec![vec![0.0; EMBEDDING_DIMENSION]]),
        )
        .unwrap();

    let writer = {
        let gateway = gateway.clone();
        thread::spawn(move || {
            for batch in 0..20u64 {
                let photos = (0..25u64)
                    .map(|i| {
                        PhotoSubmission::from_vectors(
                            PhotoId(1 + batch * 25 + i),
                            vec![vec![0.001; EMBEDDING_DIMENSION]],
                        )
                    })
                    .collect();
                gateway.ingest(EventId(1), photos).unwrap();
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let registry = registry.clone();
            thread::spawn(move || {
                let engine = SearchEngine::default();
                for _ in 0..50 {
                    let index = registry.snapshot(EventId(1)).unwrap();
                    let response = engine
                        .search(&index, &origin(), &SearchParams::new(0.6, None))
                        .unwrap();
                    // Batches are published whole: 1 seed photo + 25 per batch.
                    assert_eq!((response.count - 1) % 25, 0);
                    assert_eq!(response.results[0].photo_id, PhotoId(0));
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }

    assert_eq!(registry.snapshot(EventId(1)).unwrap().photo_count(), 501);
}

// Property-based testing
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    /// Records on one axis at multiples of 1/8, so distances are exact and
    /// ties between photos are common
    fn build(faces: &[(u64, u32)]) -> SimilarityIndex {
        let mut next_slot: BTreeMap<u64, u32> = BTreeMap::new();
        let records = faces.iter().map(|&(photo, step)| {
            let slot = next_slot.entry(photo).or_insert(0);
            let record = FaceRecord::new(PhotoId(photo), *slot, at_distance(step as f32 * 0.125));
            *slot += 1;
            record
        });
        SimilarityIndex::from_records(EventId(1), records.collect::<Vec<_>>())
    }

    proptest! {
        #[test]
        fn test_ranking_invariants_hold(
            faces in prop::collection::vec((0..20u64, 0..8u32), 0..60),
            threshold_step in 0..=8u32,
            limit in prop::option::of(1..10usize),
        ) {
            let index = build(&faces);
            let threshold = threshold_step as f32 * 0.125;
            let response = SearchEngine::sequential()
                .search(&index, &origin(), &SearchParams::new(threshold, limit))
                .unwrap();

            check_invariants(&response.results, threshold);
            prop_assert_eq!(response.count, response.results.len());

            let mut expected = oracle(&index, &origin(), threshold);
            if let Some(limit) = limit {
                expected.truncate(limit);
            }
            let got: Vec<_> = response.results.iter().map(|m| (m.photo_id, m.distance)).collect();
            prop_assert_eq!(got, expected);
        }

        #[test]
        fn test_insertion_order_irrelevant(
            faces in prop::collection::vec((0..10u64, 0..8u32), 1..30),
        ) {
            let forward = build(&faces);
            let reversed: Vec<_> = faces.iter().rev().copied().collect();
            let backward = build(&reversed);

            let params = SearchParams::new(1.0, None);
            let a = SearchEngine::sequential().search(&forward, &origin(), &params).unwrap();
            let b = SearchEngine::sequential().search(&backward, &origin(), &params).unwrap();
            let a: Vec<_> = a.results.iter().map(|m| (m.photo_id, m.distance)).collect();
            let b: Vec<_> = b.results.iter().map(|m| (m.photo_id, m.distance)).collect();
            prop_assert_eq!(a, b);
        }
    }
}

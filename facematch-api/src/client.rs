//! # FaceMatch Client
//!
//! Embedded facade over the registry, ingestion gateway and search engine.
//! The HTTP server is a thin layer on top of this; tools that live in the
//! same process (the CLI, tests) use it directly.

use std::path::Path;
use std::sync::Arc;

use facematch_core::config::{Config, SearchConfig};
use facematch_core::{EmbeddingVector, Error, EventId, Metrics, MetricsSnapshot, PhotoId, Result};
use facematch_index::{
    IndexRegistry, IndexStats, IngestReport, IngestionGateway, PhotoSubmission, SearchEngine,
    SearchParams, SearchResponse,
};

use crate::catalog::{self, CatalogReport};
use crate::server::SearchRequest;

/// In-process handle to a set of event indexes. Cheap to clone.
#[derive(Clone)]
pub struct FaceMatchClient {
    registry: Arc<IndexRegistry>,
    gateway: IngestionGateway,
    engine: SearchEngine,
    search_config: SearchConfig,
    metrics: Metrics,
}

impl FaceMatchClient {
    /// Empty registry configured from `config`
    pub fn new(config: &Config) -> Self {
        let registry = Arc::new(IndexRegistry::new());
        let metrics = Metrics::new();
        let gateway =
            IngestionGateway::new(registry.clone(), config.ingestion.clone(), metrics.clone());

        Self {
            registry,
            gateway,
            engine: SearchEngine::new(&config.search),
            search_config: config.search.clone(),
            metrics,
        }
    }

    // ========== Ingestion ==========

    /// Ingest a batch of photos for one event
    pub fn ingest(&self, event_id: EventId, photos: Vec<PhotoSubmission>) -> Result<IngestReport> {
        self.gateway.ingest(event_id, photos)
    }

    /// Drop a deleted or deactivated photo from its event
    pub fn remove_photo(&self, event_id: EventId, photo_id: PhotoId) -> Result<usize> {
        self.gateway.remove_photo(event_id, photo_id)
    }

    /// Bulk-load a JSON catalog file
    pub fn load_catalog(&self, path: impl AsRef<Path>) -> Result<CatalogReport> {
        catalog::load_catalog(path, &self.gateway)
    }

    // ========== Search ==========

    /// Search with a raw JSON query as a client sent it. Missing parameters
    /// fall back to the configured defaults.
    pub fn search_request(
        &self,
        event_id: EventId,
        request: &SearchRequest,
    ) -> Result<SearchResponse> {
        let result = self.run_search_request(event_id, request);
        self.record_search(&result);
        result
    }

    /// Search one event. An event that was never populated behaves as an
    /// empty gallery.
    pub fn search(
        &self,
        event_id: EventId,
        query: &EmbeddingVector,
        params: &SearchParams,
    ) -> Result<SearchResponse> {
        let result = self.run_search(event_id, query, params);
        self.record_search(&result);
        result
    }

    /// [`search_request`](Self::search_request) without touching the query
    /// counters; the caller decides whether the outcome is recorded.
    pub(crate) fn run_search_request(
        &self,
        event_id: EventId,
        request: &SearchRequest,
    ) -> Result<SearchResponse> {
        let query =
            EmbeddingVector::from_json(&request.query_embedding).map_err(Error::into_validation)?;
        let params =
            SearchParams::resolve(request.threshold, request.max_results, &self.search_config);
        self.run_search(event_id, &query, &params)
    }

    fn run_search(
        &self,
        event_id: EventId,
        query: &EmbeddingVector,
        params: &SearchParams,
    ) -> Result<SearchResponse> {
        params.validate()?;
        match self.registry.snapshot(event_id) {
            Some(index) => self.engine.search(&index, query, params),
            None => Ok(SearchResponse::default()),
        }
    }

    pub(crate) fn record_search(&self, result: &Result<SearchResponse>) {
        match result {
            Ok(response) => self.metrics.record_query(response.count as u64),
            Err(_) => self.metrics.record_query_error(),
        }
    }

    // ========== Introspection ==========

    pub fn stats(&self, event_id: EventId) -> Result<IndexStats> {
        self.registry
            .stats(event_id)
            .ok_or(Error::EventNotFound { event_id: event_id.0 })
    }

    /// Known events, ascending
    pub fn events(&self) -> Vec<EventId> {
        self.registry.events()
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn registry(&self) -> &Arc<IndexRegistry> {
        &self.registry
    }
}

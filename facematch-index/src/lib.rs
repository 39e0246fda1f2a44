//! # FaceMatch Index
//!
//! Per-event face corpora and exact similarity search.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Face Index Layer                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                              │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐     │
//! │  │  Ingestion  │───►│  Registry   │───►│ Similarity  │     │
//! │  │  Gateway    │    │ (CoW/event) │    │   Index     │     │
//! │  └─────────────┘    └─────────────┘    └─────────────┘     │
//! │                                               │              │
//! │                                        ┌─────────────┐      │
//! │                                        │   Search    │      │
//! │                                        │   Engine    │      │
//! │                                        └─────────────┘      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `similarity`: one event's face records, grouped by photo
//! - `search`: threshold match, dedup-by-best, ranking
//! - `registry`: event id -> copy-on-write index snapshots
//! - `ingest`: descriptor validation and idempotent insertion

pub mod ingest;
pub mod registry;
pub mod search;
pub mod similarity;

pub use ingest::{IngestReport, IngestionGateway, PhotoSubmission, RejectedDescriptor};
pub use registry::IndexRegistry;
pub use search::{SearchEngine, SearchMatch, SearchParams, SearchResponse};
pub use similarity::{IndexStats, PhotoFaces, SimilarityIndex};

//! # FaceMatch Core
//!
//! This crate provides the fundamental building blocks for FaceMatch:
//! - Face embeddings and face records
//! - Error types
//! - Configuration
//! - Metrics
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                 facematch-core                  │
//! ├─────────────────────────────────────────────────┤
//! │  • types    - EmbeddingVector, FaceRecord, ids  │
//! │  • distance - SIMD euclidean kernels            │
//! │  • error    - Error handling                    │
//! │  • config   - TOML configuration                │
//! │  • metrics  - Ingestion / search counters       │
//! └─────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod distance;
pub mod error;
pub mod metrics;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
pub use metrics::{Metrics, MetricsSnapshot};
pub use types::{EmbeddingVector, EventId, FaceRecord, FaceSlot, PhotoId, EMBEDDING_DIMENSION};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

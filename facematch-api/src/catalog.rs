//! # Catalog Loader
//!
//! Bootstraps the registry from a JSON export of the photo catalog:
//!
//! ```json
//! [
//!   {"event_id": 1, "photo_id": 10, "descriptors": [[0.01, ...], ...]},
//!   {"event_id": 1, "photo_id": 11, "descriptors": []}
//! ]
//! ```
//!
//! Rows are grouped by event and each event is ingested in batches of at
//! most `max_photos_per_batch`. A row that does not parse is logged and
//! counted; only an unreadable file or a non-array document fails the load.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use facematch_core::error::ResultExt;
use facematch_core::{Error, EventId, PhotoId, Result};
use facematch_index::{IngestionGateway, PhotoSubmission, RejectedDescriptor};

/// One photo in the catalog export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogRow {
    pub event_id: EventId,
    pub photo_id: PhotoId,
    #[serde(default)]
    pub descriptors: Vec<serde_json::Value>,
}

/// Totals for one catalog load
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogReport {
    pub events: usize,
    pub photos: usize,
    pub faces_indexed: usize,
    pub duplicates_skipped: usize,
    pub malformed_rows: usize,
    pub rejected: Vec<RejectedDescriptor>,
}

/// Read `path` and ingest every row through `gateway`
pub fn load_catalog(path: impl AsRef<Path>, gateway: &IngestionGateway) -> Result<CatalogReport> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .map_err(Error::from)
        .with_context(|| format!("reading catalog {}", path.display()))?;
    ingest_catalog_str(&text, gateway)
}

/// Same as [`load_catalog`] for an in-memory document
pub fn ingest_catalog_str(text: &str, gateway: &IngestionGateway) -> Result<CatalogReport> {
    let rows: Vec<serde_json::Value> = serde_json::from_str(text)
        .map_err(|e| Error::validation(format!("catalog must be a JSON array of rows: {e}")))?;

    let mut report = CatalogReport::default();
    let mut by_event: BTreeMap<EventId, Vec<PhotoSubmission>> = BTreeMap::new();

    for (position, row) in rows.into_iter().enumerate() {
        match serde_json::from_value::<CatalogRow>(row) {
            Ok(row) => by_event
                .entry(row.event_id)
                .or_default()
                .push(PhotoSubmission::new(row.photo_id, row.descriptors)),
            Err(e) => {
                warn!(row = position, error = %e, "skipping malformed catalog row");
                report.malformed_rows += 1;
            }
        }
    }

    let batch_size = gateway.max_photos_per_batch().max(1);
    for (event_id, photos) in by_event {
        report.events += 1;
        let mut photos = photos.into_iter().peekable();
        while photos.peek().is_some() {
            let batch: Vec<_> = photos.by_ref().take(batch_size).collect();
            let ingested = gateway.ingest(event_id, batch)?;
            report.photos += ingested.photos_received;
            report.faces_indexed += ingested.faces_indexed;
            report.duplicates_skipped += ingested.duplicates_skipped;
            report.rejected.extend(ingested.rejected);
        }
    }

    info!(
        events = report.events,
        photos = report.photos,
        faces = report.faces_indexed,
        malformed_rows = report.malformed_rows,
        rejected = report.rejected.len(),
        "catalog ingested"
    );
    Ok(report)
}

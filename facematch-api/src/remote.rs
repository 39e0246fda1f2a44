//! # Remote Client
//!
//! Connect to a FaceMatch server via HTTP.

use serde::de::DeserializeOwned;

use facematch_core::{Error, EventId, MetricsSnapshot, PhotoId, Result};
use facematch_index::{IndexStats, IngestReport, PhotoSubmission, SearchResponse};

use crate::server::{ApiError, IngestRequest, RemoveResponse, SearchRequest};

/// Remote client for connecting to a FaceMatch server
pub struct RemoteClient {
    base_url: String,
    client: reqwest::Client,
}

impl RemoteClient {
    /// Connect to a FaceMatch server, failing if it does not answer `/health`
    pub async fn connect(endpoint: impl Into<String>) -> Result<Self> {
        let remote = Self {
            base_url: endpoint.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        };
        remote.health().await?;
        Ok(remote)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn health(&self) -> Result<String> {
        let resp = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await
            .map_err(|e| Error::Internal { message: format!("Connection failed: {}", e) })?;

        if !resp.status().is_success() {
            return Err(Error::Internal {
                message: format!("health check returned {}", resp.status()),
            });
        }
        resp.text().await.map_err(transport)
    }

    pub async fn metrics(&self) -> Result<MetricsSnapshot> {
        let resp = self
            .client
            .get(format!("{}/metrics", self.base_url))
            .send()
            .await
            .map_err(transport)?;
        decode(resp, None).await
    }

    /// Ingest a batch of photos for one event
    pub async fn ingest(
        &self,
        event_id: EventId,
        photos: Vec<PhotoSubmission>,
    ) -> Result<IngestReport> {
        let resp = self
            .client
            .post(format!("{}/events/{}/photos", self.base_url, event_id))
            .json(&IngestRequest { photos })
            .send()
            .await
            .map_err(transport)?;
        decode(resp, Some(event_id)).await
    }

    pub async fn remove_photo(
        &self,
        event_id: EventId,
        photo_id: PhotoId,
    ) -> Result<RemoveResponse> {
        let resp = self
            .client
            .delete(format!("{}/events/{}/photos/{}", self.base_url, event_id, photo_id))
            .send()
            .await
            .map_err(transport)?;
        decode(resp, Some(event_id)).await
    }

    /// Find photos of the person in `query_embedding`
    pub async fn search(
        &self,
        event_id: EventId,
        query_embedding: &[f32],
        threshold: Option<f32>,
        max_results: Option<usize>,
    ) -> Result<SearchResponse> {
        let req = SearchRequest {
            query_embedding: serde_json::Value::from(query_embedding.to_vec()),
            threshold,
            max_results,
        };

        let resp = self
            .client
            .post(format!("{}/events/{}/search", self.base_url, event_id))
            .json(&req)
            .send()
            .await
            .map_err(transport)?;
        decode(resp, Some(event_id)).await
    }

    pub async fn stats(&self, event_id: EventId) -> Result<IndexStats> {
        let resp = self
            .client
            .get(format!("{}/events/{}/stats", self.base_url, event_id))
            .send()
            .await
            .map_err(transport)?;
        decode(resp, Some(event_id)).await
    }
}

fn transport(e: reqwest::Error) -> Error {
    Error::Internal { message: e.to_string() }
}

/// Parse a success body, or turn the server's `{error, code}` back into an [`Error`]
async fn decode<T: DeserializeOwned>(
    resp: reqwest::Response,
    event_id: Option<EventId>,
) -> Result<T> {
    let status = resp.status();
    if status.is_success() {
        return resp.json().await.map_err(transport);
    }

    let body: ApiError = resp.json().await.unwrap_or_else(|_| ApiError {
        error: status.to_string(),
        code: "INTERNAL_ERROR".to_string(),
    });

    Err(match (body.code.as_str(), event_id) {
        ("EVENT_NOT_FOUND", Some(event_id)) => Error::EventNotFound { event_id: event_id.0 },
        (_, _) if status.is_client_error() => Error::Validation { message: body.error },
        _ => Error::Internal {
            message: format!("{} ({})", body.error, body.code),
        },
    })
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Qdrant REST adapter
//!
//! Talks to a Qdrant server over its HTTP API:
//! - `GET  /collections/{name}` to read the vector size and point count
//! - `PUT  /collections/{name}` to create a cosine collection
//! - `PUT  /collections/{name}/points?wait=true` to upsert points
//! - `POST /collections/{name}/points/search` for nearest neighbours
//!
//! Every request runs under the client timeout from [`QdrantConfig`].

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::store::{validate_upsert, ScoredPayload, VectorStore};
use crate::config::QdrantConfig;
use crate::rag::errors::RagError;
use crate::rag::types::{DenseVector, Document};

/// [`VectorStore`] backed by a Qdrant collection
pub struct QdrantVectorStore {
    client: Client,
    base_url: String,
    collection: String,
    /// Collection dimensionality; 0 until `ensure_collection` succeeds
    dimension: AtomicUsize,
    next_id: AtomicU64,
}

impl std::fmt::Debug for QdrantVectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QdrantVectorStore")
            .field("base_url", &self.base_url)
            .field("collection", &self.collection)
            .finish_non_exhaustive()
    }
}

fn http_error(e: reqwest::Error) -> RagError {
    if e.is_timeout() {
        RagError::store_unavailable(format!("request timed out: {}", e))
    } else {
        RagError::store_unavailable(e)
    }
}

async fn status_error(action: &str, response: reqwest::Response) -> RagError {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<body unavailable>".to_string());
    RagError::store_unavailable(format!("{} returned {}: {}", action, status, body))
}

impl QdrantVectorStore {
    /// Build the adapter; fails with [`RagError::InvalidConfig`] on malformed
    /// connection parameters. No network call is made here.
    pub fn new(config: &QdrantConfig) -> Result<Self, RagError> {
        if config.collection_name.trim().is_empty() {
            return Err(RagError::InvalidConfig(
                "Qdrant collection name must not be empty".to_string(),
            ));
        }

        let base_url = Self::base_url(&config.host, config.port);
        reqwest::Url::parse(&base_url)
            .map_err(|e| RagError::InvalidConfig(format!("Invalid Qdrant URL {}: {}", base_url, e)))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(api_key) = config.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            headers.insert(
                "api-key",
                HeaderValue::from_str(api_key.trim())
                    .map_err(|_| RagError::InvalidConfig("invalid Qdrant API key".to_string()))?,
            );
        }

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .default_headers(headers)
            .build()
            .map_err(|e| RagError::InvalidConfig(format!("failed to build Qdrant client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            collection: config.collection_name.clone(),
            dimension: AtomicUsize::new(0),
            next_id: AtomicU64::new(0),
        })
    }

    fn base_url(host: &str, port: u16) -> String {
        let host = host.trim().trim_end_matches('/');
        if host.starts_with("http://") || host.starts_with("https://") {
            format!("{}:{}", host, port)
        } else {
            format!("http://{}:{}", host, port)
        }
    }

    fn collection_url(&self) -> String {
        format!("{}/collections/{}", self.base_url, self.collection)
    }

    pub fn collection_name(&self) -> &str {
        &self.collection
    }

    /// Check that the server answers
    pub async fn ping(&self) -> Result<(), RagError> {
        let response = self
            .client
            .get(format!("{}/collections", self.base_url))
            .send()
            .await
            .map_err(http_error)?;

        if !response.status().is_success() {
            return Err(status_error("list collections", response).await);
        }
        Ok(())
    }

    async fn create_collection(&self, dimension: usize) -> Result<(), RagError> {
        info!(
            collection = %self.collection,
            dimension,
            "Creating Qdrant collection"
        );

        let response = self
            .client
            .put(self.collection_url())
            .json(&json!({
                "vectors": { "size": dimension, "distance": "Cosine" }
            }))
            .send()
            .await
            .map_err(http_error)?;

        if !response.status().is_success() {
            return Err(status_error("create collection", response).await);
        }
        Ok(())
    }
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    async fn ensure_collection(&self, dimension: usize) -> Result<(), RagError> {
        if dimension == 0 {
            return Err(RagError::InvalidConfig(
                "collection dimension must be greater than 0".to_string(),
            ));
        }

        let response = self
            .client
            .get(self.collection_url())
            .send()
            .await
            .map_err(http_error)?;

        match response.status() {
            StatusCode::NOT_FOUND => self.create_collection(dimension).await?,
            status if status.is_success() => {
                let info: QdrantResponse<CollectionInfo> =
                    response.json().await.map_err(http_error)?;
                let existing = info.result.vector_size().ok_or_else(|| {
                    RagError::InvalidConfig(format!(
                        "collection {} has no single unnamed vector configuration",
                        self.collection
                    ))
                })?;
                if existing != dimension {
                    return Err(RagError::DimensionMismatch {
                        expected: existing,
                        actual: dimension,
                    });
                }
                // Continue numbering after points written by earlier processes
                self.next_id
                    .fetch_max(info.result.points_count.unwrap_or(0), Ordering::SeqCst);
            }
            _ => return Err(status_error("get collection", response).await),
        }

        self.dimension.store(dimension, Ordering::SeqCst);
        Ok(())
    }

    async fn upsert(
        &self,
        vectors: Vec<DenseVector>,
        payloads: Vec<Document>,
    ) -> Result<Vec<u64>, RagError> {
        let dimension = self.dimension.load(Ordering::SeqCst);
        if dimension == 0 {
            return Err(RagError::store_unavailable(
                "collection not ensured; call ensure_collection first",
            ));
        }
        validate_upsert(dimension, &vectors, &payloads)?;

        let first_id = self
            .next_id
            .fetch_add(vectors.len() as u64, Ordering::SeqCst);
        let ids: Vec<u64> = (first_id..first_id + vectors.len() as u64).collect();

        let points: Vec<PointStruct<'_>> = ids
            .iter()
            .zip(vectors.iter().zip(payloads.iter()))
            .map(|(id, (vector, payload))| PointStruct {
                id: *id,
                vector,
                payload,
            })
            .collect();

        let response = self
            .client
            .put(format!("{}/points?wait=true", self.collection_url()))
            .json(&UpsertRequest { points })
            .send()
            .await
            .map_err(http_error)?;

        if !response.status().is_success() {
            return Err(status_error("upsert points", response).await);
        }

        debug!(collection = %self.collection, count = ids.len(), "Upserted points");
        Ok(ids)
    }

    async fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<ScoredPayload>, RagError> {
        let response = self
            .client
            .post(format!("{}/points/search", self.collection_url()))
            .json(&SearchRequest {
                vector,
                limit,
                with_payload: true,
            })
            .send()
            .await
            .map_err(http_error)?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!(collection = %self.collection, "Collection does not exist yet; no dense hits");
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            return Err(status_error("search points", response).await);
        }

        let body: QdrantResponse<Vec<ScoredPoint>> = response.json().await.map_err(http_error)?;
        Ok(body
            .result
            .into_iter()
            .filter_map(|point| point.into_scored_payload())
            .collect())
    }

    fn name(&self) -> &'static str {
        "qdrant"
    }
}

#[derive(Serialize)]
struct PointStruct<'a> {
    id: u64,
    vector: &'a [f32],
    payload: &'a Document,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    points: Vec<PointStruct<'a>>,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    vector: &'a [f32],
    limit: usize,
    with_payload: bool,
}

#[derive(Debug, Deserialize)]
struct QdrantResponse<T> {
    result: T,
}

#[derive(Debug, Deserialize)]
struct CollectionInfo {
    #[serde(default)]
    points_count: Option<u64>,
    config: CollectionConfig,
}

#[derive(Debug, Deserialize)]
struct CollectionConfig {
    params: CollectionParams,
}

#[derive(Debug, Deserialize)]
struct CollectionParams {
    vectors: Value,
}

impl CollectionInfo {
    fn vector_size(&self) -> Option<usize> {
        self.config
            .params
            .vectors
            .get("size")
            .and_then(Value::as_u64)
            .map(|size| size as usize)
    }
}

#[derive(Debug, Deserialize)]
struct ScoredPoint {
    id: Value,
    score: f32,
    #[serde(default)]
    payload: Option<Value>,
}

impl ScoredPoint {
    fn into_scored_payload(self) -> Option<ScoredPayload> {
        let payload = self.payload?;
        match serde_json::from_value::<Document>(payload) {
            Ok(document) => Some(ScoredPayload {
                id: self.id.as_u64().unwrap_or_default(),
                score: self.score,
                payload: document,
            }),
            Err(e) => {
                warn!(id = %self.id, error = %e, "Skipping point with malformed payload");
                None
            }
        }
    }
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Process-local vector store
// Linear cosine scan over all entries; suitable for small corpora and tests

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::store::{cosine_similarity, validate_upsert, ScoredPayload, VectorStore};
use crate::rag::errors::RagError;
use crate::rag::types::{DenseVector, Document, IndexedEntry};

#[derive(Debug, Default)]
struct Collection {
    dimension: Option<usize>,
    entries: Vec<IndexedEntry>,
}

/// In-memory [`VectorStore`]
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    collection: RwLock<Collection>,
    next_id: AtomicU64,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries
    pub async fn count(&self) -> usize {
        self.collection.read().await.entries.len()
    }

    /// Configured dimensionality, if the collection exists
    pub async fn dimension(&self) -> Option<usize> {
        self.collection.read().await.dimension
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn ensure_collection(&self, dimension: usize) -> Result<(), RagError> {
        if dimension == 0 {
            return Err(RagError::InvalidConfig(
                "collection dimension must be greater than 0".to_string(),
            ));
        }

        let mut collection = self.collection.write().await;
        match collection.dimension {
            None => {
                collection.dimension = Some(dimension);
                Ok(())
            }
            Some(existing) if existing == dimension => Ok(()),
            Some(existing) => Err(RagError::DimensionMismatch {
                expected: existing,
                actual: dimension,
            }),
        }
    }

    async fn upsert(
        &self,
        vectors: Vec<DenseVector>,
        payloads: Vec<Document>,
    ) -> Result<Vec<u64>, RagError> {
        let mut collection = self.collection.write().await;
        let dimension = collection.dimension.ok_or_else(|| {
            RagError::store_unavailable("collection does not exist; call ensure_collection first")
        })?;
        validate_upsert(dimension, &vectors, &payloads)?;

        let mut ids = Vec::with_capacity(vectors.len());
        for (vector, payload) in vectors.into_iter().zip(payloads) {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            collection.entries.push(IndexedEntry {
                id,
                vector,
                payload,
            });
            ids.push(id);
        }

        Ok(ids)
    }

    async fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<ScoredPayload>, RagError> {
        let collection = self.collection.read().await;
        let dimension = match collection.dimension {
            Some(d) => d,
            None => return Ok(Vec::new()),
        };
        if vector.len() != dimension {
            return Err(RagError::DimensionMismatch {
                expected: dimension,
                actual: vector.len(),
            });
        }

        let mut results: Vec<ScoredPayload> = collection
            .entries
            .iter()
            .map(|entry| ScoredPayload {
                id: entry.id,
                score: cosine_similarity(vector, &entry.vector),
                payload: entry.payload.clone(),
            })
            .collect();

        // Stable: equal scores keep insertion order
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(limit);

        Ok(results)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

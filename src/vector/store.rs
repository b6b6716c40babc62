// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vector store contract used by the hybrid retriever

use async_trait::async_trait;

use crate::rag::errors::RagError;
use crate::rag::types::{DenseVector, Document};

/// A stored payload with its similarity to the query vector
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPayload {
    pub id: u64,
    /// Cosine similarity, higher is closer
    pub score: f32,
    pub payload: Document,
}

/// Persistent index of dense vectors with document payloads
///
/// Connectivity, timeout and server errors surface as
/// [`RagError::StoreUnavailable`]; vectors whose length does not match the
/// collection surface as [`RagError::DimensionMismatch`].
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create the collection on first call; afterwards validate `dimension`
    async fn ensure_collection(&self, dimension: usize) -> Result<(), RagError>;

    /// Insert parallel arrays of vectors and payloads, returning assigned ids
    async fn upsert(
        &self,
        vectors: Vec<DenseVector>,
        payloads: Vec<Document>,
    ) -> Result<Vec<u64>, RagError>;

    /// Nearest neighbours by cosine similarity, highest first
    async fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<ScoredPayload>, RagError>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}

/// Check the parallel-array and dimensionality invariants of an upsert
pub(crate) fn validate_upsert(
    dimension: usize,
    vectors: &[DenseVector],
    payloads: &[Document],
) -> Result<(), RagError> {
    if vectors.len() != payloads.len() {
        return Err(RagError::InvalidRequest(format!(
            "upsert received {} vectors but {} payloads",
            vectors.len(),
            payloads.len()
        )));
    }
    if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
        return Err(RagError::DimensionMismatch {
            expected: dimension,
            actual: bad.len(),
        });
    }
    if vectors
        .iter()
        .any(|v| v.iter().any(|x| x.is_nan() || x.is_infinite()))
    {
        return Err(RagError::InvalidRequest(
            "vectors must contain only finite values".to_string(),
        ));
    }
    Ok(())
}

/// Cosine similarity of two equal-length vectors (0.0 for zero vectors)
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let magnitude_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        0.0
    } else {
        dot_product / (magnitude_a * magnitude_b)
    }
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Dense text embeddings
//!
//! Two encoders share the [`EmbeddingService`] contract:
//! - [`OnnxEmbeddingService`]: sentence transformer run through ONNX Runtime
//! - [`HashEmbeddingService`]: deterministic hash-seeded vectors for offline use

pub mod hash_model;
pub mod onnx_model;

pub use hash_model::{HashEmbeddingConfig, HashEmbeddingService};
pub use onnx_model::OnnxEmbeddingService;

use async_trait::async_trait;

use crate::rag::errors::RagError;
use crate::rag::types::DenseVector;

/// Turns text into fixed-dimension dense vectors
///
/// Implementations must return exactly one vector per input, in input order,
/// and be deterministic for a fixed model version. A model that cannot be
/// loaded or does not respond reports [`RagError::ModelUnavailable`].
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    /// Encode a batch of texts
    async fn encode(&self, texts: &[String]) -> Result<Vec<DenseVector>, RagError>;

    /// Model name for logging
    fn model_name(&self) -> &str;
}

/// Scale `vector` to unit length in place (zero vectors are left untouched)
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::{l2_normalize, EmbeddingService};
use crate::rag::errors::RagError;
use crate::rag::types::DenseVector;

#[derive(Debug, Clone)]
pub struct HashEmbeddingConfig {
    pub model: String,
    pub dimension: usize,
    pub batch_size: usize,
    pub normalize: bool,
}

impl Default for HashEmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "hash-embedding-v1".to_string(),
            dimension: 384,
            batch_size: 32,
            normalize: true,
        }
    }
}

/// Deterministic pseudo-random embeddings seeded by a SHA-256 of the text.
///
/// Carries no semantics beyond exact-text identity; used when no model
/// weights are installed and throughout the test suite.
#[derive(Debug, Clone)]
pub struct HashEmbeddingService {
    config: HashEmbeddingConfig,
}

impl HashEmbeddingService {
    pub fn new(config: HashEmbeddingConfig) -> Result<Self, RagError> {
        if config.dimension == 0 {
            return Err(RagError::InvalidConfig(
                "Embedding dimension must be greater than 0".to_string(),
            ));
        }
        if config.batch_size == 0 {
            return Err(RagError::InvalidConfig(
                "Batch size must be greater than 0".to_string(),
            ));
        }

        Ok(Self { config })
    }

    pub fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn embed_one(&self, text: &str) -> DenseVector {
        let digest = Sha256::digest(text.as_bytes());
        let mut seed_bytes = [0u8; 8];
        seed_bytes.copy_from_slice(&digest[..8]);
        let mut current_seed = u64::from_le_bytes(seed_bytes);

        let mut embedding = Vec::with_capacity(self.config.dimension);
        for i in 0..self.config.dimension {
            // Linear congruential step, mixed with the position
            current_seed =
                (current_seed.wrapping_mul(1664525).wrapping_add(1013904223)) ^ (i as u64);
            let value = (current_seed as f64 / u64::MAX as f64) * 2.0 - 1.0;
            embedding.push(value as f32);
        }

        if self.config.normalize {
            l2_normalize(&mut embedding);
        }

        embedding
    }
}

#[async_trait]
impl EmbeddingService for HashEmbeddingService {
    async fn encode(&self, texts: &[String]) -> Result<Vec<DenseVector>, RagError> {
        let mut embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.config.batch_size) {
            embeddings.extend(batch.iter().map(|text| self.embed_one(text)));
        }

        Ok(embeddings)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

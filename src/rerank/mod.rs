// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Second-pass relevance ranking of retrieval candidates

pub mod cross_encoder;
pub mod overlap;

pub use cross_encoder::OnnxCrossEncoder;
pub use overlap::TermOverlapReranker;

use async_trait::async_trait;

use crate::rag::errors::RagError;

/// Scores (query, document) pairs and orders candidates by relevance
#[async_trait]
pub trait RerankerService: Send + Sync {
    /// Indices into `documents`, most relevant first, ties in input order,
    /// at most `top_k` long
    async fn rerank(
        &self,
        query: &str,
        documents: &[String],
        top_k: usize,
    ) -> Result<Vec<usize>, RagError>;

    fn model_name(&self) -> &str;
}

/// Stable descending argsort truncated to `top_k`; NaN sorts last
pub fn rank_by_scores(scores: &[f32], top_k: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    let key = |i: usize| {
        let s = scores[i];
        if s.is_nan() {
            f32::NEG_INFINITY
        } else {
            s
        }
    };
    order.sort_by(|&a, &b| key(b).total_cmp(&key(a)));
    order.truncate(top_k);
    order
}

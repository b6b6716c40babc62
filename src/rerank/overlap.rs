// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Lexical reranker used when no cross-encoder model is installed

use std::collections::HashSet;

use async_trait::async_trait;

use super::{rank_by_scores, RerankerService};
use crate::rag::errors::RagError;
use crate::sparse::tokenizer::{default_tokenizer, TokenizeFn};

/// Ranks documents by the share of distinct query terms they contain
pub struct TermOverlapReranker {
    tokenizer: TokenizeFn,
}

impl Default for TermOverlapReranker {
    fn default() -> Self {
        Self::new()
    }
}

impl TermOverlapReranker {
    pub fn new() -> Self {
        Self {
            tokenizer: default_tokenizer(),
        }
    }

    pub fn with_tokenizer(tokenizer: TokenizeFn) -> Self {
        Self { tokenizer }
    }

    /// Distinct lowercased terms of `text`
    pub fn terms(&self, text: &str) -> HashSet<String> {
        (self.tokenizer)(text)
            .into_iter()
            .map(|t| t.to_lowercase())
            .collect()
    }

    /// Fraction of distinct query terms found in `document`, in [0, 1]
    pub fn score(&self, query_terms: &HashSet<String>, document: &str) -> f32 {
        if query_terms.is_empty() {
            return 0.0;
        }
        let doc_terms = self.terms(document);
        let hits = query_terms.intersection(&doc_terms).count();
        hits as f32 / query_terms.len() as f32
    }
}

#[async_trait]
impl RerankerService for TermOverlapReranker {
    async fn rerank(
        &self,
        query: &str,
        documents: &[String],
        top_k: usize,
    ) -> Result<Vec<usize>, RagError> {
        let query_terms = self.terms(query);
        let scores: Vec<f32> = documents
            .iter()
            .map(|doc| self.score(&query_terms, doc))
            .collect();
        Ok(rank_by_scores(&scores, top_k))
    }

    fn model_name(&self) -> &str {
        "term-overlap"
    }
}

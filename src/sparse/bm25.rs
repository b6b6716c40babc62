// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! BM25 Okapi index over one document batch
//!
//! Scoring follows the classic Okapi formulation:
//!
//! ```text
//! idf(t)      = ln(N - n(t) + 0.5) - ln(n(t) + 0.5)
//! score(d, q) = Σ idf(t) · f(t,d)·(k1+1) / (f(t,d) + k1·(1 - b + b·|d|/avgdl))
//! ```
//!
//! Terms appearing in more than half the corpus get a negative idf, which is
//! replaced by `epsilon · mean(idf)`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::tokenizer::TokenizeFn;
use crate::rag::errors::RagError;
use crate::rag::types::Document;

/// BM25 tuning parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bm25Params {
    /// Term-frequency saturation
    pub k1: f64,
    /// Document-length normalization, in [0, 1]
    pub b: f64,
    /// Floor for negative idf, as a fraction of the mean idf
    pub epsilon: f64,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self {
            k1: 1.5,
            b: 0.75,
            epsilon: 0.25,
        }
    }
}

impl Bm25Params {
    pub fn validate(&self) -> Result<(), RagError> {
        if !(self.k1.is_finite() && self.k1 > 0.0) {
            return Err(RagError::InvalidConfig(format!(
                "BM25 k1 must be positive, got {}",
                self.k1
            )));
        }
        if !(0.0..=1.0).contains(&self.b) {
            return Err(RagError::InvalidConfig(format!(
                "BM25 b must be within [0, 1], got {}",
                self.b
            )));
        }
        if !(self.epsilon.is_finite() && self.epsilon >= 0.0) {
            return Err(RagError::InvalidConfig(format!(
                "BM25 epsilon must be non-negative, got {}",
                self.epsilon
            )));
        }
        Ok(())
    }
}

/// Immutable lexical index; rebuilt wholesale for every batch
pub struct SparseIndex {
    documents: Vec<Document>,
    term_freqs: Vec<HashMap<String, u32>>,
    doc_lengths: Vec<usize>,
    avgdl: f64,
    idf: HashMap<String, f64>,
    params: Bm25Params,
    tokenizer: TokenizeFn,
}

impl std::fmt::Debug for SparseIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SparseIndex")
            .field("documents", &self.documents.len())
            .field("vocabulary", &self.idf.len())
            .field("avgdl", &self.avgdl)
            .field("params", &self.params)
            .finish()
    }
}

impl SparseIndex {
    /// Tokenize and index `documents`; corpus positions follow input order
    pub fn build(documents: Vec<Document>, tokenizer: TokenizeFn, params: Bm25Params) -> Self {
        let mut term_freqs = Vec::with_capacity(documents.len());
        let mut doc_lengths = Vec::with_capacity(documents.len());
        let mut doc_counts: HashMap<String, usize> = HashMap::new();
        let mut total_terms = 0usize;

        for document in &documents {
            let tokens = tokenizer(&document.text);
            total_terms += tokens.len();
            doc_lengths.push(tokens.len());

            let mut freqs: HashMap<String, u32> = HashMap::new();
            for token in tokens {
                *freqs.entry(token).or_insert(0) += 1;
            }
            for term in freqs.keys() {
                *doc_counts.entry(term.clone()).or_insert(0) += 1;
            }
            term_freqs.push(freqs);
        }

        let corpus_size = documents.len() as f64;
        let avgdl = if documents.is_empty() {
            0.0
        } else {
            total_terms as f64 / corpus_size
        };

        let mut idf = HashMap::with_capacity(doc_counts.len());
        let mut idf_sum = 0.0;
        let mut negative = Vec::new();
        for (term, count) in doc_counts {
            let n = count as f64;
            let value = (corpus_size - n + 0.5).ln() - (n + 0.5).ln();
            idf_sum += value;
            if value < 0.0 {
                negative.push(term.clone());
            }
            idf.insert(term, value);
        }
        if !idf.is_empty() {
            let floor = params.epsilon * idf_sum / idf.len() as f64;
            for term in negative {
                idf.insert(term, floor);
            }
        }

        Self {
            documents,
            term_freqs,
            doc_lengths,
            avgdl,
            idf,
            params,
            tokenizer,
        }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn document(&self, index: usize) -> Option<&Document> {
        self.documents.get(index)
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn tokenize(&self, text: &str) -> Vec<String> {
        (self.tokenizer)(text)
    }

    /// BM25 score of every corpus document, in corpus order
    ///
    /// Repeated query tokens contribute once per occurrence.
    pub fn score(&self, query_tokens: &[String]) -> Vec<f64> {
        let Bm25Params { k1, b, .. } = self.params;
        let mut scores = vec![0.0; self.documents.len()];

        for token in query_tokens {
            let idf = match self.idf.get(token) {
                Some(idf) => *idf,
                None => continue,
            };
            for (i, freqs) in self.term_freqs.iter().enumerate() {
                let tf = match freqs.get(token) {
                    Some(tf) => *tf as f64,
                    None => continue,
                };
                let length_ratio = if self.avgdl > 0.0 {
                    self.doc_lengths[i] as f64 / self.avgdl
                } else {
                    0.0
                };
                scores[i] += idf * (tf * (k1 + 1.0)) / (tf + k1 * (1.0 - b + b * length_ratio));
            }
        }

        scores
    }

    /// Highest-scoring `n` corpus positions with raw scores
    ///
    /// Ties keep corpus order. Documents sharing no term with the query still
    /// fill the list with a score of zero, so the result length is
    /// `min(n, len())`.
    pub fn top(&self, query: &str, n: usize) -> Vec<(usize, f64)> {
        if self.is_empty() || n == 0 {
            return Vec::new();
        }

        let scores = self.score(&self.tokenize(query));
        let mut ranked: Vec<(usize, f64)> = scores.into_iter().enumerate().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.truncate(n);
        ranked
    }
}

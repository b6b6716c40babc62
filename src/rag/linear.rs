// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// In-memory retriever used when the embedding model or vector store is missing
// Keeps every indexed document and ranks by query-term overlap

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::errors::RagError;
use super::retriever::{Retriever, RetrieverKind};
use super::types::{Channel, Document, FusedResult, IndexReport, RetrievalHit};
use crate::rerank::{rank_by_scores, TermOverlapReranker};

#[derive(Default)]
pub struct LinearScanRetriever {
    documents: RwLock<Vec<Document>>,
    scorer: TermOverlapReranker,
}

impl LinearScanRetriever {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

#[async_trait]
impl Retriever for LinearScanRetriever {
    async fn index(&self, documents: Vec<Document>) -> Result<IndexReport, RagError> {
        let received = documents.len();
        let kept: Vec<Document> = documents.into_iter().filter(Document::has_text).collect();
        let indexed = kept.len();

        let mut stored = self.documents.write().await;
        stored.extend(kept);
        debug!(received, indexed, total = stored.len(), "Linear scan batch appended");

        Ok(IndexReport {
            received,
            indexed,
            dense_indexed: false,
            ids: Vec::new(),
        })
    }

    async fn retrieve(&self, query: &str, top_k: usize) -> FusedResult {
        let documents = self.documents.read().await;
        let query_terms = self.scorer.terms(query);

        let scores: Vec<f32> = documents
            .iter()
            .map(|doc| self.scorer.score(&query_terms, &doc.text))
            .collect();

        rank_by_scores(&scores, top_k)
            .into_iter()
            .map(|i| RetrievalHit {
                document: documents[i].clone(),
                score: scores[i],
                channel: Channel::Sparse,
            })
            .collect()
    }

    fn kind(&self) -> RetrieverKind {
        RetrieverKind::LinearScan
    }
}

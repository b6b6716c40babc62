// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Hybrid dense + sparse retrieval
//!
//! Indexing writes each batch to the vector store and rebuilds the BM25 index
//! from the same batch. Retrieval:
//!
//! 1. dense: embed the query, take `2K` nearest neighbours from the store
//! 2. sparse: take the BM25 top `2K` from the latest batch
//! 3. fuse: dense hits followed by sparse hits, duplicates kept
//! 4. rerank the fused list when a reranker is attached, keep `K`
//!
//! A channel that is unavailable or times out contributes nothing; a failed
//! rerank keeps the fused order.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use super::errors::{bounded, RagError};
use super::retriever::{Retriever, RetrieverKind};
use super::types::{Channel, Document, FusedResult, IndexReport, RetrievalHit};
use crate::config::PlatformConfig;
use crate::embeddings::EmbeddingService;
use crate::rerank::RerankerService;
use crate::sparse::{default_tokenizer, Bm25Params, SparseIndex, TokenizeFn};
use crate::vector::VectorStore;

/// Tuning for [`HybridRetriever`]
#[derive(Debug, Clone, PartialEq)]
pub struct HybridConfig {
    pub bm25: Bm25Params,
    pub embedding_timeout: Duration,
    pub store_timeout: Duration,
    pub reranker_timeout: Duration,
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            bm25: Bm25Params::default(),
            embedding_timeout: Duration::from_secs(30),
            store_timeout: Duration::from_secs(10),
            reranker_timeout: Duration::from_secs(30),
        }
    }
}

impl From<&PlatformConfig> for HybridConfig {
    fn from(config: &PlatformConfig) -> Self {
        Self {
            bm25: config.retrieval.bm25,
            embedding_timeout: config.embedding.timeout(),
            store_timeout: config.qdrant.timeout(),
            reranker_timeout: config.reranker.timeout(),
        }
    }
}

/// Concatenate channel results, dense first
pub fn fuse(dense: Vec<RetrievalHit>, sparse: Vec<RetrievalHit>) -> FusedResult {
    let mut fused = dense;
    fused.extend(sparse);
    fused
}

pub struct HybridRetriever {
    embeddings: Arc<dyn EmbeddingService>,
    store: Arc<dyn VectorStore>,
    reranker: Option<Arc<dyn RerankerService>>,
    tokenizer: TokenizeFn,
    config: HybridConfig,
    /// Latest batch only; replaced by swap on every `index`
    sparse: RwLock<Option<Arc<SparseIndex>>>,
}

impl HybridRetriever {
    pub fn new(embeddings: Arc<dyn EmbeddingService>, store: Arc<dyn VectorStore>) -> Self {
        Self {
            embeddings,
            store,
            reranker: None,
            tokenizer: default_tokenizer(),
            config: HybridConfig::default(),
            sparse: RwLock::new(None),
        }
    }

    pub fn with_reranker(mut self, reranker: Arc<dyn RerankerService>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    /// Tokenizer for BM25 indexing and queries
    pub fn with_tokenizer(mut self, tokenizer: TokenizeFn) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    pub fn with_config(mut self, config: HybridConfig) -> Self {
        self.config = config;
        self
    }

    pub fn has_reranker(&self) -> bool {
        self.reranker.is_some()
    }

    /// Number of documents in the current sparse index
    pub async fn sparse_len(&self) -> usize {
        self.sparse
            .read()
            .await
            .as_ref()
            .map(|index| index.len())
            .unwrap_or(0)
    }

    /// Current sparse index, if any batch has been indexed
    pub async fn sparse_snapshot(&self) -> Option<Arc<SparseIndex>> {
        self.sparse.read().await.clone()
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        let model = self.embeddings.model_name().to_string();
        let vectors = bounded(
            self.config.embedding_timeout,
            self.embeddings.encode(texts),
            || RagError::model_unavailable(&model, "embedding request timed out"),
        )
        .await?;

        if vectors.len() != texts.len() {
            return Err(RagError::model_unavailable(
                &model,
                format!("returned {} vectors for {} texts", vectors.len(), texts.len()),
            ));
        }
        Ok(vectors)
    }

    async fn index_dense(&self, documents: &[Document]) -> Result<Vec<u64>, RagError> {
        let texts: Vec<String> = documents.iter().map(|d| d.text.clone()).collect();
        let vectors = self.embed(&texts).await?;

        let dimension = vectors.first().map(Vec::len).unwrap_or(0);
        if dimension == 0 {
            return Err(RagError::model_unavailable(
                self.embeddings.model_name(),
                "model produced empty embeddings",
            ));
        }

        bounded(
            self.config.store_timeout,
            self.store.ensure_collection(dimension),
            || RagError::store_unavailable("ensure_collection timed out"),
        )
        .await?;

        bounded(
            self.config.store_timeout,
            self.store.upsert(vectors, documents.to_vec()),
            || RagError::store_unavailable("upsert timed out"),
        )
        .await
    }

    async fn dense_hits(&self, query: &str, limit: usize) -> Result<Vec<RetrievalHit>, RagError> {
        let vector = self
            .embed(&[query.to_string()])
            .await?
            .into_iter()
            .next()
            .unwrap_or_default();

        let results = bounded(
            self.config.store_timeout,
            self.store.search(&vector, limit),
            || RagError::store_unavailable("search timed out"),
        )
        .await?;

        Ok(results
            .into_iter()
            .map(|result| RetrievalHit {
                document: result.payload,
                score: result.score,
                channel: Channel::Dense,
            })
            .collect())
    }

    async fn sparse_hits(&self, query: &str, limit: usize) -> Vec<RetrievalHit> {
        let index = match self.sparse_snapshot().await {
            Some(index) => index,
            None => return Vec::new(),
        };

        index
            .top(query, limit)
            .into_iter()
            .filter_map(|(position, score)| {
                index.document(position).map(|document| RetrievalHit {
                    document: document.clone(),
                    score: score as f32,
                    channel: Channel::Sparse,
                })
            })
            .collect()
    }

    /// Reorder `fused` with the reranker; `None` when reranking is unavailable
    async fn rerank(&self, query: &str, fused: &[RetrievalHit], top_k: usize) -> Option<FusedResult> {
        let reranker = self.reranker.as_ref()?;
        let texts: Vec<String> = fused.iter().map(|hit| hit.document.text.clone()).collect();
        let model = reranker.model_name().to_string();

        let order = bounded(
            self.config.reranker_timeout,
            reranker.rerank(query, &texts, top_k),
            || RagError::model_unavailable(&model, "rerank request timed out"),
        )
        .await;

        let order = match order {
            Ok(order) => order,
            Err(e) => {
                warn!(
                    code = e.error_code(),
                    error = %e,
                    "Reranker unavailable, keeping fused order"
                );
                return None;
            }
        };

        let expected = top_k.min(fused.len());
        let reranked: Option<FusedResult> = order
            .iter()
            .take(top_k)
            .map(|&i| fused.get(i).cloned())
            .collect();
        match reranked {
            Some(hits) if hits.len() == expected => Some(hits),
            _ => {
                warn!(
                    model = %model,
                    returned = order.len(),
                    expected,
                    "Reranker returned an invalid ordering, keeping fused order"
                );
                None
            }
        }
    }
}

#[async_trait]
impl Retriever for HybridRetriever {
    async fn index(&self, documents: Vec<Document>) -> Result<IndexReport, RagError> {
        let received = documents.len();
        let documents: Vec<Document> = documents.into_iter().filter(Document::has_text).collect();
        let mut report = IndexReport {
            received,
            indexed: documents.len(),
            ..Default::default()
        };

        if documents.is_empty() {
            debug!(received, "No documents with text to index");
            return Ok(report);
        }

        match self.index_dense(&documents).await {
            Ok(ids) => {
                report.dense_indexed = true;
                report.ids = ids;
            }
            Err(e) if e.is_degradable() => {
                warn!(
                    channel = Channel::Dense.as_str(),
                    store = self.store.name(),
                    code = e.error_code(),
                    error = %e,
                    "Dense indexing unavailable, batch kept for sparse retrieval only"
                );
            }
            Err(e) => return Err(e),
        }

        // Build outside the lock; readers see either the old or the new index
        let index = Arc::new(SparseIndex::build(
            documents,
            self.tokenizer.clone(),
            self.config.bm25,
        ));
        *self.sparse.write().await = Some(index);

        info!(
            received = report.received,
            indexed = report.indexed,
            dense = report.dense_indexed,
            "Indexed document batch"
        );
        Ok(report)
    }

    async fn retrieve(&self, query: &str, top_k: usize) -> FusedResult {
        if top_k == 0 {
            return Vec::new();
        }
        let candidates = top_k.saturating_mul(2);

        let (dense, sparse) = tokio::join!(
            self.dense_hits(query, candidates),
            self.sparse_hits(query, candidates)
        );

        let dense = match dense {
            Ok(hits) => hits,
            Err(e) if e.is_degradable() => {
                warn!(
                    channel = Channel::Dense.as_str(),
                    code = e.error_code(),
                    error = %e,
                    "Dense channel unavailable, continuing without it"
                );
                Vec::new()
            }
            Err(e) => {
                error!(
                    channel = Channel::Dense.as_str(),
                    code = e.error_code(),
                    error = %e,
                    "Dense channel failed, continuing without it"
                );
                Vec::new()
            }
        };

        debug!(dense = dense.len(), sparse = sparse.len(), "Channel hits");

        let mut fused = fuse(dense, sparse);
        if fused.is_empty() {
            return fused;
        }

        if let Some(reranked) = self.rerank(query, &fused, top_k).await {
            return reranked;
        }

        fused.truncate(top_k);
        fused
    }

    fn kind(&self) -> RetrieverKind {
        RetrieverKind::Hybrid
    }
}

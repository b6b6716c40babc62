// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Shared test doubles for retrieval and research tests
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use quant_rag_node::embeddings::{EmbeddingService, HashEmbeddingConfig, HashEmbeddingService};
use quant_rag_node::llm::{GenerationOptions, LanguageModel};
use quant_rag_node::rag::{
    Channel, Document, FusedResult, HybridConfig, IndexReport, RagError, RetrievalHit, Retriever,
    RetrieverKind,
};
use quant_rag_node::rerank::RerankerService;
use quant_rag_node::vector::{InMemoryVectorStore, ScoredPayload, VectorStore};

pub fn doc(source: &str, text: &str) -> Document {
    Document::new(source, text).with_timestamp(1_700_000_000)
}

/// Small market-notes corpus with distinct vocabulary per document
pub fn market_notes() -> Vec<Document> {
    vec![
        doc("snowball", "SH000001 closes higher on heavy volume"),
        doc("eastmoney", "MACD golden cross on the daily chart"),
        doc("research-note", "third buy point confirmed after pivot breakout"),
        doc("news", "central bank holds lending rate steady"),
    ]
}

pub fn hash_embedder(dimension: usize) -> Arc<HashEmbeddingService> {
    Arc::new(
        HashEmbeddingService::new(HashEmbeddingConfig {
            dimension,
            ..Default::default()
        })
        .unwrap(),
    )
}

/// Short deadlines so degradation tests finish quickly
pub fn fast_config() -> HybridConfig {
    HybridConfig {
        embedding_timeout: Duration::from_millis(200),
        store_timeout: Duration::from_millis(200),
        reranker_timeout: Duration::from_millis(200),
        ..Default::default()
    }
}

pub fn channels(hits: &[RetrievalHit]) -> Vec<Channel> {
    hits.iter().map(|hit| hit.channel).collect()
}

pub fn texts(hits: &[RetrievalHit]) -> Vec<String> {
    hits.iter().map(|hit| hit.document.text.clone()).collect()
}

/// Embedding service that is never available
pub struct FailingEmbedder;

#[async_trait]
impl EmbeddingService for FailingEmbedder {
    async fn encode(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        Err(RagError::model_unavailable("missing-model", "weights not installed"))
    }

    fn model_name(&self) -> &str {
        "missing-model"
    }
}

/// Hash embeddings delivered after a delay
pub struct SlowEmbedder {
    pub inner: Arc<HashEmbeddingService>,
    pub delay: Duration,
}

#[async_trait]
impl EmbeddingService for SlowEmbedder {
    async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        tokio::time::sleep(self.delay).await;
        self.inner.encode(texts).await
    }

    fn model_name(&self) -> &str {
        "slow-hash"
    }
}

/// Vector store whose every call reports the service as down
pub struct UnavailableStore;

#[async_trait]
impl VectorStore for UnavailableStore {
    async fn ensure_collection(&self, _dimension: usize) -> Result<(), RagError> {
        Err(RagError::store_unavailable("connection refused"))
    }

    async fn upsert(
        &self,
        _vectors: Vec<Vec<f32>>,
        _payloads: Vec<Document>,
    ) -> Result<Vec<u64>, RagError> {
        Err(RagError::store_unavailable("connection refused"))
    }

    async fn search(&self, _vector: &[f32], _limit: usize) -> Result<Vec<ScoredPayload>, RagError> {
        Err(RagError::store_unavailable("connection refused"))
    }

    fn name(&self) -> &'static str {
        "unavailable"
    }
}

/// In-memory store whose searches hang for `delay`
pub struct SlowSearchStore {
    pub inner: InMemoryVectorStore,
    pub delay: Duration,
}

impl SlowSearchStore {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: InMemoryVectorStore::new(),
            delay,
        }
    }
}

#[async_trait]
impl VectorStore for SlowSearchStore {
    async fn ensure_collection(&self, dimension: usize) -> Result<(), RagError> {
        self.inner.ensure_collection(dimension).await
    }

    async fn upsert(
        &self,
        vectors: Vec<Vec<f32>>,
        payloads: Vec<Document>,
    ) -> Result<Vec<u64>, RagError> {
        self.inner.upsert(vectors, payloads).await
    }

    async fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<ScoredPayload>, RagError> {
        tokio::time::sleep(self.delay).await;
        self.inner.search(vector, limit).await
    }

    fn name(&self) -> &'static str {
        "slow-memory"
    }
}

pub struct FailingReranker;

#[async_trait]
impl RerankerService for FailingReranker {
    async fn rerank(
        &self,
        _query: &str,
        _documents: &[String],
        _top_k: usize,
    ) -> Result<Vec<usize>, RagError> {
        Err(RagError::model_unavailable("broken-reranker", "inference failed"))
    }

    fn model_name(&self) -> &str {
        "broken-reranker"
    }
}

/// Ranks candidates back to front
pub struct ReversingReranker;

#[async_trait]
impl RerankerService for ReversingReranker {
    async fn rerank(
        &self,
        _query: &str,
        documents: &[String],
        top_k: usize,
    ) -> Result<Vec<usize>, RagError> {
        Ok((0..documents.len()).rev().take(top_k).collect())
    }

    fn model_name(&self) -> &str {
        "reversing"
    }
}

/// Returns positions that do not exist in the candidate list
pub struct OutOfRangeReranker;

#[async_trait]
impl RerankerService for OutOfRangeReranker {
    async fn rerank(
        &self,
        _query: &str,
        documents: &[String],
        top_k: usize,
    ) -> Result<Vec<usize>, RagError> {
        Ok((documents.len()..documents.len() + top_k).collect())
    }

    fn model_name(&self) -> &str {
        "out-of-range"
    }
}

/// Language model that records every prompt it receives
#[derive(Default)]
pub struct RecordingModel {
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl RecordingModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for RecordingModel {
    async fn generate(&self, prompt: &str, _options: &GenerationOptions) -> String {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.prompts.lock().unwrap().push(prompt.to_string());
        format!("response-{}", n)
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Retriever returning a fixed evidence list and recording queries
pub struct FixedRetriever {
    hits: FusedResult,
    queries: Mutex<Vec<String>>,
}

impl FixedRetriever {
    pub fn new(documents: Vec<Document>) -> Self {
        let hits = documents
            .into_iter()
            .map(|document| RetrievalHit {
                document,
                score: 1.0,
                channel: Channel::Dense,
            })
            .collect();
        Self {
            hits,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl Retriever for FixedRetriever {
    async fn index(&self, documents: Vec<Document>) -> Result<IndexReport, RagError> {
        Ok(IndexReport {
            received: documents.len(),
            ..Default::default()
        })
    }

    async fn retrieve(&self, query: &str, top_k: usize) -> FusedResult {
        self.queries.lock().unwrap().push(query.to_string());
        self.hits.iter().take(top_k).cloned().collect()
    }

    fn kind(&self) -> RetrieverKind {
        RetrieverKind::LinearScan
    }
}

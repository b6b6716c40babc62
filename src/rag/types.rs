// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Core records flowing through indexing and retrieval

use serde::{Deserialize, Serialize};

/// Dense embedding produced by an [`crate::embeddings::EmbeddingService`]
pub type DenseVector = Vec<f32>;

/// A piece of textual evidence produced by an ingestion source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Producer of the document (e.g. "snowball", "research-report")
    pub source: String,
    /// Text that gets embedded and tokenized
    pub text: String,
    /// Unix timestamp (seconds) of the observation
    #[serde(default)]
    pub timestamp: i64,
    /// Ticker symbol, when the document is about one instrument
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    /// Research topic, when the document is topical
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
}

impl Document {
    /// Create a document stamped with the current time
    pub fn new(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            text: text.into(),
            timestamp: chrono::Utc::now().timestamp(),
            symbol: None,
            topic: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    /// Documents without text are never indexed
    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

/// Entry persisted in a vector store
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedEntry {
    pub id: u64,
    pub vector: DenseVector,
    pub payload: Document,
}

/// Retrieval channel that produced a hit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Dense,
    Sparse,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Dense => "dense",
            Channel::Sparse => "sparse",
        }
    }
}

/// A single candidate returned by a retrieval channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalHit {
    pub document: Document,
    /// Cosine similarity for dense hits, raw BM25 value for sparse hits
    pub score: f32,
    pub channel: Channel,
}

/// Ordered hits after fusion and optional reranking
pub type FusedResult = Vec<RetrievalHit>;

/// Summary of one indexing call
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IndexReport {
    /// Documents handed to the indexer
    pub received: usize,
    /// Documents kept after dropping empty text
    pub indexed: usize,
    /// Whether the dense channel accepted the batch
    pub dense_indexed: bool,
    /// Ids assigned by the vector store
    pub ids: Vec<u64>,
}

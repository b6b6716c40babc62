// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use async_trait::async_trait;
use serde::Serialize;

use super::errors::RagError;
use super::types::{Document, FusedResult, IndexReport};

/// Which retrieval strategy sits behind a [`Retriever`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrieverKind {
    Hybrid,
    LinearScan,
}

impl RetrieverKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RetrieverKind::Hybrid => "hybrid",
            RetrieverKind::LinearScan => "linear_scan",
        }
    }
}

/// Evidence retrieval capability shared by the research loop and ingestion
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Index a batch of documents; empty-text documents are skipped
    async fn index(&self, documents: Vec<Document>) -> Result<IndexReport, RagError>;

    /// At most `top_k` hits for `query`. Channel failures degrade to fewer
    /// (possibly zero) hits; this never fails.
    async fn retrieve(&self, query: &str, top_k: usize) -> FusedResult;

    fn kind(&self) -> RetrieverKind;
}

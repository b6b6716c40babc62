// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Document ingestion
//!
//! Sources produce [`Document`] batches; the scheduler pulls from every source
//! and pushes the combined batch into a [`DocumentSink`].

pub mod scheduler;
pub mod sources;

pub use scheduler::{IngestSummary, IngestionScheduler};
pub use sources::{DocumentSource, JsonFileSource, StaticSource};

use async_trait::async_trait;

use crate::rag::errors::RagError;
use crate::rag::types::{Document, IndexReport};

/// Anything that can index a document batch
#[async_trait]
pub trait DocumentSink: Send + Sync {
    async fn ingest(&self, documents: Vec<Document>) -> Result<IndexReport, RagError>;
}

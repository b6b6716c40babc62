// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Periodic ingestion loop
//!
//! Each cycle fetches every source, concatenates the batches and pushes them
//! into the sink as one batch. There is no backpressure: a new cycle starts
//! one interval after the previous one finished.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::sources::DocumentSource;
use super::DocumentSink;
use crate::rag::errors::RagError;
use crate::rag::types::IndexReport;

/// Outcome of one ingestion cycle
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestSummary {
    /// Documents fetched across all sources
    pub fetched: usize,
    /// Sources whose fetch failed this cycle
    pub failed_sources: Vec<String>,
    /// Sink report; `None` when nothing was fetched
    pub report: Option<IndexReport>,
}

pub struct IngestionScheduler {
    sources: Vec<Arc<dyn DocumentSource>>,
    sink: Arc<dyn DocumentSink>,
}

impl IngestionScheduler {
    pub fn new(sink: Arc<dyn DocumentSink>) -> Self {
        Self {
            sources: Vec::new(),
            sink,
        }
    }

    pub fn with_source(mut self, source: Arc<dyn DocumentSource>) -> Self {
        self.sources.push(source);
        self
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Pull every source once and push the combined batch
    ///
    /// A failing source is logged and skipped. Sink errors are returned.
    pub async fn ingest_all(&self) -> Result<IngestSummary, RagError> {
        let mut summary = IngestSummary::default();
        let mut documents = Vec::new();

        for source in &self.sources {
            match source.fetch().await {
                Ok(batch) => {
                    debug!(source = source.name(), count = batch.len(), "Fetched documents");
                    documents.extend(batch);
                }
                Err(e) => {
                    warn!(source = source.name(), error = %format!("{:#}", e), "Source fetch failed");
                    summary.failed_sources.push(source.name().to_string());
                }
            }
        }

        summary.fetched = documents.len();
        if documents.is_empty() {
            debug!("No documents fetched this cycle");
            return Ok(summary);
        }

        info!("Ingested {} documents", summary.fetched);
        summary.report = Some(self.sink.ingest(documents).await?);
        Ok(summary)
    }

    /// Repeat [`Self::ingest_all`] every `interval` until `cancel` fires
    ///
    /// Returns the number of completed cycles. An in-flight cycle always runs
    /// to completion so the dense and sparse channels index the same batch;
    /// cancellation is observed before a cycle starts and during the wait.
    pub async fn run_periodically(&self, interval: Duration, cancel: CancellationToken) -> usize {
        let mut cycles = 0;

        loop {
            if cancel.is_cancelled() {
                break;
            }

            let result = self.ingest_all().await;
            cycles += 1;
            if let Err(e) = result {
                error!(code = e.error_code(), error = %e, "Ingestion cycle failed");
            }
            if cancel.is_cancelled() {
                info!("Ingestion cancelled after cycle {}", cycles);
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = cancel.cancelled() => {
                    info!("Ingestion cancelled");
                    break;
                }
            }
        }

        cycles
    }
}

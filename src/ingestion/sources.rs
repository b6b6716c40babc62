// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::debug;

use crate::rag::types::Document;

/// Producer of document batches (scrapers, report feeds, file drops)
#[async_trait]
pub trait DocumentSource: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch(&self) -> Result<Vec<Document>>;
}

/// Reads a JSON array of documents from disk on every fetch
///
/// Missing `timestamp` fields default to 0; a `source_override` replaces the
/// `source` of every document read.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
    name: String,
    source_override: Option<String>,
}

impl JsonFileSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let name = format!("json:{}", path.display());
        Self {
            path,
            name,
            source_override: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source_override = Some(source.into());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl DocumentSource for JsonFileSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<Vec<Document>> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        let mut documents: Vec<Document> = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid document JSON in {}", self.path.display()))?;

        if let Some(source) = &self.source_override {
            for document in &mut documents {
                document.source = source.clone();
            }
        }

        debug!(path = %self.path.display(), count = documents.len(), "Read documents");
        Ok(documents)
    }
}

/// Fixed in-memory batch, returned on every fetch
#[derive(Debug, Clone)]
pub struct StaticSource {
    name: String,
    documents: Vec<Document>,
}

impl StaticSource {
    pub fn new(name: impl Into<String>, documents: Vec<Document>) -> Self {
        Self {
            name: name.into(),
            documents,
        }
    }
}

#[async_trait]
impl DocumentSource for StaticSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<Vec<Document>> {
        Ok(self.documents.clone())
    }
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Startup capability probe and retriever selection
//!
//! [`probe_capabilities`] runs once at startup. Its result picks a
//! [`RetrieverPlan`], and [`build_retriever`] constructs exactly that plan.
//! Construction failures after a successful probe are returned to the caller.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use super::errors::{bounded, RagError};
use super::hybrid::{HybridConfig, HybridRetriever};
use super::linear::LinearScanRetriever;
use super::retriever::Retriever;
use crate::config::PlatformConfig;
use crate::embeddings::{
    EmbeddingService, HashEmbeddingConfig, HashEmbeddingService, OnnxEmbeddingService,
};
use crate::rerank::{OnnxCrossEncoder, RerankerService, TermOverlapReranker};
use crate::vector::{InMemoryVectorStore, QdrantVectorStore, VectorStore};

/// What the running host can support
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    /// Embedding model and tokenizer files are present
    pub embedding_model: bool,
    /// Reranker model and tokenizer files are present
    pub reranker_model: bool,
    /// Vector store answered a ping within its timeout
    pub vector_store: bool,
}

impl Capabilities {
    pub fn hybrid_available(&self) -> bool {
        self.embedding_model && self.vector_store
    }

    /// Retriever the capabilities allow
    pub fn plan(&self) -> RetrieverPlan {
        if !self.hybrid_available() {
            return RetrieverPlan::LinearScan;
        }
        RetrieverPlan::Hybrid {
            embedding: EmbeddingBackend::Onnx,
            vector: VectorBackend::Qdrant,
            reranker: if self.reranker_model {
                RerankerBackend::CrossEncoder
            } else {
                RerankerBackend::Disabled
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingBackend {
    Onnx,
    Hash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorBackend {
    Qdrant,
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RerankerBackend {
    CrossEncoder,
    TermOverlap,
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RetrieverPlan {
    Hybrid {
        embedding: EmbeddingBackend,
        vector: VectorBackend,
        reranker: RerankerBackend,
    },
    LinearScan,
}

impl RetrieverPlan {
    /// Hybrid retrieval with no model files and no external services
    pub fn offline() -> Self {
        RetrieverPlan::Hybrid {
            embedding: EmbeddingBackend::Hash,
            vector: VectorBackend::Memory,
            reranker: RerankerBackend::TermOverlap,
        }
    }
}

fn files_present(label: &str, model_path: &Path, tokenizer_path: &Path) -> bool {
    let model = model_path.is_file();
    let tokenizer = tokenizer_path.is_file();
    if !(model && tokenizer) {
        info!(
            component = label,
            model = %model_path.display(),
            model_found = model,
            tokenizer = %tokenizer_path.display(),
            tokenizer_found = tokenizer,
            "Model files not found"
        );
    }
    model && tokenizer
}

async fn vector_store_reachable(config: &PlatformConfig) -> bool {
    let store = match QdrantVectorStore::new(&config.qdrant) {
        Ok(store) => store,
        Err(e) => {
            warn!(error = %e, "Vector store configuration rejected");
            return false;
        }
    };

    match bounded(config.qdrant.timeout(), store.ping(), || {
        RagError::store_unavailable("ping timed out")
    })
    .await
    {
        Ok(()) => true,
        Err(e) => {
            info!(
                host = %config.qdrant.host,
                port = config.qdrant.port,
                error = %e,
                "Vector store not reachable"
            );
            false
        }
    }
}

/// Check model files and vector store reachability once
pub async fn probe_capabilities(config: &PlatformConfig) -> Capabilities {
    let capabilities = Capabilities {
        embedding_model: files_present(
            "embedding",
            &config.embedding.model_path,
            &config.embedding.tokenizer_path,
        ),
        reranker_model: files_present(
            "reranker",
            &config.reranker.model_path,
            &config.reranker.tokenizer_path,
        ),
        vector_store: vector_store_reachable(config).await,
    };

    info!(
        embedding_model = capabilities.embedding_model,
        reranker_model = capabilities.reranker_model,
        vector_store = capabilities.vector_store,
        "Capability probe complete"
    );
    capabilities
}

/// Construct the retriever described by `plan`
///
/// # Errors
/// [`RagError::ModelUnavailable`] when a planned model fails to load, and
/// [`RagError::InvalidConfig`] for unusable store settings.
pub async fn build_retriever(
    config: &PlatformConfig,
    plan: RetrieverPlan,
) -> Result<Arc<dyn Retriever>, RagError> {
    let (embedding, vector, reranker) = match plan {
        RetrieverPlan::LinearScan => {
            info!("Using linear scan retriever");
            return Ok(Arc::new(LinearScanRetriever::new()));
        }
        RetrieverPlan::Hybrid {
            embedding,
            vector,
            reranker,
        } => (embedding, vector, reranker),
    };

    let embeddings: Arc<dyn EmbeddingService> = match embedding {
        EmbeddingBackend::Onnx => Arc::new(
            OnnxEmbeddingService::load(
                &config.embedding.model_name,
                &config.embedding.model_path,
                &config.embedding.tokenizer_path,
                config.embedding.batch_size,
            )
            .await?,
        ),
        EmbeddingBackend::Hash => Arc::new(HashEmbeddingService::new(HashEmbeddingConfig {
            batch_size: config.embedding.batch_size,
            ..Default::default()
        })?),
    };

    let store: Arc<dyn VectorStore> = match vector {
        VectorBackend::Qdrant => Arc::new(QdrantVectorStore::new(&config.qdrant)?),
        VectorBackend::Memory => Arc::new(InMemoryVectorStore::new()),
    };

    let mut retriever =
        HybridRetriever::new(embeddings, store).with_config(HybridConfig::from(config));

    let reranker_service: Option<Arc<dyn RerankerService>> = match reranker {
        RerankerBackend::CrossEncoder => Some(Arc::new(
            OnnxCrossEncoder::load(
                &config.reranker.model_name,
                &config.reranker.model_path,
                &config.reranker.tokenizer_path,
            )
            .await?,
        )),
        RerankerBackend::TermOverlap => Some(Arc::new(TermOverlapReranker::new())),
        RerankerBackend::Disabled => None,
    };
    if let Some(service) = reranker_service {
        retriever = retriever.with_reranker(service);
    }

    info!(?embedding, ?vector, ?reranker, "Using hybrid retriever");
    Ok(Arc::new(retriever))
}

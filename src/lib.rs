// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod cli;
pub mod config;
pub mod embeddings;
pub mod ingestion;
pub mod llm;
pub mod rag;
pub mod rerank;
pub mod sparse;
pub mod vector;
pub mod version;

// Re-export main types
pub use config::PlatformConfig;
pub use embeddings::{EmbeddingService, HashEmbeddingService, OnnxEmbeddingService};
pub use ingestion::{DocumentSink, DocumentSource, IngestionScheduler};
pub use llm::{GenerationOptions, LanguageModel, PlaceholderModel, ProviderRegistry};
pub use rag::{
    build_retriever, probe_capabilities, Capabilities, ConversationState,
    ConversationalResearchLoop, Document, FusedResult, HybridRetriever, LinearScanRetriever,
    RagError, ResearchOutcome, RetrievalHit, Retriever, RetrieverPlan,
};
pub use rerank::{OnnxCrossEncoder, RerankerService, TermOverlapReranker};
pub use sparse::{Bm25Params, SparseIndex};
pub use vector::{InMemoryVectorStore, QdrantVectorStore, VectorStore};

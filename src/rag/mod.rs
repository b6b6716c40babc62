// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// RAG (Retrieval-Augmented Generation) module
// Hybrid dense/sparse retrieval feeding a multi-round research loop

pub mod agentic;
pub mod capabilities;
pub mod errors;
pub mod hybrid;
pub mod linear;
pub mod prompts;
pub mod retriever;
pub mod types;

pub use agentic::{ConversationState, ConversationalResearchLoop, ResearchOutcome, NO_EVIDENCE_ANSWER};
pub use capabilities::{
    build_retriever, probe_capabilities, Capabilities, EmbeddingBackend, RerankerBackend,
    RetrieverPlan, VectorBackend,
};
pub use errors::RagError;
pub use hybrid::{fuse, HybridConfig, HybridRetriever};
pub use linear::LinearScanRetriever;
pub use retriever::{Retriever, RetrieverKind};
pub use types::{Channel, DenseVector, Document, FusedResult, IndexReport, IndexedEntry, RetrievalHit};

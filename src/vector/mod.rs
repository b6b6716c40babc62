// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod memory;
pub mod qdrant;
pub mod store;

pub use memory::InMemoryVectorStore;
pub use qdrant::QdrantVectorStore;
pub use store::{cosine_similarity, ScoredPayload, VectorStore};

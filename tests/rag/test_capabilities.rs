// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Capability probing and retriever construction

use std::fs;

use quant_rag_node::config::PlatformConfig;
use quant_rag_node::rag::{
    build_retriever, probe_capabilities, Capabilities, EmbeddingBackend, RerankerBackend,
    RetrieverKind, RetrieverPlan, VectorBackend,
};
use serde_json::json;
use tempfile::TempDir;

use crate::common::market_notes;

fn unreachable_config() -> PlatformConfig {
    let mut config = PlatformConfig::default();
    config.embedding.model_path = "/nonexistent/bge/model.onnx".into();
    config.embedding.tokenizer_path = "/nonexistent/bge/tokenizer.json".into();
    config.reranker.model_path = "/nonexistent/reranker/model.onnx".into();
    config.reranker.tokenizer_path = "/nonexistent/reranker/tokenizer.json".into();
    config.qdrant.host = "127.0.0.1".to_string();
    config.qdrant.port = 1;
    config.qdrant.timeout_ms = 500;
    config
}

#[tokio::test]
async fn test_bare_host_falls_back_to_linear_scan() {
    let config = unreachable_config();

    let capabilities = probe_capabilities(&config).await;
    assert!(!capabilities.hybrid_available());

    let retriever = build_retriever(&config, capabilities.plan()).await.unwrap();
    assert_eq!(retriever.kind(), RetrieverKind::LinearScan);

    retriever.index(market_notes()).await.unwrap();
    let hits = retriever.retrieve("pivot breakout", 2).await;
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].document.source, "research-note");
}

#[tokio::test]
async fn test_model_files_detected_without_store() {
    let dir = TempDir::new().unwrap();
    let model = dir.path().join("model.onnx");
    let tokenizer = dir.path().join("tokenizer.json");
    fs::write(&model, b"not really onnx").unwrap();
    fs::write(&tokenizer, b"{}").unwrap();

    let mut config = unreachable_config();
    config.embedding.model_path = model;
    config.embedding.tokenizer_path = tokenizer;

    let capabilities = probe_capabilities(&config).await;
    assert_eq!(
        capabilities,
        Capabilities {
            embedding_model: true,
            reranker_model: false,
            vector_store: false,
        }
    );
    // Hybrid needs both embeddings and a reachable store
    assert_eq!(capabilities.plan(), RetrieverPlan::LinearScan);
}

#[test]
fn test_plan_serialization() {
    assert_eq!(
        serde_json::to_value(RetrieverPlan::offline()).unwrap(),
        json!({
            "kind": "hybrid",
            "embedding": "hash",
            "vector": "memory",
            "reranker": "term_overlap"
        })
    );
    assert_eq!(
        serde_json::to_value(RetrieverPlan::LinearScan).unwrap(),
        json!({"kind": "linear_scan"})
    );
}

#[test]
fn test_full_capabilities_plan_cross_encoder() {
    let capabilities = Capabilities {
        embedding_model: true,
        reranker_model: true,
        vector_store: true,
    };
    assert_eq!(
        capabilities.plan(),
        RetrieverPlan::Hybrid {
            embedding: EmbeddingBackend::Onnx,
            vector: VectorBackend::Qdrant,
            reranker: RerankerBackend::CrossEncoder,
        }
    );
}

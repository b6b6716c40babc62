// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! ONNX embedding and cross-encoder loading
//!
//! Tests marked `#[ignore]` need the model files under `models/`.

use quant_rag_node::embeddings::{EmbeddingService, OnnxEmbeddingService};
use quant_rag_node::rag::RagError;
use quant_rag_node::rerank::{OnnxCrossEncoder, RerankerService};

const MODEL_PATH: &str = "models/bge-large-zh-onnx/model.onnx";
const TOKENIZER_PATH: &str = "models/bge-large-zh-onnx/tokenizer.json";
const RERANKER_PATH: &str = "models/bge-reranker-large-onnx/model.onnx";
const RERANKER_TOKENIZER_PATH: &str = "models/bge-reranker-large-onnx/tokenizer.json";

#[tokio::test]
async fn test_missing_embedding_model_is_unavailable() {
    let result = OnnxEmbeddingService::load(
        "bge-large-zh",
        "/nonexistent/model.onnx",
        "/nonexistent/tokenizer.json",
        8,
    )
    .await;

    match result {
        Err(RagError::ModelUnavailable { model, .. }) => assert_eq!(model, "bge-large-zh"),
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("loading a missing model must fail"),
    }
}

#[tokio::test]
async fn test_missing_reranker_model_is_unavailable() {
    let result = OnnxCrossEncoder::load(
        "bge-reranker-large",
        "/nonexistent/reranker.onnx",
        "/nonexistent/tokenizer.json",
    )
    .await;

    assert!(matches!(result, Err(RagError::ModelUnavailable { .. })));
}

#[tokio::test]
#[ignore] // Requires model files in models/
async fn test_embedding_dimension_and_batching() {
    let model = OnnxEmbeddingService::load("bge-large-zh", MODEL_PATH, TOKENIZER_PATH, 2)
        .await
        .expect("Failed to load model");

    let texts: Vec<String> = ["上证指数", "三买", "MACD 金叉"]
        .iter()
        .map(|t| t.to_string())
        .collect();
    let vectors = model.encode(&texts).await.unwrap();

    assert_eq!(vectors.len(), 3);
    assert!(vectors.iter().all(|v| v.len() == model.dimension()));
}

#[tokio::test]
#[ignore] // Requires model files in models/
async fn test_cross_encoder_prefers_relevant_document() {
    let reranker = OnnxCrossEncoder::load(
        "bge-reranker-large",
        RERANKER_PATH,
        RERANKER_TOKENIZER_PATH,
    )
    .await
    .expect("Failed to load reranker");

    let documents = vec![
        "央行维持贷款利率不变".to_string(),
        "日线级别出现第三类买点".to_string(),
    ];
    let order = reranker.rerank("第三类买点", &documents, 2).await.unwrap();

    assert_eq!(order, vec![1, 0]);
}

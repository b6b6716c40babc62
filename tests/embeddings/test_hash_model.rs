// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Deterministic hash embeddings used for offline retrieval

use quant_rag_node::embeddings::{EmbeddingService, HashEmbeddingConfig, HashEmbeddingService};
use quant_rag_node::rag::RagError;
use quant_rag_node::vector::cosine_similarity;

fn service(dimension: usize, batch_size: usize) -> HashEmbeddingService {
    HashEmbeddingService::new(HashEmbeddingConfig {
        dimension,
        batch_size,
        ..Default::default()
    })
    .unwrap()
}

fn strings(texts: &[&str]) -> Vec<String> {
    texts.iter().map(|t| t.to_string()).collect()
}

#[tokio::test]
async fn test_same_text_same_vector_across_instances() {
    let a = service(128, 4);
    let b = service(128, 16);

    let va = a.encode(&strings(&["缠论 三买"])).await.unwrap();
    let vb = b.encode(&strings(&["缠论 三买"])).await.unwrap();

    assert_eq!(va, vb);
}

#[tokio::test]
async fn test_output_order_matches_input_order() {
    let svc = service(32, 2);
    let texts = strings(&["one", "two", "three", "four", "five"]);

    let batch = svc.encode(&texts).await.unwrap();
    assert_eq!(batch.len(), texts.len());

    for (text, vector) in texts.iter().zip(&batch) {
        let single = svc.encode(&[text.clone()]).await.unwrap();
        assert_eq!(&single[0], vector);
    }
}

#[tokio::test]
async fn test_vectors_are_unit_length_and_distinct() {
    let svc = service(384, 32);
    let vectors = svc
        .encode(&strings(&["MACD golden cross", "lending rate steady"]))
        .await
        .unwrap();

    for v in &vectors {
        assert_eq!(v.len(), 384);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }
    assert!(cosine_similarity(&vectors[0], &vectors[1]) < 0.99);
}

#[tokio::test]
async fn test_empty_input_returns_empty() {
    let svc = service(16, 8);
    assert!(svc.encode(&[]).await.unwrap().is_empty());
}

#[test]
fn test_zero_dimension_rejected() {
    let result = HashEmbeddingService::new(HashEmbeddingConfig {
        dimension: 0,
        ..Default::default()
    });
    assert!(matches!(result, Err(RagError::InvalidConfig(_))));
}

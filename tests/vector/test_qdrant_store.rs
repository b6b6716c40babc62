// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Qdrant adapter
//!
//! Tests marked `#[ignore]` expect a Qdrant server on localhost:6333.

use std::time::{Duration, Instant};

use quant_rag_node::config::QdrantConfig;
use quant_rag_node::rag::{Document, RagError};
use quant_rag_node::vector::{QdrantVectorStore, VectorStore};

fn unreachable() -> QdrantConfig {
    QdrantConfig {
        host: "127.0.0.1".to_string(),
        port: 1,
        timeout_ms: 500,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_unreachable_server_is_unavailable_not_fatal() {
    let store = QdrantVectorStore::new(&unreachable()).unwrap();
    let started = Instant::now();

    let ping = store.ping().await;
    let ensure = store.ensure_collection(8).await;
    let search = store.search(&[0.0; 8], 3).await;

    assert!(matches!(ping, Err(RagError::StoreUnavailable(_))));
    assert!(matches!(ensure, Err(RagError::StoreUnavailable(_))));
    assert!(matches!(search, Err(RagError::StoreUnavailable(_))));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
fn test_invalid_settings_rejected() {
    let config = QdrantConfig {
        collection_name: "  ".to_string(),
        ..Default::default()
    };
    assert!(matches!(
        QdrantVectorStore::new(&config),
        Err(RagError::InvalidConfig(_))
    ));
}

#[tokio::test]
#[ignore] // Requires a running Qdrant server
async fn test_roundtrip_against_local_server() {
    let config = QdrantConfig {
        collection_name: format!("rag_test_{}", chrono::Utc::now().timestamp_millis()),
        ..Default::default()
    };
    let store = QdrantVectorStore::new(&config).unwrap();
    store.ping().await.unwrap();
    store.ensure_collection(3).await.unwrap();

    let ids = store
        .upsert(
            vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]],
            vec![
                Document::new("a", "x axis").with_symbol("SH000001"),
                Document::new("b", "y axis"),
            ],
        )
        .await
        .unwrap();
    assert_eq!(ids.len(), 2);

    let results = store.search(&[0.9, 0.1, 0.0], 1).await.unwrap();
    assert_eq!(results[0].payload.text, "x axis");
    assert_eq!(results[0].payload.symbol.as_deref(), Some("SH000001"));

    let mismatch = store.ensure_collection(4).await;
    assert!(matches!(mismatch, Err(RagError::DimensionMismatch { .. })));
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for the quant research RAG node

/// Full version string with feature description
pub const VERSION: &str = "v0.1.0-hybrid-retrieval-2026-10-17";

/// Semantic version number
pub const VERSION_NUMBER: &str = "0.1.0";

pub const VERSION_MAJOR: u32 = 0;
pub const VERSION_MINOR: u32 = 1;
pub const VERSION_PATCH: u32 = 0;

/// Build date
pub const BUILD_DATE: &str = "2026-10-17";

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "hybrid-retrieval",
    "bm25-okapi",
    "onnx-embeddings",
    "cross-encoder-rerank",
    "qdrant-rest",
    "channel-degradation",
    "research-loop",
    "capability-probe",
    "provider-registry",
    "periodic-ingestion",
];

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("Quant RAG Node {} ({})", VERSION_NUMBER, BUILD_DATE)
}

/// Get full version info for status output
pub fn get_version_info() -> serde_json::Value {
    serde_json::json!({
        "version": VERSION_NUMBER,
        "build": VERSION,
        "date": BUILD_DATE,
        "features": FEATURES,
    })
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Error types for the retrieval pipeline
//!
//! Error handling follows the channel boundary:
//! - Model errors (embedding or reranker cannot load or respond)
//! - Store errors (vector store unreachable, timed out or misconfigured)
//! - Dimension errors (vector length does not match the collection)
//! - Configuration and request validation errors

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// Errors raised by retrieval components
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RagError {
    /// Embedding or reranking model could not be loaded or did not respond
    #[error("Model unavailable ({model}): {reason}")]
    ModelUnavailable { model: String, reason: String },

    /// Vector store is unreachable, timed out, or rejected the request
    #[error("Vector store unavailable: {0}")]
    StoreUnavailable(String),

    /// Vector length does not match the collection dimensionality
    #[error("Dimension mismatch: collection expects {expected}D vectors, got {actual}D")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Setup-time configuration problem
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Caller supplied an out-of-range argument
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl RagError {
    /// Build a `ModelUnavailable` error from any displayable cause
    pub fn model_unavailable(model: impl Into<String>, reason: impl Display) -> Self {
        RagError::ModelUnavailable {
            model: model.into(),
            reason: reason.to_string(),
        }
    }

    /// Build a `StoreUnavailable` error from any displayable cause
    pub fn store_unavailable(reason: impl Display) -> Self {
        RagError::StoreUnavailable(reason.to_string())
    }

    /// Get error code for logging
    pub fn error_code(&self) -> &'static str {
        match self {
            RagError::ModelUnavailable { .. } => "MODEL_UNAVAILABLE",
            RagError::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            RagError::DimensionMismatch { .. } => "DIMENSION_MISMATCH",
            RagError::InvalidConfig(_) => "INVALID_CONFIG",
            RagError::InvalidRequest(_) => "INVALID_REQUEST",
        }
    }

    /// Whether a retrieval channel may absorb this error and continue empty
    pub fn is_degradable(&self) -> bool {
        matches!(
            self,
            RagError::ModelUnavailable { .. } | RagError::StoreUnavailable(_)
        )
    }
}

/// Run `fut` under a deadline; elapsing is reported through `on_timeout`
/// so that a timeout looks exactly like the service being unavailable.
pub async fn bounded<T, F>(
    duration: Duration,
    fut: F,
    on_timeout: impl FnOnce() -> RagError,
) -> Result<T, RagError>
where
    F: Future<Output = Result<T, RagError>>,
{
    match tokio::time::timeout(duration, fut).await {
        Ok(result) => result,
        Err(_) => Err(on_timeout()),
    }
}

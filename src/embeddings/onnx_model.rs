// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! ONNX sentence encoder
//!
//! Wraps ONNX Runtime to run a sentence transformer (BGE, MiniLM, ...):
//! - CUDA execution provider with automatic CPU fallback
//! - BERT tokenization with truncation and per-batch padding
//! - Attention-masked mean pooling over token embeddings
//! - Output dimension detected from a validation inference at load time
//!
//! Session and tokenizer helpers are shared with the cross-encoder reranker.

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use ndarray::{Array2, Axis};
use ort::execution_providers::{CPUExecutionProvider, CUDAExecutionProvider};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use tokenizers::{Encoding, Tokenizer, TruncationParams};
use tracing::{debug, info, warn};

use super::{l2_normalize, EmbeddingService};
use crate::rag::errors::RagError;
use crate::rag::types::DenseVector;

/// Maximum sequence length fed to the encoder
const MAX_SEQUENCE_LENGTH: usize = 512;

/// Intra-op threads for CPU inference
const INTRA_THREADS: usize = 4;

/// Build an ONNX Runtime session, trying CUDA first and falling back to CPU
pub(crate) fn build_session(model_path: &Path) -> Result<Session> {
    if !model_path.exists() {
        anyhow::bail!("ONNX model file not found: {}", model_path.display());
    }

    let cuda_result = Session::builder()
        .context("Failed to create session builder")?
        .with_execution_providers([CUDAExecutionProvider::default().build()])
        .context("Failed to set CUDA execution provider")?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .context("Failed to set optimization level")?
        .with_intra_threads(INTRA_THREADS)
        .context("Failed to set intra threads")?
        .commit_from_file(model_path);

    match cuda_result {
        Ok(session) => {
            info!("CUDA execution provider initialized for {}", model_path.display());
            Ok(session)
        }
        Err(e) => {
            warn!("CUDA execution provider failed: {}, falling back to CPU", e);
            Session::builder()
                .context("Failed to create session builder")?
                .with_execution_providers([CPUExecutionProvider::default().build()])
                .context("Failed to set CPU execution provider")?
                .with_optimization_level(GraphOptimizationLevel::Level3)
                .context("Failed to set optimization level")?
                .with_intra_threads(INTRA_THREADS)
                .context("Failed to set intra threads")?
                .commit_from_file(model_path)
                .context(format!(
                    "Failed to load ONNX model from {}",
                    model_path.display()
                ))
        }
    }
}

/// Load a HuggingFace tokenizer with truncation enabled
pub(crate) fn load_tokenizer(tokenizer_path: &Path) -> Result<Tokenizer> {
    if !tokenizer_path.exists() {
        anyhow::bail!("Tokenizer file not found: {}", tokenizer_path.display());
    }

    let mut tokenizer = Tokenizer::from_file(tokenizer_path)
        .map_err(|e| anyhow!("Failed to load tokenizer: {}", e))?;
    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length: MAX_SEQUENCE_LENGTH,
            ..Default::default()
        }))
        .map_err(|e| anyhow!("Failed to configure truncation: {}", e))?;

    Ok(tokenizer)
}

/// Whether a graph declares a `token_type_ids` input
///
/// BERT exports take segment ids; XLM-R exports accept only ids and mask.
pub(crate) fn accepts_token_type_ids<'a>(
    input_names: impl IntoIterator<Item = &'a str>,
) -> bool {
    input_names.into_iter().any(|name| name == "token_type_ids")
}

/// Padded model inputs for a batch of encodings
pub(crate) struct PaddedBatch {
    pub input_ids: Array2<i64>,
    pub attention_mask: Array2<i64>,
    pub token_type_ids: Array2<i64>,
    /// Row-major copy of the attention mask, kept for pooling
    pub mask: Vec<i64>,
    pub max_len: usize,
}

/// Pad every encoding to the longest sequence in the batch
pub(crate) fn pad_batch(encodings: &[Encoding]) -> Result<PaddedBatch> {
    let batch = encodings.len();
    let max_len = encodings
        .iter()
        .map(|enc| enc.get_ids().len())
        .max()
        .unwrap_or(0);

    let mut input_ids = Vec::with_capacity(batch * max_len);
    let mut attention_mask = Vec::with_capacity(batch * max_len);
    let mut token_type_ids = Vec::with_capacity(batch * max_len);

    for encoding in encodings {
        let ids = encoding.get_ids();
        let padding = max_len - ids.len();

        input_ids.extend(ids.iter().map(|&id| id as i64));
        attention_mask.extend(encoding.get_attention_mask().iter().map(|&m| m as i64));
        token_type_ids.extend(encoding.get_type_ids().iter().map(|&t| t as i64));

        input_ids.extend(std::iter::repeat(0i64).take(padding));
        attention_mask.extend(std::iter::repeat(0i64).take(padding));
        token_type_ids.extend(std::iter::repeat(0i64).take(padding));
    }

    let mask = attention_mask.clone();

    Ok(PaddedBatch {
        input_ids: Array2::from_shape_vec((batch, max_len), input_ids)
            .context("Failed to create batch input_ids array")?,
        attention_mask: Array2::from_shape_vec((batch, max_len), attention_mask)
            .context("Failed to create batch attention_mask array")?,
        token_type_ids: Array2::from_shape_vec((batch, max_len), token_type_ids)
            .context("Failed to create batch token_type_ids array")?,
        mask,
        max_len,
    })
}

/// ONNX-based sentence encoder
///
/// Session and tokenizer are behind `Arc` so the service clones cheaply into
/// `spawn_blocking` tasks.
#[derive(Clone)]
pub struct OnnxEmbeddingService {
    session: Arc<Mutex<Session>>,
    tokenizer: Arc<Tokenizer>,
    model_name: String,
    dimension: usize,
    batch_size: usize,
    normalize: bool,
    uses_token_type_ids: bool,
}

impl std::fmt::Debug for OnnxEmbeddingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxEmbeddingService")
            .field("model_name", &self.model_name)
            .field("dimension", &self.dimension)
            .field("batch_size", &self.batch_size)
            .field("uses_token_type_ids", &self.uses_token_type_ids)
            .finish_non_exhaustive()
    }
}

impl OnnxEmbeddingService {
    /// Load the encoder from disk
    ///
    /// # Errors
    /// [`RagError::ModelUnavailable`] when the model or tokenizer file is
    /// missing or invalid, or the validation inference fails.
    pub async fn load(
        model_name: impl Into<String>,
        model_path: impl AsRef<Path>,
        tokenizer_path: impl AsRef<Path>,
        batch_size: usize,
    ) -> Result<Self, RagError> {
        let model_name = model_name.into();
        let model_path = model_path.as_ref().to_path_buf();
        let tokenizer_path = tokenizer_path.as_ref().to_path_buf();
        let name = model_name.clone();

        info!("Loading embedding model: {}", model_name);

        tokio::task::spawn_blocking(move || {
            Self::load_blocking(name, &model_path, &tokenizer_path, batch_size.max(1))
        })
        .await
        .map_err(|e| RagError::model_unavailable(&model_name, e))?
        .map_err(|e| RagError::model_unavailable(&model_name, format!("{:#}", e)))
    }

    fn load_blocking(
        model_name: String,
        model_path: &Path,
        tokenizer_path: &Path,
        batch_size: usize,
    ) -> Result<Self> {
        let tokenizer = load_tokenizer(tokenizer_path)?;
        let session = build_session(model_path)?;
        let uses_token_type_ids =
            accepts_token_type_ids(session.inputs.iter().map(|i| i.name.as_str()));
        debug!(uses_token_type_ids, "Embedding model inputs inspected");

        let mut service = Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
            model_name,
            dimension: 0,
            batch_size,
            normalize: true,
            uses_token_type_ids,
        };

        // Token-level output is [batch, seq_len, hidden]; hidden is the embedding size
        let probe = service.embed_batch_blocking(&["validation test".to_string()])?;
        service.dimension = probe.first().map(|v| v.len()).unwrap_or(0);
        if service.dimension == 0 {
            anyhow::bail!("Model produced an empty embedding during validation");
        }

        info!(
            "Embedding model {} loaded ({} dimensions)",
            service.model_name, service.dimension
        );

        Ok(service)
    }

    /// Skip the final L2 normalization (for models that normalize in-graph)
    pub fn without_normalization(mut self) -> Self {
        self.normalize = false;
        self
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed_batch_blocking(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let encodings: Vec<Encoding> = texts
            .iter()
            .map(|text| {
                self.tokenizer
                    .encode(text.as_str(), true)
                    .map_err(|e| anyhow!("Tokenization failed: {}", e))
            })
            .collect::<Result<Vec<_>>>()?;

        let batch = pad_batch(&encodings)?;

        let mut session_guard = self
            .session
            .lock()
            .map_err(|_| anyhow!("ONNX session lock poisoned"))?;
        let outputs = if self.uses_token_type_ids {
            session_guard.run(ort::inputs![
                "input_ids" => Value::from_array(batch.input_ids)?,
                "attention_mask" => Value::from_array(batch.attention_mask)?,
                "token_type_ids" => Value::from_array(batch.token_type_ids)?
            ])?
        } else {
            session_guard.run(ort::inputs![
                "input_ids" => Value::from_array(batch.input_ids)?,
                "attention_mask" => Value::from_array(batch.attention_mask)?
            ])?
        };

        // Index [0]: output names differ between exported models
        let output_array = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;

        if output_array.ndim() != 3 {
            anyhow::bail!(
                "Model outputs unexpected shape {:?} (expected [batch, seq_len, hidden])",
                output_array.shape()
            );
        }

        let mut embeddings = Vec::with_capacity(texts.len());
        for batch_idx in 0..texts.len() {
            let item = output_array.index_axis(Axis(0), batch_idx);
            let seq_len = item.shape()[0];
            let hidden_dim = item.shape()[1];
            let item_mask = &batch.mask[batch_idx * batch.max_len..(batch_idx + 1) * batch.max_len];

            let mut pooled = vec![0.0f32; hidden_dim];
            let mut sum_mask = 0.0f32;
            for i in 0..seq_len {
                let mask_value = item_mask[i] as f32;
                sum_mask += mask_value;
                for j in 0..hidden_dim {
                    pooled[j] += item[[i, j]] * mask_value;
                }
            }
            for val in &mut pooled {
                *val /= sum_mask.max(1e-9);
            }
            if self.normalize {
                l2_normalize(&mut pooled);
            }

            embeddings.push(pooled);
        }

        if self.dimension > 0 {
            if let Some((i, emb)) = embeddings
                .iter()
                .enumerate()
                .find(|(_, e)| e.len() != self.dimension)
            {
                anyhow::bail!(
                    "Unexpected embedding dimension at index {}: {} (expected {})",
                    i,
                    emb.len(),
                    self.dimension
                );
            }
        }

        Ok(embeddings)
    }
}

#[async_trait]
impl EmbeddingService for OnnxEmbeddingService {
    async fn encode(&self, texts: &[String]) -> Result<Vec<DenseVector>, RagError> {
        let mut embeddings = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(self.batch_size) {
            let service = self.clone();
            let chunk = chunk.to_vec();
            let vectors = tokio::task::spawn_blocking(move || service.embed_batch_blocking(&chunk))
                .await
                .map_err(|e| RagError::model_unavailable(&self.model_name, e))?
                .map_err(|e| RagError::model_unavailable(&self.model_name, format!("{:#}", e)))?;
            embeddings.extend(vectors);
        }

        Ok(embeddings)
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

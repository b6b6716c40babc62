// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! ONNX cross-encoder reranker
//!
//! Each (query, document) pair is encoded as one sequence
//! (`[CLS] query [SEP] document [SEP]`) and the first output logit is the
//! relevance score. Models exported without a `token_type_ids` input
//! (XLM-R based rerankers such as bge-reranker) are detected at load time.

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use ndarray::Axis;
use ort::session::Session;
use ort::value::Value;
use tokenizers::{Encoding, Tokenizer};
use tracing::{debug, info};

use super::{rank_by_scores, RerankerService};
use crate::embeddings::onnx_model::{
    accepts_token_type_ids, build_session, load_tokenizer, pad_batch,
};
use crate::rag::errors::RagError;

/// Pairs scored per inference call
const DEFAULT_BATCH_SIZE: usize = 16;

#[derive(Clone)]
pub struct OnnxCrossEncoder {
    session: Arc<Mutex<Session>>,
    tokenizer: Arc<Tokenizer>,
    model_name: String,
    uses_token_type_ids: bool,
    batch_size: usize,
}

impl std::fmt::Debug for OnnxCrossEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxCrossEncoder")
            .field("model_name", &self.model_name)
            .field("uses_token_type_ids", &self.uses_token_type_ids)
            .finish_non_exhaustive()
    }
}

impl OnnxCrossEncoder {
    /// Load the cross-encoder; missing or invalid files give
    /// [`RagError::ModelUnavailable`]
    pub async fn load(
        model_name: impl Into<String>,
        model_path: impl AsRef<Path>,
        tokenizer_path: impl AsRef<Path>,
    ) -> Result<Self, RagError> {
        let model_name = model_name.into();
        let model_path = model_path.as_ref().to_path_buf();
        let tokenizer_path = tokenizer_path.as_ref().to_path_buf();
        let name = model_name.clone();

        info!("Loading reranker model: {}", model_name);

        tokio::task::spawn_blocking(move || Self::load_blocking(name, &model_path, &tokenizer_path))
            .await
            .map_err(|e| RagError::model_unavailable(&model_name, e))?
            .map_err(|e| RagError::model_unavailable(&model_name, format!("{:#}", e)))
    }

    fn load_blocking(model_name: String, model_path: &Path, tokenizer_path: &Path) -> Result<Self> {
        let tokenizer = load_tokenizer(tokenizer_path)?;
        let session = build_session(model_path)?;

        let input_names: Vec<&str> = session.inputs.iter().map(|i| i.name.as_str()).collect();
        debug!("Reranker inputs: {:?}", input_names);
        let uses_token_type_ids = accepts_token_type_ids(input_names.iter().copied());

        let encoder = Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
            model_name,
            uses_token_type_ids,
            batch_size: DEFAULT_BATCH_SIZE,
        };

        encoder
            .score_blocking("validation", &["validation test".to_string()])
            .context("Reranker validation inference failed")?;

        info!("Reranker model {} loaded", encoder.model_name);
        Ok(encoder)
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    fn score_blocking(&self, query: &str, documents: &[String]) -> Result<Vec<f32>> {
        if documents.is_empty() {
            return Ok(vec![]);
        }

        let encodings: Vec<Encoding> = documents
            .iter()
            .map(|doc| {
                self.tokenizer
                    .encode((query, doc.as_str()), true)
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

        let logits = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract logits tensor")?;

        if logits.ndim() == 0 || logits.shape()[0] != documents.len() {
            anyhow::bail!(
                "Reranker outputs unexpected shape {:?} for {} pairs",
                logits.shape(),
                documents.len()
            );
        }

        (0..documents.len())
            .map(|i| {
                logits
                    .index_axis(Axis(0), i)
                    .iter()
                    .next()
                    .copied()
                    .ok_or_else(|| anyhow!("Empty logits for pair {}", i))
            })
            .collect()
    }
}

#[async_trait]
impl RerankerService for OnnxCrossEncoder {
    async fn rerank(
        &self,
        query: &str,
        documents: &[String],
        top_k: usize,
    ) -> Result<Vec<usize>, RagError> {
        let mut scores = Vec::with_capacity(documents.len());

        for chunk in documents.chunks(self.batch_size) {
            let encoder = self.clone();
            let query = query.to_string();
            let chunk = chunk.to_vec();
            let chunk_scores =
                tokio::task::spawn_blocking(move || encoder.score_blocking(&query, &chunk))
                    .await
                    .map_err(|e| RagError::model_unavailable(&self.model_name, e))?
                    .map_err(|e| {
                        RagError::model_unavailable(&self.model_name, format!("{:#}", e))
                    })?;
            scores.extend(chunk_scores);
        }

        Ok(rank_by_scores(&scores, top_k))
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

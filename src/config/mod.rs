// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Platform configuration
//!
//! Every setting can be supplied through the environment; unset or blank
//! values fall back to the defaults below. A value that does not parse is an
//! [`RagError::InvalidConfig`] from `from_env`, and [`PlatformConfig::validate`]
//! rejects out-of-range values before any component is built.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::rag::errors::RagError;
use crate::sparse::Bm25Params;

fn env_string(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: FromStr>(key: &str, default: T) -> Result<T, RagError> {
    match env_optional(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| {
            RagError::InvalidConfig(format!("{}: invalid value {:?}", key, raw.trim()))
        }),
    }
}

/// Connection parameters for the Qdrant vector store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QdrantConfig {
    /// Host name, or a full `http(s)://` base URL without port
    pub host: String,
    pub port: u16,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub collection_name: String,
    /// Per-request timeout
    pub timeout_ms: u64,
}

impl Default for QdrantConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6333,
            api_key: None,
            collection_name: "finance_rag_documents".to_string(),
            timeout_ms: 10_000,
        }
    }
}

impl QdrantConfig {
    pub fn from_env() -> Result<Self, RagError> {
        let defaults = Self::default();
        Ok(Self {
            host: env_string("QDRANT_HOST", &defaults.host),
            port: env_parse("QDRANT_PORT", defaults.port)?,
            api_key: env_optional("QDRANT_API_KEY"),
            collection_name: env_string("QDRANT_COLLECTION", &defaults.collection_name),
            timeout_ms: env_parse("QDRANT_TIMEOUT_MS", defaults.timeout_ms)?,
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn validate(&self) -> Result<(), RagError> {
        if self.host.trim().is_empty() {
            return Err(RagError::InvalidConfig("QDRANT_HOST must not be empty".to_string()));
        }
        if self.port == 0 {
            return Err(RagError::InvalidConfig("QDRANT_PORT must be non-zero".to_string()));
        }
        if self.collection_name.trim().is_empty() {
            return Err(RagError::InvalidConfig(
                "QDRANT_COLLECTION must not be empty".to_string(),
            ));
        }
        if self
            .collection_name
            .chars()
            .any(|c| c == '/' || c.is_whitespace())
        {
            return Err(RagError::InvalidConfig(format!(
                "QDRANT_COLLECTION contains invalid characters: {:?}",
                self.collection_name
            )));
        }
        if self.timeout_ms == 0 {
            return Err(RagError::InvalidConfig(
                "QDRANT_TIMEOUT_MS must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Sentence encoder location and batching
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    pub model_name: String,
    pub model_path: PathBuf,
    pub tokenizer_path: PathBuf,
    pub batch_size: usize,
    pub timeout_ms: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model_name: "BAAI/bge-large-zh".to_string(),
            model_path: PathBuf::from("models/bge-large-zh-onnx/model.onnx"),
            tokenizer_path: PathBuf::from("models/bge-large-zh-onnx/tokenizer.json"),
            batch_size: 32,
            timeout_ms: 30_000,
        }
    }
}

impl EmbeddingSettings {
    pub fn from_env() -> Result<Self, RagError> {
        let defaults = Self::default();
        Ok(Self {
            model_name: env_string("EMBEDDING_MODEL_NAME", &defaults.model_name),
            model_path: env_optional("EMBEDDING_MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_path),
            tokenizer_path: env_optional("EMBEDDING_TOKENIZER_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.tokenizer_path),
            batch_size: env_parse("EMBEDDING_BATCH_SIZE", defaults.batch_size)?,
            timeout_ms: env_parse("EMBEDDING_TIMEOUT_MS", defaults.timeout_ms)?,
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Cross-encoder location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RerankerSettings {
    pub model_name: String,
    pub model_path: PathBuf,
    pub tokenizer_path: PathBuf,
    pub timeout_ms: u64,
}

impl Default for RerankerSettings {
    fn default() -> Self {
        Self {
            model_name: "BAAI/bge-reranker-large".to_string(),
            model_path: PathBuf::from("models/bge-reranker-large-onnx/model.onnx"),
            tokenizer_path: PathBuf::from("models/bge-reranker-large-onnx/tokenizer.json"),
            timeout_ms: 30_000,
        }
    }
}

impl RerankerSettings {
    pub fn from_env() -> Result<Self, RagError> {
        let defaults = Self::default();
        Ok(Self {
            model_name: env_string("RERANKER_MODEL_NAME", &defaults.model_name),
            model_path: env_optional("RERANKER_MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_path),
            tokenizer_path: env_optional("RERANKER_TOKENIZER_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.tokenizer_path),
            timeout_ms: env_parse("RERANKER_TIMEOUT_MS", defaults.timeout_ms)?,
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Retrieval and research-loop defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalSettings {
    pub bm25: Bm25Params,
    pub default_top_k: usize,
    pub default_rounds: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            bm25: Bm25Params::default(),
            default_top_k: 5,
            default_rounds: 2,
        }
    }
}

impl RetrievalSettings {
    pub fn from_env() -> Result<Self, RagError> {
        let defaults = Self::default();
        Ok(Self {
            bm25: Bm25Params {
                k1: env_parse("BM25_K1", defaults.bm25.k1)?,
                b: env_parse("BM25_B", defaults.bm25.b)?,
                epsilon: env_parse("BM25_EPSILON", defaults.bm25.epsilon)?,
            },
            default_top_k: env_parse("DEFAULT_TOP_K", defaults.default_top_k)?,
            default_rounds: env_parse("DEFAULT_ROUNDS", defaults.default_rounds)?,
        })
    }
}

/// Access tokens for supported generation providers
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LlmProviderTokens {
    pub openai: Option<String>,
    pub anthropic: Option<String>,
    pub deepseek: Option<String>,
    pub qwen: Option<String>,
}

impl LlmProviderTokens {
    pub fn from_env() -> Self {
        Self {
            openai: env_optional("OPENAI_API_KEY"),
            anthropic: env_optional("ANTHROPIC_API_KEY"),
            deepseek: env_optional("DEEPSEEK_API_KEY"),
            qwen: env_optional("QWEN_API_KEY"),
        }
    }

    /// Token for a provider name (case-insensitive)
    pub fn for_provider(&self, provider: &str) -> Option<&str> {
        match provider.to_lowercase().as_str() {
            "openai" => self.openai.as_deref(),
            "anthropic" => self.anthropic.as_deref(),
            "deepseek" => self.deepseek.as_deref(),
            "qwen" => self.qwen.as_deref(),
            _ => None,
        }
    }
}

/// Language-generation provider selection
#[derive(Debug, Clone, PartialEq)]
pub struct LlmSettings {
    pub provider: String,
    /// Provider model override; each provider has its own default
    pub model: Option<String>,
    pub tokens: LlmProviderTokens,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: None,
            tokens: LlmProviderTokens::default(),
        }
    }
}

impl LlmSettings {
    pub fn from_env() -> Self {
        Self {
            provider: env_string("LLM_PROVIDER", "openai").to_lowercase(),
            model: env_optional("LLM_MODEL"),
            tokens: LlmProviderTokens::from_env(),
        }
    }
}

/// Periodic ingestion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionSettings {
    pub interval_minutes: u64,
    /// JSON document files pulled on every cycle
    pub paths: Vec<PathBuf>,
}

impl Default for IngestionSettings {
    fn default() -> Self {
        Self {
            interval_minutes: 30,
            paths: Vec::new(),
        }
    }
}

impl IngestionSettings {
    pub fn from_env() -> Result<Self, RagError> {
        Ok(Self {
            interval_minutes: env_parse("INGEST_INTERVAL_MINUTES", 30)?,
            paths: env_optional("INGEST_PATHS")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|p| !p.is_empty())
                        .map(PathBuf::from)
                        .collect()
                })
                .unwrap_or_default(),
        })
    }

    pub fn interval(&self) -> Duration {
        interval_from_minutes(self.interval_minutes)
    }
}

/// Longest accepted ingestion interval (one week)
pub const MAX_INGEST_INTERVAL_MINUTES: u64 = 7 * 24 * 60;

pub fn interval_from_minutes(minutes: u64) -> Duration {
    Duration::from_secs(minutes.saturating_mul(60))
}

/// Aggregate configuration for every subsystem
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlatformConfig {
    pub qdrant: QdrantConfig,
    pub embedding: EmbeddingSettings,
    pub reranker: RerankerSettings,
    pub retrieval: RetrievalSettings,
    pub llm: LlmSettings,
    pub ingestion: IngestionSettings,
}

impl PlatformConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, RagError> {
        Ok(Self {
            qdrant: QdrantConfig::from_env()?,
            embedding: EmbeddingSettings::from_env()?,
            reranker: RerankerSettings::from_env()?,
            retrieval: RetrievalSettings::from_env()?,
            llm: LlmSettings::from_env(),
            ingestion: IngestionSettings::from_env()?,
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), RagError> {
        self.qdrant.validate()?;

        if self.embedding.batch_size == 0 {
            return Err(RagError::InvalidConfig(
                "EMBEDDING_BATCH_SIZE must be greater than 0".to_string(),
            ));
        }
        if self.embedding.timeout_ms == 0 {
            return Err(RagError::InvalidConfig(
                "EMBEDDING_TIMEOUT_MS must be greater than 0".to_string(),
            ));
        }
        if self.reranker.timeout_ms == 0 {
            return Err(RagError::InvalidConfig(
                "RERANKER_TIMEOUT_MS must be greater than 0".to_string(),
            ));
        }

        self.retrieval.bm25.validate()?;
        if self.retrieval.default_top_k == 0 {
            return Err(RagError::InvalidConfig(
                "DEFAULT_TOP_K must be at least 1".to_string(),
            ));
        }

        if self.llm.provider.trim().is_empty() {
            return Err(RagError::InvalidConfig("LLM_PROVIDER must not be empty".to_string()));
        }
        validate_interval_minutes(self.ingestion.interval_minutes)?;

        Ok(())
    }
}

/// Reject ingestion intervals outside `1..=MAX_INGEST_INTERVAL_MINUTES`
pub fn validate_interval_minutes(minutes: u64) -> Result<(), RagError> {
    if minutes == 0 || minutes > MAX_INGEST_INTERVAL_MINUTES {
        return Err(RagError::InvalidConfig(format!(
            "INGEST_INTERVAL_MINUTES must be between 1 and {}, got {}",
            MAX_INGEST_INTERVAL_MINUTES, minutes
        )));
    }
    Ok(())
}

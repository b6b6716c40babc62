// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Name → constructor map for generation providers
//!
//! Built once at startup and passed to whoever needs a model. Lookups are
//! case-insensitive. An unknown name or a missing token yields the
//! [`PlaceholderModel`].

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{info, warn};

use super::anthropic::AnthropicModel;
use super::openai::OpenAiCompatibleModel;
use super::placeholder::PlaceholderModel;
use super::provider::{LanguageModel, LlmError};
use super::qwen::QwenModel;
use crate::config::LlmSettings;

/// Builds a provider client from an API token and optional model override
pub type ModelFactory = fn(String, Option<String>) -> Result<Arc<dyn LanguageModel>, LlmError>;

fn openai_factory(token: String, model: Option<String>) -> Result<Arc<dyn LanguageModel>, LlmError> {
    Ok(Arc::new(OpenAiCompatibleModel::openai(Some(token), model)?))
}

fn anthropic_factory(
    token: String,
    model: Option<String>,
) -> Result<Arc<dyn LanguageModel>, LlmError> {
    Ok(Arc::new(AnthropicModel::new(Some(token), model)?))
}

fn deepseek_factory(
    token: String,
    model: Option<String>,
) -> Result<Arc<dyn LanguageModel>, LlmError> {
    Ok(Arc::new(OpenAiCompatibleModel::deepseek(Some(token), model)?))
}

fn qwen_factory(token: String, model: Option<String>) -> Result<Arc<dyn LanguageModel>, LlmError> {
    Ok(Arc::new(QwenModel::new(Some(token), model)?))
}

#[derive(Clone)]
pub struct ProviderRegistry {
    factories: BTreeMap<String, ModelFactory>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.names())
            .finish()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::with_default_providers()
    }
}

impl ProviderRegistry {
    /// Registry with no providers; every lookup yields the placeholder
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// openai, anthropic, deepseek and qwen
    pub fn with_default_providers() -> Self {
        Self::empty()
            .register("openai", openai_factory)
            .register("anthropic", anthropic_factory)
            .register("deepseek", deepseek_factory)
            .register("qwen", qwen_factory)
    }

    pub fn register(mut self, name: &str, factory: ModelFactory) -> Self {
        self.factories.insert(name.to_lowercase(), factory);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(&name.to_lowercase())
    }

    /// Registered provider names, sorted
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Create a model for `provider`, falling back to the placeholder
    pub fn create(
        &self,
        provider: &str,
        token: Option<&str>,
        model: Option<&str>,
    ) -> Arc<dyn LanguageModel> {
        let provider = provider.to_lowercase();
        let factory = match self.factories.get(&provider) {
            Some(factory) => factory,
            None => {
                warn!(provider = %provider, "Unknown LLM provider, using placeholder model");
                return Arc::new(PlaceholderModel::new());
            }
        };

        let token = match token.map(str::trim).filter(|t| !t.is_empty()) {
            Some(token) => token.to_string(),
            None => {
                warn!(
                    provider = %provider,
                    "Missing token for LLM provider, using placeholder model"
                );
                return Arc::new(PlaceholderModel::new());
            }
        };

        match factory(token, model.map(str::to_string)) {
            Ok(model) => {
                info!(provider = %provider, "LLM provider initialized");
                model
            }
            Err(e) => {
                warn!(provider = %provider, error = %e, "LLM provider init failed, using placeholder model");
                Arc::new(PlaceholderModel::new())
            }
        }
    }

    /// Create the model selected by `settings`
    pub fn from_settings(&self, settings: &LlmSettings) -> Arc<dyn LanguageModel> {
        self.create(
            &settings.provider,
            settings.tokens.for_provider(&settings.provider),
            settings.model.as_deref(),
        )
    }
}

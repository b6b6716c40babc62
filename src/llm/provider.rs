// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Language-generation contract
//!
//! [`LanguageModel::generate`] always yields a string. HTTP providers report
//! failures internally as [`LlmError`] and substitute the placeholder
//! response, so callers never branch on generation failure.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

use super::placeholder::placeholder_response;

/// Client-side timeout for provider HTTP calls
pub const PROVIDER_TIMEOUT: Duration = Duration::from_secs(60);

/// Per-call generation parameters
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOptions {
    /// Overrides the provider's configured model
    pub model: Option<String>,
    pub temperature: f32,
    pub max_tokens: usize,
    /// System message, for providers that accept one
    pub system: Option<String>,
    /// Appended by the placeholder model
    pub suffix: String,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            model: None,
            temperature: 0.2,
            max_tokens: 1024,
            system: None,
            suffix: String::new(),
        }
    }
}

/// Provider-side generation failures; never surfaced by `generate`
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    #[error("Missing token for provider '{provider}'")]
    MissingToken { provider: String },

    #[error("Request to {provider} failed: {reason}")]
    Request { provider: String, reason: String },

    #[error("{provider} returned {status}: {body}")]
    Status {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("Malformed {provider} response: {reason}")]
    MalformedResponse { provider: String, reason: String },

    #[error("Invalid {provider} client configuration: {reason}")]
    InvalidConfig { provider: String, reason: String },
}

impl LlmError {
    pub fn error_code(&self) -> &'static str {
        match self {
            LlmError::MissingToken { .. } => "MISSING_TOKEN",
            LlmError::Request { .. } => "REQUEST_FAILED",
            LlmError::Status { .. } => "BAD_STATUS",
            LlmError::MalformedResponse { .. } => "MALFORMED_RESPONSE",
            LlmError::InvalidConfig { .. } => "INVALID_CONFIG",
        }
    }
}

/// Text generation collaborator
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generate a completion for `prompt`; never fails
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> String;

    /// Provider name for logging
    fn name(&self) -> &str;
}

/// Turn a provider result into the final text, substituting the placeholder
/// response on failure
pub(crate) fn or_placeholder(
    provider: &str,
    prompt: &str,
    options: &GenerationOptions,
    result: Result<String, LlmError>,
) -> String {
    match result {
        Ok(text) => text,
        Err(e) => {
            warn!(
                provider,
                code = e.error_code(),
                error = %e,
                "Generation failed, using placeholder response"
            );
            placeholder_response(prompt, &options.suffix)
        }
    }
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use async_trait::async_trait;

use super::provider::{GenerationOptions, LanguageModel};

pub const PLACEHOLDER_PREFIX: &str = "[dummy-response]";

/// Placeholder responses are cut to this many characters
pub const PLACEHOLDER_MAX_CHARS: usize = 512;

/// `"[dummy-response]{prompt}{suffix}"` truncated to [`PLACEHOLDER_MAX_CHARS`]
/// characters (not bytes)
pub fn placeholder_response(prompt: &str, suffix: &str) -> String {
    PLACEHOLDER_PREFIX
        .chars()
        .chain(prompt.chars())
        .chain(suffix.chars())
        .take(PLACEHOLDER_MAX_CHARS)
        .collect()
}

/// Deterministic model used when no provider credentials are configured
#[derive(Debug, Clone, Default)]
pub struct PlaceholderModel;

impl PlaceholderModel {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl LanguageModel for PlaceholderModel {
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> String {
        placeholder_response(prompt, &options.suffix)
    }

    fn name(&self) -> &str {
        "placeholder"
    }
}

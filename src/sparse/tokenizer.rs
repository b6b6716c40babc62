// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use std::sync::Arc;

/// Splits text into BM25 terms
pub type TokenizeFn = Arc<dyn Fn(&str) -> Vec<String> + Send + Sync>;

/// Split on Unicode whitespace; terms keep their case and punctuation
pub fn whitespace_tokenize(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_string).collect()
}

/// The tokenizer used when none is configured
pub fn default_tokenizer() -> TokenizeFn {
    Arc::new(whitespace_tokenize)
}

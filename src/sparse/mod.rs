// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Sparse lexical retrieval (BM25)

pub mod bm25;
pub mod tokenizer;

pub use bm25::{Bm25Params, SparseIndex};
pub use tokenizer::{default_tokenizer, whitespace_tokenize, TokenizeFn};

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Language-generation providers

pub mod anthropic;
pub mod openai;
pub mod placeholder;
pub mod provider;
pub mod qwen;
pub mod registry;

pub use anthropic::AnthropicModel;
pub use openai::OpenAiCompatibleModel;
pub use placeholder::{placeholder_response, PlaceholderModel};
pub use provider::{GenerationOptions, LanguageModel, LlmError};
pub use qwen::QwenModel;
pub use registry::{ModelFactory, ProviderRegistry};

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::provider::{or_placeholder, GenerationOptions, LanguageModel, LlmError, PROVIDER_TIMEOUT};

pub const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com/v1/messages";
pub const ANTHROPIC_DEFAULT_MODEL: &str = "claude-3-sonnet-20240229";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic messages API client
pub struct AnthropicModel {
    api_base: String,
    api_key: Option<String>,
    model: String,
    client: Client,
}

impl AnthropicModel {
    pub fn new(api_key: Option<String>, model: Option<String>) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(PROVIDER_TIMEOUT)
            .build()
            .map_err(|e| LlmError::InvalidConfig {
                provider: "anthropic".to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            api_base: ANTHROPIC_API_BASE.to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: model.unwrap_or_else(|| ANTHROPIC_DEFAULT_MODEL.to_string()),
            client,
        })
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str, options: &GenerationOptions) -> Result<String, LlmError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| LlmError::MissingToken {
            provider: "anthropic".to_string(),
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(api_key.trim()).map_err(|_| LlmError::InvalidConfig {
                provider: "anthropic".to_string(),
                reason: "invalid API key".to_string(),
            })?,
        );
        headers.insert("anthropic-version", HeaderValue::from_static(ANTHROPIC_VERSION));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let body = MessagesRequest {
            model: options.model.as_deref().unwrap_or(&self.model),
            max_tokens: options.max_tokens,
            system: options.system.as_deref(),
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(&self.api_base)
            .headers(headers)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Request {
                provider: "anthropic".to_string(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(LlmError::Status {
                provider: "anthropic".to_string(),
                status,
                body,
            });
        }

        let parsed: MessagesResponse =
            response.json().await.map_err(|e| LlmError::MalformedResponse {
                provider: "anthropic".to_string(),
                reason: e.to_string(),
            })?;
        Ok(first_text(parsed))
    }
}

/// Text of the first content block; empty when the block is not text
fn first_text(response: MessagesResponse) -> String {
    match response.content.into_iter().next() {
        Some(ContentBlock::Text { text }) => text,
        _ => String::new(),
    }
}

#[async_trait]
impl LanguageModel for AnthropicModel {
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> String {
        let result = self.complete(prompt, options).await;
        or_placeholder("anthropic", prompt, options, result)
    }

    fn name(&self) -> &str {
        "anthropic"
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

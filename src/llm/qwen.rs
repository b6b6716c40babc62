// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Tongyi Qianwen via the DashScope text-generation API

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::placeholder::placeholder_response;
use super::provider::{or_placeholder, GenerationOptions, LanguageModel, LlmError, PROVIDER_TIMEOUT};

pub const QWEN_API_BASE: &str =
    "https://dashscope.aliyuncs.com/api/v1/services/aigc/text-generation/generation";
pub const QWEN_DEFAULT_MODEL: &str = "qwen-plus";
const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

pub struct QwenModel {
    api_base: String,
    api_key: Option<String>,
    model: String,
    client: Client,
}

impl QwenModel {
    pub fn new(api_key: Option<String>, model: Option<String>) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(PROVIDER_TIMEOUT)
            .build()
            .map_err(|e| LlmError::InvalidConfig {
                provider: "qwen".to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            api_base: QWEN_API_BASE.to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: model.unwrap_or_else(|| QWEN_DEFAULT_MODEL.to_string()),
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
            provider: "qwen".to_string(),
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key.trim())).map_err(|_| {
                LlmError::InvalidConfig {
                    provider: "qwen".to_string(),
                    reason: "invalid API key".to_string(),
                }
            })?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let body = GenerationRequest {
            model: options.model.as_deref().unwrap_or(&self.model),
            input: GenerationInput {
                messages: vec![
                    Message {
                        role: "system",
                        content: options.system.as_deref().unwrap_or(DEFAULT_SYSTEM_PROMPT),
                    },
                    Message {
                        role: "user",
                        content: prompt,
                    },
                ],
            },
        };

        let response = self
            .client
            .post(&self.api_base)
            .headers(headers)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Request {
                provider: "qwen".to_string(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(LlmError::Status {
                provider: "qwen".to_string(),
                status,
                body,
            });
        }

        let parsed: GenerationResponse =
            response.json().await.map_err(|e| LlmError::MalformedResponse {
                provider: "qwen".to_string(),
                reason: e.to_string(),
            })?;
        Ok(output_text(parsed))
    }
}

/// `output.text`, or the first choice of the message result format
fn output_text(response: GenerationResponse) -> String {
    let output = response.output.unwrap_or_default();
    if let Some(text) = output.text.filter(|t| !t.is_empty()) {
        return text;
    }
    output
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content)
        .unwrap_or_default()
}

#[async_trait]
impl LanguageModel for QwenModel {
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> String {
        let text = or_placeholder("qwen", prompt, options, self.complete(prompt, options).await);
        if text.is_empty() {
            return placeholder_response(prompt, &options.suffix);
        }
        text
    }

    fn name(&self) -> &str {
        "qwen"
    }
}

#[derive(Serialize)]
struct GenerationRequest<'a> {
    model: &'a str,
    input: GenerationInput<'a>,
}

#[derive(Serialize)]
struct GenerationInput<'a> {
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerationResponse {
    #[serde(default)]
    output: Option<GenerationOutput>,
}

#[derive(Debug, Default, Deserialize)]
struct GenerationOutput {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    choices: Vec<OutputChoice>,
}

#[derive(Debug, Deserialize)]
struct OutputChoice {
    message: OutputMessage,
}

#[derive(Debug, Deserialize)]
struct OutputMessage {
    content: String,
}

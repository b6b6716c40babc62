// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! OpenAI-compatible chat completions (OpenAI, DeepSeek)

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::provider::{or_placeholder, GenerationOptions, LanguageModel, LlmError, PROVIDER_TIMEOUT};

pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1/chat/completions";
pub const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEEPSEEK_API_BASE: &str = "https://api.deepseek.com/chat/completions";
pub const DEEPSEEK_DEFAULT_MODEL: &str = "deepseek-chat";

/// Chat client for any endpoint speaking the OpenAI completions protocol
pub struct OpenAiCompatibleModel {
    provider: &'static str,
    api_base: String,
    api_key: Option<String>,
    model: String,
    /// DeepSeek is called without a temperature
    send_temperature: bool,
    client: Client,
}

impl OpenAiCompatibleModel {
    fn build(
        provider: &'static str,
        api_base: &str,
        api_key: Option<String>,
        model: String,
        send_temperature: bool,
    ) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(PROVIDER_TIMEOUT)
            .build()
            .map_err(|e| LlmError::InvalidConfig {
                provider: provider.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            provider,
            api_base: api_base.to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model,
            send_temperature,
            client,
        })
    }

    pub fn openai(api_key: Option<String>, model: Option<String>) -> Result<Self, LlmError> {
        Self::build(
            "openai",
            OPENAI_API_BASE,
            api_key,
            model.unwrap_or_else(|| OPENAI_DEFAULT_MODEL.to_string()),
            true,
        )
    }

    pub fn deepseek(api_key: Option<String>, model: Option<String>) -> Result<Self, LlmError> {
        Self::build(
            "deepseek",
            DEEPSEEK_API_BASE,
            api_key,
            model.unwrap_or_else(|| DEEPSEEK_DEFAULT_MODEL.to_string()),
            false,
        )
    }

    /// Point the client at another endpoint (proxies, self-hosted gateways)
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str, options: &GenerationOptions) -> Result<String, LlmError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| LlmError::MissingToken {
            provider: self.provider.to_string(),
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key.trim())).map_err(|_| {
                LlmError::InvalidConfig {
                    provider: self.provider.to_string(),
                    reason: "invalid API key".to_string(),
                }
            })?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = options.system.as_deref() {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: prompt,
        });

        let body = ChatRequest {
            model: options.model.as_deref().unwrap_or(&self.model),
            messages,
            temperature: self.send_temperature.then_some(options.temperature),
        };

        let response = self
            .client
            .post(&self.api_base)
            .headers(headers)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Request {
                provider: self.provider.to_string(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(LlmError::Status {
                provider: self.provider.to_string(),
                status,
                body,
            });
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| LlmError::MalformedResponse {
            provider: self.provider.to_string(),
            reason: e.to_string(),
        })?;
        parse_chat_response(self.provider, parsed)
    }
}

fn parse_chat_response(provider: &str, parsed: ChatResponse) -> Result<String, LlmError> {
    parsed
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content)
        .ok_or_else(|| LlmError::MalformedResponse {
            provider: provider.to_string(),
            reason: "response contained no choices".to_string(),
        })
}

#[async_trait]
impl LanguageModel for OpenAiCompatibleModel {
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> String {
        let result = self.complete(prompt, options).await;
        or_placeholder(self.provider, prompt, options, result)
    }

    fn name(&self) -> &str {
        self.provider
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: String,
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Provider request shapes, response parsing and placeholder fallback

use quant_rag_node::llm::{
    placeholder_response, AnthropicModel, GenerationOptions, LanguageModel,
    OpenAiCompatibleModel, QwenModel,
};

use super::stub_server::serve_once;

fn options_with_suffix(suffix: &str) -> GenerationOptions {
    GenerationOptions {
        suffix: suffix.to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_openai_success() {
    let (url, request) =
        serve_once(200, r#"{"choices":[{"message":{"content":"三买成立"}}]}"#).await;
    let model = OpenAiCompatibleModel::openai(Some("sk-test".into()), None)
        .unwrap()
        .with_api_base(url);

    let text = model.generate("trend?", &GenerationOptions::default()).await;
    let request = request.await.unwrap().to_lowercase();

    assert_eq!(text, "三买成立");
    assert!(request.starts_with("post /v1/generate"));
    assert!(request.contains("authorization: bearer sk-test"));
    assert!(request.contains("\"temperature\""));
    assert!(request.contains("gpt-4o-mini"));
}

#[tokio::test]
async fn test_deepseek_omits_temperature_and_honours_model_override() {
    let (url, request) = serve_once(200, r#"{"choices":[{"message":{"content":"ok"}}]}"#).await;
    let model = OpenAiCompatibleModel::deepseek(Some("ds-test".into()), None)
        .unwrap()
        .with_api_base(url);
    let options = GenerationOptions {
        model: Some("deepseek-reasoner".to_string()),
        ..Default::default()
    };

    assert_eq!(model.generate("q", &options).await, "ok");
    let request = request.await.unwrap();
    assert!(!request.contains("temperature"));
    assert!(request.contains("deepseek-reasoner"));
}

#[tokio::test]
async fn test_error_status_yields_placeholder() {
    let (url, _request) = serve_once(500, r#"{"error":"overloaded"}"#).await;
    let model = OpenAiCompatibleModel::openai(Some("sk-test".into()), None)
        .unwrap()
        .with_api_base(url);

    let text = model.generate("prompt body", &options_with_suffix("#")).await;
    assert_eq!(text, placeholder_response("prompt body", "#"));
}

#[tokio::test]
async fn test_malformed_body_yields_placeholder() {
    let (url, _request) = serve_once(200, r#"{"unexpected": true}"#).await;
    let model = OpenAiCompatibleModel::openai(Some("sk-test".into()), None)
        .unwrap()
        .with_api_base(url);

    let text = model.generate("p", &GenerationOptions::default()).await;
    assert_eq!(text, placeholder_response("p", ""));
}

#[tokio::test]
async fn test_anthropic_success() {
    let (url, request) = serve_once(
        200,
        r#"{"content":[{"type":"text","text":"趋势向上"}],"stop_reason":"end_turn"}"#,
    )
    .await;
    let model = AnthropicModel::new(Some("ak-test".into()), None)
        .unwrap()
        .with_api_base(url);
    let options = GenerationOptions {
        system: Some("quant analyst".to_string()),
        ..Default::default()
    };

    assert_eq!(model.generate("trend?", &options).await, "趋势向上");
    let request = request.await.unwrap().to_lowercase();
    assert!(request.contains("x-api-key: ak-test"));
    assert!(request.contains("anthropic-version"));
    assert!(request.contains("quant analyst"));
}

#[tokio::test]
async fn test_qwen_output_text() {
    let (url, request) = serve_once(200, r#"{"output":{"text":"通义回答"}}"#).await;
    let model = QwenModel::new(Some("dash-test".into()), None)
        .unwrap()
        .with_api_base(url);

    assert_eq!(model.generate("q", &GenerationOptions::default()).await, "通义回答");
    let request = request.await.unwrap().to_lowercase();
    assert!(request.contains("authorization: bearer dash-test"));
    assert!(request.contains("qwen-plus"));
}

#[tokio::test]
async fn test_qwen_empty_output_yields_placeholder() {
    let (url, _request) = serve_once(200, r#"{"output":{}}"#).await;
    let model = QwenModel::new(Some("dash-test".into()), None)
        .unwrap()
        .with_api_base(url);

    let text = model.generate("q", &options_with_suffix("!")).await;
    assert_eq!(text, "[dummy-response]q!");
}

#[tokio::test]
async fn test_missing_key_never_calls_out() {
    let model = OpenAiCompatibleModel::openai(None, None).unwrap();
    let text = model.generate("offline", &GenerationOptions::default()).await;
    assert_eq!(text, "[dummy-response]offline");
}

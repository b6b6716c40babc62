// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Research loop: phases, generation call counts and the no-evidence path

use std::collections::HashSet;
use std::sync::Arc;

use quant_rag_node::config::PlatformConfig;
use quant_rag_node::llm::placeholder::PLACEHOLDER_PREFIX;
use quant_rag_node::llm::{GenerationOptions, PlaceholderModel};
use quant_rag_node::rag::{
    build_retriever, ConversationState, ConversationalResearchLoop, RagError, RetrieverPlan,
    NO_EVIDENCE_ANSWER,
};

use crate::common::{market_notes, FixedRetriever, RecordingModel};

fn pipeline(
    retriever: Arc<FixedRetriever>,
    llm: Arc<RecordingModel>,
) -> ConversationalResearchLoop {
    ConversationalResearchLoop::new(retriever, llm)
}

#[tokio::test]
async fn test_empty_evidence_makes_no_generation_calls() {
    let retriever = Arc::new(FixedRetriever::empty());
    let llm = Arc::new(RecordingModel::new());

    let outcome = pipeline(retriever.clone(), llm.clone())
        .run("上证指数 trend", 3, 5)
        .await
        .unwrap();

    assert!(outcome.is_no_evidence());
    assert_eq!(outcome.answer, NO_EVIDENCE_ANSWER);
    assert!(outcome.research.is_empty());
    assert_eq!(llm.calls(), 0);
    assert_eq!(retriever.queries(), vec!["上证指数 trend".to_string()]);
}

#[tokio::test]
async fn test_rounds_drive_generation_count() {
    for rounds in [0usize, 1, 3] {
        let llm = Arc::new(RecordingModel::new());
        let outcome = pipeline(Arc::new(FixedRetriever::new(market_notes())), llm.clone())
            .run("MACD", rounds, 2)
            .await
            .unwrap();

        assert_eq!(llm.calls(), rounds + 2, "rounds={}", rounds);
        assert_eq!(outcome.research.len(), rounds);
        assert_eq!(outcome.summary.as_deref(), Some("response-1"));
        assert_eq!(outcome.answer, format!("response-{}", rounds + 2));
    }
}

#[tokio::test]
async fn test_phase_prompts_carry_evidence_and_summary() {
    let llm = Arc::new(RecordingModel::new());
    pipeline(Arc::new(FixedRetriever::new(market_notes())), llm.clone())
        .run("third buy point?", 2, 3)
        .await
        .unwrap();

    let prompts = llm.prompts();
    assert_eq!(prompts.len(), 4);

    // Summary sees the first top_k evidence texts in order
    assert!(prompts[0].contains("SH000001 closes higher on heavy volume"));
    assert!(prompts[0].contains("third buy point confirmed after pivot breakout"));
    assert!(!prompts[0].contains("central bank"));
    assert!(prompts[0].contains("third buy point?"));

    assert!(prompts[1].contains("response-1"));
    assert!(prompts[1].contains("round 1"));
    assert!(prompts[2].contains("round 2"));

    assert!(prompts[3].contains("response-1"));
    assert!(prompts[3].contains("Round 1: response-2"));
    assert!(prompts[3].contains("Round 2: response-3"));
}

#[tokio::test]
async fn test_research_directives_do_not_trigger_retrieval() {
    let retriever = Arc::new(FixedRetriever::new(market_notes()));
    let llm = Arc::new(RecordingModel::new());

    pipeline(retriever.clone(), llm)
        .run("pivot", 4, 2)
        .await
        .unwrap();

    assert_eq!(retriever.queries(), vec!["pivot".to_string()]);
}

#[tokio::test]
async fn test_sources_are_the_retrieved_evidence() {
    let outcome = pipeline(
        Arc::new(FixedRetriever::new(market_notes())),
        Arc::new(RecordingModel::new()),
    )
    .run("volume", 1, 2)
    .await
    .unwrap();

    assert_eq!(outcome.sources.len(), 2);
    assert_eq!(outcome.sources[0].document.source, "snowball");
    assert_eq!(outcome.sources[1].document.source, "eastmoney");
}

#[tokio::test]
async fn test_zero_top_k_is_rejected_before_retrieval() {
    let retriever = Arc::new(FixedRetriever::new(market_notes()));
    let llm = Arc::new(RecordingModel::new());

    let result = pipeline(retriever.clone(), llm.clone()).run("q", 2, 0).await;

    assert!(matches!(result, Err(RagError::InvalidRequest(_))));
    assert!(retriever.queries().is_empty());
    assert_eq!(llm.calls(), 0);
}

#[tokio::test]
async fn test_state_tracks_summaries_and_rounds() {
    let llm = Arc::new(RecordingModel::new());
    let pipeline = pipeline(Arc::new(FixedRetriever::new(market_notes())), llm);
    let mut state = ConversationState::new();

    pipeline.run_with_state(&mut state, "a", 2, 1).await.unwrap();
    assert_eq!(state.summaries(), &["response-1".to_string()]);
    assert_eq!(state.round_count(), 2);

    // Second run: summary is call 5 after 1 summary + 2 research + 1 answer
    pipeline.run_with_state(&mut state, "b", 0, 1).await.unwrap();
    assert_eq!(state.latest_summary(), Some("response-5"));
    assert_eq!(state.round_count(), 2);
}

#[tokio::test]
async fn test_offline_pipeline_end_to_end() {
    let retriever = build_retriever(&PlatformConfig::default(), RetrieverPlan::offline())
        .await
        .unwrap();
    let pipeline = ConversationalResearchLoop::new(retriever, Arc::new(PlaceholderModel::new()))
        .with_generation_options(GenerationOptions {
            suffix: "<end>".to_string(),
            ..Default::default()
        });

    let report = pipeline.ingest(market_notes()).await.unwrap();
    assert!(report.dense_indexed);

    let outcome = pipeline.run("MACD golden cross", 1, 3).await.unwrap();

    assert!(outcome.answer.starts_with(PLACEHOLDER_PREFIX));
    assert!(outcome.summary.unwrap().starts_with(PLACEHOLDER_PREFIX));
    assert_eq!(outcome.research.len(), 1);
    assert_eq!(outcome.sources.len(), 3);
    assert!(outcome.sources[0].document.text.contains("MACD"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_runs_keep_separate_state() {
    let llm = Arc::new(RecordingModel::new());
    let pipeline = Arc::new(pipeline(
        Arc::new(FixedRetriever::new(market_notes())),
        llm.clone(),
    ));

    let handles: Vec<_> = (0..8usize)
        .map(|i| {
            let pipeline = pipeline.clone();
            tokio::spawn(async move {
                let rounds = i % 4;
                let query = format!("ticker {} outlook", i);
                let outcome = pipeline.run(&query, rounds, 2).await.unwrap();
                (query, rounds, outcome)
            })
        })
        .collect();
    let results: Vec<_> = futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    let expected_calls: usize = results.iter().map(|(_, rounds, _)| rounds + 2).sum();
    assert_eq!(llm.calls(), expected_calls);

    // Every generation belongs to exactly one run
    let mut seen = HashSet::new();
    for (_, rounds, outcome) in &results {
        assert_eq!(outcome.research.len(), *rounds);
        let summary = outcome.summary.clone().unwrap();
        for text in std::iter::once(summary)
            .chain(outcome.research.iter().cloned())
            .chain(std::iter::once(outcome.answer.clone()))
        {
            assert!(seen.insert(text.clone()), "{} shared between runs", text);
        }
    }
    assert_eq!(seen.len(), expected_calls);

    // Summary and answer prompts carry only their own question
    let prompts = llm.prompts();
    for (query, _, _) in &results {
        assert_eq!(prompts.iter().filter(|p| p.contains(query.as_str())).count(), 2);
    }
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Conversational research loop
//!
//! One `run` walks through:
//!
//! ```text
//! INIT ──(no evidence)──────────────────────────────▶ DONE
//!   │
//!   ▼
//! SUMMARIZING ─▶ RESEARCHING ×rounds ─▶ ANSWERING ─▶ DONE
//! ```
//!
//! Research directives are collected for the caller and are not fed back
//! into retrieval.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::errors::RagError;
use super::prompts::{answer_prompt, research_prompt, summary_prompt};
use super::retriever::Retriever;
use super::types::{Document, FusedResult, IndexReport};
use crate::ingestion::DocumentSink;
use crate::llm::{GenerationOptions, LanguageModel};

/// Answer returned when retrieval finds nothing
pub const NO_EVIDENCE_ANSWER: &str = "no evidence found";

/// Append-only record of one conversation
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConversationState {
    summaries: Vec<String>,
    round_count: usize,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn summaries(&self) -> &[String] {
        &self.summaries
    }

    pub fn latest_summary(&self) -> Option<&str> {
        self.summaries.last().map(String::as_str)
    }

    pub fn round_count(&self) -> usize {
        self.round_count
    }

    fn push_summary(&mut self, summary: String) {
        self.summaries.push(summary);
    }

    fn complete_round(&mut self) {
        self.round_count += 1;
    }
}

/// Result of one research run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchOutcome {
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub research: Vec<String>,
    /// Evidence used for the summary
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: FusedResult,
}

impl ResearchOutcome {
    pub fn no_evidence() -> Self {
        Self {
            answer: NO_EVIDENCE_ANSWER.to_string(),
            summary: None,
            research: Vec::new(),
            sources: Vec::new(),
        }
    }

    pub fn is_no_evidence(&self) -> bool {
        self.summary.is_none() && self.sources.is_empty() && self.answer == NO_EVIDENCE_ANSWER
    }
}

/// Retrieval-grounded summarize / research / answer loop
pub struct ConversationalResearchLoop {
    retriever: Arc<dyn Retriever>,
    llm: Arc<dyn LanguageModel>,
    options: GenerationOptions,
}

impl ConversationalResearchLoop {
    pub fn new(retriever: Arc<dyn Retriever>, llm: Arc<dyn LanguageModel>) -> Self {
        Self {
            retriever,
            llm,
            options: GenerationOptions::default(),
        }
    }

    /// Options passed to every generation call
    pub fn with_generation_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn retriever(&self) -> &Arc<dyn Retriever> {
        &self.retriever
    }

    /// Index documents through the configured retriever
    pub async fn ingest(&self, documents: Vec<Document>) -> Result<IndexReport, RagError> {
        self.retriever.index(documents).await
    }

    /// Run with a fresh conversation state
    ///
    /// # Errors
    /// [`RagError::InvalidRequest`] when `top_k` is zero.
    pub async fn run(
        &self,
        query: &str,
        rounds: usize,
        top_k: usize,
    ) -> Result<ResearchOutcome, RagError> {
        let mut state = ConversationState::new();
        self.run_with_state(&mut state, query, rounds, top_k).await
    }

    /// Run against a caller-owned state; summaries and rounds are appended
    pub async fn run_with_state(
        &self,
        state: &mut ConversationState,
        query: &str,
        rounds: usize,
        top_k: usize,
    ) -> Result<ResearchOutcome, RagError> {
        if top_k == 0 {
            return Err(RagError::InvalidRequest(
                "top_k must be at least 1".to_string(),
            ));
        }

        let evidence = self.retriever.retrieve(query, top_k).await;
        if evidence.is_empty() {
            info!(retriever = self.retriever.kind().as_str(), "No evidence found");
            return Ok(ResearchOutcome::no_evidence());
        }
        debug!(phase = "summarizing", evidence = evidence.len());

        let summary = self
            .llm
            .generate(&summary_prompt(query, &evidence), &self.options)
            .await;
        state.push_summary(summary.clone());

        let mut research = Vec::with_capacity(rounds);
        for iteration in 1..=rounds {
            debug!(phase = "researching", iteration);
            let prompt = research_prompt(state.latest_summary(), iteration);
            research.push(self.llm.generate(&prompt, &self.options).await);
            state.complete_round();
        }

        debug!(phase = "answering", rounds);
        let answer = self
            .llm
            .generate(&answer_prompt(query, &summary, &research), &self.options)
            .await;

        info!(
            model = self.llm.name(),
            sources = evidence.len(),
            rounds,
            "Research run complete"
        );

        Ok(ResearchOutcome {
            answer,
            summary: Some(summary),
            research,
            sources: evidence,
        })
    }
}

#[async_trait]
impl DocumentSink for ConversationalResearchLoop {
    async fn ingest(&self, documents: Vec<Document>) -> Result<IndexReport, RagError> {
        ConversationalResearchLoop::ingest(self, documents).await
    }
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Prompt templates for the research loop

use super::types::RetrievalHit;

/// Evidence texts separated by blank lines, in retrieval order
pub fn evidence_context(evidence: &[RetrievalHit]) -> String {
    evidence
        .iter()
        .map(|hit| hit.document.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn summary_prompt(query: &str, evidence: &[RetrievalHit]) -> String {
    format!(
        "You are a quantitative research assistant. Summarize the material below \
using Chan theory (缠论) market-structure analysis and quantitative strategy practice.\n\
Focus on:\n\
1. Core views and market structure: trend, consolidation, buy and sell points.\n\
2. Indicators or factors a quantitative strategy can act on.\n\
3. Risk warnings and backtest assumptions.\n\
Answer as bullet points.\n\
Material:\n{context}\n\
Question: {query}\n",
        context = evidence_context(evidence),
        query = query,
    )
}

/// `iteration` is 1-based
pub fn research_prompt(latest_summary: Option<&str>, iteration: usize) -> String {
    format!(
        "Existing summary: {summary}\n\
Research round {iteration}: list the missing data points, candidate backtest \
parameters and validation steps tied to the Chan theory structure.\n",
        summary = latest_summary.unwrap_or("none"),
        iteration = iteration,
    )
}

pub fn answer_prompt(query: &str, summary: &str, research: &[String]) -> String {
    let plan = if research.is_empty() {
        "none".to_string()
    } else {
        research
            .iter()
            .enumerate()
            .map(|(i, step)| format!("Round {}: {}", i + 1, step))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "Summary:\n{summary}\n\
Research plan:\n{plan}\n\
Based on the summary and research plan, give quantitative recommendations for \
the question \"{query}\", covering:\n\
- Chan theory structure and trend level\n\
- Recommended quantitative factors and parameters\n\
- External data still needed\n\
- Risk controls and the suggested backtest platform\n",
    )
}

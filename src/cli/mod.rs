// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod research;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// Quant research RAG node CLI
#[derive(Parser, Debug)]
#[command(name = "quant-rag-cli")]
#[command(version = crate::version::VERSION_NUMBER)]
#[command(about = "Hybrid retrieval and multi-round research over financial documents", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Report which retrieval components are available on this host
    Probe(research::ProbeArgs),

    /// Index JSON document files, once or on an interval
    Ingest(research::IngestArgs),

    /// Run the research loop for a question
    Ask(research::AskArgs),
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Probe(args) => research::probe(args).await,
        Commands::Ingest(args) => research::ingest(args).await,
        Commands::Ask(args) => research::ask(args).await,
    }
}

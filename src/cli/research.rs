// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Args;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::{interval_from_minutes, validate_interval_minutes, PlatformConfig};
use crate::ingestion::{DocumentSource, IngestionScheduler, JsonFileSource};
use crate::llm::ProviderRegistry;
use crate::rag::{build_retriever, probe_capabilities, ConversationalResearchLoop, RetrieverPlan};

/// Retriever selection shared by every command
#[derive(Args, Debug, Clone, Default)]
pub struct RetrieverArgs {
    /// Hash embeddings, in-memory store and lexical reranking; no models or services needed
    #[arg(long, conflicts_with = "linear")]
    pub offline: bool,

    /// Force the linear scan retriever
    #[arg(long, conflicts_with = "offline")]
    pub linear: bool,
}

/// Arguments for probe command
#[derive(Args, Debug)]
pub struct ProbeArgs {
    #[command(flatten)]
    pub retriever: RetrieverArgs,
}

/// Arguments for ingest command
#[derive(Args, Debug)]
pub struct IngestArgs {
    /// JSON files holding arrays of documents (defaults to INGEST_PATHS)
    pub paths: Vec<PathBuf>,

    /// Keep ingesting on an interval until interrupted
    #[arg(long)]
    pub watch: bool,

    /// Minutes between cycles in watch mode
    #[arg(long, env = "INGEST_INTERVAL_MINUTES")]
    pub interval_minutes: Option<u64>,

    #[command(flatten)]
    pub retriever: RetrieverArgs,
}

/// Arguments for ask command
#[derive(Args, Debug)]
pub struct AskArgs {
    /// Research question
    pub query: String,

    /// Research rounds (defaults to DEFAULT_ROUNDS)
    #[arg(long)]
    pub rounds: Option<usize>,

    /// Evidence documents to retrieve (defaults to DEFAULT_TOP_K)
    #[arg(long)]
    pub top_k: Option<usize>,

    /// JSON document files indexed before asking
    #[arg(long = "documents", value_delimiter = ',')]
    pub documents: Vec<PathBuf>,

    /// Generation provider override (openai, anthropic, deepseek, qwen)
    #[arg(long)]
    pub provider: Option<String>,

    #[command(flatten)]
    pub retriever: RetrieverArgs,
}

fn load_config() -> Result<PlatformConfig> {
    dotenv::dotenv().ok();
    let config = PlatformConfig::from_env().context("Invalid configuration")?;
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

async fn select_plan(config: &PlatformConfig, args: &RetrieverArgs) -> RetrieverPlan {
    if args.offline {
        RetrieverPlan::offline()
    } else if args.linear {
        RetrieverPlan::LinearScan
    } else {
        probe_capabilities(config).await.plan()
    }
}

async fn build_pipeline(
    config: &PlatformConfig,
    args: &RetrieverArgs,
) -> Result<ConversationalResearchLoop> {
    let plan = select_plan(config, args).await;
    let retriever = build_retriever(config, plan)
        .await
        .context("Failed to build retriever")?;
    let llm = ProviderRegistry::with_default_providers().from_settings(&config.llm);

    info!(
        retriever = retriever.kind().as_str(),
        llm = llm.name(),
        "Research pipeline ready"
    );
    Ok(ConversationalResearchLoop::new(retriever, llm))
}

fn scheduler_for(
    pipeline: Arc<ConversationalResearchLoop>,
    paths: &[PathBuf],
) -> IngestionScheduler {
    paths.iter().fold(IngestionScheduler::new(pipeline), |scheduler, path| {
        let source: Arc<dyn DocumentSource> = Arc::new(JsonFileSource::new(path));
        scheduler.with_source(source)
    })
}

/// Print capabilities and the retriever plan
pub async fn probe(args: ProbeArgs) -> Result<()> {
    let config = load_config()?;
    let capabilities = probe_capabilities(&config).await;
    let plan = if args.retriever.offline || args.retriever.linear {
        select_plan(&config, &args.retriever).await
    } else {
        capabilities.plan()
    };

    let report = json!({
        "version": crate::version::get_version_info(),
        "capabilities": capabilities,
        "plan": plan,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Index document files once, or repeatedly with --watch
pub async fn ingest(args: IngestArgs) -> Result<()> {
    let config = load_config()?;
    let paths = if args.paths.is_empty() {
        config.ingestion.paths.clone()
    } else {
        args.paths.clone()
    };
    if paths.is_empty() {
        return Err(anyhow!(
            "No document files given. Pass paths or set INGEST_PATHS"
        ));
    }

    let pipeline = Arc::new(build_pipeline(&config, &args.retriever).await?);
    let scheduler = scheduler_for(pipeline, &paths);

    if !args.watch {
        let summary = scheduler.ingest_all().await.context("Ingestion failed")?;
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let minutes = args
        .interval_minutes
        .unwrap_or(config.ingestion.interval_minutes);
    validate_interval_minutes(minutes).context("Invalid --interval-minutes")?;

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
        }
        signal_token.cancel();
    });

    info!(minutes, sources = scheduler.source_count(), "Starting periodic ingestion");
    let cycles = scheduler
        .run_periodically(interval_from_minutes(minutes), cancel)
        .await;
    info!(cycles, "Periodic ingestion stopped");
    Ok(())
}

/// Run the research loop and print the outcome as JSON
pub async fn ask(args: AskArgs) -> Result<()> {
    let mut config = load_config()?;
    if let Some(provider) = &args.provider {
        config.llm.provider = provider.to_lowercase();
    }

    let pipeline = Arc::new(build_pipeline(&config, &args.retriever).await?);

    if !args.documents.is_empty() {
        let summary = scheduler_for(pipeline.clone(), &args.documents)
            .ingest_all()
            .await
            .context("Failed to index documents")?;
        info!(fetched = summary.fetched, "Indexed documents for this question");
    }

    let rounds = args.rounds.unwrap_or(config.retrieval.default_rounds);
    let top_k = args.top_k.unwrap_or(config.retrieval.default_top_k);
    let outcome = pipeline.run(&args.query, rounds, top_k).await?;

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;

use newsloom::config::Config;
use newsloom::error::LoomErrorTrait;
use newsloom::llm::LlmRewriter;
use newsloom::pipeline::{
    ArticleOutcome, HtmlExtractor, PipelineStores, RewriteOrchestrator, StopFlag,
};

use super::{read_url_file, truncate_url, Workspace};

/// Rewrite a batch of article URLs and store the results
pub async fn process(config: Config, urls: Vec<String>, file: Option<PathBuf>) -> Result<()> {
    let mut urls = urls;
    if let Some(path) = file {
        urls.extend(read_url_file(&path)?);
    }
    if urls.is_empty() {
        anyhow::bail!("No URLs given; pass them as arguments or with --file");
    }

    let mut workspace = Workspace::open(config)?;
    let config = &workspace.config;

    let provider = config.provider()?;
    if workspace.state.keys.keys(provider.id()).is_empty() {
        anyhow::bail!(
            "No API keys for provider '{provider}'; add one with `newsloom keys add --provider {provider} <KEY>`"
        );
    }

    let extractor =
        HtmlExtractor::new(config.extract_timeout()).context("Failed to create extractor")?;
    let rewriter = LlmRewriter::with_config(config.llm_config()?)
        .context("Failed to create rewriter")?;
    let orchestrator = RewriteOrchestrator::new(
        Arc::new(extractor),
        Arc::new(rewriter),
        config.orchestrator_config(workspace.state.excluded_domains.clone())?,
    );

    println!("Processing {} article(s) with {provider}", urls.len());
    println!("==========================================");

    let stop = StopFlag::new();
    let ctrl_c_stop = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("\nStop requested, finishing current article...");
            ctrl_c_stop.stop();
        }
    });

    let total = urls.len();
    let summary = {
        let state = &mut workspace.state;
        let mut stores = PipelineStores {
            archive: &mut state.archive,
            keys: &mut state.keys,
            queue: &mut state.queue,
        };
        orchestrator
            .process_batch_with(&urls, &mut stores, &stop, |index, report| {
                println!(
                    "[{}/{total}] {} -> {}",
                    index + 1,
                    truncate_url(&report.url, 60),
                    describe_outcome(&report.outcome)
                );
            })
            .await
    };

    workspace.save()?;

    println!();
    println!("Batch Summary");
    println!("=============");
    println!("  Stored: {}", summary.stored());
    println!("  Duplicates: {}", summary.duplicates());
    println!("  Excluded: {}", summary.excluded());
    println!("  Failed: {}", summary.failed());
    if summary.was_cancelled() {
        println!("  Not started (stopped): {}", summary.not_started);
    }
    println!("  Pending posts in queue: {}", workspace.state.queue.pending().len());

    Ok(())
}

/// One-line progress text; failures use the short user-facing message and
/// the full error goes to the log
fn describe_outcome(outcome: &ArticleOutcome) -> String {
    match outcome {
        ArticleOutcome::Stored { article, .. } => format!("stored: {}", article.title),
        ArticleOutcome::SkippedDuplicate { matched_title, .. } => {
            format!("duplicate of: {matched_title}")
        }
        ArticleOutcome::SkippedExcluded { domain } => format!("excluded domain: {domain}"),
        ArticleOutcome::Failed { error } => format!(
            "failed ({}): {}",
            error.category().description(),
            error.user_message()
        ),
    }
}

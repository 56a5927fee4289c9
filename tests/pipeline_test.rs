//! Integration tests for the rewrite pipeline
//!
//! Exercises the orchestrator with scripted collaborators:
//! - Key rotation on quota errors
//! - Duplicate and excluded-domain skips
//! - Batch pacing and cancellation

mod common;

use common::{raw_article, MockExtractor, ScriptedRewriter, Step, STORY_A, STORY_B, STORY_C};
use newsloom::models::{NewArchiveEntry, PostStatus};
use newsloom::pipeline::{
    ArticleOutcome, OrchestratorConfig, PipelineStores, RewriteOrchestrator, StopFlag,
};
use newsloom::scheduler::KeyPool;
use newsloom::storage::{ArchiveStore, PublishQueue};
use newsloom::utils::error::ProcessError;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

const URL_A: &str = "https://news.example/transport";
const URL_B: &str = "https://news.example/floods";
const URL_C: &str = "https://news.example/fish";

struct Harness {
    archive: ArchiveStore,
    keys: KeyPool,
    queue: PublishQueue,
}

impl Harness {
    fn with_keys(count: usize) -> Self {
        let mut keys = KeyPool::new();
        for i in 1..=count {
            keys.add("gemini", format!("k{i}"), format!("key {i}"));
        }
        Self {
            archive: ArchiveStore::new(),
            keys,
            queue: PublishQueue::new(),
        }
    }

    fn stores(&mut self) -> PipelineStores<'_> {
        PipelineStores {
            archive: &mut self.archive,
            keys: &mut self.keys,
            queue: &mut self.queue,
        }
    }
}

fn extractor() -> Arc<MockExtractor> {
    Arc::new(MockExtractor::new(vec![
        raw_article(URL_A, "Council approves transport budget", STORY_A),
        raw_article(URL_B, "Floods hit coastal villages", STORY_B),
        raw_article(URL_C, "New deep sea fish discovered", STORY_C),
    ]))
}

fn orchestrator(
    extractor: Arc<MockExtractor>,
    rewriter: Arc<ScriptedRewriter>,
    config: OrchestratorConfig,
) -> RewriteOrchestrator {
    RewriteOrchestrator::new(extractor, rewriter, config)
}

// ============================================================================
// Key rotation
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_quota_twice_then_success_rotates_twice() {
    let mut harness = Harness::with_keys(3);
    let rewriter = Arc::new(ScriptedRewriter::new(
        vec![Step::Quota, Step::Quota],
        Step::Rewrite,
    ));
    let orchestrator = orchestrator(extractor(), rewriter.clone(), OrchestratorConfig::default());

    let started = Instant::now();
    let report = orchestrator.process_url(URL_A, &mut harness.stores()).await;

    assert!(report.outcome.is_stored(), "got {:?}", report.outcome);
    assert_eq!(report.attempts, 3);
    assert_eq!(report.rotations, 2);
    assert_eq!(rewriter.keys_used(), vec!["k1", "k2", "k3"]);
    assert_eq!(harness.keys.cursor("gemini"), 2);
    assert!(harness.keys.keys("gemini").iter().all(|k| k.usage_count == 1));

    // One backoff per rotation
    assert_eq!(started.elapsed(), Duration::from_secs(2));

    assert_eq!(harness.archive.len(), 1);
    assert_eq!(harness.queue.len(), 1);
    assert_eq!(harness.queue.posts()[0].status, PostStatus::Pending);
}

#[tokio::test(start_paused = true)]
async fn test_persistent_quota_gives_up_after_max_rotations() {
    let mut harness = Harness::with_keys(3);
    let rewriter = Arc::new(ScriptedRewriter::new(Vec::new(), Step::Quota));
    let orchestrator = orchestrator(extractor(), rewriter.clone(), OrchestratorConfig::default());

    let report = orchestrator.process_url(URL_A, &mut harness.stores()).await;

    assert_eq!(report.attempts, 4);
    assert_eq!(report.rotations, 3);
    assert!(matches!(
        report.outcome,
        ArticleOutcome::Failed {
            error: ProcessError::QuotaExhausted { rotations: 3, .. }
        }
    ));
    // Rotation wraps around the pool
    assert_eq!(rewriter.keys_used(), vec!["k1", "k2", "k3", "k1"]);
    assert!(harness.archive.is_empty());
    assert!(harness.queue.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_non_quota_error_does_not_rotate() {
    let mut harness = Harness::with_keys(2);
    let rewriter = Arc::new(ScriptedRewriter::new(Vec::new(), Step::Reject));
    let orchestrator = orchestrator(extractor(), rewriter.clone(), OrchestratorConfig::default());

    let report = orchestrator.process_url(URL_A, &mut harness.stores()).await;

    assert_eq!(report.attempts, 1);
    assert_eq!(report.rotations, 0);
    assert!(matches!(
        report.outcome,
        ArticleOutcome::Failed {
            error: ProcessError::Rewrite(_)
        }
    ));
    assert_eq!(harness.keys.cursor("gemini"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_single_key_retries_same_key() {
    let mut harness = Harness::with_keys(1);
    let rewriter = Arc::new(ScriptedRewriter::new(vec![Step::Quota], Step::Rewrite));
    let orchestrator = orchestrator(extractor(), rewriter.clone(), OrchestratorConfig::default());

    let report = orchestrator.process_url(URL_A, &mut harness.stores()).await;

    assert!(report.outcome.is_stored());
    assert_eq!(report.rotations, 1);
    assert_eq!(rewriter.keys_used(), vec!["k1", "k1"]);
}

#[tokio::test]
async fn test_missing_key_fails_without_calling_rewriter() {
    let mut harness = Harness::with_keys(0);
    let rewriter = Arc::new(ScriptedRewriter::ok());
    let orchestrator = orchestrator(extractor(), rewriter.clone(), OrchestratorConfig::default());

    let report = orchestrator.process_url(URL_A, &mut harness.stores()).await;

    assert!(matches!(
        report.outcome,
        ArticleOutcome::Failed {
            error: ProcessError::NoActiveKey { .. }
        }
    ));
    assert!(rewriter.keys_used().is_empty());
}

// ============================================================================
// Skips
// ============================================================================

#[tokio::test]
async fn test_duplicate_is_skipped_before_rewrite() {
    let mut harness = Harness::with_keys(1);
    harness.archive.insert(NewArchiveEntry {
        title: "X wins award".to_string(),
        content: STORY_A.to_string(),
        ..Default::default()
    });

    let extractor = Arc::new(MockExtractor::new(vec![raw_article(
        URL_A,
        "X wins award today",
        STORY_A,
    )]));
    let rewriter = Arc::new(ScriptedRewriter::ok());
    let orchestrator = orchestrator(extractor, rewriter.clone(), OrchestratorConfig::default());

    let report = orchestrator.process_url(URL_A, &mut harness.stores()).await;

    match &report.outcome {
        ArticleOutcome::SkippedDuplicate { matched_title, .. } => {
            assert_eq!(matched_title, "X wins award")
        }
        other => panic!("expected duplicate, got {other:?}"),
    }
    assert!(rewriter.keys_used().is_empty());
    assert_eq!(harness.archive.len(), 1);
    assert!(harness.queue.is_empty());
}

#[tokio::test]
async fn test_excluded_domain_is_not_fetched() {
    let mut harness = Harness::with_keys(1);
    let extractor = extractor();
    let config = OrchestratorConfig {
        excluded_domains: vec!["blocked.example".to_string()],
        ..Default::default()
    };
    let orchestrator = orchestrator(extractor.clone(), Arc::new(ScriptedRewriter::ok()), config);

    let report = orchestrator
        .process_url("https://www.sport.blocked.example/match", &mut harness.stores())
        .await;

    assert!(matches!(
        report.outcome,
        ArticleOutcome::SkippedExcluded { ref domain } if domain == "blocked.example"
    ));
    assert!(extractor.calls().is_empty());

    // A host that merely contains the name is not excluded
    let report = orchestrator
        .process_url("https://notblocked.example/a", &mut harness.stores())
        .await;
    assert!(!matches!(report.outcome, ArticleOutcome::SkippedExcluded { .. }));
}

#[tokio::test]
async fn test_auto_enqueue_disabled_archives_only() {
    let mut harness = Harness::with_keys(1);
    let config = OrchestratorConfig {
        auto_enqueue: false,
        ..Default::default()
    };
    let orchestrator = orchestrator(extractor(), Arc::new(ScriptedRewriter::ok()), config);

    let report = orchestrator.process_url(URL_B, &mut harness.stores()).await;

    match report.outcome {
        ArticleOutcome::Stored {
            article,
            queued_post,
        } => {
            assert_eq!(article.title, "Breaking: Floods hit coastal villages");
            assert_eq!(article.original_url, URL_B);
            assert!(queued_post.is_none());
        }
        other => panic!("expected stored, got {other:?}"),
    }
    assert_eq!(harness.archive.len(), 1);
    assert!(harness.queue.is_empty());
}

// ============================================================================
// Batches
// ============================================================================

fn urls(list: &[&str]) -> Vec<String> {
    list.iter().map(|u| u.to_string()).collect()
}

#[tokio::test(start_paused = true)]
async fn test_batch_delays_follow_outcomes() {
    let mut harness = Harness::with_keys(1);
    let orchestrator = orchestrator(
        extractor(),
        Arc::new(ScriptedRewriter::ok()),
        OrchestratorConfig::default(),
    );

    let started = Instant::now();
    let summary = orchestrator
        .process_batch(
            &urls(&[URL_A, "https://news.example/missing", URL_C]),
            &mut harness.stores(),
            &StopFlag::new(),
        )
        .await;

    assert_eq!(summary.stored(), 2);
    assert_eq!(summary.failed(), 1);
    assert!(!summary.was_cancelled());
    // 1.5 s after the store, 0.5 s after the failure, nothing after the last
    assert_eq!(started.elapsed(), Duration::from_millis(2000));
    assert_eq!(harness.queue.pending().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_batch_skips_have_no_delay_and_catch_repeats() {
    let mut harness = Harness::with_keys(1);
    let extractor = Arc::new(MockExtractor::new(vec![
        raw_article(URL_A, "Council approves transport budget", STORY_A),
        raw_article(
            "https://mirror.example/transport",
            "Council approves transport budget",
            STORY_A,
        ),
        raw_article(URL_C, "New deep sea fish discovered", STORY_C),
    ]));
    let orchestrator = orchestrator(
        extractor,
        Arc::new(ScriptedRewriter::ok()),
        OrchestratorConfig::default(),
    );

    let started = Instant::now();
    let summary = orchestrator
        .process_batch(
            &urls(&[URL_A, "https://mirror.example/transport", URL_C]),
            &mut harness.stores(),
            &StopFlag::new(),
        )
        .await;

    assert_eq!(summary.stored(), 2);
    assert_eq!(summary.duplicates(), 1);
    assert_eq!(started.elapsed(), Duration::from_millis(1500));
    assert_eq!(harness.archive.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_batch_stop_finishes_current_article() {
    let mut harness = Harness::with_keys(1);
    let extractor = extractor();
    let orchestrator = orchestrator(
        extractor.clone(),
        Arc::new(ScriptedRewriter::ok()),
        OrchestratorConfig::default(),
    );

    let stop = StopFlag::new();
    let stopper = stop.clone();
    let mut seen = Vec::new();
    let summary = orchestrator
        .process_batch_with(
            &urls(&[URL_A, URL_B, URL_C]),
            &mut harness.stores(),
            &stop,
            |index, report| {
                seen.push((index, report.outcome.label()));
                stopper.stop();
            },
        )
        .await;

    assert_eq!(seen, vec![(0, "stored")]);
    assert_eq!(summary.reports.len(), 1);
    assert_eq!(summary.not_started, 2);
    assert!(summary.was_cancelled());
    assert_eq!(extractor.calls(), vec![URL_A]);
}

#[tokio::test]
async fn test_batch_with_stop_already_set_does_nothing() {
    let mut harness = Harness::with_keys(1);
    let orchestrator = orchestrator(
        extractor(),
        Arc::new(ScriptedRewriter::ok()),
        OrchestratorConfig::default(),
    );
    let stop = StopFlag::new();
    stop.stop();

    let summary = orchestrator
        .process_batch(&urls(&[URL_A, URL_B]), &mut harness.stores(), &stop)
        .await;

    assert!(summary.reports.is_empty());
    assert_eq!(summary.not_started, 2);
}

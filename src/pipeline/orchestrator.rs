//! Per-article rewrite pipeline
//!
//! ```text
//! Fetching -> DuplicateCheck -> Rewriting -> Stored
//!                  |               |
//!                  v               v
//!          SkippedDuplicate      Failed
//! ```
//!
//! Quota errors rotate the provider's key and retry after a backoff, up to
//! `max_key_rotations` times per article. Every other failure is terminal.

use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use super::extract::ContentExtractor;
use crate::llm::{RewriteContext, RewriteRequest, Rewriter};
use crate::metrics;
use crate::models::{NewArchiveEntry, NewPost, ProcessedArticle, RawArticle, RewrittenArticle};
use crate::scheduler::rotation::KeyPool;
use crate::storage::{ArchiveStore, PublishQueue};
use crate::utils::error::ProcessError;
use crate::utils::{domain_matches, extract_domain};

// ============================================================================
// Configuration and stores
// ============================================================================

/// Orchestrator settings
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Key pool / rewriter provider id
    pub provider: String,
    /// Model passed to the rewriter; `None` uses the provider default
    pub model: Option<String>,
    /// Queue stored articles for publishing
    pub auto_enqueue: bool,
    pub max_key_rotations: u32,
    /// Wait between a rotation and the retry
    pub rotation_backoff: Duration,
    /// Batch pause after a stored article
    pub success_delay: Duration,
    /// Batch pause after a failed article
    pub failure_delay: Duration,
    /// Hosts skipped before extraction
    pub excluded_domains: Vec<String>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: None,
            auto_enqueue: true,
            max_key_rotations: 3,
            rotation_backoff: Duration::from_secs(1),
            success_delay: Duration::from_millis(1500),
            failure_delay: Duration::from_millis(500),
            excluded_domains: Vec::new(),
        }
    }
}

/// Mutable state one article run touches
pub struct PipelineStores<'a> {
    pub archive: &'a mut ArchiveStore,
    pub keys: &'a mut KeyPool,
    pub queue: &'a mut PublishQueue,
}

// ============================================================================
// Outcomes
// ============================================================================

/// Terminal state of one article
#[derive(Debug)]
pub enum ArticleOutcome {
    /// Archived, and queued when auto-enqueue is on
    Stored {
        article: Box<ProcessedArticle>,
        queued_post: Option<Uuid>,
    },
    /// Matched an archived article
    SkippedDuplicate { title: String, matched_title: String },
    /// Host is on the excluded list
    SkippedExcluded { domain: String },
    Failed { error: ProcessError },
}

impl ArticleOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Stored { .. } => "stored",
            Self::SkippedDuplicate { .. } => "duplicate",
            Self::SkippedExcluded { .. } => "excluded",
            Self::Failed { .. } => "failed",
        }
    }

    pub fn is_stored(&self) -> bool {
        matches!(self, Self::Stored { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// What happened to one URL
#[derive(Debug)]
pub struct ProcessReport {
    pub url: String,
    pub outcome: ArticleOutcome,
    /// Rewrite calls made
    pub attempts: u32,
    /// Key rotations performed
    pub rotations: u32,
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Drives articles through extraction, duplicate check and rewrite
pub struct RewriteOrchestrator {
    extractor: Arc<dyn ContentExtractor>,
    rewriter: Arc<dyn Rewriter>,
    config: OrchestratorConfig,
}

impl RewriteOrchestrator {
    pub fn new(
        extractor: Arc<dyn ContentExtractor>,
        rewriter: Arc<dyn Rewriter>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            extractor,
            rewriter,
            config,
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Run one URL to a terminal outcome. Never returns an error; failures
    /// are reported in [`ProcessReport::outcome`].
    pub async fn process_url(&self, url: &str, stores: &mut PipelineStores<'_>) -> ProcessReport {
        let mut attempts = 0;
        let mut rotations = 0;
        let outcome = self
            .run(url, stores, &mut attempts, &mut rotations)
            .await;

        match &outcome {
            ArticleOutcome::Stored { article, queued_post } => tracing::info!(
                url,
                title = %article.title,
                queued = queued_post.is_some(),
                attempts,
                rotations,
                "Article stored"
            ),
            ArticleOutcome::SkippedDuplicate { matched_title, .. } => {
                tracing::info!(url, matched = %matched_title, "Skipping duplicate article")
            }
            ArticleOutcome::SkippedExcluded { domain } => {
                tracing::info!(url, domain = %domain, "Skipping excluded domain")
            }
            ArticleOutcome::Failed { error } => {
                tracing::warn!(url, error = %error, attempts, rotations, "Article failed")
            }
        }
        metrics::record_article_outcome(outcome.label());

        ProcessReport {
            url: url.to_string(),
            outcome,
            attempts,
            rotations,
        }
    }

    async fn run(
        &self,
        url: &str,
        stores: &mut PipelineStores<'_>,
        attempts: &mut u32,
        rotations: &mut u32,
    ) -> ArticleOutcome {
        if let Some(domain) = self.excluded_domain(url) {
            return ArticleOutcome::SkippedExcluded { domain };
        }

        tracing::debug!(url, "Fetching article");
        let raw = match self.extractor.extract(url).await {
            Ok(raw) => raw,
            Err(e) => {
                return ArticleOutcome::Failed {
                    error: ProcessError::Extraction(e),
                }
            }
        };

        if let Some(hit) = stores.archive.find_duplicate(&raw.title, &raw.content) {
            tracing::debug!(
                title_similarity = hit.title_similarity,
                content_similarity = hit.content_similarity,
                "Duplicate match"
            );
            return ArticleOutcome::SkippedDuplicate {
                title: raw.title,
                matched_title: hit.article.title.clone(),
            };
        }

        let rewritten = match self
            .rewrite_with_rotation(&raw, stores.keys, attempts, rotations)
            .await
        {
            Ok(rewritten) => rewritten,
            Err(error) => return ArticleOutcome::Failed { error },
        };

        let article = ProcessedArticle::from_parts(raw, rewritten);
        stores.archive.insert(NewArchiveEntry::from(&article));
        let queued_post = self
            .config
            .auto_enqueue
            .then(|| stores.queue.enqueue(NewPost::from(&article)));

        ArticleOutcome::Stored {
            article: Box::new(article),
            queued_post,
        }
    }

    async fn rewrite_with_rotation(
        &self,
        raw: &RawArticle,
        keys: &mut KeyPool,
        attempts: &mut u32,
        rotations: &mut u32,
    ) -> Result<RewrittenArticle, ProcessError> {
        let provider = self.config.provider.as_str();
        let request = RewriteRequest {
            title: raw.title.clone(),
            content: raw.content.clone(),
            model: self.config.model.clone(),
            context: RewriteContext {
                location: raw.location.clone(),
                publish_date: raw.publish_date.clone(),
            },
        };

        loop {
            let Some(key) = keys.active(provider) else {
                return Err(ProcessError::NoActiveKey {
                    provider: provider.to_string(),
                });
            };
            let (key_id, secret) = (key.id, key.secret.clone());
            keys.record_usage(provider, key_id);
            *attempts += 1;

            let result = {
                let _timer = metrics::start_rewrite_timer(provider);
                self.rewriter.rewrite(&request, &secret).await
            };
            metrics::record_rewrite_attempt(provider, result.is_ok());

            let error = match result {
                Ok(rewritten) => return Ok(rewritten),
                Err(e) if e.is_quota() => e,
                Err(e) => return Err(ProcessError::Rewrite(e)),
            };

            if *rotations >= self.config.max_key_rotations {
                return Err(ProcessError::QuotaExhausted {
                    rotations: *rotations,
                    last: error,
                });
            }

            *rotations += 1;
            keys.rotate(provider);
            metrics::record_key_rotation(provider);
            tracing::warn!(
                provider,
                rotation = *rotations,
                max = self.config.max_key_rotations,
                error = %error,
                "Quota error, rotating API key"
            );
            tokio::time::sleep(self.config.rotation_backoff).await;
        }
    }

    fn excluded_domain(&self, url: &str) -> Option<String> {
        let host = extract_domain(url).ok()?;
        self.config
            .excluded_domains
            .iter()
            .find(|d| domain_matches(&host, d))
            .cloned()
    }
}

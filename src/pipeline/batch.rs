//! Sequential batch processing of discovered URLs

use super::cancel::StopFlag;
use super::orchestrator::{ArticleOutcome, PipelineStores, ProcessReport, RewriteOrchestrator};

/// Result of a batch run
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub reports: Vec<ProcessReport>,
    /// URLs never started because a stop was requested
    pub not_started: usize,
}

impl BatchSummary {
    fn count(&self, pred: impl Fn(&ArticleOutcome) -> bool) -> usize {
        self.reports.iter().filter(|r| pred(&r.outcome)).count()
    }

    pub fn stored(&self) -> usize {
        self.count(ArticleOutcome::is_stored)
    }

    pub fn duplicates(&self) -> usize {
        self.count(|o| matches!(o, ArticleOutcome::SkippedDuplicate { .. }))
    }

    pub fn excluded(&self) -> usize {
        self.count(|o| matches!(o, ArticleOutcome::SkippedExcluded { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(ArticleOutcome::is_failed)
    }

    pub fn was_cancelled(&self) -> bool {
        self.not_started > 0
    }
}

impl RewriteOrchestrator {
    /// Process URLs one at a time in the given order.
    pub async fn process_batch(
        &self,
        urls: &[String],
        stores: &mut PipelineStores<'_>,
        stop: &StopFlag,
    ) -> BatchSummary {
        self.process_batch_with(urls, stores, stop, |_, _| {}).await
    }

    /// Like [`Self::process_batch`], calling `on_report(index, report)` after
    /// each URL.
    ///
    /// The stop flag is checked before each URL, never in the middle of one.
    /// The pause after an article depends on its outcome: `success_delay`
    /// after a store, `failure_delay` after a failure, none after a skip.
    pub async fn process_batch_with<F>(
        &self,
        urls: &[String],
        stores: &mut PipelineStores<'_>,
        stop: &StopFlag,
        mut on_report: F,
    ) -> BatchSummary
    where
        F: FnMut(usize, &ProcessReport),
    {
        let mut summary = BatchSummary::default();
        tracing::info!(total = urls.len(), "Starting batch");

        for (index, url) in urls.iter().enumerate() {
            if stop.is_stopped() {
                summary.not_started = urls.len() - index;
                tracing::info!(remaining = summary.not_started, "Batch stopped");
                break;
            }

            let report = self.process_url(url, stores).await;
            on_report(index, &report);

            let delay = match report.outcome {
                ArticleOutcome::Stored { .. } => Some(self.config().success_delay),
                ArticleOutcome::Failed { .. } => Some(self.config().failure_delay),
                _ => None,
            };
            summary.reports.push(report);

            let is_last = index + 1 == urls.len();
            if let (Some(delay), false) = (delay, is_last) {
                tokio::time::sleep(delay).await;
            }
        }

        tracing::info!(
            stored = summary.stored(),
            duplicates = summary.duplicates(),
            excluded = summary.excluded(),
            failed = summary.failed(),
            "Batch finished"
        );
        summary
    }
}

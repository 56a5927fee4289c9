//! Prometheus metrics for the rewrite pipeline and publisher
//!
//! This module provides metrics tracking for:
//! - Pipeline: article outcomes, rewrite attempts, key rotations, rewrite latency
//! - Publishing: per-platform results, resolved post statuses, queue depth
//!
//! # Usage
//!
//! Call `init_metrics()` at application startup to register all metrics.
//! If initialization fails, metrics operations become no-ops.

use prometheus::{
    register_counter_vec, register_gauge, register_histogram_vec, CounterVec, Encoder, Gauge,
    HistogramVec, TextEncoder,
};
use std::sync::OnceLock;

// ============================================================================
// Metrics Storage
// ============================================================================

/// Container for rewrite pipeline metrics
struct PipelineMetrics {
    articles: CounterVec,
    rewrite_attempts: CounterVec,
    key_rotations: CounterVec,
    rewrite_duration: HistogramVec,
}

/// Container for publishing metrics
struct PublishMetrics {
    results: CounterVec,
    posts_resolved: CounterVec,
    queue_pending: Gauge,
    publish_duration: HistogramVec,
}

static PIPELINE_METRICS: OnceLock<PipelineMetrics> = OnceLock::new();

static PUBLISH_METRICS: OnceLock<PublishMetrics> = OnceLock::new();

/// Flag to track if initialization was attempted
static METRICS_INIT_ATTEMPTED: OnceLock<bool> = OnceLock::new();

// ============================================================================
// Initialization
// ============================================================================

/// Initialize all Prometheus metrics
///
/// If metric registration fails, subsequent metric operations become no-ops.
pub fn init_metrics() -> Result<(), Box<dyn std::error::Error>> {
    // Prevent double initialization
    if METRICS_INIT_ATTEMPTED.get().is_some() {
        return Ok(());
    }
    METRICS_INIT_ATTEMPTED.set(true).ok();

    let pipeline = PipelineMetrics {
        articles: register_counter_vec!(
            "newsloom_articles_total",
            "Articles processed by outcome",
            &["outcome"]
        )?,
        rewrite_attempts: register_counter_vec!(
            "newsloom_rewrite_attempts_total",
            "Rewrite calls by provider and result",
            &["provider", "result"]
        )?,
        key_rotations: register_counter_vec!(
            "newsloom_key_rotations_total",
            "API key rotations triggered by quota errors",
            &["provider"]
        )?,
        rewrite_duration: register_histogram_vec!(
            "newsloom_rewrite_duration_seconds",
            "Rewrite call latency",
            &["provider"],
            vec![0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 40.0, 60.0]
        )?,
    };

    let publish = PublishMetrics {
        results: register_counter_vec!(
            "newsloom_publish_results_total",
            "Per-account publish results",
            &["platform", "success"]
        )?,
        posts_resolved: register_counter_vec!(
            "newsloom_posts_resolved_total",
            "Posts resolved by final status",
            &["status"]
        )?,
        queue_pending: register_gauge!(
            "newsloom_queue_pending",
            "Posts currently pending in the publish queue"
        )?,
        publish_duration: register_histogram_vec!(
            "newsloom_publish_duration_seconds",
            "Per-account publish latency",
            &["platform"],
            vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
        )?,
    };

    PIPELINE_METRICS
        .set(pipeline)
        .map_err(|_| "Pipeline metrics already initialized")?;
    PUBLISH_METRICS
        .set(publish)
        .map_err(|_| "Publish metrics already initialized")?;

    tracing::info!("Prometheus metrics initialized successfully");
    Ok(())
}

/// Check if metrics have been initialized
pub fn metrics_initialized() -> bool {
    PIPELINE_METRICS.get().is_some() && PUBLISH_METRICS.get().is_some()
}

/// Encode all metrics to Prometheus text format
pub fn gather_metrics() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

// ============================================================================
// Timer
// ============================================================================

/// Histogram timer guard that records duration on drop
pub struct MetricsTimer {
    timer: Option<prometheus::HistogramTimer>,
}

impl MetricsTimer {
    fn new(timer: prometheus::HistogramTimer) -> Self {
        Self { timer: Some(timer) }
    }

    /// Create a no-op timer when metrics are not initialized
    fn noop() -> Self {
        Self { timer: None }
    }
}

impl Drop for MetricsTimer {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.stop_and_record();
        }
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Record the terminal outcome of one article (`stored`, `duplicate`, `excluded`, `failed`)
pub fn record_article_outcome(outcome: &str) {
    if let Some(m) = PIPELINE_METRICS.get() {
        m.articles.with_label_values(&[outcome]).inc();
    }
}

/// Record one rewrite call
pub fn record_rewrite_attempt(provider: &str, success: bool) {
    if let Some(m) = PIPELINE_METRICS.get() {
        let result = if success { "success" } else { "error" };
        m.rewrite_attempts
            .with_label_values(&[provider, result])
            .inc();
    }
}

/// Record a key rotation
pub fn record_key_rotation(provider: &str) {
    if let Some(m) = PIPELINE_METRICS.get() {
        m.key_rotations.with_label_values(&[provider]).inc();
    }
}

/// Start a rewrite timer
pub fn start_rewrite_timer(provider: &str) -> MetricsTimer {
    match PIPELINE_METRICS.get() {
        Some(m) => MetricsTimer::new(
            m.rewrite_duration
                .with_label_values(&[provider])
                .start_timer(),
        ),
        None => MetricsTimer::noop(),
    }
}

// ============================================================================
// Publishing
// ============================================================================

/// Record one per-account publish result
pub fn record_publish_result(platform: &str, success: bool) {
    if let Some(m) = PUBLISH_METRICS.get() {
        let success = if success { "true" } else { "false" };
        m.results.with_label_values(&[platform, success]).inc();
    }
}

/// Record a post reaching its final status
pub fn record_post_resolved(status: &str) {
    if let Some(m) = PUBLISH_METRICS.get() {
        m.posts_resolved.with_label_values(&[status]).inc();
    }
}

/// Update the pending queue gauge
pub fn update_queue_pending(pending: usize) {
    if let Some(m) = PUBLISH_METRICS.get() {
        m.queue_pending.set(pending as f64);
    }
}

/// Start a publish timer
pub fn start_publish_timer(platform: &str) -> MetricsTimer {
    match PUBLISH_METRICS.get() {
        Some(m) => MetricsTimer::new(
            m.publish_duration
                .with_label_values(&[platform])
                .start_timer(),
        ),
        None => MetricsTimer::noop(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ensure_metrics_initialized() {
        let _ = init_metrics();
    }

    #[test]
    fn test_init_metrics() {
        assert!(init_metrics().is_ok());
        // Second call is a no-op
        assert!(init_metrics().is_ok());
    }

    #[test]
    fn test_metrics_initialized() {
        ensure_metrics_initialized();
        assert!(metrics_initialized());
    }

    #[test]
    fn test_gather_metrics() {
        ensure_metrics_initialized();
        record_article_outcome("stored");
        let text = gather_metrics().unwrap();
        assert!(text.contains("newsloom_articles_total"));
    }

    #[test]
    fn test_pipeline_metrics() {
        ensure_metrics_initialized();
        record_rewrite_attempt("gemini", false);
        record_key_rotation("gemini");
        let _timer = start_rewrite_timer("gemini");
    }

    #[test]
    fn test_publish_metrics() {
        ensure_metrics_initialized();
        record_publish_result("telegram", true);
        record_post_resolved("published");
        update_queue_pending(3);
        let _timer = start_publish_timer("telegram");
    }
}

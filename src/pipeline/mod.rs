//! Article rewrite pipeline
//!
//! Candidate URLs come from the command line or from a news search feed.
//! Discovered URLs are processed strictly one at a time: extract, check the
//! archive for a near-duplicate, rewrite with key rotation, then archive and
//! optionally queue the result for publishing.

pub mod batch;
pub mod cancel;
pub mod discover;
pub mod extract;
pub mod orchestrator;

pub use batch::BatchSummary;
pub use cancel::StopFlag;
pub use discover::{DiscoverConfig, DiscoveredArticle, NewsSearch, RssNewsSearch, TimeRange};
pub use extract::{ContentExtractor, HtmlExtractor};
pub use orchestrator::{
    ArticleOutcome, OrchestratorConfig, PipelineStores, ProcessReport, RewriteOrchestrator,
};

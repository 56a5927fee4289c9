//! newsloom - news relay with near-duplicate detection, LLM rewriting and
//! scheduled social publishing
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`pipeline`] - News search, article extraction, duplicate check and rewrite orchestration
//! - [`llm`] - Rewrite providers (Gemini, Groq, HuggingFace)
//! - [`publisher`] - Twitter, Facebook and Telegram delivery
//! - [`scheduler`] - API key rotation and interval publishing
//! - [`storage`] - Archive, publish queue and state persistence
//! - [`models`] - Core data structures and types
//! - [`metrics`] - Prometheus counters
//! - [`utils`] - Common utilities and domain errors
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use newsloom::config::Config;
//! use newsloom::llm::LlmRewriter;
//! use newsloom::pipeline::{HtmlExtractor, PipelineStores, RewriteOrchestrator};
//! use newsloom::storage::StateStore;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let store = StateStore::new(&config.storage.data_dir, config.storage.archive_limit);
//!     let mut state = store.load()?;
//!
//!     let orchestrator = RewriteOrchestrator::new(
//!         Arc::new(HtmlExtractor::new(config.extract_timeout())?),
//!         Arc::new(LlmRewriter::with_config(config.llm_config()?)?),
//!         config.orchestrator_config(state.excluded_domains.clone())?,
//!     );
//!     let mut stores = PipelineStores {
//!         archive: &mut state.archive,
//!         keys: &mut state.keys,
//!         queue: &mut state.queue,
//!     };
//!     let report = orchestrator
//!         .process_url("https://example.com/news/1", &mut stores)
//!         .await;
//!     println!("{}", report.outcome.label());
//!
//!     store.save(&mut state)?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod llm;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod publisher;
pub mod scheduler;
pub mod storage;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, ErrorCategory, LoomErrorTrait, Result};
    pub use crate::models::{
        PostStatus, ProcessedArticle, PublishPost, PublishResult, RawArticle, SocialAccount,
    };
    pub use crate::pipeline::{
        ArticleOutcome, DiscoveredArticle, NewsSearch, RewriteOrchestrator, StopFlag, TimeRange,
    };
    pub use crate::scheduler::{KeyPool, PublishEvent, PublishScheduler};
    pub use crate::storage::{AppState, ArchiveStore, PublishQueue, StateStore};
}

// Direct re-exports for convenience
pub use models::{ProcessedArticle, PublishPost, SocialAccount};

//! Credential rotation and interval publishing
//!
//! # Overview
//!
//! - [`rotation`] - Per-provider API key pools with a circular active cursor
//! - [`publish`] - Interval-driven publishing of queued posts to every
//!   configured account
//! - [`error`] - Scheduler error types
//!
//! # Publishing
//!
//! ```text
//!   PublishQueue (pending ids snapshot)
//!          │
//!          ▼
//!   ┌──────────────┐  tick  ┌───────────┐
//!   │ ScheduledRun │ ─────▶ │ Publisher │ ──▶ account 1..n
//!   └──────┬───────┘        └───────────┘
//!          │ PublishEvent
//!          ▼
//!        caller  (applies results to the queue)
//! ```
//!
//! ```ignore
//! use newsloom::scheduler::{PublishEvent, PublishScheduler};
//!
//! let scheduler = PublishScheduler::new(publisher);
//! let mut events = scheduler.start(queue.clone(), accounts, interval).await?;
//! while let Some(event) = events.recv().await {
//!     if let PublishEvent::Published { post_id, results } = event {
//!         queue.write().await.apply_results(post_id, &results, SuccessPolicy::Any);
//!     }
//! }
//! ```
//!
//! # Configuration
//!
//! | Setting | Default | Description |
//! |---------|---------|-------------|
//! | `publish.interval_minutes` | 5 | Minutes between scheduled posts |
//! | `publish.success_policy` | `any` | How per-account results resolve a post |
//! | `rewrite.max_key_rotations` | 3 | Rotations after quota errors before giving up |

pub mod error;
pub mod publish;
pub mod rotation;

pub use error::{SchedulerError, SchedulerResult};
pub use publish::{publish_to_all, PublishEvent, PublishNowReport, PublishScheduler};
pub use rotation::{KeyPool, ProviderPool};

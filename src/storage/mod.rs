//! Archive, publish queue and state persistence
//!
//! The archive and queue are plain in-memory collections. [`state::StateStore`]
//! snapshots them, together with key pools and accounts, to a JSON file.

pub mod archive;
pub mod queue;
pub mod similarity;
pub mod state;

pub use archive::{ArchiveStore, DuplicateMatch};
pub use queue::{PublishQueue, SharedQueue, SuccessPolicy};
pub use state::{AppState, StateStore};

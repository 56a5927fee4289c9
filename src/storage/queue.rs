//! Publish queue
//!
//! Posts enter as `pending` and move forward only: `pending → publishing`,
//! `pending | publishing → published | failed`. A failed post never returns to
//! `pending` on its own; [`PublishQueue::requeue`] is the explicit way back.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{NewPost, PostStatus, PublishPost, PublishResult};

/// Queue shared between the caller and a running publish scheduler
pub type SharedQueue = Arc<RwLock<PublishQueue>>;

/// How per-account results decide the post status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuccessPolicy {
    /// Published if at least one account succeeded
    #[default]
    Any,
    /// Published only if every account succeeded
    All,
}

impl SuccessPolicy {
    pub fn is_success(&self, results: &[PublishResult]) -> bool {
        match self {
            Self::Any => results.iter().any(|r| r.success),
            Self::All => !results.is_empty() && results.iter().all(|r| r.success),
        }
    }
}

/// Ordered list of posts awaiting publication
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct PublishQueue {
    posts: Vec<PublishPost>,
}

impl PublishQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_shared(self) -> SharedQueue {
        Arc::new(RwLock::new(self))
    }

    /// Append a new pending post.
    pub fn enqueue(&mut self, post: NewPost) -> Uuid {
        let id = Uuid::new_v4();
        self.posts.push(PublishPost {
            id,
            title: post.title,
            description: post.description,
            content: post.content,
            image: post.image,
            source: post.source,
            location: post.location,
            publish_date: post.publish_date,
            original_url: post.original_url,
            status: PostStatus::Pending,
            created_at: Utc::now(),
            published_at: None,
        });
        id
    }

    pub fn remove(&mut self, id: Uuid) -> Option<PublishPost> {
        let index = self.posts.iter().position(|p| p.id == id)?;
        Some(self.posts.remove(index))
    }

    pub fn get(&self, id: Uuid) -> Option<&PublishPost> {
        self.posts.iter().find(|p| p.id == id)
    }

    /// Set a post's status; `published_at` is stamped on `published`.
    pub fn set_status(&mut self, id: Uuid, status: PostStatus) -> bool {
        let Some(post) = self.posts.iter_mut().find(|p| p.id == id) else {
            return false;
        };
        post.status = status;
        if status == PostStatus::Published {
            post.published_at = Some(Utc::now());
        }
        true
    }

    /// Move a pending post to `publishing` and return a copy of it.
    ///
    /// `None` if the post is gone or no longer pending.
    pub fn claim(&mut self, id: Uuid) -> Option<PublishPost> {
        let post = self
            .posts
            .iter_mut()
            .find(|p| p.id == id && p.status == PostStatus::Pending)?;
        post.status = PostStatus::Publishing;
        Some(post.clone())
    }

    /// Resolve a post from its per-account results. Returns the new status.
    pub fn apply_results(
        &mut self,
        id: Uuid,
        results: &[PublishResult],
        policy: SuccessPolicy,
    ) -> Option<PostStatus> {
        let status = if policy.is_success(results) {
            PostStatus::Published
        } else {
            PostStatus::Failed
        };
        self.set_status(id, status).then_some(status)
    }

    /// Put a failed post back into `pending`.
    pub fn requeue(&mut self, id: Uuid) -> bool {
        match self.posts.iter_mut().find(|p| p.id == id) {
            Some(post) if post.status == PostStatus::Failed => {
                post.status = PostStatus::Pending;
                true
            }
            _ => false,
        }
    }

    /// Move the post at `from` to position `to`.
    pub fn reorder(&mut self, from: usize, to: usize) -> bool {
        if from >= self.posts.len() || to >= self.posts.len() {
            return false;
        }
        let post = self.posts.remove(from);
        self.posts.insert(to, post);
        true
    }

    /// Pending posts in queue order.
    pub fn pending(&self) -> Vec<&PublishPost> {
        self.posts
            .iter()
            .filter(|p| p.status == PostStatus::Pending)
            .collect()
    }

    pub fn pending_ids(&self) -> Vec<Uuid> {
        self.pending().into_iter().map(|p| p.id).collect()
    }

    pub fn count_by_status(&self, status: PostStatus) -> usize {
        self.posts.iter().filter(|p| p.status == status).count()
    }

    pub fn posts(&self) -> &[PublishPost] {
        &self.posts
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }
}

//! Archive of processed articles and near-duplicate lookup

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::similarity::{normalize_text, prefix_chars, score};
use crate::models::{ArchivedArticle, NewArchiveEntry};

/// Title similarity above which two articles are the same story
pub const TITLE_SIMILARITY_THRESHOLD: f64 = 0.8;

/// Content-prefix similarity above which two articles are the same story
pub const CONTENT_SIMILARITY_THRESHOLD: f64 = 0.7;

/// Number of content characters compared
pub const CONTENT_PREFIX_CHARS: usize = 200;

/// Details of the archived item a candidate collided with
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateMatch<'a> {
    pub index: usize,
    pub article: &'a ArchivedArticle,
    pub title_similarity: f64,
    pub content_similarity: f64,
}

/// Append-only collection of previously processed articles
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct ArchiveStore {
    items: Vec<ArchivedArticle>,
}

impl ArchiveStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items(items: Vec<ArchivedArticle>) -> Self {
        Self { items }
    }

    /// Append an entry stamped with the current time.
    ///
    /// No uniqueness check happens here; callers run [`Self::is_duplicate`] first.
    pub fn insert(&mut self, entry: NewArchiveEntry) -> &ArchivedArticle {
        self.items.push(ArchivedArticle {
            title: entry.title,
            content: entry.content,
            source: entry.source,
            description: entry.description,
            original_title: entry.original_title,
            original_url: entry.original_url,
            archived_at: Utc::now(),
        });
        &self.items[self.items.len() - 1]
    }

    /// Whether any archived article looks like the same story.
    pub fn is_duplicate(&self, title: &str, content: &str) -> bool {
        self.find_duplicate(title, content).is_some()
    }

    /// First archived article (in archive order) matching the candidate.
    pub fn find_duplicate(&self, title: &str, content: &str) -> Option<DuplicateMatch<'_>> {
        let candidate_title = normalize_text(title);
        let candidate_content = normalize_text(prefix_chars(content, CONTENT_PREFIX_CHARS));

        self.items.iter().enumerate().find_map(|(index, archived)| {
            let title_similarity = score(&candidate_title, &normalize_text(&archived.title));
            let content_similarity = score(
                &candidate_content,
                &normalize_text(prefix_chars(&archived.content, CONTENT_PREFIX_CHARS)),
            );

            if title_similarity > TITLE_SIMILARITY_THRESHOLD
                || content_similarity > CONTENT_SIMILARITY_THRESHOLD
            {
                Some(DuplicateMatch {
                    index,
                    article: archived,
                    title_similarity,
                    content_similarity,
                })
            } else {
                None
            }
        })
    }

    /// Remove everything. Only user-triggered.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ArchivedArticle> {
        self.items.iter()
    }

    /// Newest `limit` items, newest first.
    pub fn recent(&self, limit: usize) -> Vec<&ArchivedArticle> {
        self.items.iter().rev().take(limit).collect()
    }

    /// Drop the oldest items so at most `limit` remain.
    pub fn truncate_to_latest(&mut self, limit: usize) {
        if self.items.len() > limit {
            let excess = self.items.len() - limit;
            self.items.drain(..excess);
        }
    }
}

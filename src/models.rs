// Core data structures for the newsloom relay

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Article as returned by a content extractor
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RawArticle {
    pub url: String,
    pub title: String,
    pub content: String,
    pub image: Option<String>,
    pub source: String, // host without "www."
    pub publish_date: Option<String>,
    pub location: Option<String>,
}

/// Article as returned by a rewriter
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RewrittenArticle {
    pub title: String,
    pub description: String,
    pub content: String,
    pub location: Option<String>,
    pub publish_date: Option<String>,
}

/// Result of a successful extract + rewrite pass
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessedArticle {
    pub original_url: String,
    pub original_title: String,
    pub original_content: String,
    pub title: String,
    pub description: String,
    pub content: String,
    pub image: Option<String>,
    pub source: String,
    pub location: Option<String>,
    pub publish_date: Option<String>,
    pub processed_at: DateTime<Utc>,
}

impl ProcessedArticle {
    /// Merge extracted and rewritten fields. Extracted location and date win.
    pub fn from_parts(raw: RawArticle, rewritten: RewrittenArticle) -> Self {
        Self {
            location: raw.location.or(rewritten.location),
            publish_date: raw.publish_date.or(rewritten.publish_date),
            original_url: raw.url,
            original_title: raw.title,
            original_content: raw.content,
            title: rewritten.title,
            description: rewritten.description,
            content: rewritten.content,
            image: raw.image,
            source: raw.source,
            processed_at: Utc::now(),
        }
    }
}

/// Archived article used for duplicate detection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArchivedArticle {
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub original_title: Option<String>,
    #[serde(default)]
    pub original_url: Option<String>,
    pub archived_at: DateTime<Utc>,
}

/// Fields supplied by the caller when archiving; `archived_at` is stamped on insert
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewArchiveEntry {
    pub title: String,
    pub content: String,
    pub source: String,
    pub description: Option<String>,
    pub original_title: Option<String>,
    pub original_url: Option<String>,
}

impl From<&ProcessedArticle> for NewArchiveEntry {
    fn from(article: &ProcessedArticle) -> Self {
        Self {
            title: article.title.clone(),
            content: article.content.clone(),
            source: article.source.clone(),
            description: Some(article.description.clone()),
            original_title: Some(article.original_title.clone()),
            original_url: Some(article.original_url.clone()),
        }
    }
}

/// A provider credential tracked by the key pool
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiKeyRecord {
    pub id: Uuid,
    pub secret: String,
    pub display_name: String,
    pub usage_count: u64,
    pub last_used_at: Option<DateTime<Utc>>,
}

/// Publishing status of a queued post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Pending,
    Publishing,
    Published,
    Failed,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Publishing => "publishing",
            Self::Published => "published",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Post waiting in (or resolved by) the publish queue
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublishPost {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub content: String,
    pub image: Option<String>,
    pub source: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub publish_date: Option<String>,
    #[serde(default)]
    pub original_url: Option<String>,
    pub status: PostStatus,
    pub created_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
}

/// Fields supplied by the caller when queueing a post
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewPost {
    pub title: String,
    pub description: String,
    pub content: String,
    pub image: Option<String>,
    pub source: String,
    pub location: Option<String>,
    pub publish_date: Option<String>,
    pub original_url: Option<String>,
}

impl From<&ProcessedArticle> for NewPost {
    fn from(article: &ProcessedArticle) -> Self {
        Self {
            title: article.title.clone(),
            description: article.description.clone(),
            content: article.content.clone(),
            image: article.image.clone(),
            source: article.source.clone(),
            location: article.location.clone(),
            publish_date: article.publish_date.clone(),
            original_url: Some(article.original_url.clone()),
        }
    }
}

/// Social platforms a post can be delivered to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Twitter,
    Facebook,
    Telegram,
}

impl Platform {
    pub fn all() -> Vec<Self> {
        vec![Self::Twitter, Self::Facebook, Self::Telegram]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Twitter => "twitter",
            Self::Facebook => "facebook",
            Self::Telegram => "telegram",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Facebook destination kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FacebookTarget {
    #[default]
    Page,
    Group,
}

/// Per-platform credentials
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "platform", rename_all = "lowercase")]
pub enum AccountCredentials {
    Twitter {
        access_token: String,
    },
    Facebook {
        access_token: String,
        page_id: String,
        #[serde(default)]
        target: FacebookTarget,
    },
    Telegram {
        bot_token: String,
        chat_id: String,
    },
}

/// Configured social media account
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SocialAccount {
    pub id: Uuid,
    pub name: String,
    #[serde(flatten)]
    pub credentials: AccountCredentials,
}

impl SocialAccount {
    pub fn new(name: impl Into<String>, credentials: AccountCredentials) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            credentials,
        }
    }

    pub fn platform(&self) -> Platform {
        match self.credentials {
            AccountCredentials::Twitter { .. } => Platform::Twitter,
            AccountCredentials::Facebook { .. } => Platform::Facebook,
            AccountCredentials::Telegram { .. } => Platform::Telegram,
        }
    }
}

/// Outcome of delivering one post to one account
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublishResult {
    pub account_id: Uuid,
    pub platform: Platform,
    pub success: bool,
    pub post_id: Option<String>,
    pub url: Option<String>,
    pub error: Option<String>,
}

impl PublishResult {
    pub fn success(account: &SocialAccount, post_id: impl Into<String>, url: Option<String>) -> Self {
        Self {
            account_id: account.id,
            platform: account.platform(),
            success: true,
            post_id: Some(post_id.into()),
            url,
            error: None,
        }
    }

    pub fn failure(account: &SocialAccount, error: impl Into<String>) -> Self {
        Self {
            account_id: account.id,
            platform: account.platform(),
            success: false,
            post_id: None,
            url: None,
            error: Some(error.into()),
        }
    }
}

impl fmt::Display for PublishResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.success { "SUCCESS" } else { "FAILED" };
        write!(f, "[{status}] {} ({})", self.platform, self.account_id)?;
        if let Some(id) = &self.post_id {
            write!(f, " post {id}")?;
        }
        if let Some(err) = &self.error {
            write!(f, ": {err}")?;
        }
        Ok(())
    }
}

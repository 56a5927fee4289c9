//! Error types for the newsloom pipeline
//!
//! This module defines the domain errors raised by extraction, rewriting,
//! publishing and persistence.

use thiserror::Error;

/// Errors that can occur while extracting an article from a URL
#[derive(Error, Debug)]
pub enum ExtractError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status from the article server
    #[error("Server returned status {0}")]
    Status(u16),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Title not found in HTML
    #[error("Title not found in article")]
    TitleNotFound,

    /// Content not found in HTML
    #[error("Content not found in article")]
    ContentNotFound,
}

/// Errors that can occur while searching the news feed
#[derive(Error, Debug)]
pub enum DiscoverError {
    /// HTTP transport error, with the request URL removed
    #[error("HTTP request failed: {0}")]
    Http(reqwest::Error),

    /// Non-success status from the feed server
    #[error("Feed server returned status {0}")]
    Status(u16),

    /// Body is not a readable RSS or Atom feed
    #[error("Failed to parse news feed: {0}")]
    Feed(String),
}

impl From<reqwest::Error> for DiscoverError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e.without_url())
    }
}

/// Errors returned by a rewrite provider
#[derive(Error, Debug)]
pub enum RewriteError {
    /// Provider rejected the call for quota or rate reasons
    #[error("Rate limit or quota exceeded: {0}")]
    Quota(String),

    /// Provider answered with a non-success status
    #[error("Provider error ({status}): {message}")]
    Provider { status: u16, message: String },

    /// HTTP transport error, with the request URL removed
    #[error("HTTP request failed: {0}")]
    Http(reqwest::Error),

    /// Unexpected response shape
    #[error("Failed to parse provider response: {0}")]
    Parse(String),

    /// Provider returned no text
    #[error("Provider returned an empty response")]
    EmptyResponse,

    /// Provider name not recognized
    #[error("Rewrite provider not configured: {0}")]
    NotConfigured(String),
}

impl RewriteError {
    /// Whether the failure should trigger key rotation.
    ///
    /// True for explicit quota errors, HTTP 429, and any provider message
    /// mentioning `429`, `quota`, `limit` or `rate`. Transport failures only
    /// count when they carry a 429 status.
    pub fn is_quota(&self) -> bool {
        match self {
            Self::Quota(_) => true,
            Self::Provider { status: 429, .. } => true,
            Self::Provider { message, .. } | Self::Parse(message) => mentions_quota(message),
            Self::Http(e) => e.status() == Some(reqwest::StatusCode::TOO_MANY_REQUESTS),
            Self::EmptyResponse | Self::NotConfigured(_) => false,
        }
    }
}

fn mentions_quota(message: &str) -> bool {
    let message = message.to_lowercase();
    ["429", "quota", "limit", "rate"]
        .iter()
        .any(|needle| message.contains(needle))
}

// Request URLs can carry credentials (bot tokens, access tokens), so they
// never reach an error message.
impl From<reqwest::Error> for RewriteError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e.without_url())
    }
}

/// Errors that can occur while delivering a post to one account
#[derive(Error, Debug)]
pub enum PublishError {
    /// HTTP transport error, with the request URL removed
    #[error("HTTP request failed: {0}")]
    Http(reqwest::Error),

    /// Platform API rejected the request
    #[error("{platform} API error: {message}")]
    Api { platform: String, message: String },

    /// Platform answered with a body we could not read
    #[error("Unexpected {platform} response: {reason}")]
    InvalidResponse { platform: String, reason: String },
}

impl From<reqwest::Error> for PublishError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e.without_url())
    }
}

impl PublishError {
    pub fn api(platform: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            platform: platform.into(),
            message: message.into(),
        }
    }

    pub fn invalid_response(platform: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            platform: platform.into(),
            reason: reason.into(),
        }
    }
}

/// Terminal failure of one article in the rewrite pipeline
#[derive(Error, Debug)]
pub enum ProcessError {
    /// Extraction failed
    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractError),

    /// Rewrite failed with a non-quota error
    #[error("Rewrite failed: {0}")]
    Rewrite(RewriteError),

    /// Quota errors persisted after every allowed rotation
    #[error("Rewrite quota exhausted after {rotations} key rotations: {last}")]
    QuotaExhausted { rotations: u32, last: RewriteError },

    /// No key is configured for the provider
    #[error("No active API key for provider '{provider}'")]
    NoActiveKey { provider: String },
}

/// Errors that can occur while loading or saving application state
#[derive(Error, Debug)]
pub enum StateError {
    /// IO error
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Serialization error
    #[error("Invalid state file {path}: {source}")]
    Serde {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

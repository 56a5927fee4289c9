//! Social platform publishers
//!
//! A [`Publisher`] delivers one post to one account and always returns a
//! [`PublishResult`]; transport and API failures are captured in the result
//! instead of propagating. [`PlatformPublisher`] picks the platform client
//! from the account's credentials.

pub mod facebook;
pub mod telegram;
pub mod twitter;

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::metrics;
use crate::models::{AccountCredentials, PublishPost, PublishResult, SocialAccount};
use crate::utils::error::PublishError;

pub use facebook::FacebookClient;
pub use telegram::TelegramClient;
pub use twitter::TwitterClient;

/// Result type for platform calls
pub type PublishOutcome<T> = Result<T, PublishError>;

/// Successful platform delivery
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub post_id: String,
    pub url: Option<String>,
}

/// Trait for delivering posts
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Deliver a post to one account
    async fn publish(&self, account: &SocialAccount, post: &PublishPost) -> PublishResult;

    /// Check that the account's credentials work; returns a display name
    async fn verify(&self, account: &SocialAccount) -> PublishOutcome<String>;
}

/// Plain-text body shared by all platforms: title, description, content
pub fn compose_text(post: &PublishPost) -> String {
    [
        post.title.trim(),
        post.description.trim(),
        post.content.trim(),
    ]
    .into_iter()
    .filter(|part| !part.is_empty())
    .collect::<Vec<_>>()
    .join("\n\n")
}

/// [`Publisher`] backed by the real platform APIs
pub struct PlatformPublisher {
    twitter: TwitterClient,
    facebook: FacebookClient,
    telegram: TelegramClient,
}

impl PlatformPublisher {
    pub fn new(timeout: Duration) -> PublishOutcome<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            twitter: TwitterClient::new(client.clone()),
            facebook: FacebookClient::new(client.clone()),
            telegram: TelegramClient::new(client),
        })
    }

    /// Override the Twitter API base URL
    pub fn with_twitter_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.twitter = self.twitter.with_base_url(base_url);
        self
    }

    /// Override the Graph API base URL
    pub fn with_facebook_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.facebook = self.facebook.with_base_url(base_url);
        self
    }

    /// Override the Bot API base URL
    pub fn with_telegram_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.telegram = self.telegram.with_base_url(base_url);
        self
    }

    async fn deliver(&self, account: &SocialAccount, post: &PublishPost) -> PublishOutcome<Delivery> {
        match &account.credentials {
            AccountCredentials::Twitter { access_token } => {
                self.twitter.post(access_token, post).await
            }
            AccountCredentials::Facebook {
                access_token,
                page_id,
                ..
            } => self.facebook.post(access_token, page_id, post).await,
            AccountCredentials::Telegram { bot_token, chat_id } => {
                self.telegram.post(bot_token, chat_id, post).await
            }
        }
    }
}

#[async_trait]
impl Publisher for PlatformPublisher {
    async fn publish(&self, account: &SocialAccount, post: &PublishPost) -> PublishResult {
        let platform = account.platform();
        let outcome = {
            let _timer = metrics::start_publish_timer(platform.as_str());
            self.deliver(account, post).await
        };

        let result = match outcome {
            Ok(delivery) => {
                tracing::info!(
                    %platform,
                    account = %account.name,
                    post = %post.id,
                    remote_id = %delivery.post_id,
                    "Post delivered"
                );
                PublishResult::success(account, delivery.post_id, delivery.url)
            }
            Err(e) => {
                tracing::warn!(
                    %platform,
                    account = %account.name,
                    post = %post.id,
                    error = %e,
                    "Post delivery failed"
                );
                PublishResult::failure(account, e.to_string())
            }
        };

        metrics::record_publish_result(platform.as_str(), result.success);
        result
    }

    async fn verify(&self, account: &SocialAccount) -> PublishOutcome<String> {
        match &account.credentials {
            AccountCredentials::Twitter { access_token } => self.twitter.verify(access_token).await,
            AccountCredentials::Facebook {
                access_token,
                page_id,
                ..
            } => self.facebook.verify(access_token, page_id).await,
            AccountCredentials::Telegram { bot_token, .. } => {
                self.telegram.verify(bot_token).await
            }
        }
    }
}

//! Common test utilities

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use tokio::time::Instant;

use newsloom::llm::{RewriteRequest, Rewriter};
use newsloom::models::{
    AccountCredentials, PublishPost, PublishResult, RawArticle, RewrittenArticle, SocialAccount,
};
use newsloom::pipeline::ContentExtractor;
use newsloom::publisher::{PublishOutcome, Publisher};
use newsloom::utils::error::{ExtractError, PublishError, RewriteError};

// ============================================================================
// Fixtures
// ============================================================================

/// Create a raw article for a URL
pub fn raw_article(url: &str, title: &str, content: &str) -> RawArticle {
    RawArticle {
        url: url.to_string(),
        title: title.to_string(),
        content: content.to_string(),
        image: Some(format!("{url}/cover.jpg")),
        source: "news.example".to_string(),
        publish_date: Some("2024-05-01 10:00".to_string()),
        location: None,
    }
}

/// Telegram account; names starting with "broken" fail in [`RecordingPublisher`]
pub fn telegram_account(name: &str) -> SocialAccount {
    SocialAccount::new(
        name,
        AccountCredentials::Telegram {
            bot_token: "123:abc".to_string(),
            chat_id: "@newsloom_test".to_string(),
        },
    )
}

pub const STORY_A: &str = "The city council approved a new budget for public transport on Monday, \
     adding three bus lines and extending the tram network to the northern districts.";

pub const STORY_B: &str = "Heavy rain flooded several coastal villages overnight, forcing hundreds \
     of residents to leave their homes as rescue teams worked through the night.";

pub const STORY_C: &str = "Scientists reported the discovery of a new species of deep sea fish \
     during an expedition that mapped previously unexplored volcanic vents.";

// ============================================================================
// Extractor
// ============================================================================

/// Serves canned articles by URL; unknown URLs fail with `ContentNotFound`
#[derive(Default)]
pub struct MockExtractor {
    articles: HashMap<String, RawArticle>,
    calls: Mutex<Vec<String>>,
}

impl MockExtractor {
    pub fn new(articles: Vec<RawArticle>) -> Self {
        Self {
            articles: articles.into_iter().map(|a| (a.url.clone(), a)).collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContentExtractor for MockExtractor {
    async fn extract(&self, url: &str) -> Result<RawArticle, ExtractError> {
        self.calls.lock().unwrap().push(url.to_string());
        self.articles
            .get(url)
            .cloned()
            .ok_or(ExtractError::ContentNotFound)
    }
}

// ============================================================================
// Rewriter
// ============================================================================

/// One scripted rewriter reply
#[derive(Debug, Clone)]
pub enum Step {
    Rewrite,
    Quota,
    /// Non-quota provider failure
    Reject,
}

/// Replays scripted steps, then repeats `fallback`
pub struct ScriptedRewriter {
    steps: Mutex<VecDeque<Step>>,
    fallback: Step,
    keys_used: Mutex<Vec<String>>,
}

impl ScriptedRewriter {
    pub fn new(steps: Vec<Step>, fallback: Step) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            fallback,
            keys_used: Mutex::new(Vec::new()),
        }
    }

    /// Always succeeds
    pub fn ok() -> Self {
        Self::new(Vec::new(), Step::Rewrite)
    }

    /// API keys in call order
    pub fn keys_used(&self) -> Vec<String> {
        self.keys_used.lock().unwrap().clone()
    }
}

#[async_trait]
impl Rewriter for ScriptedRewriter {
    async fn rewrite(
        &self,
        request: &RewriteRequest,
        api_key: &str,
    ) -> Result<RewrittenArticle, RewriteError> {
        self.keys_used.lock().unwrap().push(api_key.to_string());
        let step = self
            .steps
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        match step {
            Step::Rewrite => Ok(RewrittenArticle {
                title: format!("Breaking: {}", request.title),
                description: "Short summary".to_string(),
                content: format!("Rewritten. {}", request.content),
                location: request.context.location.clone(),
                publish_date: request.context.publish_date.clone(),
            }),
            Step::Quota => Err(RewriteError::Quota("Resource has been exhausted".to_string())),
            Step::Reject => Err(RewriteError::Provider {
                status: 400,
                message: "Invalid request body".to_string(),
            }),
        }
    }
}

// ============================================================================
// Publisher
// ============================================================================

/// One delivery seen by [`RecordingPublisher`]
#[derive(Debug, Clone)]
pub struct Delivered {
    pub account: String,
    pub post_title: String,
    pub at: Instant,
}

/// Records deliveries; accounts named "broken..." fail
#[derive(Default)]
pub struct RecordingPublisher {
    deliveries: Mutex<Vec<Delivered>>,
}

impl RecordingPublisher {
    pub fn deliveries(&self) -> Vec<Delivered> {
        self.deliveries.lock().unwrap().clone()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(&self, account: &SocialAccount, post: &PublishPost) -> PublishResult {
        self.deliveries.lock().unwrap().push(Delivered {
            account: account.name.clone(),
            post_title: post.title.clone(),
            at: Instant::now(),
        });
        if account.name.starts_with("broken") {
            PublishResult::failure(account, "Forbidden")
        } else {
            PublishResult::success(account, format!("remote-{}", post.title), None)
        }
    }

    async fn verify(&self, account: &SocialAccount) -> PublishOutcome<String> {
        if account.name.starts_with("broken") {
            Err(PublishError::api("telegram", "Unauthorized"))
        } else {
            Ok(account.name.clone())
        }
    }
}

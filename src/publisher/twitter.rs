//! Twitter/X delivery through the v2 `POST /2/tweets` endpoint

use reqwest::{Client, Response};
use serde::Deserialize;

use super::{Delivery, PublishOutcome};
use crate::models::PublishPost;
use crate::utils::error::PublishError;
use crate::utils::truncate_text;

const DEFAULT_BASE_URL: &str = "https://api.twitter.com";
const PLATFORM: &str = "twitter";

/// Tweet length limit
pub const TWEET_MAX_CHARS: usize = 280;

#[derive(Debug, Deserialize)]
struct TweetResponse {
    data: TweetData,
}

#[derive(Debug, Deserialize)]
struct TweetData {
    id: String,
}

#[derive(Debug, Deserialize)]
struct MeResponse {
    data: MeData,
}

#[derive(Debug, Deserialize)]
struct MeData {
    username: String,
}

/// Twitter API v2 client authenticated with a user access token
#[derive(Debug, Clone)]
pub struct TwitterClient {
    client: Client,
    base_url: String,
}

impl TwitterClient {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Tweet text: title and description cut to the tweet limit
    pub fn tweet_text(post: &PublishPost) -> String {
        let title = post.title.trim();
        let description = post.description.trim();
        let text = if description.is_empty() {
            title.to_string()
        } else {
            format!("{title}\n\n{description}")
        };
        truncate_text(&text, TWEET_MAX_CHARS)
    }

    pub async fn post(&self, access_token: &str, post: &PublishPost) -> PublishOutcome<Delivery> {
        let response = self
            .client
            .post(format!("{}/2/tweets", self.base_url))
            .bearer_auth(access_token)
            .json(&serde_json::json!({ "text": Self::tweet_text(post) }))
            .send()
            .await?;
        let response = check_status(response).await?;

        let tweet: TweetResponse = response
            .json()
            .await
            .map_err(|e| PublishError::invalid_response(PLATFORM, e.without_url().to_string()))?;

        Ok(Delivery {
            url: Some(format!("https://twitter.com/i/web/status/{}", tweet.data.id)),
            post_id: tweet.data.id,
        })
    }

    pub async fn verify(&self, access_token: &str) -> PublishOutcome<String> {
        let response = self
            .client
            .get(format!("{}/2/users/me", self.base_url))
            .bearer_auth(access_token)
            .send()
            .await?;
        let response = check_status(response).await?;

        let me: MeResponse = response
            .json()
            .await
            .map_err(|e| PublishError::invalid_response(PLATFORM, e.without_url().to_string()))?;
        Ok(format!("@{}", me.data.username))
    }
}

async fn check_status(response: Response) -> PublishOutcome<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body: serde_json::Value = response.json().await.unwrap_or_default();
    let message = body["detail"]
        .as_str()
        .or_else(|| body["errors"][0]["message"].as_str())
        .or_else(|| body["title"].as_str())
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {status}"));

    Err(PublishError::api(PLATFORM, message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publisher::tests::sample_post;

    #[test]
    fn test_tweet_text_uses_title_and_description() {
        let post = sample_post();
        assert_eq!(TwitterClient::tweet_text(&post), "Rates rise\n\nCentral bank moves");
    }

    #[test]
    fn test_tweet_text_is_limited() {
        let mut post = sample_post();
        post.description = "word ".repeat(100);
        let text = TwitterClient::tweet_text(&post);
        assert_eq!(text.chars().count(), TWEET_MAX_CHARS);
        assert!(text.ends_with("..."));
    }
}

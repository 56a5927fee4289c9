//! Integration tests for the platform publishers using wiremock
//!
//! These tests validate request shapes and response handling for the
//! Telegram, Facebook and Twitter clients against mock servers.

use chrono::Utc;
use newsloom::models::{
    AccountCredentials, FacebookTarget, PostStatus, PublishPost, SocialAccount,
};
use newsloom::publisher::{PlatformPublisher, Publisher};
use serde_json::json;
use std::time::Duration;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn post(image: Option<&str>) -> PublishPost {
    PublishPost {
        id: Uuid::new_v4(),
        title: "Council approves budget".to_string(),
        description: "Three new bus lines".to_string(),
        content: "The council voted on Monday.".to_string(),
        image: image.map(str::to_string),
        source: "news.example".to_string(),
        location: None,
        publish_date: None,
        original_url: Some("https://news.example/a".to_string()),
        status: PostStatus::Pending,
        created_at: Utc::now(),
        published_at: None,
    }
}

fn publisher(server: &MockServer) -> PlatformPublisher {
    PlatformPublisher::new(Duration::from_secs(5))
        .unwrap()
        .with_telegram_base_url(server.uri())
        .with_facebook_base_url(server.uri())
        .with_twitter_base_url(server.uri())
}

fn telegram() -> SocialAccount {
    SocialAccount::new(
        "channel",
        AccountCredentials::Telegram {
            bot_token: "123:abc".to_string(),
            chat_id: "@loom_news".to_string(),
        },
    )
}

fn facebook() -> SocialAccount {
    SocialAccount::new(
        "page",
        AccountCredentials::Facebook {
            access_token: "fb-token".to_string(),
            page_id: "42".to_string(),
            target: FacebookTarget::Page,
        },
    )
}

fn twitter() -> SocialAccount {
    SocialAccount::new(
        "x",
        AccountCredentials::Twitter {
            access_token: "tw-token".to_string(),
        },
    )
}

// ============================================================================
// Telegram
// ============================================================================

/// Test text post goes through sendMessage in HTML mode
#[tokio::test]
async fn test_telegram_send_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/bot123:abc/sendMessage"))
        .and(body_partial_json(json!({
            "chat_id": "@loom_news",
            "parse_mode": "HTML",
            "text": "<b>Council approves budget</b>\n\nThree new bus lines\n\nThe council voted on Monday.",
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"ok": true, "result": {"message_id": 77}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let account = telegram();
    let result = publisher(&server).publish(&account, &post(None)).await;

    assert!(result.success, "publish failed: {:?}", result.error);
    assert_eq!(result.account_id, account.id);
    assert_eq!(result.post_id.as_deref(), Some("77"));
    assert_eq!(result.url.as_deref(), Some("https://t.me/loom_news/77"));
}

/// Test posts with an image use sendPhoto with a caption
#[tokio::test]
async fn test_telegram_send_photo() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/bot123:abc/sendPhoto"))
        .and(body_partial_json(json!({
            "photo": "https://news.example/a.jpg",
            "parse_mode": "HTML",
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"ok": true, "result": {"message_id": 8}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let result = publisher(&server)
        .publish(&telegram(), &post(Some("https://news.example/a.jpg")))
        .await;
    assert!(result.success, "publish failed: {:?}", result.error);
}

/// Test Bot API errors become failed results
#[tokio::test]
async fn test_telegram_error_is_captured() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/bot123:abc/sendMessage"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "ok": false,
            "error_code": 400,
            "description": "Bad Request: chat not found",
        })))
        .mount(&server)
        .await;

    let result = publisher(&server).publish(&telegram(), &post(None)).await;

    assert!(!result.success);
    assert!(result.post_id.is_none());
    assert!(result.error.unwrap().contains("chat not found"));
}

#[tokio::test]
async fn test_telegram_verify() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/bot123:abc/getMe"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "result": {"id": 1, "is_bot": true, "first_name": "Loom", "username": "loom_bot"},
        })))
        .mount(&server)
        .await;

    let identity = publisher(&server).verify(&telegram()).await.unwrap();
    assert_eq!(identity, "@loom_bot");
}

/// Test transport failures never expose the bot token from the URL path
#[tokio::test]
async fn test_telegram_connection_error_hides_token() {
    let publisher = PlatformPublisher::new(Duration::from_secs(5))
        .unwrap()
        .with_telegram_base_url("http://127.0.0.1:1");

    let result = publisher.publish(&telegram(), &post(None)).await;

    assert!(!result.success);
    let error = result.error.unwrap();
    assert!(error.contains("HTTP request failed"), "unexpected error: {error}");
    assert!(!error.contains("123:abc"));
}

// ============================================================================
// Facebook
// ============================================================================

/// Test feed post sends message, token and image link
#[tokio::test]
async fn test_facebook_feed_post() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v18.0/42/feed"))
        .and(body_string_contains("access_token=fb-token"))
        .and(body_string_contains("link=https%3A%2F%2Fnews.example%2Fa.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "42_99"})))
        .expect(1)
        .mount(&server)
        .await;

    let result = publisher(&server)
        .publish(&facebook(), &post(Some("https://news.example/a.jpg")))
        .await;

    assert!(result.success, "publish failed: {:?}", result.error);
    assert_eq!(result.post_id.as_deref(), Some("42_99"));
    assert_eq!(result.url.as_deref(), Some("https://facebook.com/42_99"));
}

#[tokio::test]
async fn test_facebook_graph_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v18.0/42/feed"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"message": "Invalid OAuth access token.", "type": "OAuthException", "code": 190}
        })))
        .mount(&server)
        .await;

    let result = publisher(&server).publish(&facebook(), &post(None)).await;

    assert!(!result.success);
    assert!(result.error.unwrap().contains("Invalid OAuth access token"));
}

#[tokio::test]
async fn test_facebook_verify_returns_page_name() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v18.0/42"))
        .and(query_param("access_token", "fb-token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": "42", "name": "Daily Page"})),
        )
        .mount(&server)
        .await;

    let identity = publisher(&server).verify(&facebook()).await.unwrap();
    assert_eq!(identity, "Daily Page");
}

// ============================================================================
// Twitter
// ============================================================================

/// Test tweet creation with bearer auth
#[tokio::test]
async fn test_twitter_create_tweet() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/2/tweets"))
        .and(header("authorization", "Bearer tw-token"))
        .and(body_partial_json(json!({
            "text": "Council approves budget\n\nThree new bus lines",
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "data": {"id": "1799", "text": "Council approves budget"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = publisher(&server).publish(&twitter(), &post(None)).await;

    assert!(result.success, "publish failed: {:?}", result.error);
    assert_eq!(
        result.url.as_deref(),
        Some("https://twitter.com/i/web/status/1799")
    );
}

#[tokio::test]
async fn test_twitter_forbidden() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/2/tweets"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "title": "Forbidden",
            "detail": "You are not permitted to perform this action.",
            "status": 403,
        })))
        .mount(&server)
        .await;

    let result = publisher(&server).publish(&twitter(), &post(None)).await;

    assert!(!result.success);
    assert!(result.error.unwrap().contains("not permitted"));
}

#[tokio::test]
async fn test_twitter_verify() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/2/users/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"id": "1", "name": "Newsroom", "username": "newsroom"}
        })))
        .mount(&server)
        .await;

    let identity = publisher(&server).verify(&twitter()).await.unwrap();
    assert_eq!(identity, "@newsroom");
}

//! Integration tests for RssNewsSearch using wiremock

use chrono::{Duration, Utc};
use newsloom::pipeline::{DiscoverConfig, NewsSearch, RssNewsSearch, TimeRange};
use newsloom::utils::error::DiscoverError;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn hours_ago(hours: i64) -> String {
    (Utc::now() - Duration::hours(hours)).to_rfc2822()
}

fn feed(items: &[(&str, &str, Option<String>)]) -> String {
    let items: String = items
        .iter()
        .map(|(title, link, date)| {
            let date = date
                .as_ref()
                .map(|d| format!("<pubDate>{d}</pubDate>"))
                .unwrap_or_default();
            format!(
                "<item><title>{title}</title><link>{link}</link>{date}\
                 <description>&lt;a href=\"{link}\"&gt;{title}&lt;/a&gt;</description></item>"
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel><title>Search results</title>
<link>https://news.google.com</link><description>Search</description>{items}</channel></rss>"#
    )
}

fn searcher(server: &MockServer, max_results: usize) -> RssNewsSearch {
    RssNewsSearch::new(DiscoverConfig {
        max_results,
        ..DiscoverConfig::default()
    })
    .unwrap()
    .with_base_url(server.uri())
}

#[tokio::test]
async fn test_search_sends_range_operator_and_locale() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rss/search"))
        .and(query_param("q", "القاهرة when:1d"))
        .and(query_param("hl", "ar"))
        .and(query_param("gl", "EG"))
        .and(query_param("ceid", "EG:ar"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/rss+xml")
                .set_body_string(feed(&[(
                    "Metro line opens",
                    "https://news.example/metro",
                    Some(hours_ago(2)),
                )])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let articles = searcher(&server, 10)
        .search("القاهرة", TimeRange::Day, &[])
        .await
        .unwrap();

    assert_eq!(articles.len(), 1);
    assert_eq!(articles[0].title, "Metro line opens");
    assert_eq!(articles[0].url, "https://news.example/metro");
    assert_eq!(articles[0].source, "news.example");
    assert_eq!(articles[0].snippet.as_deref(), Some("Metro line opens"));
    assert!(articles[0].published_at.is_some());
}

#[tokio::test]
async fn test_search_filters_sorts_and_caps() {
    let server = MockServer::start().await;

    let body = feed(&[
        ("Three hours", "https://a.example/3", Some(hours_ago(3))),
        ("Undated", "https://a.example/u", None),
        ("Too old", "https://a.example/old", Some(hours_ago(30))),
        ("Blocked", "https://www.blocked.example/b", Some(hours_ago(1))),
        ("One hour", "https://b.example/1", Some(hours_ago(1))),
        ("Two hours", "https://c.example/2", Some(hours_ago(2))),
    ]);
    Mock::given(method("GET"))
        .and(path("/rss/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let excluded = vec!["blocked.example".to_string()];
    let articles = searcher(&server, 3)
        .search("economy", TimeRange::Day, &excluded)
        .await
        .unwrap();

    let titles: Vec<&str> = articles.iter().map(|a| a.title.as_str()).collect();
    assert_eq!(titles, vec!["One hour", "Two hours", "Three hours"]);
}

#[tokio::test]
async fn test_undated_entries_kept_last() {
    let server = MockServer::start().await;

    let body = feed(&[
        ("Undated", "https://a.example/u", None),
        ("Recent", "https://a.example/r", Some(hours_ago(1))),
    ]);
    Mock::given(method("GET"))
        .and(path("/rss/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let articles = searcher(&server, 10)
        .search("economy", TimeRange::TwoHours, &[])
        .await
        .unwrap();

    let titles: Vec<&str> = articles.iter().map(|a| a.title.as_str()).collect();
    assert_eq!(titles, vec!["Recent", "Undated"]);
}

#[tokio::test]
async fn test_unknown_range_sends_bare_query() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rss/search"))
        .and(query_param("q", "elections"))
        .respond_with(ResponseTemplate::new(200).set_body_string(feed(&[])))
        .expect(1)
        .mount(&server)
        .await;

    let articles = searcher(&server, 10)
        .search("elections", TimeRange::from_label("3w"), &[])
        .await
        .unwrap();
    assert!(articles.is_empty());
}

#[tokio::test]
async fn test_search_server_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rss/search"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = searcher(&server, 10)
        .search("economy", TimeRange::Day, &[])
        .await
        .unwrap_err();
    assert!(matches!(err, DiscoverError::Status(503)));
}

#[tokio::test]
async fn test_search_rejects_non_feed_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rss/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body>captcha</body></html>"))
        .mount(&server)
        .await;

    let err = searcher(&server, 10)
        .search("economy", TimeRange::Day, &[])
        .await
        .unwrap_err();
    assert!(matches!(err, DiscoverError::Feed(_)));
}

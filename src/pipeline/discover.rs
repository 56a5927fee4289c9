//! Article discovery through a news search RSS feed
//!
//! A query plus a time range becomes one feed request. Entries from
//! excluded domains or older than the range are dropped, the rest are
//! sorted newest first and capped. Entries without a date are kept and
//! sort last.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use feed_rs::model::{Entry, Feed};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::Client;
use scraper::Html;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

use crate::utils::error::DiscoverError;
use crate::utils::{domain_matches, extract_domain, normalize_whitespace};

pub const DEFAULT_SEARCH_URL: &str = "https://news.google.com";

const FEED_USER_AGENT: &str = "Mozilla/5.0 (compatible; newsloom/0.1)";

/// How far back a search reaches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeRange {
    OneHour,
    TwoHours,
    SixHours,
    TwelveHours,
    #[default]
    Day,
    Week,
    Month,
    /// Label not recognized: no search operator, one day age limit
    Unspecified,
}

impl TimeRange {
    /// Lenient parse of `1h`, `2h`, `6h`, `12h`, `24h`, `7d` or `30d`
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "1h" => Self::OneHour,
            "2h" => Self::TwoHours,
            "6h" => Self::SixHours,
            "12h" => Self::TwelveHours,
            "24h" | "1d" => Self::Day,
            "7d" => Self::Week,
            "30d" => Self::Month,
            _ => Self::Unspecified,
        }
    }

    /// Search operator appended to the query
    pub fn when_param(&self) -> &'static str {
        match self {
            Self::OneHour => "when:1h",
            Self::TwoHours => "when:2h",
            Self::SixHours => "when:6h",
            Self::TwelveHours => "when:12h",
            Self::Day => "when:1d",
            Self::Week => "when:7d",
            Self::Month => "when:30d",
            Self::Unspecified => "",
        }
    }

    /// Oldest entry age kept
    pub fn limit(&self) -> ChronoDuration {
        match self {
            Self::OneHour => ChronoDuration::hours(1),
            Self::TwoHours => ChronoDuration::hours(2),
            Self::SixHours => ChronoDuration::hours(6),
            Self::TwelveHours => ChronoDuration::hours(12),
            Self::Day | Self::Unspecified => ChronoDuration::hours(24),
            Self::Week => ChronoDuration::days(7),
            Self::Month => ChronoDuration::days(30),
        }
    }

    /// Whether an entry published at `published` is inside the range
    pub fn contains(&self, published: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        published.map_or(true, |at| now.signed_duration_since(at) <= self.limit())
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::OneHour => "1h",
            Self::TwoHours => "2h",
            Self::SixHours => "6h",
            Self::TwelveHours => "12h",
            Self::Day => "24h",
            Self::Week => "7d",
            Self::Month => "30d",
            Self::Unspecified => "any",
        };
        f.write_str(label)
    }
}

/// One search hit, ready to be handed to the rewrite pipeline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscoveredArticle {
    pub title: String,
    pub url: String,
    /// Host of the article link
    pub source: String,
    pub snippet: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

/// Finds article URLs for a query
#[async_trait]
pub trait NewsSearch: Send + Sync {
    async fn search(
        &self,
        query: &str,
        range: TimeRange,
        excluded_domains: &[String],
    ) -> Result<Vec<DiscoveredArticle>, DiscoverError>;
}

/// Feed request settings
#[derive(Debug, Clone)]
pub struct DiscoverConfig {
    pub base_url: String,
    /// `hl` parameter
    pub language: String,
    /// `gl` parameter; `ceid` is `<country>:<language>`
    pub country: String,
    pub max_results: usize,
    pub timeout: Duration,
}

impl Default for DiscoverConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SEARCH_URL.to_string(),
            language: "ar".to_string(),
            country: "EG".to_string(),
            max_results: 10,
            timeout: Duration::from_secs(30),
        }
    }
}

/// [`NewsSearch`] backed by the Google News RSS search endpoint
pub struct RssNewsSearch {
    client: Client,
    config: DiscoverConfig,
}

impl RssNewsSearch {
    pub fn new(config: DiscoverConfig) -> Result<Self, DiscoverError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(FEED_USER_AGENT));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/rss+xml, application/xml;q=0.9, */*;q=0.8"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .gzip(true)
            .build()?;

        Ok(Self { client, config })
    }

    /// Point the search at another host, for tests and mirrors
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    fn search_url(&self) -> String {
        format!("{}/rss/search", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl NewsSearch for RssNewsSearch {
    async fn search(
        &self,
        query: &str,
        range: TimeRange,
        excluded_domains: &[String],
    ) -> Result<Vec<DiscoveredArticle>, DiscoverError> {
        let q = format!("{} {}", query.trim(), range.when_param())
            .trim()
            .to_string();
        let ceid = format!("{}:{}", self.config.country, self.config.language);

        let response = self
            .client
            .get(self.search_url())
            .query(&[
                ("q", q.as_str()),
                ("hl", self.config.language.as_str()),
                ("gl", self.config.country.as_str()),
                ("ceid", ceid.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DiscoverError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        let feed =
            feed_rs::parser::parse(&body[..]).map_err(|e| DiscoverError::Feed(e.to_string()))?;
        tracing::debug!(query = %q, entries = feed.entries.len(), "Fetched search feed");

        let articles = select_articles(
            feed,
            range,
            excluded_domains,
            self.config.max_results,
            Utc::now(),
        );
        tracing::info!(query, range = %range, found = articles.len(), "News search complete");
        Ok(articles)
    }
}

/// Filter, sort and cap feed entries
pub fn select_articles(
    feed: Feed,
    range: TimeRange,
    excluded_domains: &[String],
    max_results: usize,
    now: DateTime<Utc>,
) -> Vec<DiscoveredArticle> {
    let mut articles: Vec<DiscoveredArticle> = feed
        .entries
        .into_iter()
        .filter_map(to_article)
        .filter(|article| {
            let excluded = excluded_domains
                .iter()
                .any(|domain| domain_matches(&article.source, domain));
            if excluded {
                tracing::debug!(url = %article.url, "Skipping excluded domain");
            }
            !excluded
        })
        .filter(|article| range.contains(article.published_at, now))
        .collect();

    // None sorts below Some, so undated entries land last
    articles.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    articles.truncate(max_results);
    articles
}

fn to_article(entry: Entry) -> Option<DiscoveredArticle> {
    let url = entry.links.first()?.href.trim().to_string();
    let source = extract_domain(&url).ok()?;
    let title = entry
        .title
        .map(|t| normalize_whitespace(&t.content))
        .filter(|t| !t.is_empty())?;
    let snippet = entry
        .summary
        .map(|s| plain_text(&s.content))
        .filter(|s| !s.is_empty());

    Some(DiscoveredArticle {
        title,
        url,
        source,
        snippet,
        published_at: entry.published.or(entry.updated),
    })
}

/// Feed summaries are often HTML fragments
fn plain_text(fragment: &str) -> String {
    let html = Html::parse_fragment(fragment);
    let text: Vec<&str> = html.root_element().text().collect();
    normalize_whitespace(&text.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rss(items: &str) -> Feed {
        let xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel><title>Search</title><link>https://news.example</link>
<description>results</description>{items}</channel></rss>"#
        );
        feed_rs::parser::parse(xml.as_bytes()).unwrap()
    }

    fn item(title: &str, link: &str, date: Option<&str>) -> String {
        let date = date
            .map(|d| format!("<pubDate>{d}</pubDate>"))
            .unwrap_or_default();
        format!("<item><title>{title}</title><link>{link}</link>{date}</item>")
    }

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc2822("Tue, 14 Oct 2025 12:00:00 GMT")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_time_range_labels() {
        assert_eq!(TimeRange::from_label("24h").when_param(), "when:1d");
        assert_eq!(TimeRange::from_label("1h").when_param(), "when:1h");
        assert_eq!(TimeRange::from_label(" 7D ").when_param(), "when:7d");
        assert_eq!(TimeRange::from_label("30d").limit(), ChronoDuration::days(30));

        let unknown = TimeRange::from_label("3w");
        assert_eq!(unknown, TimeRange::Unspecified);
        assert_eq!(unknown.when_param(), "");
        assert_eq!(unknown.limit(), ChronoDuration::hours(24));
    }

    #[test]
    fn test_range_keeps_undated_entries() {
        let range = TimeRange::TwoHours;
        assert!(range.contains(None, now()));
        assert!(range.contains(Some(now() - ChronoDuration::minutes(90)), now()));
        assert!(!range.contains(Some(now() - ChronoDuration::hours(3)), now()));
    }

    #[test]
    fn test_select_sorts_newest_first_and_caps() {
        let feed = rss(&[
            item("Undated", "https://a.example/u", None),
            item("Older", "https://a.example/o", Some("Tue, 14 Oct 2025 08:00:00 GMT")),
            item("Newest", "https://b.example/n", Some("Tue, 14 Oct 2025 11:30:00 GMT")),
            item("Middle", "https://c.example/m", Some("Tue, 14 Oct 2025 10:00:00 GMT")),
        ]
        .concat());

        let articles = select_articles(feed, TimeRange::Day, &[], 3, now());
        let titles: Vec<&str> = articles.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["Newest", "Middle", "Older"]);
        assert_eq!(articles[0].source, "b.example");
    }

    #[test]
    fn test_select_drops_old_and_excluded() {
        let feed = rss(&[
            item("Stale", "https://a.example/s", Some("Mon, 13 Oct 2025 08:00:00 GMT")),
            item("Spam", "https://www.spam.example/x", Some("Tue, 14 Oct 2025 11:00:00 GMT")),
            item("Sub", "https://m.spam.example/y", None),
            item("Kept", "https://a.example/k", None),
        ]
        .concat());

        let excluded = vec!["spam.example".to_string()];
        let articles = select_articles(feed, TimeRange::Day, &excluded, 10, now());
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].title, "Kept");
        assert_eq!(articles[0].published_at, None);
    }

    #[test]
    fn test_summary_html_becomes_plain_text() {
        assert_eq!(
            plain_text(r#"<a href="https://a.example">Headline</a>&nbsp;<font>Source</font>"#),
            "Headline Source"
        );
    }
}

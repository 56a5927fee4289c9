//! Article extraction from arbitrary news pages
//!
//! Heuristics, in order of preference:
//! - title: first `h1`, `og:title`, `meta[name=title]`, `<title>`
//! - image: `og:image`, `twitter:image`, first article image
//! - date: `article:published_time`, `meta[name=date]`, `time[datetime]`
//! - body: paragraphs longer than 30 characters inside the first known
//!   article container that yields more than 200 characters, otherwise the
//!   first 15 page paragraphs longer than 40 characters

use async_trait::async_trait;
use chrono::DateTime;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use std::time::Duration;
use url::Url;

use crate::models::RawArticle;
use crate::utils::error::ExtractError;
use crate::utils::{extract_domain, normalize_whitespace};

/// Fetches a URL and returns the article it contains
#[async_trait]
pub trait ContentExtractor: Send + Sync {
    async fn extract(&self, url: &str) -> Result<RawArticle, ExtractError>;
}

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const CONTAINER_PARAGRAPH_MIN: usize = 30;
const CONTAINER_CONTENT_MIN: usize = 200;
const FALLBACK_PARAGRAPH_MIN: usize = 40;
const FALLBACK_PARAGRAPH_LIMIT: usize = 15;

/// Elements whose text never counts as article body
const NOISE_TAGS: &[&str] = &[
    "script", "style", "nav", "header", "footer", "aside", "iframe", "noscript",
];

/// Place names looked for in the page body
const KNOWN_LOCATIONS: &[&str] = &[
    "مصر", "القاهرة", "السعودية", "الرياض", "الإمارات", "دبي", "أبوظبي", "قطر", "الدوحة",
    "الكويت", "البحرين", "عمان", "الأردن", "لبنان", "بيروت", "سوريا", "دمشق", "العراق",
    "بغداد", "فلسطين", "غزة", "القدس", "اليمن", "صنعاء", "ليبيا", "طرابلس", "تونس",
    "الجزائر", "المغرب", "السودان", "إيران", "طهران", "تركيا", "أنقرة", "إسطنبول", "روسيا",
    "موسكو", "أمريكا", "واشنطن", "الصين", "بكين", "أوكرانيا", "كييف", "بريطانيا", "لندن",
    "فرنسا", "باريس", "ألمانيا", "برلين",
];

// Statically known selectors
fn sel(s: &str) -> Selector {
    Selector::parse(s).expect("Invalid CSS selector")
}

struct PageSelectors {
    h1: Selector,
    og_title: Selector,
    meta_title: Selector,
    title: Selector,
    og_image: Selector,
    twitter_image: Selector,
    article_image: Selector,
    published_time: Selector,
    meta_date: Selector,
    time_datetime: Selector,
    paragraph: Selector,
    body: Selector,
    containers: Vec<Selector>,
}

static SELECTORS: LazyLock<PageSelectors> = LazyLock::new(|| PageSelectors {
    h1: sel("h1"),
    og_title: sel(r#"meta[property="og:title"]"#),
    meta_title: sel(r#"meta[name="title"]"#),
    title: sel("title"),
    og_image: sel(r#"meta[property="og:image"]"#),
    twitter_image: sel(r#"meta[name="twitter:image"]"#),
    article_image: sel("article img, .article-image img, .post-image img, .featured-image img"),
    published_time: sel(r#"meta[property="article:published_time"]"#),
    meta_date: sel(r#"meta[name="date"]"#),
    time_datetime: sel("time[datetime]"),
    paragraph: sel("p"),
    body: sel("body"),
    containers: [
        "article",
        ".article-content",
        ".article-body",
        ".post-content",
        ".entry-content",
        ".story-body",
        ".story-content",
        r#"[itemprop="articleBody"]"#,
        ".content-body",
        ".news-content",
        "main article",
        ".main-content",
    ]
    .into_iter()
    .map(sel)
    .collect(),
});

/// [`ContentExtractor`] that downloads the page and scrapes it
pub struct HtmlExtractor {
    client: Client,
}

impl HtmlExtractor {
    pub fn new(timeout: Duration) -> Result<Self, ExtractError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("ar,en-US;q=0.8,en;q=0.6"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .gzip(true)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl ContentExtractor for HtmlExtractor {
    async fn extract(&self, url: &str) -> Result<RawArticle, ExtractError> {
        Url::parse(url).map_err(|_| ExtractError::InvalidUrl(url.to_string()))?;

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ExtractError::Status(status.as_u16()));
        }

        let html = response.text().await?;
        tracing::debug!(url, bytes = html.len(), "Fetched article page");
        parse_article(&html, url)
    }
}

/// Scrape an article out of a page
pub fn parse_article(html: &str, url: &str) -> Result<RawArticle, ExtractError> {
    let page_url = Url::parse(url).map_err(|_| ExtractError::InvalidUrl(url.to_string()))?;
    let source =
        extract_domain(url).map_err(|_| ExtractError::InvalidUrl(url.to_string()))?;

    let document = Html::parse_document(html);
    let s = &*SELECTORS;

    let title = first_text(&document, &s.h1)
        .or_else(|| meta_content(&document, &s.og_title))
        .or_else(|| meta_content(&document, &s.meta_title))
        .or_else(|| first_text(&document, &s.title))
        .ok_or(ExtractError::TitleNotFound)?;

    let content = extract_content(&document);
    if content.is_empty() {
        return Err(ExtractError::ContentNotFound);
    }

    let image = meta_content(&document, &s.og_image)
        .or_else(|| meta_content(&document, &s.twitter_image))
        .or_else(|| {
            document
                .select(&s.article_image)
                .find_map(|img| img.value().attr("src").map(str::to_string))
        })
        .and_then(|src| page_url.join(&src).ok())
        .map(|u| u.to_string());

    let publish_date = meta_content(&document, &s.published_time)
        .or_else(|| meta_content(&document, &s.meta_date))
        .or_else(|| {
            document
                .select(&s.time_datetime)
                .find_map(|t| t.value().attr("datetime").map(str::to_string))
        })
        .map(|raw| format_date(&raw));

    let location = detect_location(&document);

    Ok(RawArticle {
        url: url.to_string(),
        title,
        content,
        image,
        source,
        publish_date,
        location,
    })
}

fn element_text(el: ElementRef<'_>) -> String {
    normalize_whitespace(&el.text().collect::<String>())
}

fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .map(element_text)
        .find(|t| !t.is_empty())
}

fn meta_content(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .filter_map(|m| m.value().attr("content"))
        .map(str::trim)
        .find(|c| !c.is_empty())
        .map(str::to_string)
}

fn in_noise(el: &ElementRef<'_>) -> bool {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .any(|a| NOISE_TAGS.contains(&a.value().name()))
}

fn extract_content(document: &Html) -> String {
    let s = &*SELECTORS;

    let mut content = String::new();
    for container_selector in &s.containers {
        let Some(container) = document.select(container_selector).next() else {
            continue;
        };
        content = container
            .select(&s.paragraph)
            .map(element_text)
            .filter(|p| p.chars().count() > CONTAINER_PARAGRAPH_MIN)
            .collect::<Vec<_>>()
            .join("\n\n");
        if content.chars().count() > CONTAINER_CONTENT_MIN {
            return content;
        }
    }

    let fallback = document
        .select(&s.paragraph)
        .filter(|p| !in_noise(p))
        .map(element_text)
        .filter(|p| {
            let lower = p.to_lowercase();
            p.chars().count() > FALLBACK_PARAGRAPH_MIN
                && !lower.contains("cookie")
                && !lower.contains("privacy")
        })
        .take(FALLBACK_PARAGRAPH_LIMIT)
        .collect::<Vec<_>>()
        .join("\n\n");

    if fallback.is_empty() {
        content
    } else {
        fallback
    }
}

fn format_date(raw: &str) -> String {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
        Err(_) => raw.to_string(),
    }
}

fn detect_location(document: &Html) -> Option<String> {
    let body = document
        .select(&SELECTORS.body)
        .next()
        .map(|b| b.text().collect::<String>())?;

    KNOWN_LOCATIONS
        .iter()
        .find(|loc| body.contains(*loc))
        .map(|loc| loc.to_string())
}

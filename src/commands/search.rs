use anyhow::{Context, Result};

use newsloom::config::Config;
use newsloom::error::LoomErrorTrait;
use newsloom::pipeline::{DiscoveredArticle, NewsSearch, RssNewsSearch, TimeRange};
use newsloom::utils::truncate_text;

use super::{process, truncate_url, Workspace};

/// Search the news feed and optionally rewrite what it finds
pub async fn search(
    config: Config,
    query: String,
    range: Option<String>,
    max_results: Option<usize>,
    then_process: bool,
) -> Result<()> {
    if query.trim().is_empty() {
        anyhow::bail!("Search query is empty");
    }

    let label = range.unwrap_or_else(|| config.search.default_range.clone());
    let range = TimeRange::from_label(&label);
    if range == TimeRange::Unspecified {
        tracing::warn!(range = %label, "Unknown time range, searching without a date operator");
    }

    // Excluded domains are persisted state, not configuration
    let excluded = Workspace::open(config.clone())?.state.excluded_domains;

    let search = RssNewsSearch::new(config.discover_config(max_results))
        .context("Failed to create news search client")?;
    let articles = match search.search(&query, range, &excluded).await {
        Ok(articles) => articles,
        Err(e) => {
            tracing::error!(error = %e, query = %query, "News search failed");
            anyhow::bail!(
                "{}: {}",
                e.category().description(),
                e.user_message()
            );
        }
    };

    println!("Search: \"{query}\" ({range})");
    println!("==========================================");
    if articles.is_empty() {
        println!("No articles found");
        return Ok(());
    }
    for (index, article) in articles.iter().enumerate() {
        println!("{}", describe_article(index, article));
    }

    if then_process {
        println!();
        let urls = articles.into_iter().map(|a| a.url).collect();
        process(config, urls, None).await?;
    }

    Ok(())
}

fn describe_article(index: usize, article: &DiscoveredArticle) -> String {
    let when = article
        .published_at
        .map(|at| at.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "undated".to_string());
    let mut text = format!(
        "[{}] {}\n    {} | {when}\n    {}",
        index + 1,
        article.title,
        article.source,
        truncate_url(&article.url, 80)
    );
    if let Some(snippet) = &article.snippet {
        text.push_str("\n    ");
        text.push_str(&truncate_text(snippet, 120));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_describe_article() {
        let article = DiscoveredArticle {
            title: "Cairo metro expansion".into(),
            url: "https://news.example/metro".into(),
            source: "news.example".into(),
            snippet: None,
            published_at: Some(Utc.with_ymd_and_hms(2025, 10, 14, 9, 30, 0).unwrap()),
        };
        assert_eq!(
            describe_article(0, &article),
            "[1] Cairo metro expansion\n    news.example | 2025-10-14 09:30 UTC\n    https://news.example/metro"
        );
    }

    #[test]
    fn test_describe_undated_article_with_snippet() {
        let article = DiscoveredArticle {
            title: "Title".into(),
            url: "https://a.example/1".into(),
            source: "a.example".into(),
            snippet: Some("Short summary".into()),
            published_at: None,
        };
        let text = describe_article(2, &article);
        assert!(text.starts_with("[3] Title"));
        assert!(text.contains("a.example | undated"));
        assert!(text.ends_with("\n    Short summary"));
    }
}

//! Telegram delivery through the Bot API
//!
//! Posts without an image go out with `sendMessage` (4096 characters), posts
//! with an image with `sendPhoto` and a caption (1024 characters). Text is
//! sent as HTML with the title in bold.

use reqwest::Client;
use serde::Deserialize;

use super::{Delivery, PublishOutcome};
use crate::models::PublishPost;
use crate::utils::error::PublishError;

const DEFAULT_BASE_URL: &str = "https://api.telegram.org";
const PLATFORM: &str = "telegram";

pub const MESSAGE_MAX_CHARS: usize = 4096;
pub const CAPTION_MAX_CHARS: usize = 1024;

#[derive(Debug, Deserialize)]
struct BotResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

impl<T> BotResponse<T> {
    fn into_result(self) -> PublishOutcome<T> {
        match (self.ok, self.result) {
            (true, Some(result)) => Ok(result),
            _ => Err(PublishError::api(
                PLATFORM,
                self.description
                    .unwrap_or_else(|| "Unknown error".to_string()),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    message_id: i64,
}

#[derive(Debug, Deserialize)]
struct BotUser {
    username: Option<String>,
    first_name: String,
}

/// Telegram Bot API client
#[derive(Debug, Clone)]
pub struct TelegramClient {
    client: Client,
    base_url: String,
}

impl TelegramClient {
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

    fn method_url(&self, bot_token: &str, method: &str) -> String {
        format!("{}/bot{bot_token}/{method}", self.base_url)
    }

    pub async fn post(
        &self,
        bot_token: &str,
        chat_id: &str,
        post: &PublishPost,
    ) -> PublishOutcome<Delivery> {
        let text = html_text(post);

        let (method, body) = match &post.image {
            Some(photo) => (
                "sendPhoto",
                serde_json::json!({
                    "chat_id": chat_id,
                    "photo": photo,
                    "caption": clip_html(&text, CAPTION_MAX_CHARS),
                    "parse_mode": "HTML",
                }),
            ),
            None => (
                "sendMessage",
                serde_json::json!({
                    "chat_id": chat_id,
                    "text": clip_html(&text, MESSAGE_MAX_CHARS),
                    "parse_mode": "HTML",
                }),
            ),
        };

        let reply: BotResponse<SentMessage> = self
            .client
            .post(self.method_url(bot_token, method))
            .json(&body)
            .send()
            .await?
            .json()
            .await
            .map_err(|e| PublishError::invalid_response(PLATFORM, e.without_url().to_string()))?;

        let message = reply.into_result()?;
        Ok(Delivery {
            post_id: message.message_id.to_string(),
            url: message_url(chat_id, message.message_id),
        })
    }

    pub async fn verify(&self, bot_token: &str) -> PublishOutcome<String> {
        let reply: BotResponse<BotUser> = self
            .client
            .get(self.method_url(bot_token, "getMe"))
            .send()
            .await?
            .json()
            .await
            .map_err(|e| PublishError::invalid_response(PLATFORM, e.without_url().to_string()))?;

        let bot = reply.into_result()?;
        Ok(bot
            .username
            .map(|u| format!("@{u}"))
            .unwrap_or(bot.first_name))
    }
}

/// `<b>title</b>`, description and content, HTML-escaped
pub fn html_text(post: &PublishPost) -> String {
    let mut parts = vec![format!(
        "<b>{}</b>",
        html_escape::encode_text(post.title.trim())
    )];
    for part in [post.description.trim(), post.content.trim()] {
        if !part.is_empty() {
            parts.push(html_escape::encode_text(part).into_owned());
        }
    }
    parts.join("\n\n")
}

/// Cut HTML text to `max_chars` without leaving a broken entity or an
/// unclosed bold tag
pub fn clip_html(text: &str, max_chars: usize) -> String {
    const CLOSE: &str = "</b>";

    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let clipped = cut_html(text, max_chars);
    if !has_open_bold(&clipped) {
        return clipped;
    }

    // Cut again from the source to leave room for the closing tag
    let mut clipped = cut_html(text, max_chars.saturating_sub(CLOSE.len()));
    if has_open_bold(&clipped) {
        clipped.push_str(CLOSE);
    }
    clipped
}

/// First `max_chars` characters, minus a trailing partial entity ("&am")
/// or partial tag ("</")
fn cut_html(text: &str, max_chars: usize) -> String {
    let mut clipped: String = text.chars().take(max_chars).collect();

    if let Some(amp) = clipped.rfind('&') {
        if !clipped[amp..].contains(';') {
            clipped.truncate(amp);
        }
    }
    if let Some(lt) = clipped.rfind('<') {
        if !clipped[lt..].contains('>') {
            clipped.truncate(lt);
        }
    }
    clipped
}

fn has_open_bold(text: &str) -> bool {
    text.matches("<b>").count() > text.matches("</b>").count()
}

/// Public link for channel messages, when one can be derived
fn message_url(chat_id: &str, message_id: i64) -> Option<String> {
    if let Some(username) = chat_id.strip_prefix('@') {
        return Some(format!("https://t.me/{username}/{message_id}"));
    }
    chat_id
        .strip_prefix("-100")
        .map(|internal| format!("https://t.me/c/{internal}/{message_id}"))
}

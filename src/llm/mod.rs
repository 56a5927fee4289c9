//! LLM rewrite providers
//!
//! This module turns an extracted article into a rewritten headline,
//! short description and body using one of three hosted providers:
//! Gemini `generateContent`, Groq's OpenAI-compatible chat completions and
//! Hugging Face text generation. All three are plain HTTPS calls through
//! `reqwest`; the API key is supplied per call so the caller can rotate it.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::models::RewrittenArticle;
use crate::utils::error::RewriteError;

// ============================================================================
// Requests and the Rewriter trait
// ============================================================================

/// Metadata passed along with the text to rewrite
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RewriteContext {
    pub location: Option<String>,
    pub publish_date: Option<String>,
}

/// One rewrite call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RewriteRequest {
    pub title: String,
    pub content: String,
    /// Provider model; `None` uses the provider default
    pub model: Option<String>,
    pub context: RewriteContext,
}

/// Rewrites an article with a given API key
#[async_trait]
pub trait Rewriter: Send + Sync {
    async fn rewrite(
        &self,
        request: &RewriteRequest,
        api_key: &str,
    ) -> Result<RewrittenArticle, RewriteError>;
}

// ============================================================================
// Providers
// ============================================================================

/// Supported rewrite providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Gemini,
    Groq,
    #[serde(alias = "hf")]
    HuggingFace,
}

impl ProviderKind {
    pub fn all() -> Vec<Self> {
        vec![Self::Gemini, Self::Groq, Self::HuggingFace]
    }

    /// Identifier used for key pools and config
    pub fn id(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::Groq => "groq",
            Self::HuggingFace => "huggingface",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini-2.0-flash-exp",
            Self::Groq => "llama-3.3-70b-versatile",
            Self::HuggingFace => "meta-llama/Llama-3.2-3B-Instruct",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::Gemini => "https://generativelanguage.googleapis.com",
            Self::Groq => "https://api.groq.com",
            Self::HuggingFace => "https://api-inference.huggingface.co",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ProviderKind {
    type Err = RewriteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "groq" => Ok(Self::Groq),
            "huggingface" | "hf" => Ok(Self::HuggingFace),
            other => Err(RewriteError::NotConfigured(other.to_string())),
        }
    }
}

/// Configuration for the LLM rewriter
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub provider: ProviderKind,

    /// Override for the provider endpoint (tests, proxies)
    pub base_url: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Gemini,
            base_url: None,
            timeout_secs: 60,
            max_tokens: 4096,
            temperature: 0.8,
        }
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum HfResponse {
    Many(Vec<HfGenerated>),
    One(HfGenerated),
}

#[derive(Debug, Deserialize)]
struct HfGenerated {
    generated_text: String,
}

// ============================================================================
// LlmRewriter
// ============================================================================

const SYSTEM_PROMPT: &str =
    "You are a professional news writer. You rewrite breaking news in a vivid, engaging style while keeping every fact accurate.";

/// HTTP-backed [`Rewriter`] for the configured provider
pub struct LlmRewriter {
    client: Client,
    config: LlmConfig,
}

impl LlmRewriter {
    /// Create a new rewriter with custom config
    pub fn with_config(config: LlmConfig) -> Result<Self, RewriteError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    pub fn new(provider: ProviderKind) -> Result<Self, RewriteError> {
        Self::with_config(LlmConfig {
            provider,
            ..Default::default()
        })
    }

    /// Point the rewriter at a different endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = Some(base_url.into());
        self
    }

    pub fn provider(&self) -> ProviderKind {
        self.config.provider
    }

    fn base_url(&self) -> &str {
        self.config
            .base_url
            .as_deref()
            .unwrap_or_else(|| self.config.provider.default_base_url())
            .trim_end_matches('/')
    }

    /// Build the rewrite prompt
    pub fn build_prompt(request: &RewriteRequest) -> String {
        let location = request
            .context
            .location
            .as_deref()
            .map(|l| format!("Location: {l}\n"))
            .unwrap_or_default();
        let date = request
            .context
            .publish_date
            .clone()
            .unwrap_or_else(|| Utc::now().format("%Y-%m-%d").to_string());

        format!(
            r#"Rewrite the following news article.

## Original article
Title: {title}
{location}Date: {date}

{content}

## Instructions
1. New title: urgent and attention-grabbing without inventing facts. Mention the place if known.
2. Description: two short lines summarising the story.
3. Content: open with the place and date, then rewrite the story in clear paragraphs, keeping all original facts.

## Output format (follow exactly)
Title: [new title]
Description: [short description]
Content: [rewritten content]"#,
            title = request.title,
            content = request.content,
        )
    }

    async fn generate(&self, prompt: &str, model: &str, api_key: &str) -> Result<String, RewriteError> {
        match self.config.provider {
            ProviderKind::Gemini => self.generate_gemini(prompt, model, api_key).await,
            ProviderKind::Groq => self.generate_groq(prompt, model, api_key).await,
            ProviderKind::HuggingFace => self.generate_huggingface(prompt, model, api_key).await,
        }
    }

    async fn generate_gemini(
        &self,
        prompt: &str,
        model: &str,
        api_key: &str,
    ) -> Result<String, RewriteError> {
        let url = format!("{}/v1beta/models/{model}:generateContent", self.base_url());
        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": self.config.temperature,
                "topP": 0.95,
                "topK": 40,
                "maxOutputTokens": self.config.max_tokens,
            }
        });

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;
        let response = check_status(response).await?;

        let parsed: GeminiResponse = response
            .json()
            .await
            .map_err(|e| RewriteError::Parse(e.without_url().to_string()))?;

        Ok(parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect::<String>())
            .unwrap_or_default())
    }

    async fn generate_groq(
        &self,
        prompt: &str,
        model: &str,
        api_key: &str,
    ) -> Result<String, RewriteError> {
        let url = format!("{}/openai/v1/chat/completions", self.base_url());
        let body = serde_json::json!({
            "model": model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt },
            ],
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
            "top_p": 0.95,
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;
        let response = check_status(response).await?;

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| RewriteError::Parse(e.without_url().to_string()))?;

        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }

    async fn generate_huggingface(
        &self,
        prompt: &str,
        model: &str,
        api_key: &str,
    ) -> Result<String, RewriteError> {
        let url = format!("{}/models/{model}", self.base_url());
        let body = serde_json::json!({
            "inputs": prompt,
            "parameters": {
                "max_new_tokens": self.config.max_tokens,
                "temperature": self.config.temperature,
                "top_p": 0.95,
                "return_full_text": false,
            }
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;
        let response = check_status(response).await?;

        let parsed: HfResponse = response
            .json()
            .await
            .map_err(|e| RewriteError::Parse(e.without_url().to_string()))?;

        Ok(match parsed {
            HfResponse::Many(items) => items
                .into_iter()
                .next()
                .map(|g| g.generated_text)
                .unwrap_or_default(),
            HfResponse::One(item) => item.generated_text,
        })
    }
}

#[async_trait]
impl Rewriter for LlmRewriter {
    async fn rewrite(
        &self,
        request: &RewriteRequest,
        api_key: &str,
    ) -> Result<RewrittenArticle, RewriteError> {
        let model = request
            .model
            .as_deref()
            .unwrap_or_else(|| self.config.provider.default_model());
        let prompt = Self::build_prompt(request);

        tracing::debug!(provider = %self.config.provider, model, "Sending rewrite request");
        let text = self.generate(&prompt, model, api_key).await?;

        if text.trim().is_empty() {
            return Err(RewriteError::EmptyResponse);
        }

        Ok(parse_rewritten(&text, request))
    }
}

/// Map non-success responses onto [`RewriteError`]
async fn check_status(response: Response) -> Result<Response, RewriteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body);

    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(RewriteError::Quota(message));
    }
    Err(RewriteError::Provider {
        status: status.as_u16(),
        message,
    })
}

/// Pull `error.message` (or a bare `error` string) out of an error body
fn error_message(body: &str) -> String {
    let parsed = serde_json::from_str::<serde_json::Value>(body).ok();
    let from_json = parsed.as_ref().and_then(|v| {
        let error = v.get("error")?;
        error
            .get("message")
            .and_then(|m| m.as_str())
            .or_else(|| error.as_str())
            .map(str::to_string)
    });

    from_json.unwrap_or_else(|| body.chars().take(300).collect())
}

// ============================================================================
// Response parsing
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Title,
    Description,
    Content,
}

const LABELS: &[(&str, Section)] = &[
    ("title:", Section::Title),
    ("description:", Section::Description),
    ("content:", Section::Content),
    ("العنوان:", Section::Title),
    ("الوصف:", Section::Description),
    ("المحتوى:", Section::Content),
];

/// Detect a `Label:` line, tolerating markdown bold and heading markers
fn split_label(line: &str) -> Option<(Section, &str)> {
    let stripped = line.trim_start_matches(['*', '#']).trim_start();

    LABELS.iter().find_map(|(label, section)| {
        let head = stripped.get(..label.len())?;
        if !head.eq_ignore_ascii_case(label) {
            return None;
        }
        let rest = stripped[label.len()..].trim_start_matches('*').trim();
        Some((*section, rest))
    })
}

/// Split provider output into title, description and content.
///
/// Lines after a label belong to that section until the next label. Missing
/// sections fall back to the original title, the first 200 characters of the
/// output, and the whole output respectively.
pub fn parse_rewritten(text: &str, request: &RewriteRequest) -> RewrittenArticle {
    let mut title = String::new();
    let mut description = String::new();
    let mut content = String::new();
    let mut current: Option<Section> = None;

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some((section, rest)) = split_label(line) {
            let target = match section {
                Section::Title => &mut title,
                Section::Description => &mut description,
                Section::Content => &mut content,
            };
            *target = rest.to_string();
            current = Some(section);
            continue;
        }

        match current {
            Some(Section::Content) => {
                content.push('\n');
                content.push_str(line);
            }
            Some(Section::Description) => {
                description.push(' ');
                description.push_str(line);
            }
            Some(Section::Title) => {
                title.push(' ');
                title.push_str(line);
            }
            None => {}
        }
    }

    let clean = |s: &str| s.replace("**", "").trim().to_string();
    let (title, description, content) = (clean(&title), clean(&description), clean(&content));

    RewrittenArticle {
        title: if title.is_empty() {
            request.title.clone()
        } else {
            title
        },
        description: if description.is_empty() {
            text.chars().take(200).collect()
        } else {
            description
        },
        content: if content.is_empty() {
            text.to_string()
        } else {
            content
        },
        location: request.context.location.clone(),
        publish_date: request.context.publish_date.clone(),
    }
}

//! Configuration management for newsloom
//!
//! Settings load from a TOML file (every section and field optional) and are
//! then overridden by `NEWSLOOM_*` environment variables.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::llm::{LlmConfig, ProviderKind};
use crate::pipeline::discover::DEFAULT_SEARCH_URL;
use crate::pipeline::{DiscoverConfig, OrchestratorConfig, TimeRange};
use crate::storage::SuccessPolicy;

/// Config file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "newsloom.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Extraction and rewrite pipeline
    pub rewrite: RewriteConfig,

    /// News search feed
    pub search: SearchConfig,

    /// Scheduled publishing
    pub publish: PublishConfig,

    /// State persistence
    pub storage: StorageConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RewriteConfig {
    /// Rewrite provider (gemini, groq, huggingface)
    pub provider: String,

    /// Model name; provider default when unset
    pub model: Option<String>,

    /// Alternative provider endpoint
    pub base_url: Option<String>,

    /// Queue stored articles for publishing
    pub auto_enqueue: bool,

    /// Key rotations allowed per article after quota errors
    pub max_key_rotations: u32,

    pub rotation_backoff_ms: u64,
    pub success_delay_ms: u64,
    pub failure_delay_ms: u64,

    /// Rewrite request timeout in seconds
    pub request_timeout_secs: u64,

    /// Article fetch timeout in seconds
    pub extract_timeout_secs: u64,

    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            provider: String::from("gemini"),
            model: None,
            base_url: None,
            auto_enqueue: true,
            max_key_rotations: 3,
            rotation_backoff_ms: 1000,
            success_delay_ms: 1500,
            failure_delay_ms: 500,
            request_timeout_secs: 60,
            extract_timeout_secs: 30,
            max_tokens: 4096,
            temperature: 0.8,
        }
    }
}

/// News search configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchConfig {
    /// Search feed host
    pub base_url: String,

    /// Feed language (`hl`)
    pub language: String,

    /// Feed country (`gl`)
    pub country: String,

    /// Results kept per search
    pub max_results: usize,

    /// Range used when `--range` is not given
    pub default_range: String,

    pub request_timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SEARCH_URL.to_string(),
            language: String::from("ar"),
            country: String::from("EG"),
            max_results: 10,
            default_range: String::from("24h"),
            request_timeout_secs: 30,
        }
    }
}

/// Publishing configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PublishConfig {
    /// Minutes between scheduled posts
    pub interval_minutes: u64,

    /// Platform request timeout in seconds
    pub request_timeout_secs: u64,

    /// How per-account results resolve a post
    pub success_policy: SuccessPolicy,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            interval_minutes: 5,
            request_timeout_secs: 30,
            success_policy: SuccessPolicy::Any,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding `state.json`
    pub data_dir: PathBuf,

    /// Archive items kept on save
    pub archive_limit: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            archive_limit: 1000,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}

impl Config {
    /// Defaults with environment overrides applied
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env();
        Ok(config)
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Resolve the effective configuration: the given file, else
    /// `newsloom.toml` if present, else defaults; then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Override fields from `NEWSLOOM_*` variables; unparsable values are ignored
    pub fn apply_env(&mut self) {
        if let Ok(provider) = std::env::var("NEWSLOOM_PROVIDER") {
            self.rewrite.provider = provider;
        }
        if let Ok(model) = std::env::var("NEWSLOOM_MODEL") {
            self.rewrite.model = Some(model);
        }
        if let Some(auto) = env_parse("NEWSLOOM_AUTO_ENQUEUE") {
            self.rewrite.auto_enqueue = auto;
        }
        if let Some(rotations) = env_parse("NEWSLOOM_MAX_KEY_ROTATIONS") {
            self.rewrite.max_key_rotations = rotations;
        }
        if let Some(max) = env_parse("NEWSLOOM_MAX_RESULTS") {
            self.search.max_results = max;
        }
        if let Some(interval) = env_parse("NEWSLOOM_PUBLISH_INTERVAL") {
            self.publish.interval_minutes = interval;
        }
        if let Ok(dir) = std::env::var("NEWSLOOM_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(dir);
        }
        if let Some(limit) = env_parse("NEWSLOOM_ARCHIVE_LIMIT") {
            self.storage.archive_limit = limit;
        }
        if let Ok(level) = std::env::var("NEWSLOOM_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("NEWSLOOM_LOG_FORMAT") {
            self.logging.format = format;
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        self.provider()?;

        if self.publish.interval_minutes == 0 {
            anyhow::bail!("publish.interval_minutes must be at least 1");
        }

        if self.rewrite.request_timeout_secs == 0
            || self.rewrite.extract_timeout_secs == 0
            || self.publish.request_timeout_secs == 0
            || self.search.request_timeout_secs == 0
        {
            anyhow::bail!("request timeouts must be greater than 0");
        }

        if self.rewrite.max_tokens == 0 {
            anyhow::bail!("rewrite.max_tokens must be greater than 0");
        }

        if !(0.0..=2.0).contains(&self.rewrite.temperature) {
            anyhow::bail!("rewrite.temperature must be between 0 and 2");
        }

        if self.search.max_results == 0 {
            anyhow::bail!("search.max_results must be greater than 0");
        }

        if TimeRange::from_label(&self.search.default_range) == TimeRange::Unspecified {
            anyhow::bail!(
                "search.default_range must be one of 1h, 2h, 6h, 12h, 24h, 7d, 30d"
            );
        }

        if self.storage.archive_limit == 0 {
            anyhow::bail!("storage.archive_limit must be greater than 0");
        }

        if !matches!(self.logging.format.as_str(), "text" | "json") {
            anyhow::bail!("logging.format must be \"text\" or \"json\"");
        }

        Ok(())
    }

    pub fn provider(&self) -> Result<ProviderKind> {
        self.rewrite
            .provider
            .parse()
            .with_context(|| format!("Unknown rewrite provider: {}", self.rewrite.provider))
    }

    /// Get the publish interval as Duration
    #[must_use]
    pub fn publish_interval(&self) -> Duration {
        Duration::from_secs(self.publish.interval_minutes * 60)
    }

    #[must_use]
    pub fn publish_timeout(&self) -> Duration {
        Duration::from_secs(self.publish.request_timeout_secs)
    }

    #[must_use]
    pub fn extract_timeout(&self) -> Duration {
        Duration::from_secs(self.rewrite.extract_timeout_secs)
    }

    /// Rewriter settings
    pub fn llm_config(&self) -> Result<LlmConfig> {
        Ok(LlmConfig {
            provider: self.provider()?,
            base_url: self.rewrite.base_url.clone(),
            timeout_secs: self.rewrite.request_timeout_secs,
            max_tokens: self.rewrite.max_tokens,
            temperature: self.rewrite.temperature,
        })
    }

    /// Search feed settings; `max_results` overrides the configured cap
    #[must_use]
    pub fn discover_config(&self, max_results: Option<usize>) -> DiscoverConfig {
        DiscoverConfig {
            base_url: self.search.base_url.clone(),
            language: self.search.language.clone(),
            country: self.search.country.clone(),
            max_results: max_results.unwrap_or(self.search.max_results),
            timeout: Duration::from_secs(self.search.request_timeout_secs),
        }
    }

    /// Orchestrator settings; excluded domains come from persisted state
    pub fn orchestrator_config(&self, excluded_domains: Vec<String>) -> Result<OrchestratorConfig> {
        Ok(OrchestratorConfig {
            provider: self.provider()?.id().to_string(),
            model: self.rewrite.model.clone(),
            auto_enqueue: self.rewrite.auto_enqueue,
            max_key_rotations: self.rewrite.max_key_rotations,
            rotation_backoff: Duration::from_millis(self.rewrite.rotation_backoff_ms),
            success_delay: Duration::from_millis(self.rewrite.success_delay_ms),
            failure_delay: Duration::from_millis(self.rewrite.failure_delay_ms),
            excluded_domains,
        })
    }
}

//! Unified error handling for the newsloom crate
//!
//! This module provides a unified error type that consolidates all domain-specific
//! errors into a single `Error` enum, while keeping the domain errors usable on
//! their own.
//!
//! # Architecture
//!
//! - [`LoomErrorTrait`] - Common interface implemented by all error types
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Unified error enum wrapping all domain-specific errors
//!
//! # Usage
//!
//! ```rust,ignore
//! use newsloom::error::{Error, LoomErrorTrait};
//!
//! fn handle_error(err: Error) {
//!     if err.is_recoverable() {
//!         println!("Retrying: {}", err.user_message());
//!     } else {
//!         eprintln!("Fatal error: {}", err);
//!     }
//! }
//! ```

use std::io;
use thiserror::Error;

pub use crate::scheduler::error::SchedulerError;
pub use crate::utils::error::{
    DiscoverError, ExtractError, ProcessError, PublishError, RewriteError, StateError,
};

/// Common trait for all newsloom error types
pub trait LoomErrorTrait: std::error::Error {
    /// Check if this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Short description for user-facing messages
    fn user_message(&self) -> String;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Network-related errors (HTTP, timeout, rate limit)
    Network,
    /// Article extraction errors
    Extraction,
    /// Rewrite provider errors
    Rewrite,
    /// Social platform delivery errors
    Publish,
    /// Storage and I/O errors
    Storage,
    /// Configuration and validation errors
    Config,
    /// Scheduler and timing errors
    Scheduler,
}

impl ErrorCategory {
    pub fn description(&self) -> &'static str {
        match self {
            Self::Network => "Network error",
            Self::Extraction => "Extraction error",
            Self::Rewrite => "Rewrite error",
            Self::Publish => "Publish error",
            Self::Storage => "Storage error",
            Self::Config => "Configuration error",
            Self::Scheduler => "Scheduler error",
        }
    }
}

// ============================================================================
// Domain error classification
// ============================================================================

impl LoomErrorTrait for ExtractError {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::Status(code) => *code == 429 || *code >= 500,
            _ => false,
        }
    }

    fn user_message(&self) -> String {
        match self {
            Self::Http(_) | Self::Status(_) => "Could not download the article".to_string(),
            Self::InvalidUrl(url) => format!("Not a valid article URL: {url}"),
            Self::TitleNotFound | Self::ContentNotFound => {
                "The page does not look like a news article".to_string()
            }
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Http(_) | Self::Status(_) => ErrorCategory::Network,
            _ => ErrorCategory::Extraction,
        }
    }
}

impl LoomErrorTrait for DiscoverError {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::Status(code) => *code == 429 || *code >= 500,
            Self::Feed(_) => false,
        }
    }

    fn user_message(&self) -> String {
        match self {
            Self::Http(_) | Self::Status(_) => "Could not reach the news search".to_string(),
            Self::Feed(_) => "The news search returned an unreadable feed".to_string(),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Http(_) | Self::Status(_) => ErrorCategory::Network,
            Self::Feed(_) => ErrorCategory::Extraction,
        }
    }
}

impl LoomErrorTrait for RewriteError {
    fn is_recoverable(&self) -> bool {
        self.is_quota() || matches!(self, Self::Http(_))
    }

    fn user_message(&self) -> String {
        if self.is_quota() {
            return "The rewrite provider is rate limiting this key".to_string();
        }
        match self {
            Self::NotConfigured(provider) => format!("Unknown rewrite provider '{provider}'"),
            Self::Provider { status, message } => {
                format!("The rewrite provider refused the request ({status}): {message}")
            }
            Self::Http(_) => "Could not reach the rewrite provider".to_string(),
            _ => "The rewrite provider returned an unusable answer".to_string(),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Http(_) => ErrorCategory::Network,
            Self::NotConfigured(_) => ErrorCategory::Config,
            _ => ErrorCategory::Rewrite,
        }
    }
}

impl LoomErrorTrait for PublishError {
    fn is_recoverable(&self) -> bool {
        matches!(self, Self::Http(_))
    }

    fn user_message(&self) -> String {
        match self {
            Self::Http(_) => "Could not reach the platform".to_string(),
            Self::Api { platform, message } => format!("{platform} rejected the post: {message}"),
            Self::InvalidResponse { platform, .. } => {
                format!("{platform} returned an unexpected response")
            }
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Http(_) => ErrorCategory::Network,
            _ => ErrorCategory::Publish,
        }
    }
}

impl LoomErrorTrait for ProcessError {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Extraction(e) => e.is_recoverable(),
            Self::Rewrite(e) => e.is_recoverable(),
            // More keys or a later retry may succeed
            Self::QuotaExhausted { .. } => true,
            Self::NoActiveKey { .. } => false,
        }
    }

    fn user_message(&self) -> String {
        match self {
            Self::Extraction(e) => e.user_message(),
            Self::Rewrite(e) => e.user_message(),
            Self::QuotaExhausted { rotations, .. } => {
                format!("Every API key hit its quota ({rotations} rotations)")
            }
            Self::NoActiveKey { provider } => format!("Add an API key for '{provider}' first"),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Extraction(e) => e.category(),
            Self::Rewrite(e) => e.category(),
            Self::QuotaExhausted { .. } => ErrorCategory::Rewrite,
            Self::NoActiveKey { .. } => ErrorCategory::Config,
        }
    }
}

impl LoomErrorTrait for StateError {
    fn is_recoverable(&self) -> bool {
        matches!(self, Self::Io { .. })
    }

    fn user_message(&self) -> String {
        match self {
            Self::Io { path, .. } => format!("Could not access {path}"),
            Self::Serde { path, .. } => format!("{path} is corrupted"),
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Storage
    }
}

impl LoomErrorTrait for SchedulerError {
    fn is_recoverable(&self) -> bool {
        SchedulerError::is_recoverable(self)
    }

    fn user_message(&self) -> String {
        self.to_string()
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Scheduler
    }
}

// ============================================================================
// Unified error
// ============================================================================

/// Unified error type for the newsloom crate
#[derive(Error, Debug)]
pub enum Error {
    /// Article extraction errors
    #[error("Extract error: {0}")]
    Extract(#[from] ExtractError),

    /// News search errors
    #[error("Discover error: {0}")]
    Discover(#[from] DiscoverError),

    /// Rewrite provider errors
    #[error("Rewrite error: {0}")]
    Rewrite(#[from] RewriteError),

    /// Platform delivery errors
    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),

    /// Per-article pipeline failures
    #[error("Process error: {0}")]
    Process(#[from] ProcessError),

    /// State persistence errors
    #[error("State error: {0}")]
    State(#[from] StateError),

    /// Scheduler and timing errors
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LoomErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Extract(e) => e.is_recoverable(),
            Self::Discover(e) => e.is_recoverable(),
            Self::Rewrite(e) => e.is_recoverable(),
            Self::Publish(e) => e.is_recoverable(),
            Self::Process(e) => e.is_recoverable(),
            Self::State(e) => e.is_recoverable(),
            Self::Scheduler(e) => e.is_recoverable(),
            Self::Io(_) => true, // I/O errors are often transient
            Self::Json(_) => false,
        }
    }

    fn user_message(&self) -> String {
        match self {
            Self::Extract(e) => e.user_message(),
            Self::Discover(e) => e.user_message(),
            Self::Rewrite(e) => e.user_message(),
            Self::Publish(e) => e.user_message(),
            Self::Process(e) => e.user_message(),
            Self::State(e) => e.user_message(),
            Self::Scheduler(e) => e.user_message(),
            Self::Io(e) => format!("{}: {e}", ErrorCategory::Storage.description()),
            Self::Json(e) => format!("{}: {e}", ErrorCategory::Storage.description()),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Extract(e) => e.category(),
            Self::Discover(e) => e.category(),
            Self::Rewrite(e) => e.category(),
            Self::Publish(e) => e.category(),
            Self::Process(e) => e.category(),
            Self::State(_) | Self::Io(_) | Self::Json(_) => ErrorCategory::Storage,
            Self::Scheduler(_) => ErrorCategory::Scheduler,
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;

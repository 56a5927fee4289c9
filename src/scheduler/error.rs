//! Error types for the scheduler module

use std::fmt;
use std::time::Duration;

/// Result type for scheduler operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Scheduler-specific errors
#[derive(Debug)]
pub enum SchedulerError {
    /// A scheduled run is already active
    AlreadyRunning,

    /// Interval must be positive
    InvalidInterval {
        interval: Duration,
    },

    /// No account to publish to
    NoAccounts,
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyRunning => {
                write!(f, "A publish run is already in progress")
            }
            Self::InvalidInterval { interval } => {
                write!(
                    f,
                    "Invalid publish interval {:?}. Must be greater than zero",
                    interval
                )
            }
            Self::NoAccounts => {
                write!(f, "No social accounts configured")
            }
        }
    }
}

impl std::error::Error for SchedulerError {}

impl SchedulerError {
    /// Create an invalid interval error
    pub fn invalid_interval(interval: Duration) -> Self {
        Self::InvalidInterval { interval }
    }

    /// Check if the error is recoverable
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::AlreadyRunning)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_interval_error() {
        let err = SchedulerError::invalid_interval(Duration::ZERO);
        assert!(err.to_string().contains("greater than zero"));
    }

    #[test]
    fn test_no_accounts_error() {
        assert_eq!(
            SchedulerError::NoAccounts.to_string(),
            "No social accounts configured"
        );
    }

    #[test]
    fn test_is_recoverable() {
        assert!(SchedulerError::AlreadyRunning.is_recoverable());
        assert!(!SchedulerError::NoAccounts.is_recoverable());
        assert!(!SchedulerError::invalid_interval(Duration::ZERO).is_recoverable());
    }
}

//! Configuration loading and validation.

pub mod loader;
pub mod schema;

pub use loader::{load_config, load_config_from_str};
pub use schema::{Config, DatabaseConfig, ProgressConfig, PublishingConfig, ValidationConfig};

use std::time::Duration;

use crate::publish::publisher::RetryPolicy;
use crate::publish::validator::ValidationLimits;

impl Config {
    /// Retry policy derived from the publishing section.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.publishing.max_attempts,
            base_delay: Duration::from_millis(self.publishing.base_delay_ms),
            attempt_timeout: Duration::from_secs(self.publishing.attempt_timeout_secs),
        }
    }

    /// Validation thresholds derived from the validation section.
    pub fn validation_limits(&self) -> ValidationLimits {
        ValidationLimits {
            min_word_count: self.validation.min_word_count,
            min_overall_score: self.validation.min_overall_score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_policy_conversion() {
        let config = load_config_from_str(
            r#"{ "version": "1.0", "publishing": { "max_attempts": 4, "base_delay_ms": 250 } }"#,
        )
        .unwrap();

        let policy = config.retry_policy();
        assert_eq!(policy.max_attempts, 4);
        assert_eq!(policy.base_delay, Duration::from_millis(250));
        assert_eq!(policy.attempt_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_validation_limits_conversion() {
        let config = load_config_from_str(
            r#"{ "version": "1.0", "validation": { "min_word_count": 250 } }"#,
        )
        .unwrap();

        let limits = config.validation_limits();
        assert_eq!(limits.min_word_count, 250);
        assert_eq!(limits.min_overall_score, 50);
    }
}

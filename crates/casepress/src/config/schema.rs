use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub publishing: PublishingConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub progress: ProgressConfig,
}

fn default_worker_count() -> usize {
    num_cpus::get()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database file path; defaults to `~/.casepress/data/casepress.db`.
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishingConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_attempt_timeout_secs")]
    pub attempt_timeout_secs: u64,
    #[serde(default = "default_batch_cap")]
    pub batch_cap: usize,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    2000
}

fn default_attempt_timeout_secs() -> u64 {
    30
}

fn default_batch_cap() -> usize {
    50
}

impl Default for PublishingConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            attempt_timeout_secs: default_attempt_timeout_secs(),
            batch_cap: default_batch_cap(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    #[serde(default = "default_min_word_count")]
    pub min_word_count: u32,
    #[serde(default = "default_min_overall_score")]
    pub min_overall_score: u32,
}

fn default_min_word_count() -> u32 {
    500
}

fn default_min_overall_score() -> u32 {
    50
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_word_count: default_min_word_count(),
            min_overall_score: default_min_overall_score(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressConfig {
    #[serde(default = "default_retention_secs")]
    pub retention_secs: i64,
}

fn default_retention_secs() -> i64 {
    3600
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            retention_secs: default_retention_secs(),
        }
    }
}

use serde::{Deserialize, Serialize};

/// Top-level configuration for finrep.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReportConfig {
    pub oracle: OracleConfig,
    pub pipeline: PipelineConfig,
}

/// Configuration for the text-generation oracle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OracleConfig {
    /// Model used for section generation.
    pub model: String,
    /// Model for the paraphrase step. Falls back to `model`.
    pub paraphrase_model: Option<String>,
    /// Timeout of a single oracle invocation in seconds.
    pub timeout_seconds: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            model: "claude-3-5-haiku-latest".to_string(),
            paraphrase_model: None,
            timeout_seconds: 45,
        }
    }
}

/// How stages are scheduled within a run.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    #[default]
    Sequential,
    Concurrent,
}

/// Configuration for the orchestration layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Upper bound on how long one stage waits for the oracle, in seconds.
    pub stage_timeout_seconds: u64,
    pub mode: ExecutionMode,
    /// Worker bound for concurrent mode.
    pub max_workers: usize,
    /// Cap on the number of entries in the sources section.
    pub max_sources: usize,
    /// Run the paraphrase step. When off, the query is used verbatim.
    pub paraphrase: bool,
    pub retry: RetryConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            stage_timeout_seconds: 60,
            mode: ExecutionMode::Sequential,
            max_workers: 4,
            max_sources: 10,
            paraphrase: true,
            retry: RetryConfig::default(),
        }
    }
}

/// Retry settings for oracle calls. One attempt means no retry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff_ms: 500,
            max_backoff_ms: 5_000,
            backoff_multiplier: 2.0,
        }
    }
}

//! finrep - financial report synthesis
//!
//! Assembles a structured stock report from independently generated sections.
//! Each section comes from a Claude CLI call; any stage that fails is replaced by
//! a deterministic fallback so the report is always schema-complete.
//!
//! # Library Usage
//!
//! ```rust,no_run
//! use finrep::models::{ReportConfig, ReportContext, Subject};
//! use finrep::agents::{Pipeline, GenerationOracle, SectionGenerator};
//! ```

pub use finrep_agents as agents;
pub use finrep_models as models;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use finrep_agents::{default_generators, ClaudeCliConfig, ClaudeCliOracle, GenerationOracle, Pipeline};
use finrep_models::{PipelineResult, ReportConfig, ReportContext};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Path used when no configuration file is given.
pub const DEFAULT_CONFIG_PATH: &str = "config/finrep.toml";

/// Load configuration from `path`, or from the default path when present.
///
/// An explicit path must exist; a missing default file means built-in defaults.
pub fn load_config(path: Option<&str>) -> anyhow::Result<ReportConfig> {
    let (path, explicit) = match path {
        Some(p) => (p, true),
        None => (DEFAULT_CONFIG_PATH, false),
    };

    if !explicit && !Path::new(path).exists() {
        info!(path, "No config file, using defaults");
        return Ok(ReportConfig::default());
    }

    let config_str =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read config: {path}"))?;
    toml::from_str(&config_str).with_context(|| format!("Failed to parse config: {path}"))
}

/// Build a Pipeline backed by the Claude CLI from configuration.
pub fn build_pipeline(config: &ReportConfig) -> Pipeline {
    let oracle: Arc<dyn GenerationOracle> =
        Arc::new(ClaudeCliOracle::new(ClaudeCliConfig::from(&config.oracle)));
    let pipeline = Pipeline::new(default_generators(), oracle, config.pipeline.clone());

    match &config.oracle.paraphrase_model {
        Some(model) if model != &config.oracle.model => {
            let paraphrase = ClaudeCliOracle::new(ClaudeCliConfig {
                model: model.clone(),
                timeout: Duration::from_secs(config.oracle.timeout_seconds),
            });
            pipeline.with_paraphrase_oracle(Arc::new(paraphrase))
        }
        _ => pipeline,
    }
}

/// Generate one report. Cancelling `cancel` makes the remaining stages fall back.
pub async fn generate_report(
    pipeline: &Pipeline,
    ctx: ReportContext,
    cancel: CancellationToken,
) -> PipelineResult {
    pipeline.execute_with_cancel(ctx, cancel).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use finrep_models::ExecutionMode;

    #[test]
    fn explicit_missing_config_is_an_error() {
        assert!(load_config(Some("does/not/exist.toml")).is_err());
    }

    #[test]
    fn build_pipeline_carries_pipeline_config() {
        let mut config = ReportConfig::default();
        config.pipeline.mode = ExecutionMode::Concurrent;
        config.oracle.paraphrase_model = Some("claude-3-5-haiku-latest".to_string());
        let pipeline = build_pipeline(&config);
        assert_eq!(pipeline.config().mode, ExecutionMode::Concurrent);
    }

    #[test]
    fn sample_config_parses() {
        let raw = include_str!("../../../config/finrep.toml");
        let config: ReportConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.pipeline.retry.max_attempts, 1);
    }
}

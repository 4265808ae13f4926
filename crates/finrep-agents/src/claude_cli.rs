use std::time::Duration;

use async_trait::async_trait;
use finrep_models::OracleConfig;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::ReportError;
use crate::oracle::{GenerationOracle, Prompt};

/// Configuration for a Claude CLI invocation.
#[derive(Debug, Clone)]
pub struct ClaudeCliConfig {
    pub model: String,
    pub timeout: Duration,
}

impl Default for ClaudeCliConfig {
    fn default() -> Self {
        Self {
            model: "claude-3-5-haiku-latest".to_string(),
            timeout: Duration::from_secs(45),
        }
    }
}

impl From<&OracleConfig> for ClaudeCliConfig {
    fn from(config: &OracleConfig) -> Self {
        Self {
            model: config.model.clone(),
            timeout: Duration::from_secs(config.timeout_seconds),
        }
    }
}

/// Invoke the `claude` CLI with a system prompt and user prompt.
/// Returns the raw stdout text.
pub async fn invoke_claude(
    system_prompt: &str,
    user_prompt: &str,
    config: &ClaudeCliConfig,
) -> Result<String, ReportError> {
    debug!(model = %config.model, "Invoking claude CLI");

    let result = tokio::time::timeout(config.timeout, async {
        Command::new("claude")
            .args([
                "-p",
                user_prompt,
                "--system-prompt",
                system_prompt,
                "--model",
                &config.model,
                "--output-format",
                "text",
            ])
            .kill_on_drop(true)
            .output()
            .await
    })
    .await
    .map_err(|_| ReportError::Timeout(config.timeout.as_secs()))?
    .map_err(|e| ReportError::Cli(format!("Failed to spawn claude: {e}")))?;

    if !result.status.success() {
        let stderr = String::from_utf8_lossy(&result.stderr);
        warn!(status = %result.status, stderr = %stderr, "Claude CLI failed");
        return Err(ReportError::Cli(format!(
            "claude exited {}: {}",
            result.status, stderr
        )));
    }

    let stdout = String::from_utf8_lossy(&result.stdout).to_string();
    if stdout.trim().is_empty() {
        return Err(ReportError::EmptyResponse);
    }

    Ok(stdout)
}

/// Check if the `claude` CLI is available on the system.
pub async fn check_cli_available() -> bool {
    match Command::new("claude").arg("--version").output().await {
        Ok(output) => output.status.success(),
        Err(_) => false,
    }
}

/// Generation oracle backed by the `claude` CLI.
pub struct ClaudeCliOracle {
    config: ClaudeCliConfig,
}

impl ClaudeCliOracle {
    pub fn new(config: ClaudeCliConfig) -> Self {
        Self { config }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }
}

#[async_trait]
impl GenerationOracle for ClaudeCliOracle {
    fn name(&self) -> &str {
        "claude_cli"
    }

    async fn generate(&self, prompt: &Prompt) -> Result<String, ReportError> {
        debug!(stage = %prompt.stage, "Sending prompt to claude CLI");
        invoke_claude(&prompt.system, &prompt.user, &self.config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ClaudeCliConfig::default();
        assert_eq!(config.model, "claude-3-5-haiku-latest");
        assert_eq!(config.timeout, Duration::from_secs(45));
    }

    #[test]
    fn config_from_oracle_settings() {
        let oracle = OracleConfig {
            model: "claude-sonnet-4-5-20250929".to_string(),
            paraphrase_model: None,
            timeout_seconds: 12,
        };
        let config = ClaudeCliConfig::from(&oracle);
        assert_eq!(config.model, "claude-sonnet-4-5-20250929");
        assert_eq!(config.timeout, Duration::from_secs(12));
        assert_eq!(ClaudeCliOracle::new(config).model(), "claude-sonnet-4-5-20250929");
    }
}

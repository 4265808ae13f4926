//! Integration tests that invoke the real Claude CLI.
//!
//! These tests are `#[ignore]` by default. They require:
//! - The `claude` CLI installed and on PATH
//! - Valid Anthropic credentials configured
//!
//! Run explicitly with:
//! ```bash
//! cargo test -p finrep-agents --test cli_integration -- --ignored
//! ```

use std::sync::Arc;
use std::time::Duration;

use finrep_agents::claude_cli::{check_cli_available, invoke_claude, ClaudeCliConfig, ClaudeCliOracle};
use finrep_agents::parser::extract_json;
use finrep_agents::test_support::sample_context;
use finrep_agents::{default_generators, Pipeline};
use finrep_models::{PipelineConfig, SectionKind};

fn cli_config() -> ClaudeCliConfig {
    ClaudeCliConfig {
        model: "claude-3-5-haiku-latest".to_string(),
        timeout: Duration::from_secs(60),
    }
}

#[tokio::test]
#[ignore]
async fn cli_is_available() {
    assert!(
        check_cli_available().await,
        "claude CLI not found on PATH; install it from https://docs.anthropic.com/en/docs/claude-code"
    );
}

/// Catches changes in the CLI's output format that would break payload extraction.
#[tokio::test]
#[ignore]
async fn cli_output_is_parseable_json() {
    if !check_cli_available().await {
        eprintln!("Skipping: claude CLI not available");
        return;
    }

    let system_prompt = concat!(
        "You are a test agent. Respond ONLY with a JSON object, no other text.\n",
        "The JSON must have exactly these fields:\n",
        "- \"status\": the string \"ok\"\n",
        "- \"echo\": repeat back the user's message exactly\n",
    );

    let raw = invoke_claude(system_prompt, "ping", &cli_config())
        .await
        .expect("Claude CLI invocation failed");

    let json_str = extract_json(&raw).unwrap_or_else(|e| {
        panic!("Failed to extract JSON from CLI output ({e}). Raw output:\n{raw}")
    });
    let parsed: serde_json::Value = serde_json::from_str(&json_str).expect("invalid JSON");
    assert_eq!(parsed["status"], "ok");
    assert_eq!(parsed["echo"], "ping");
}

/// Full report against the live model. Sections may fall back, but the result
/// must stay schema-complete.
#[tokio::test]
#[ignore]
async fn live_report_is_schema_complete() {
    if !check_cli_available().await {
        eprintln!("Skipping: claude CLI not available");
        return;
    }

    let oracle = Arc::new(ClaudeCliOracle::new(cli_config()));
    let config = PipelineConfig {
        stage_timeout_seconds: 90,
        ..PipelineConfig::default()
    };
    let result = Pipeline::new(default_generators(), oracle, config)
        .execute(sample_context())
        .await;

    assert!(result.completed);
    assert_eq!(result.sections.len(), SectionKind::COUNT);
    for log in &result.logs {
        eprintln!("{:<22} {:?} {}ms {}", log.stage, log.outcome, log.elapsed_ms, log.message);
    }
}

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::context::Subject;
use crate::section::Section;

/// Stage name used for the paraphrase step in logs.
pub const PARAPHRASE_STAGE: &str = "paraphrase";
/// Stage name used for the context check in logs.
pub const CONTEXT_STAGE: &str = "context";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StageOutcome {
    Success,
    Fallback,
    Fatal,
}

/// One entry of the per-run log stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StageLog {
    pub stage: String,
    pub outcome: StageOutcome,
    pub message: String,
    #[serde(default)]
    pub elapsed_ms: u64,
}

impl StageLog {
    pub fn success(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_outcome(stage, StageOutcome::Success, message)
    }

    pub fn fallback(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_outcome(stage, StageOutcome::Fallback, message)
    }

    pub fn fatal(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_outcome(stage, StageOutcome::Fatal, message)
    }

    fn with_outcome(stage: impl Into<String>, outcome: StageOutcome, message: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            outcome,
            message: message.into(),
            elapsed_ms: 0,
        }
    }

    pub fn elapsed(mut self, elapsed_ms: u64) -> Self {
        self.elapsed_ms = elapsed_ms;
        self
    }

    pub fn is_success(&self) -> bool {
        self.outcome == StageOutcome::Success
    }
}

/// The complete output of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineResult {
    /// Orchestration reached the end. Says nothing about individual stages.
    pub completed: bool,
    pub request_id: Uuid,
    pub subject: Subject,
    pub intent: String,
    pub time_window: String,
    pub sections: Vec<Section>,
    pub paraphrase: String,
    pub logs: Vec<StageLog>,
}

impl PipelineResult {
    pub fn fallback_count(&self) -> usize {
        self.logs
            .iter()
            .filter(|l| l.outcome == StageOutcome::Fallback)
            .count()
    }

    pub fn log_for(&self, stage: &str) -> Option<&StageLog> {
        self.logs.iter().find(|l| l.stage == stage)
    }
}

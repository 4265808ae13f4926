use async_trait::async_trait;

use crate::error::ReportError;

/// A single request to the generation oracle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    /// Stage the prompt belongs to (e.g. "strategy", "paraphrase").
    pub stage: String,
    pub system: String,
    pub user: String,
}

impl Prompt {
    pub fn new(stage: impl Into<String>, system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            system: system.into(),
            user: user.into(),
        }
    }
}

/// The external text-generation service. Mockable for testing.
#[async_trait]
pub trait GenerationOracle: Send + Sync {
    fn name(&self) -> &str;

    /// Generate text for a prompt. May block for a long time; callers bound it.
    async fn generate(&self, prompt: &Prompt) -> Result<String, ReportError>;
}

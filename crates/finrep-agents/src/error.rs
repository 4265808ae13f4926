use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Claude CLI error: {0}")]
    Cli(String),

    #[error("Oracle returned an empty response")]
    EmptyResponse,

    #[error("Oracle timed out after {0} seconds")]
    Timeout(u64),

    #[error("Malformed oracle response: {0}")]
    Malformed(String),

    #[error("Missing input: {0}")]
    MissingInput(String),

    #[error("Stage cancelled before completion")]
    Cancelled,

    #[error("Invalid report context: {0}")]
    FatalContext(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ReportError {
    /// Transport-level failures worth another attempt.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ReportError::Cli(_) | ReportError::EmptyResponse | ReportError::Timeout(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(ReportError::Timeout(5).is_transient());
        assert!(ReportError::Cli("exit 1".to_string()).is_transient());
        assert!(!ReportError::Malformed("no cards".to_string()).is_transient());
        assert!(!ReportError::Cancelled.is_transient());
    }
}

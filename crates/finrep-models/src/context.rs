use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::financial::FinancialDataset;
use crate::source::{FinancialSource, SourceRecord};

/// The company a report is about.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Subject {
    pub name: String,
    pub ticker: String,
}

impl Subject {
    pub fn new(name: impl Into<String>, ticker: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ticker: ticker.into(),
        }
    }

    /// "Name (TICKER)" as used in prompts and fallback text.
    pub fn display(&self) -> String {
        format!("{} ({})", self.name.trim(), self.ticker.trim())
    }
}

/// Immutable input bundle for one report run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportContext {
    #[serde(default = "Uuid::new_v4")]
    pub request_id: Uuid,
    #[serde(default = "Utc::now")]
    pub requested_at: DateTime<Utc>,
    pub subject: Subject,
    /// Intent category assigned by the upstream classifier (e.g. "stock analysis").
    #[serde(default)]
    pub intent: String,
    #[serde(default)]
    pub time_window: String,
    /// The user's original question, when available.
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub news_summary: String,
    #[serde(default)]
    pub news_sources: Vec<SourceRecord>,
    #[serde(default)]
    pub financial: Option<FinancialDataset>,
    #[serde(default)]
    pub financial_sources: Vec<FinancialSource>,
}

/// A context that cannot start a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingField(pub &'static str);

impl std::fmt::Display for MissingField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "missing required field: {}", self.0)
    }
}

impl ReportContext {
    pub fn new(subject: Subject) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            requested_at: Utc::now(),
            subject,
            intent: String::new(),
            time_window: String::new(),
            query: None,
            news_summary: String::new(),
            news_sources: Vec::new(),
            financial: None,
            financial_sources: Vec::new(),
        }
    }

    /// Subject identity is the only hard requirement.
    pub fn validate(&self) -> Result<(), MissingField> {
        if self.subject.name.trim().is_empty() {
            return Err(MissingField("subject.name"));
        }
        if self.subject.ticker.trim().is_empty() {
            return Err(MissingField("subject.ticker"));
        }
        Ok(())
    }

    /// Text the paraphrase step rewrites: the query if given, else the intent.
    pub fn originating_query(&self) -> &str {
        self.query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .unwrap_or_else(|| self.intent.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_requires_name_and_ticker() {
        let ctx = ReportContext::new(Subject::new("UMC", "2303"));
        assert!(ctx.validate().is_ok());

        let no_name = ReportContext::new(Subject::new("  ", "2303"));
        assert_eq!(no_name.validate(), Err(MissingField("subject.name")));

        let no_ticker = ReportContext::new(Subject::new("UMC", ""));
        assert_eq!(no_ticker.validate(), Err(MissingField("subject.ticker")));
    }

    #[test]
    fn minimal_json_fills_defaults() {
        let json = r#"{"subject": {"name": "UMC", "ticker": "2303"}}"#;
        let ctx: ReportContext = serde_json::from_str(json).unwrap();
        assert!(ctx.news_sources.is_empty());
        assert!(ctx.financial.is_none());
        assert_eq!(ctx.originating_query(), "");
    }

    #[test]
    fn originating_query_prefers_query_over_intent() {
        let mut ctx = ReportContext::new(Subject::new("UMC", "2303"));
        ctx.intent = "stock analysis".to_string();
        assert_eq!(ctx.originating_query(), "stock analysis");

        ctx.query = Some("  ".to_string());
        assert_eq!(ctx.originating_query(), "stock analysis");

        ctx.query = Some("How is UMC doing?".to_string());
        assert_eq!(ctx.originating_query(), "How is UMC doing?");
    }

    #[test]
    fn subject_display() {
        assert_eq!(Subject::new("UMC", "2303").display(), "UMC (2303)");
    }
}

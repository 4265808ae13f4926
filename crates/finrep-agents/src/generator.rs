use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use finrep_models::{ReportContext, Section, SectionContent, SectionKind, StageLog};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::ReportError;
use crate::fallback::fallback_section;
use crate::oracle::{GenerationOracle, Prompt};
use crate::retry::RetryPolicy;

/// What one stage hands back to the orchestrator: always a section, always a log.
#[derive(Debug, Clone, PartialEq)]
pub struct StageOutput {
    pub section: Section,
    pub log: StageLog,
}

impl StageOutput {
    /// Fallback output for `kind`, logged with the reason.
    pub fn fallback(
        kind: SectionKind,
        ctx: &ReportContext,
        max_sources: usize,
        reason: &ReportError,
        elapsed: Duration,
    ) -> Self {
        warn!(stage = %kind, reason = %reason, elapsed_ms = elapsed.as_millis() as u64, "Stage fell back");
        Self {
            section: fallback_section(kind, ctx, max_sources),
            log: StageLog::fallback(kind.stage_name(), reason.to_string())
                .elapsed(elapsed.as_millis() as u64),
        }
    }

    /// Turn a stage's result into an output, substituting the fallback on error.
    pub fn resolve(
        kind: SectionKind,
        ctx: &ReportContext,
        rt: &StageRuntime,
        result: Result<SectionContent, ReportError>,
        started: Instant,
    ) -> Self {
        let elapsed = started.elapsed();
        match result {
            Ok(content) => {
                let message = format!("Generated {} {} item(s)", content.len(), content.variant_name());
                info!(stage = %kind, elapsed_ms = elapsed.as_millis() as u64, "Stage succeeded");
                Self {
                    section: Section::new(kind, content),
                    log: StageLog::success(kind.stage_name(), message)
                        .elapsed(elapsed.as_millis() as u64),
                }
            }
            Err(e) => Self::fallback(kind, ctx, rt.max_sources, &e, elapsed),
        }
    }
}

/// Outputs of earlier stages that later stages may consume.
///
/// Only a validated (non-fallback) financial section is ever exposed.
#[derive(Debug, Clone, Default)]
pub struct PriorOutputs {
    financial: Option<Section>,
}

impl PriorOutputs {
    pub fn record(&mut self, output: &StageOutput) {
        if output.section.kind == SectionKind::FinancialAnalysis && output.log.is_success() {
            self.financial = Some(output.section.clone());
        }
    }

    pub fn validated(&self, kind: SectionKind) -> Option<&Section> {
        match kind {
            SectionKind::FinancialAnalysis => self.financial.as_ref(),
            _ => None,
        }
    }

    /// Tab commentary of the validated financial section, one line per tab.
    pub fn financial_summary(&self) -> Option<String> {
        let section = self.validated(SectionKind::FinancialAnalysis)?;
        let SectionContent::TabList { items } = &section.content else {
            return None;
        };
        let lines: Vec<String> = items
            .iter()
            .map(|tab| format!("{}: {}", tab.label, tab.text))
            .collect();
        Some(lines.join("\n"))
    }
}

/// Everything a stage needs besides its inputs.
#[derive(Clone)]
pub struct StageRuntime {
    pub oracle: Arc<dyn GenerationOracle>,
    pub timeout: Duration,
    pub retry: RetryPolicy,
    pub cancel: CancellationToken,
    pub max_sources: usize,
}

impl StageRuntime {
    pub fn new(oracle: Arc<dyn GenerationOracle>, timeout: Duration) -> Self {
        Self {
            oracle,
            timeout,
            retry: RetryPolicy::no_retry(),
            cancel: CancellationToken::new(),
            max_sources: crate::fallback::DEFAULT_MAX_SOURCES,
        }
    }

    /// Call the oracle under the stage timeout and retry policy. Cancellation
    /// abandons the in-flight call.
    pub async fn call_oracle(&self, prompt: &Prompt) -> Result<String, ReportError> {
        if self.cancel.is_cancelled() {
            return Err(ReportError::Cancelled);
        }

        let oracle = &self.oracle;
        let timeout = self.timeout;
        let attempts = self.retry.execute(&prompt.stage, move || async move {
            match tokio::time::timeout(timeout, oracle.generate(prompt)).await {
                Ok(result) => result,
                Err(_) => Err(ReportError::Timeout(timeout.as_secs())),
            }
        });

        tokio::select! {
            biased;
            result = attempts => result,
            _ = self.cancel.cancelled() => Err(ReportError::Cancelled),
        }
    }
}

/// A report section producer. Mockable for testing.
#[async_trait]
pub trait SectionGenerator: Send + Sync {
    fn kind(&self) -> SectionKind;

    /// Produce this stage's section. Never fails: errors become a fallback.
    async fn run(&self, ctx: &ReportContext, priors: &PriorOutputs, rt: &StageRuntime) -> StageOutput;
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::test_support::{sample_context, ScenarioOracle};
    use finrep_models::{StageOutcome, Tab, DataTable};

    /// Generator that returns a fixed result without touching the oracle.
    pub struct MockGenerator {
        pub kind: SectionKind,
        pub result: Result<SectionContent, String>,
    }

    #[async_trait]
    impl SectionGenerator for MockGenerator {
        fn kind(&self) -> SectionKind {
            self.kind
        }

        async fn run(&self, ctx: &ReportContext, _priors: &PriorOutputs, rt: &StageRuntime) -> StageOutput {
            let result = self.result.clone().map_err(ReportError::Malformed);
            StageOutput::resolve(self.kind, ctx, rt, result, Instant::now())
        }
    }

    fn runtime() -> StageRuntime {
        StageRuntime::new(Arc::new(ScenarioOracle::new()), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn mock_generator_success_and_failure() {
        let ctx = sample_context();
        let rt = runtime();

        let ok = MockGenerator {
            kind: SectionKind::Notices,
            result: Ok(SectionContent::BulletList {
                items: vec!["a".into(), "b".into(), "c".into()],
            }),
        };
        let out = ok.run(&ctx, &PriorOutputs::default(), &rt).await;
        assert_eq!(out.log.outcome, StageOutcome::Success);
        assert_eq!(out.log.stage, "notices");

        let bad = MockGenerator {
            kind: SectionKind::Notices,
            result: Err("no bullets".to_string()),
        };
        let out = bad.run(&ctx, &PriorOutputs::default(), &rt).await;
        assert_eq!(out.log.outcome, StageOutcome::Fallback);
        assert!(out.log.message.contains("no bullets"));
        assert_eq!(out.section.content.variant_name(), "bullet_list");
    }

    #[test]
    fn priors_only_expose_successful_financial() {
        let ctx = sample_context();
        let content = SectionContent::TabList {
            items: vec![Tab {
                label: "EPS".to_string(),
                text: "EPS fell".to_string(),
                table: DataTable::new(&["Quarter"]),
            }],
        };

        let mut priors = PriorOutputs::default();
        priors.record(&StageOutput {
            section: fallback_section(SectionKind::FinancialAnalysis, &ctx, 10),
            log: StageLog::fallback("financial_analysis", "timeout"),
        });
        assert!(priors.financial_summary().is_none());

        priors.record(&StageOutput {
            section: Section::new(SectionKind::FinancialAnalysis, content),
            log: StageLog::success("financial_analysis", "ok"),
        });
        assert_eq!(priors.financial_summary().as_deref(), Some("EPS: EPS fell"));
        assert!(priors.validated(SectionKind::Strategy).is_none());
    }

    #[tokio::test]
    async fn call_oracle_respects_cancellation() {
        let rt = runtime();
        rt.cancel.cancel();
        let result = rt.call_oracle(&Prompt::new("strategy", "s", "{}")).await;
        assert!(matches!(result, Err(ReportError::Cancelled)));
    }

    #[tokio::test]
    async fn call_oracle_times_out() {
        let oracle = ScenarioOracle::new().hanging("sentiment");
        let rt = StageRuntime::new(Arc::new(oracle), Duration::from_millis(20));
        let result = rt.call_oracle(&Prompt::new("sentiment", "s", "{}")).await;
        assert!(matches!(result, Err(ReportError::Timeout(_))));
    }
}

use std::time::Instant;

use async_trait::async_trait;
use finrep_models::{ReportContext, SectionContent, SectionKind};
use serde::Deserialize;
use tracing::debug;

use super::required;
use crate::error::ReportError;
use crate::fallback::financial_tabs;
use crate::generator::{PriorOutputs, SectionGenerator, StageOutput, StageRuntime};
use crate::parser::parse_payload;
use crate::prompts::financial_prompt;

#[derive(Debug, Deserialize)]
struct Commentary {
    eps: String,
    revenue: String,
    gross_margin: String,
    debt_ratio: String,
}

/// EPS, revenue, gross margin and debt ratio tabs.
///
/// Tables come straight from the dataset; the oracle only writes the commentary.
/// Without a usable dataset the oracle is never called.
pub struct FinancialGenerator;

impl FinancialGenerator {
    async fn produce(&self, ctx: &ReportContext, rt: &StageRuntime) -> Result<SectionContent, ReportError> {
        let dataset = ctx
            .financial
            .as_ref()
            .ok_or_else(|| ReportError::MissingInput("no financial dataset".to_string()))?;
        dataset
            .validate()
            .map_err(|problem| ReportError::MissingInput(problem.to_string()))?;

        let scores = dataset.scores();
        debug!(overall = scores.overall_score, eps = scores.eps_score, "Financial scores");

        let prompt = financial_prompt(ctx, dataset)?;
        let raw = rt.call_oracle(&prompt).await?;
        let commentary: Commentary = parse_payload(&raw)?;

        let texts = [
            required("eps", &commentary.eps)?,
            required("revenue", &commentary.revenue)?,
            required("gross_margin", &commentary.gross_margin)?,
            required("debt_ratio", &commentary.debt_ratio)?,
        ];
        Ok(financial_tabs(Some(dataset), texts))
    }
}

#[async_trait]
impl SectionGenerator for FinancialGenerator {
    fn kind(&self) -> SectionKind {
        SectionKind::FinancialAnalysis
    }

    async fn run(&self, ctx: &ReportContext, _priors: &PriorOutputs, rt: &StageRuntime) -> StageOutput {
        let started = Instant::now();
        let result = self.produce(ctx, rt).await;
        StageOutput::resolve(self.kind(), ctx, rt, result, started)
    }
}

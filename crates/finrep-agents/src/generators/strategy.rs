use std::time::Instant;

use async_trait::async_trait;
use finrep_models::{ReportContext, SectionContent, SectionKind};
use serde::Deserialize;

use super::{attributed_card, required};
use crate::error::ReportError;
use crate::fallback::STRATEGY_HORIZONS;
use crate::generator::{PriorOutputs, SectionGenerator, StageOutput, StageRuntime};
use crate::parser::parse_payload;
use crate::prompts::strategy_prompt;

#[derive(Debug, Deserialize)]
struct Payload {
    intraday: Horizon,
    short_term: Horizon,
    mid_term: Horizon,
    long_term: Horizon,
}

#[derive(Debug, Deserialize)]
struct Horizon {
    suggestion: String,
    #[serde(default)]
    points: Vec<String>,
}

impl Horizon {
    fn render(&self) -> Result<String, ReportError> {
        let mut text = required("suggestion", &self.suggestion)?;
        for point in self.points.iter().map(|p| p.trim()).filter(|p| !p.is_empty()) {
            text.push_str("\n- ");
            text.push_str(point);
        }
        Ok(text)
    }
}

/// Strategy cards for four holding horizons.
///
/// Reads the validated financial summary when one exists but never waits on a
/// financial fallback.
pub struct StrategyGenerator;

impl StrategyGenerator {
    async fn produce(
        &self,
        ctx: &ReportContext,
        priors: &PriorOutputs,
        rt: &StageRuntime,
    ) -> Result<SectionContent, ReportError> {
        let summary = priors.financial_summary();
        let prompt = strategy_prompt(ctx, summary.as_deref())?;
        let raw = rt.call_oracle(&prompt).await?;
        let payload: Payload = parse_payload(&raw)?;

        let horizons = [
            &payload.intraday,
            &payload.short_term,
            &payload.mid_term,
            &payload.long_term,
        ];
        let items = STRATEGY_HORIZONS
            .iter()
            .zip(horizons)
            .map(|(title, horizon)| Ok(attributed_card(title, &horizon.render()?, &ctx.news_sources)))
            .collect::<Result<Vec<_>, ReportError>>()?;

        Ok(SectionContent::CardList { items })
    }
}

#[async_trait]
impl SectionGenerator for StrategyGenerator {
    fn kind(&self) -> SectionKind {
        SectionKind::Strategy
    }

    async fn run(&self, ctx: &ReportContext, priors: &PriorOutputs, rt: &StageRuntime) -> StageOutput {
        let started = Instant::now();
        let result = self.produce(ctx, priors, rt).await;
        StageOutput::resolve(self.kind(), ctx, rt, result, started)
    }
}

use std::time::Instant;

use async_trait::async_trait;
use finrep_models::{ReportContext, SectionContent, SectionKind};
use serde::Deserialize;

use crate::error::ReportError;
use crate::generator::{PriorOutputs, SectionGenerator, StageOutput, StageRuntime};
use crate::parser::parse_payload;
use crate::prompts::notices_prompt;

const MIN_NOTICES: usize = 3;

#[derive(Debug, Deserialize)]
struct Payload {
    notices: Vec<String>,
}

/// Trading notices as bullets.
pub struct NoticeGenerator;

impl NoticeGenerator {
    async fn produce(
        &self,
        ctx: &ReportContext,
        priors: &PriorOutputs,
        rt: &StageRuntime,
    ) -> Result<SectionContent, ReportError> {
        let summary = priors.financial_summary();
        let prompt = notices_prompt(ctx, summary.as_deref())?;
        let raw = rt.call_oracle(&prompt).await?;
        let payload: Payload = parse_payload(&raw)?;

        let items: Vec<String> = payload
            .notices
            .into_iter()
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .collect();
        if items.len() < MIN_NOTICES {
            return Err(ReportError::Malformed(format!(
                "expected at least {MIN_NOTICES} notices, got {}",
                items.len()
            )));
        }

        Ok(SectionContent::BulletList { items })
    }
}

#[async_trait]
impl SectionGenerator for NoticeGenerator {
    fn kind(&self) -> SectionKind {
        SectionKind::Notices
    }

    async fn run(&self, ctx: &ReportContext, priors: &PriorOutputs, rt: &StageRuntime) -> StageOutput {
        let started = Instant::now();
        let result = self.produce(ctx, priors, rt).await;
        StageOutput::resolve(self.kind(), ctx, rt, result, started)
    }
}

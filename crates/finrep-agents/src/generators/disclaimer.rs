use std::time::Instant;

use async_trait::async_trait;
use finrep_models::{ReportContext, SectionContent, SectionKind};
use serde::Deserialize;

use super::required;
use crate::error::ReportError;
use crate::fallback::STANDARD_DISCLAIMER;
use crate::generator::{PriorOutputs, SectionGenerator, StageOutput, StageRuntime};
use crate::parser::parse_payload;
use crate::prompts::disclaimer_prompt;

#[derive(Debug, Deserialize)]
struct Payload {
    text: String,
}

pub struct DisclaimerGenerator;

impl DisclaimerGenerator {
    async fn produce(&self, ctx: &ReportContext, rt: &StageRuntime) -> Result<SectionContent, ReportError> {
        let prompt = disclaimer_prompt(ctx, STANDARD_DISCLAIMER)?;
        let raw = rt.call_oracle(&prompt).await?;
        let payload: Payload = parse_payload(&raw)?;
        Ok(SectionContent::Disclaimer {
            text: required("text", &payload.text)?,
        })
    }
}

#[async_trait]
impl SectionGenerator for DisclaimerGenerator {
    fn kind(&self) -> SectionKind {
        SectionKind::Disclaimer
    }

    async fn run(&self, ctx: &ReportContext, _priors: &PriorOutputs, rt: &StageRuntime) -> StageOutput {
        let started = Instant::now();
        let result = self.produce(ctx, rt).await;
        StageOutput::resolve(self.kind(), ctx, rt, result, started)
    }
}

use std::time::Instant;

use async_trait::async_trait;
use finrep_models::{ReportContext, SectionContent, SectionKind};
use serde::Deserialize;

use super::{attributed_card, required};
use crate::error::ReportError;
use crate::generator::{PriorOutputs, SectionGenerator, StageOutput, StageRuntime};
use crate::parser::parse_payload;
use crate::prompts::price_movement_prompt;

const CARD_COUNT: usize = 3;

#[derive(Debug, Deserialize)]
struct Payload {
    cards: Vec<RawCard>,
}

#[derive(Debug, Deserialize)]
struct RawCard {
    title: String,
    text: String,
}

/// Three attributed cards on recent price action.
pub struct PriceMovementGenerator;

impl PriceMovementGenerator {
    async fn produce(&self, ctx: &ReportContext, rt: &StageRuntime) -> Result<SectionContent, ReportError> {
        let prompt = price_movement_prompt(ctx)?;
        let raw = rt.call_oracle(&prompt).await?;
        let payload: Payload = parse_payload(&raw)?;

        if payload.cards.len() < CARD_COUNT {
            return Err(ReportError::Malformed(format!(
                "expected {CARD_COUNT} cards, got {}",
                payload.cards.len()
            )));
        }

        let items = payload
            .cards
            .iter()
            .take(CARD_COUNT)
            .map(|c| {
                let title = required("card title", &c.title)?;
                let text = required("card text", &c.text)?;
                Ok(attributed_card(&title, &text, &ctx.news_sources))
            })
            .collect::<Result<Vec<_>, ReportError>>()?;

        Ok(SectionContent::CardList { items })
    }
}

#[async_trait]
impl SectionGenerator for PriceMovementGenerator {
    fn kind(&self) -> SectionKind {
        SectionKind::PriceMovement
    }

    async fn run(&self, ctx: &ReportContext, _priors: &PriorOutputs, rt: &StageRuntime) -> StageOutput {
        let started = Instant::now();
        let result = self.produce(ctx, rt).await;
        StageOutput::resolve(self.kind(), ctx, rt, result, started)
    }
}

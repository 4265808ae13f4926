use std::time::Instant;

use async_trait::async_trait;
use finrep_models::{Card, ReportContext, SectionContent, SectionKind};
use serde::Deserialize;

use super::required;
use crate::error::ReportError;
use crate::fallback::SENTIMENT_CARDS;
use crate::generator::{PriorOutputs, SectionGenerator, StageOutput, StageRuntime};
use crate::parser::parse_payload;
use crate::prompts::sentiment_prompt;

#[derive(Debug, Deserialize)]
struct Payload {
    heat: String,
    mix: String,
    topics: Vec<String>,
}

pub struct SentimentGenerator;

impl SentimentGenerator {
    async fn produce(&self, ctx: &ReportContext, rt: &StageRuntime) -> Result<SectionContent, ReportError> {
        let prompt = sentiment_prompt(ctx)?;
        let raw = rt.call_oracle(&prompt).await?;
        let payload: Payload = parse_payload(&raw)?;

        let topics: Vec<&str> = payload
            .topics
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .collect();
        if topics.is_empty() {
            return Err(ReportError::Malformed("no hot topics".to_string()));
        }

        let texts = [
            required("heat", &payload.heat)?,
            required("mix", &payload.mix)?,
            topics.join(", "),
        ];
        let items = SENTIMENT_CARDS
            .iter()
            .zip(texts)
            .map(|(title, text)| Card {
                title: title.to_string(),
                text,
                sources: Vec::new(),
            })
            .collect();

        Ok(SectionContent::CardList { items })
    }
}

#[async_trait]
impl SectionGenerator for SentimentGenerator {
    fn kind(&self) -> SectionKind {
        SectionKind::Sentiment
    }

    async fn run(&self, ctx: &ReportContext, _priors: &PriorOutputs, rt: &StageRuntime) -> StageOutput {
        let started = Instant::now();
        let result = self.produce(ctx, rt).await;
        StageOutput::resolve(self.kind(), ctx, rt, result, started)
    }
}

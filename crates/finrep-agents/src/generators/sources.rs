use std::collections::HashMap;
use std::time::Instant;

use async_trait::async_trait;
use finrep_models::{dedup_by_link, normalize_link, ReportContext, SectionContent, SectionKind, SourceRecord};
use serde::Deserialize;

use crate::error::ReportError;
use crate::fallback::source_candidates;
use crate::generator::{PriorOutputs, SectionGenerator, StageOutput, StageRuntime};
use crate::parser::parse_payload;
use crate::prompts::sources_prompt;

#[derive(Debug, Deserialize)]
struct Payload {
    sources: Vec<SourceRecord>,
}

/// The report's source list. The oracle may relabel candidates but never add links.
pub struct SourcesGenerator;

impl SourcesGenerator {
    async fn produce(&self, ctx: &ReportContext, rt: &StageRuntime) -> Result<SectionContent, ReportError> {
        let candidates = source_candidates(ctx, rt.max_sources);
        if candidates.is_empty() {
            return Err(ReportError::MissingInput("no candidate sources".to_string()));
        }

        let prompt = sources_prompt(ctx, &candidates)?;
        let raw = rt.call_oracle(&prompt).await?;
        let payload: Payload = parse_payload(&raw)?;

        let known: HashMap<String, &SourceRecord> =
            candidates.iter().map(|c| (c.key(), c)).collect();

        let mut relabeled = Vec::with_capacity(payload.sources.len());
        for source in payload.sources {
            let key = normalize_link(&source.link);
            let Some(candidate) = known.get(&key) else {
                return Err(ReportError::Malformed(format!("unknown source link {}", source.link)));
            };
            let title = source.title.trim();
            let title = if title.is_empty() { candidate.title.as_str() } else { title };
            relabeled.push(SourceRecord::new(title, candidate.link.clone()));
        }

        let mut items = dedup_by_link(relabeled);
        items.truncate(rt.max_sources.max(1));
        if items.is_empty() {
            return Err(ReportError::Malformed("empty source list".to_string()));
        }

        Ok(SectionContent::SourceList { items })
    }
}

#[async_trait]
impl SectionGenerator for SourcesGenerator {
    fn kind(&self) -> SectionKind {
        SectionKind::Sources
    }

    async fn run(&self, ctx: &ReportContext, _priors: &PriorOutputs, rt: &StageRuntime) -> StageOutput {
        let started = Instant::now();
        let result = self.produce(ctx, rt).await;
        StageOutput::resolve(self.kind(), ctx, rt, result, started)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{sample_context, ScenarioOracle};
    use finrep_models::StageOutcome;
    use std::sync::Arc;
    use std::time::Duration;

    fn items(out: &StageOutput) -> &[SourceRecord] {
        let SectionContent::SourceList { items } = &out.section.content else {
            panic!("expected source list");
        };
        items
    }

    #[tokio::test]
    async fn echoes_candidates_with_site_names() {
        let rt = StageRuntime::new(Arc::new(ScenarioOracle::new()), Duration::from_secs(5));
        let out = SourcesGenerator
            .run(&sample_context(), &PriorOutputs::default(), &rt)
            .await;
        assert_eq!(out.log.outcome, StageOutcome::Success);

        let items = items(&out);
        assert_eq!(items.len(), 4);
        assert_eq!(items[0].title, "UMC slips on pricing worries - Yahoo Finance");
        assert_eq!(items[3].title, "Goodinfo");
    }

    #[tokio::test]
    async fn unknown_link_is_rejected() {
        let raw = r#"{"sources": [{"title": "Made up", "link": "https://invented.example.com"}]}"#;
        let rt = StageRuntime::new(
            Arc::new(ScenarioOracle::new().replying("sources", raw)),
            Duration::from_secs(5),
        );
        let out = SourcesGenerator
            .run(&sample_context(), &PriorOutputs::default(), &rt)
            .await;
        assert_eq!(out.log.outcome, StageOutcome::Fallback);
        assert!(out.log.message.contains("unknown source link"));
        assert_eq!(items(&out).len(), 4);
    }

    #[tokio::test]
    async fn relabels_and_dedups() {
        let raw = r#"{"sources": [
            {"title": "Yahoo: pricing worries", "link": "https://tw.stock.yahoo.com/news/umc-1/"},
            {"title": "dup", "link": "https://tw.stock.yahoo.com/news/umc-1"},
            {"title": "", "link": "https://news.cnyes.com/news/id/5501"}
        ]}"#;
        let rt = StageRuntime::new(
            Arc::new(ScenarioOracle::new().replying("sources", raw)),
            Duration::from_secs(5),
        );
        let out = SourcesGenerator
            .run(&sample_context(), &PriorOutputs::default(), &rt)
            .await;
        let items = items(&out);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Yahoo: pricing worries");
        assert_eq!(items[0].link, "https://tw.stock.yahoo.com/news/umc-1");
        assert_eq!(items[1].title, "Foreign investors trim foundry stakes - Anue");
    }

    #[tokio::test]
    async fn no_candidates_uses_providers_without_oracle() {
        let oracle = Arc::new(ScenarioOracle::new());
        let rt = StageRuntime::new(oracle.clone(), Duration::from_secs(5));
        let mut ctx = sample_context();
        ctx.news_sources.clear();
        ctx.financial_sources.clear();

        let out = SourcesGenerator.run(&ctx, &PriorOutputs::default(), &rt).await;
        assert_eq!(out.log.outcome, StageOutcome::Fallback);
        assert_eq!(oracle.calls(), 0);
        assert!(items(&out).len() >= 3);
    }
}

use finrep_models::{FinancialDataset, ReportContext, SectionKind, SourceRecord};
use serde_json::{json, Value};

use crate::error::ReportError;
use crate::oracle::Prompt;

/// Shared preamble for every section prompt.
const PREAMBLE: &str = "You are a sell-side equity analyst writing one section of a stock report. \
     Base every statement on the JSON input. Do not invent figures that are not present. \
     Respond ONLY with a JSON object matching the schema below, with no other text.";

const CITATION_RULES: &str = "Sources in the input are numbered from 1. When a sentence relies on \
     a source, append its marker as [N] right after the sentence. Never cite a number that is not \
     in the list.";

fn schema_block(example: Value) -> String {
    let pretty = serde_json::to_string_pretty(&example).unwrap_or_default();
    format!("## RESPONSE SCHEMA\n\n```json\n{pretty}\n```")
}

fn system_prompt(task: &str, example: Value, cites: bool) -> String {
    let mut prompt = format!("{PREAMBLE}\n\n## TASK\n\n{task}\n\n");
    if cites {
        prompt.push_str("## CITATIONS\n\n");
        prompt.push_str(CITATION_RULES);
        prompt.push_str("\n\n");
    }
    prompt.push_str(&schema_block(example));
    prompt
}

/// Render sources as the numbered list the citation markers index into.
pub fn numbered_sources(sources: &[SourceRecord]) -> Vec<Value> {
    sources
        .iter()
        .enumerate()
        .map(|(i, s)| json!({"n": i + 1, "title": s.title, "link": s.link}))
        .collect()
}

fn base_input(ctx: &ReportContext) -> Value {
    json!({
        "subject": ctx.subject.display(),
        "ticker": ctx.subject.ticker,
        "intent": ctx.intent,
        "time_window": ctx.time_window,
    })
}

fn user_prompt(mut input: Value, extra: Value) -> Result<String, ReportError> {
    if let (Some(base), Value::Object(extra)) = (input.as_object_mut(), extra) {
        base.extend(extra);
    }
    Ok(serde_json::to_string_pretty(&input)?)
}

pub fn price_movement_prompt(ctx: &ReportContext) -> Result<Prompt, ReportError> {
    let system = system_prompt(
        "Summarize the recent price movement in exactly three cards: the price action itself, \
         volume and momentum, and the key drivers from the news.",
        json!({"cards": [{"title": "<short heading>", "text": "<two or three sentences with [N] markers>"}]}),
        true,
    );
    let user = user_prompt(
        base_input(ctx),
        json!({"news_summary": ctx.news_summary, "sources": numbered_sources(&ctx.news_sources)}),
    )?;
    Ok(Prompt::new(SectionKind::PriceMovement.stage_name(), system, user))
}

pub fn institutional_prompt(ctx: &ReportContext) -> Result<Prompt, ReportError> {
    let system = system_prompt(
        "Report institutional investor net buy/sell activity (foreign investors, investment \
         trusts, dealers) over the time window as a daily table plus a one-sentence summary. \
         Values are net lots; use negative numbers for net selling.",
        json!({
            "summary": "<one sentence>",
            "rows": [{"date": "2025-05-02", "foreign": "1520", "investment_trust": "-230", "dealer": "85", "total": "1375"}]
        }),
        false,
    );
    let user = user_prompt(base_input(ctx), json!({"news_summary": ctx.news_summary}))?;
    Ok(Prompt::new(SectionKind::InstitutionalTrend.stage_name(), system, user))
}

pub fn financial_prompt(ctx: &ReportContext, dataset: &FinancialDataset) -> Result<Prompt, ReportError> {
    let system = system_prompt(
        "Write a short commentary for each of the four financial tabs: EPS, revenue, gross \
         margin and debt ratio. Mention the latest quarter and the direction of change. The \
         `scores` object rates each area from 0 to 100.",
        json!({
            "eps": "<commentary>",
            "revenue": "<commentary>",
            "gross_margin": "<commentary>",
            "debt_ratio": "<commentary>"
        }),
        false,
    );
    let user = user_prompt(
        base_input(ctx),
        json!({
            "summary": dataset.latest_summary(),
            "scores": dataset.scores(),
            "dataset": dataset,
        }),
    )?;
    Ok(Prompt::new(SectionKind::FinancialAnalysis.stage_name(), system, user))
}

pub fn strategy_prompt(ctx: &ReportContext, financial_summary: Option<&str>) -> Result<Prompt, ReportError> {
    let system = system_prompt(
        "Give an investment strategy for four horizons: intraday, short term (weeks), mid term \
         (months) and long term (a year or more). Each horizon has a one-line suggestion and \
         two to four supporting points.",
        json!({
            "intraday": {"suggestion": "<one line>", "points": ["<point with [N] markers>"]},
            "short_term": {"suggestion": "<one line>", "points": ["<point>"]},
            "mid_term": {"suggestion": "<one line>", "points": ["<point>"]},
            "long_term": {"suggestion": "<one line>", "points": ["<point>"]}
        }),
        true,
    );
    let user = user_prompt(
        base_input(ctx),
        json!({
            "news_summary": ctx.news_summary,
            "financial_summary": financial_summary,
            "sources": numbered_sources(&ctx.news_sources),
        }),
    )?;
    Ok(Prompt::new(SectionKind::Strategy.stage_name(), system, user))
}

pub fn sentiment_prompt(ctx: &ReportContext) -> Result<Prompt, ReportError> {
    let system = system_prompt(
        "Describe community and retail-investor sentiment: how heated the discussion is, the \
         bullish/bearish mix, and the topics people talk about most.",
        json!({
            "heat": "<discussion volume and intensity>",
            "mix": "<bullish vs bearish balance>",
            "topics": ["<hot topic>"]
        }),
        false,
    );
    let user = user_prompt(base_input(ctx), json!({"news_summary": ctx.news_summary}))?;
    Ok(Prompt::new(SectionKind::Sentiment.stage_name(), system, user))
}

pub fn notices_prompt(ctx: &ReportContext, financial_summary: Option<&str>) -> Result<Prompt, ReportError> {
    let system = system_prompt(
        "List six practical notices a trader should keep in mind for this stock: risk factors, \
         upcoming events, levels to watch, and position sizing.",
        json!({"notices": ["<one sentence>"]}),
        false,
    );
    let user = user_prompt(
        base_input(ctx),
        json!({"news_summary": ctx.news_summary, "financial_summary": financial_summary}),
    )?;
    Ok(Prompt::new(SectionKind::Notices.stage_name(), system, user))
}

pub fn sources_prompt(ctx: &ReportContext, candidates: &[SourceRecord]) -> Result<Prompt, ReportError> {
    let system = system_prompt(
        "Tidy the candidate source list for display. You may shorten or clarify titles and drop \
         irrelevant entries. Links must be copied exactly from the candidates; never add new ones.",
        json!({"sources": [{"title": "<display title>", "link": "<candidate link>"}]}),
        false,
    );
    let user = user_prompt(base_input(ctx), json!({"candidates": candidates}))?;
    Ok(Prompt::new(SectionKind::Sources.stage_name(), system, user))
}

pub fn disclaimer_prompt(ctx: &ReportContext, standard: &str) -> Result<Prompt, ReportError> {
    let system = system_prompt(
        "Adapt the standard disclaimer to this report's subject. Keep every obligation it states; \
         you may only name the subject and the time window.",
        json!({"text": "<disclaimer>"}),
        false,
    );
    let user = user_prompt(base_input(ctx), json!({"standard": standard}))?;
    Ok(Prompt::new(SectionKind::Disclaimer.stage_name(), system, user))
}

pub fn paraphrase_system_prompt() -> String {
    "Rewrite the user's question about a stock as one clear, neutral sentence in the same \
     language. Reply with the sentence only, with no quotes or commentary."
        .to_string()
}

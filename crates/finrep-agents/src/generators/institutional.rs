use std::time::Instant;

use async_trait::async_trait;
use finrep_models::{DataTable, ReportContext, SectionContent, SectionKind};
use serde::Deserialize;
use serde_json::Value;

use super::required;
use crate::error::ReportError;
use crate::fallback::INSTITUTIONAL_COLUMNS;
use crate::generator::{PriorOutputs, SectionGenerator, StageOutput, StageRuntime};
use crate::parser::parse_payload;
use crate::prompts::institutional_prompt;

#[derive(Debug, Deserialize)]
struct Payload {
    summary: String,
    rows: Vec<FlowRow>,
}

/// Net lots per investor type. Models emit these as numbers or strings.
#[derive(Debug, Deserialize)]
struct FlowRow {
    date: String,
    foreign: Value,
    investment_trust: Value,
    dealer: Value,
    total: Value,
}

fn cell(field: &str, value: &Value) -> Result<String, ReportError> {
    match value {
        Value::Number(n) => Ok(n.to_string()),
        Value::String(s) => required(field, s),
        other => Err(ReportError::Malformed(format!("{field} is not a number: {other}"))),
    }
}

/// Daily institutional net flows as a table.
pub struct InstitutionalGenerator;

impl InstitutionalGenerator {
    async fn produce(&self, ctx: &ReportContext, rt: &StageRuntime) -> Result<SectionContent, ReportError> {
        let prompt = institutional_prompt(ctx)?;
        let raw = rt.call_oracle(&prompt).await?;
        let payload: Payload = parse_payload(&raw)?;

        if payload.rows.is_empty() {
            return Err(ReportError::Malformed("no institutional rows".to_string()));
        }

        let mut table = DataTable::new(&INSTITUTIONAL_COLUMNS);
        for row in &payload.rows {
            table.push_row(vec![
                required("date", &row.date)?,
                cell("foreign", &row.foreign)?,
                cell("investment_trust", &row.investment_trust)?,
                cell("dealer", &row.dealer)?,
                cell("total", &row.total)?,
            ]);
        }

        Ok(SectionContent::Table {
            summary: required("summary", &payload.summary)?,
            table,
        })
    }
}

#[async_trait]
impl SectionGenerator for InstitutionalGenerator {
    fn kind(&self) -> SectionKind {
        SectionKind::InstitutionalTrend
    }

    async fn run(&self, ctx: &ReportContext, _priors: &PriorOutputs, rt: &StageRuntime) -> StageOutput {
        let started = Instant::now();
        let result = self.produce(ctx, rt).await;
        StageOutput::resolve(self.kind(), ctx, rt, result, started)
    }
}

//! Test support module providing scripted oracles and a realistic context.
//!
//! `ScenarioOracle` answers every stage prompt with a well-formed payload, reading
//! the prompt's JSON input where the answer depends on it (the sources stage echoes
//! its candidates). Individual stages can be overridden to fail, hang, or return
//! arbitrary text, and the oracle can cancel a token on its n-th call.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use finrep_models::{
    BalanceRow, EpsRow, FinancialDataset, FinancialSource, IncomeRow, ReportContext, RevenueRow,
    SourceRecord, Subject, PARAPHRASE_STAGE,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use crate::error::ReportError;
use crate::oracle::{GenerationOracle, Prompt};

#[derive(Debug, Clone)]
enum Behavior {
    Fail,
    Hang,
    Reply(String),
}

/// An oracle that behaves like a well-prompted model, with per-stage overrides.
#[derive(Default)]
pub struct ScenarioOracle {
    overrides: HashMap<String, Behavior>,
    cancel_on_call: Option<(usize, CancellationToken)>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<(String, String)>>,
}

impl ScenarioOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `stage` fail with a CLI error.
    pub fn failing(mut self, stage: &str) -> Self {
        self.overrides.insert(stage.to_string(), Behavior::Fail);
        self
    }

    /// Make `stage` never answer.
    pub fn hanging(mut self, stage: &str) -> Self {
        self.overrides.insert(stage.to_string(), Behavior::Hang);
        self
    }

    /// Make `stage` answer with `raw` verbatim.
    pub fn replying(mut self, stage: &str, raw: &str) -> Self {
        self.overrides
            .insert(stage.to_string(), Behavior::Reply(raw.to_string()));
        self
    }

    /// Cancel `token` while serving the `n`-th call (1-based). That call still answers.
    pub fn cancelling_on_call(mut self, n: usize, token: CancellationToken) -> Self {
        self.cancel_on_call = Some((n, token));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Stages in the order they reached the oracle.
    pub fn stages_called(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|p| p.iter().map(|(stage, _)| stage.clone()).collect())
            .unwrap_or_default()
    }

    /// The JSON user input most recently sent for `stage`.
    pub fn user_input(&self, stage: &str) -> Option<Value> {
        let prompts = self.prompts.lock().ok()?;
        let (_, user) = prompts.iter().rev().find(|(s, _)| s == stage)?;
        serde_json::from_str(user).ok()
    }
}

#[async_trait]
impl GenerationOracle for ScenarioOracle {
    fn name(&self) -> &str {
        "scenario"
    }

    async fn generate(&self, prompt: &Prompt) -> Result<String, ReportError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push((prompt.stage.clone(), prompt.user.clone()));
        }
        if let Some((at, token)) = &self.cancel_on_call {
            if *at == n {
                token.cancel();
            }
        }

        match self.overrides.get(&prompt.stage) {
            Some(Behavior::Fail) => Err(ReportError::Cli(format!(
                "scripted failure for {}",
                prompt.stage
            ))),
            Some(Behavior::Hang) => std::future::pending().await,
            Some(Behavior::Reply(raw)) => Ok(raw.clone()),
            None => scenario_reply(prompt),
        }
    }
}

/// An oracle whose every call fails.
pub struct FailingOracle;

#[async_trait]
impl GenerationOracle for FailingOracle {
    fn name(&self) -> &str {
        "failing"
    }

    async fn generate(&self, prompt: &Prompt) -> Result<String, ReportError> {
        Err(ReportError::Cli(format!("oracle unavailable for {}", prompt.stage)))
    }
}

fn fenced(value: Value) -> String {
    let body = serde_json::to_string_pretty(&value).unwrap_or_default();
    format!("Here is the section:\n```json\n{body}\n```")
}

/// The payload a cooperative model would return for `prompt`.
pub fn scenario_reply(prompt: &Prompt) -> Result<String, ReportError> {
    let input: Value = serde_json::from_str(&prompt.user).unwrap_or(Value::Null);
    let subject = input["subject"].as_str().unwrap_or("the stock").to_string();

    let reply = match prompt.stage.as_str() {
        PARAPHRASE_STAGE => "Recent share price performance and near-term outlook".to_string(),
        "price_movement" => fenced(json!({
            "cards": [
                {"title": "Price Action", "text": format!("{subject} slipped 2.1% over the week [1].")},
                {"title": "Volume & Momentum", "text": "Turnover rose as foreign selling picked up [2] [9]."},
                {"title": "Key Drivers", "text": "Mature-node pricing pressure weighed on the shares [1][3]."}
            ]
        })),
        "institutional_trend" => fenced(json!({
            "summary": "Foreign investors were net sellers for most of the week.",
            "rows": [
                {"date": "2025-05-02", "foreign": -15230, "investment_trust": "420", "dealer": "-85", "total": "-14895"},
                {"date": "2025-05-01", "foreign": "3120", "investment_trust": "150", "dealer": "12", "total": "3282"}
            ]
        })),
        "financial_analysis" => fenced(json!({
            "eps": "EPS of 0.62 fell both quarter over quarter and year over year.",
            "revenue": "Revenue dipped 4.2% QoQ but grew 5.9% YoY.",
            "gross_margin": "Gross margin held near 26.7%.",
            "debt_ratio": "A 45% debt ratio leaves a moderate balance-sheet cushion."
        })),
        "strategy" => fenced(json!({
            "intraday": {"suggestion": "Stay on the sidelines", "points": ["Volatility is elevated [2]."]},
            "short_term": {"suggestion": "Wait for support to hold", "points": ["Foreign selling has not eased [2]."]},
            "mid_term": {"suggestion": "Accumulate on weakness", "points": ["Utilization is recovering [1]."]},
            "long_term": {"suggestion": "Hold", "points": ["Dividend yield remains attractive [3]."]}
        })),
        "sentiment" => fenced(json!({
            "heat": "Forum activity doubled versus last week.",
            "mix": "Roughly 40% bullish and 60% bearish posts.",
            "topics": ["Dividend policy", "Mature-node price cuts"]
        })),
        "notices" => fenced(json!({
            "notices": [
                "Ex-dividend date falls within the next month.",
                "Foreign flows have been volatile.",
                "Support sits near the 45 level.",
                "Quarterly results are due soon.",
                "Peer pricing news can move the stock.",
                "Keep position sizes modest."
            ]
        })),
        "sources" => {
            let sources: Vec<Value> = input["candidates"]
                .as_array()
                .map(|c| {
                    c.iter()
                        .map(|s| json!({"title": s["title"], "link": s["link"]}))
                        .collect()
                })
                .unwrap_or_default();
            fenced(json!({ "sources": sources }))
        }
        "disclaimer" => fenced(json!({
            "text": format!("This report on {subject} is for reference only and is not investment advice.")
        })),
        other => {
            return Err(ReportError::Malformed(format!("no scenario for stage {other}")));
        }
    };
    Ok(reply)
}

fn d(num: i64, scale: u32) -> Decimal {
    Decimal::new(num, scale)
}

/// A realistic dataset with one validated quarter per table.
pub fn sample_dataset() -> FinancialDataset {
    FinancialDataset {
        eps: vec![EpsRow {
            quarter: "2025Q1".to_string(),
            eps: d(62, 2),
            quarterly_growth: d(-882, 2),
            yearly_growth: d(-2619, 2),
            avg_price: Some(d(4286, 2)),
        }],
        revenue: vec![RevenueRow {
            quarter: "2025Q1".to_string(),
            revenue: d(57_858_957, 0),
            quarterly_growth: d(-418, 2),
            yearly_growth: d(591, 2),
        }],
        income: vec![IncomeRow {
            quarter: "2025Q1".to_string(),
            revenue: d(57_858_957, 0),
            gross_profit: d(15_446_645, 0),
            operating_income: d(9_785_901, 0),
            net_income: d(7_743_239, 0),
        }],
        balance: vec![BalanceRow {
            quarter: "2024Q4".to_string(),
            total_assets: d(1000, 0),
            total_liabilities: d(450, 0),
            equity: d(550, 0),
        }],
    }
}

/// A complete context for UMC with news, financial data, and sources.
pub fn sample_context() -> ReportContext {
    let mut ctx = ReportContext::new(Subject::new("UMC", "2303"));
    ctx.intent = "stock analysis".to_string();
    ctx.time_window = "last 7 days".to_string();
    ctx.query = Some("How is UMC doing lately?".to_string());
    ctx.news_summary = "UMC shares slipped as mature-node foundry pricing softened and foreign \
                        investors sold."
        .to_string();
    ctx.news_sources = vec![
        SourceRecord::new("UMC slips on pricing worries", "https://tw.stock.yahoo.com/news/umc-1"),
        SourceRecord::new("Foreign investors trim foundry stakes", "https://news.cnyes.com/news/id/5501"),
        SourceRecord::new("UMC keeps dividend steady", "https://www.cmoney.tw/notes/note-detail.aspx?nid=42"),
    ];
    ctx.financial = Some(sample_dataset());
    ctx.financial_sources = vec![FinancialSource {
        title: None,
        name: "Goodinfo".to_string(),
        url: "https://goodinfo.tw/tw/StockFinDetail.asp?STOCK_ID=2303".to_string(),
    }];
    ctx
}

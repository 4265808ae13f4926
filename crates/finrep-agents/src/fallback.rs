//! Deterministic section content used whenever a stage cannot produce its own.
//!
//! Every builder here is a pure function of the report context, so a run with
//! every oracle call failing still yields a schema-complete report.

use finrep_models::{
    dedup_by_link, site_name, Card, DataTable, FinancialDataset, ReportContext, Section,
    SectionContent, SectionKind, SourceRecord, Tab,
};
use rust_decimal::Decimal;

/// Default cap on the sources section.
pub const DEFAULT_MAX_SOURCES: usize = 10;

pub const STANDARD_DISCLAIMER: &str = "This report is generated automatically from public \
     news and financial data for informational purposes only. It does not constitute investment \
     advice or a recommendation to buy or sell any security. Data may be delayed, incomplete or \
     inaccurate. Investors should make their own judgment and bear their own risk.";

pub const INSTITUTIONAL_COLUMNS: [&str; 5] =
    ["Date", "Foreign", "Investment Trust", "Dealer", "Total"];

pub const EPS_COLUMNS: [&str; 5] = ["Quarter", "EPS", "QoQ %", "YoY %", "Avg Price"];
pub const REVENUE_COLUMNS: [&str; 4] = ["Quarter", "Revenue (thousands)", "QoQ %", "YoY %"];
pub const MARGIN_COLUMNS: [&str; 4] = ["Quarter", "Revenue", "Gross Profit", "Gross Margin %"];
pub const DEBT_COLUMNS: [&str; 4] = ["Quarter", "Total Assets", "Total Liabilities", "Debt Ratio %"];

pub const STRATEGY_HORIZONS: [&str; 4] = ["Intraday", "Short Term", "Mid Term", "Long Term"];
pub const SENTIMENT_CARDS: [&str; 3] = ["Discussion Heat", "Sentiment Mix", "Hot Topics"];

const PLACEHOLDER: &str = "N/A";

/// Providers listed when the context carries no usable source.
pub fn default_providers(ctx: &ReportContext) -> Vec<SourceRecord> {
    let ticker = ctx.subject.ticker.trim();
    vec![
        SourceRecord::new(
            "Yahoo Finance",
            format!("https://tw.stock.yahoo.com/quote/{ticker}"),
        ),
        SourceRecord::new(
            "CMoney",
            format!("https://www.cmoney.tw/forum/stock/{ticker}"),
        ),
        SourceRecord::new(
            "Anue",
            format!("https://www.cnyes.com/twstock/{ticker}"),
        ),
    ]
}

/// Candidate sources: news (titled with their publisher) then financial sources,
/// deduplicated by link and capped.
pub fn source_candidates(ctx: &ReportContext, max_sources: usize) -> Vec<SourceRecord> {
    let news = ctx.news_sources.iter().map(|s| {
        let site = site_name(&s.link);
        let title = s.title.trim();
        if title.is_empty() {
            SourceRecord::new(site, s.link.clone())
        } else {
            SourceRecord::new(format!("{title} - {site}"), s.link.clone())
        }
    });
    let financial = ctx.financial_sources.iter().map(SourceRecord::from);

    let mut candidates = dedup_by_link(news.chain(financial).filter(|s| !s.link.trim().is_empty()));
    candidates.truncate(max_sources.max(1));
    candidates
}

pub fn fallback_section(kind: SectionKind, ctx: &ReportContext, max_sources: usize) -> Section {
    let content = match kind {
        SectionKind::PriceMovement => price_movement(ctx),
        SectionKind::InstitutionalTrend => institutional(ctx),
        SectionKind::FinancialAnalysis => financial(ctx),
        SectionKind::Strategy => strategy(ctx),
        SectionKind::Sentiment => sentiment(ctx),
        SectionKind::Notices => notices(ctx),
        SectionKind::Sources => sources(ctx, max_sources),
        SectionKind::Disclaimer => SectionContent::Disclaimer {
            text: STANDARD_DISCLAIMER.to_string(),
        },
    };
    Section::new(kind, content)
}

fn card(title: &str, text: String) -> Card {
    Card {
        title: title.to_string(),
        text,
        sources: Vec::new(),
    }
}

fn window(ctx: &ReportContext) -> &str {
    let w = ctx.time_window.trim();
    if w.is_empty() {
        "the recent period"
    } else {
        w
    }
}

fn excerpt(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    match trimmed.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

fn price_movement(ctx: &ReportContext) -> SectionContent {
    let subject = ctx.subject.display();
    let drivers = if ctx.news_summary.trim().is_empty() {
        format!("No news coverage of {subject} was available for {}.", window(ctx))
    } else {
        excerpt(&ctx.news_summary, 200)
    };
    SectionContent::CardList {
        items: vec![
            card(
                "Price Action",
                format!("A price movement summary for {subject} over {} is not available right now.", window(ctx)),
            ),
            card(
                "Volume & Momentum",
                "Volume and momentum readings could not be generated. Check a live quote before trading.".to_string(),
            ),
            card("Key Drivers", drivers),
        ],
    }
}

fn institutional(ctx: &ReportContext) -> SectionContent {
    let mut table = DataTable::new(&INSTITUTIONAL_COLUMNS);
    table.push_row(vec![PLACEHOLDER.to_string(); INSTITUTIONAL_COLUMNS.len()]);
    SectionContent::Table {
        summary: format!(
            "Institutional investor flows for {} over {} are not available.",
            ctx.subject.display(),
            window(ctx)
        ),
        table,
    }
}

fn fmt_decimal(value: Decimal) -> String {
    value.normalize().to_string()
}

fn fmt_optional(value: Option<Decimal>) -> String {
    value.map(fmt_decimal).unwrap_or_else(|| PLACEHOLDER.to_string())
}

fn finish_table(mut table: DataTable) -> DataTable {
    if table.rows.is_empty() {
        let width = table.columns.len();
        table.push_row(vec![PLACEHOLDER.to_string(); width]);
    }
    table
}

/// Tables for the four financial tabs, in tab order. Malformed or absent data
/// yields one placeholder row per table.
pub fn financial_tables(dataset: Option<&FinancialDataset>) -> [DataTable; 4] {
    let mut eps = DataTable::new(&EPS_COLUMNS);
    let mut revenue = DataTable::new(&REVENUE_COLUMNS);
    let mut margin = DataTable::new(&MARGIN_COLUMNS);
    let mut debt = DataTable::new(&DEBT_COLUMNS);

    if let Some(data) = dataset.filter(|d| d.validate().is_ok()) {
        for row in &data.eps {
            eps.push_row(vec![
                row.quarter.clone(),
                fmt_decimal(row.eps),
                fmt_decimal(row.quarterly_growth),
                fmt_decimal(row.yearly_growth),
                fmt_optional(row.avg_price),
            ]);
        }
        for row in &data.revenue {
            revenue.push_row(vec![
                row.quarter.clone(),
                fmt_decimal(row.revenue),
                fmt_decimal(row.quarterly_growth),
                fmt_decimal(row.yearly_growth),
            ]);
        }
        for row in &data.income {
            margin.push_row(vec![
                row.quarter.clone(),
                fmt_decimal(row.revenue),
                fmt_decimal(row.gross_profit),
                fmt_optional(row.gross_margin()),
            ]);
        }
        for row in &data.balance {
            debt.push_row(vec![
                row.quarter.clone(),
                fmt_decimal(row.total_assets),
                fmt_decimal(row.total_liabilities),
                fmt_optional(row.debt_ratio()),
            ]);
        }
    }

    [
        finish_table(eps),
        finish_table(revenue),
        finish_table(margin),
        finish_table(debt),
    ]
}

pub const FINANCIAL_TABS: [&str; 4] = ["EPS", "Revenue", "Gross Margin", "Debt Ratio"];

/// Assemble the financial tab list from per-tab commentary.
pub fn financial_tabs(dataset: Option<&FinancialDataset>, texts: [String; 4]) -> SectionContent {
    let items = FINANCIAL_TABS
        .iter()
        .zip(financial_tables(dataset))
        .zip(texts)
        .map(|((label, table), text)| Tab {
            label: label.to_string(),
            text,
            table,
        })
        .collect();
    SectionContent::TabList { items }
}

fn financial(ctx: &ReportContext) -> SectionContent {
    let dataset = ctx.financial.as_ref();
    let usable = dataset.is_some_and(|d| d.validate().is_ok());
    let text = if usable {
        "Figures are shown without commentary.".to_string()
    } else {
        format!("Financial data for {} is not available.", ctx.subject.display())
    };
    financial_tabs(dataset, std::array::from_fn(|_| text.clone()))
}

fn strategy(ctx: &ReportContext) -> SectionContent {
    let subject = ctx.subject.display();
    let texts = [
        "Avoid chasing intraday swings without a live quote and a defined stop.".to_string(),
        format!("Wait for confirmation of the {subject} trend before adding exposure."),
        "Revisit the position after the next quarterly results.".to_string(),
        "Long-term allocation should follow fundamentals and your own risk tolerance.".to_string(),
    ];
    SectionContent::CardList {
        items: STRATEGY_HORIZONS
            .iter()
            .zip(texts)
            .map(|(title, text)| card(title, text))
            .collect(),
    }
}

fn sentiment(ctx: &ReportContext) -> SectionContent {
    let subject = ctx.subject.display();
    SectionContent::CardList {
        items: vec![
            card(
                SENTIMENT_CARDS[0],
                format!("Discussion volume for {subject} could not be measured."),
            ),
            card(
                SENTIMENT_CARDS[1],
                "The bullish and bearish balance is unknown; treat sentiment as neutral.".to_string(),
            ),
            card(
                SENTIMENT_CARDS[2],
                "No trending topics were identified.".to_string(),
            ),
        ],
    }
}

fn notices(ctx: &ReportContext) -> SectionContent {
    let subject = ctx.subject.display();
    SectionContent::BulletList {
        items: vec![
            format!("Confirm the latest price of {subject} before placing an order."),
            "Set a stop-loss level and respect it.".to_string(),
            "Keep any single position to a small share of the portfolio.".to_string(),
            "Watch for upcoming earnings releases and ex-dividend dates.".to_string(),
            "Institutional flows can reverse quickly; do not rely on one day of data.".to_string(),
            "Market-wide events can override company-specific news.".to_string(),
        ],
    }
}

fn sources(ctx: &ReportContext, max_sources: usize) -> SectionContent {
    let candidates = source_candidates(ctx, max_sources);
    let items = if candidates.is_empty() {
        default_providers(ctx)
    } else {
        candidates
    };
    SectionContent::SourceList { items }
}

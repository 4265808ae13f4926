use serde::{Deserialize, Serialize};

use crate::source::SourceRecord;

/// The eight report sections, declared in canonical report order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    PriceMovement,
    InstitutionalTrend,
    FinancialAnalysis,
    Strategy,
    Sentiment,
    Notices,
    Sources,
    Disclaimer,
}

impl SectionKind {
    /// Every section kind in canonical order.
    pub const ALL: [SectionKind; 8] = [
        SectionKind::PriceMovement,
        SectionKind::InstitutionalTrend,
        SectionKind::FinancialAnalysis,
        SectionKind::Strategy,
        SectionKind::Sentiment,
        SectionKind::Notices,
        SectionKind::Sources,
        SectionKind::Disclaimer,
    ];

    pub const COUNT: usize = Self::ALL.len();

    /// Stage name used in logs and prompts.
    pub fn stage_name(&self) -> &'static str {
        match self {
            SectionKind::PriceMovement => "price_movement",
            SectionKind::InstitutionalTrend => "institutional_trend",
            SectionKind::FinancialAnalysis => "financial_analysis",
            SectionKind::Strategy => "strategy",
            SectionKind::Sentiment => "sentiment",
            SectionKind::Notices => "notices",
            SectionKind::Sources => "sources",
            SectionKind::Disclaimer => "disclaimer",
        }
    }

    /// Display title of the section.
    pub fn title(&self) -> &'static str {
        match self {
            SectionKind::PriceMovement => "Price Movement Summary",
            SectionKind::InstitutionalTrend => "Institutional Investor Trend",
            SectionKind::FinancialAnalysis => "Financial Analysis",
            SectionKind::Strategy => "Investment Strategy",
            SectionKind::Sentiment => "Community Sentiment",
            SectionKind::Notices => "Trading Notices",
            SectionKind::Sources => "Sources",
            SectionKind::Disclaimer => "Disclaimer",
        }
    }

    /// Position in the canonical order.
    pub fn position(&self) -> usize {
        *self as usize
    }

    /// Whether this stage consumes the financial stage's validated output.
    pub fn depends_on_financial(&self) -> bool {
        matches!(self, SectionKind::Strategy | SectionKind::Notices)
    }
}

impl std::fmt::Display for SectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.stage_name())
    }
}

/// One titled block of the final report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Section {
    pub kind: SectionKind,
    pub title: String,
    pub content: SectionContent,
}

impl Section {
    pub fn new(kind: SectionKind, content: SectionContent) -> Self {
        Self {
            kind,
            title: kind.title().to_string(),
            content,
        }
    }
}

/// Typed payload of a section, discriminated by `variant`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "variant", rename_all = "snake_case")]
pub enum SectionContent {
    CardList { items: Vec<Card> },
    TabList { items: Vec<Tab> },
    BulletList { items: Vec<String> },
    SourceList { items: Vec<SourceRecord> },
    Disclaimer { text: String },
    Table { summary: String, table: DataTable },
}

impl SectionContent {
    pub fn variant_name(&self) -> &'static str {
        match self {
            SectionContent::CardList { .. } => "card_list",
            SectionContent::TabList { .. } => "tab_list",
            SectionContent::BulletList { .. } => "bullet_list",
            SectionContent::SourceList { .. } => "source_list",
            SectionContent::Disclaimer { .. } => "disclaimer",
            SectionContent::Table { .. } => "table",
        }
    }

    /// Number of top-level items; a disclaimer counts as one.
    pub fn len(&self) -> usize {
        match self {
            SectionContent::CardList { items } => items.len(),
            SectionContent::TabList { items } => items.len(),
            SectionContent::BulletList { items } => items.len(),
            SectionContent::SourceList { items } => items.len(),
            SectionContent::Disclaimer { text } => usize::from(!text.is_empty()),
            SectionContent::Table { table, .. } => table.rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Card {
    pub title: String,
    pub text: String,
    #[serde(default)]
    pub sources: Vec<SourceRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tab {
    pub label: String,
    pub text: String,
    pub table: DataTable,
}

/// A column-labelled table of display strings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DataTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl DataTable {
    pub fn new(columns: &[&str]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row; rows shorter than the header are padded with "N/A".
    pub fn push_row(&mut self, cells: Vec<String>) {
        let mut cells = cells;
        cells.truncate(self.columns.len());
        while cells.len() < self.columns.len() {
            cells.push("N/A".to_string());
        }
        self.rows.push(cells);
    }
}

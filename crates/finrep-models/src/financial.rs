use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Canonical financial dataset handed to the pipeline.
///
/// Every table is ordered latest quarter first. Conversion from upstream provider
/// formats happens before a `ReportContext` is built.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FinancialDataset {
    #[serde(default)]
    pub eps: Vec<EpsRow>,
    #[serde(default)]
    pub revenue: Vec<RevenueRow>,
    #[serde(default)]
    pub income: Vec<IncomeRow>,
    #[serde(default)]
    pub balance: Vec<BalanceRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EpsRow {
    pub quarter: String,
    pub eps: Decimal,
    /// Quarter-over-quarter growth in percent.
    pub quarterly_growth: Decimal,
    /// Year-over-year growth in percent.
    pub yearly_growth: Decimal,
    #[serde(default)]
    pub avg_price: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RevenueRow {
    pub quarter: String,
    /// Revenue in thousands of the reporting currency.
    pub revenue: Decimal,
    pub quarterly_growth: Decimal,
    pub yearly_growth: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IncomeRow {
    pub quarter: String,
    pub revenue: Decimal,
    pub gross_profit: Decimal,
    pub operating_income: Decimal,
    pub net_income: Decimal,
}

impl IncomeRow {
    /// Gross margin in percent.
    pub fn gross_margin(&self) -> Option<Decimal> {
        percent_of(self.gross_profit, self.revenue)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BalanceRow {
    pub quarter: String,
    pub total_assets: Decimal,
    pub total_liabilities: Decimal,
    pub equity: Decimal,
}

impl BalanceRow {
    /// Liabilities over assets in percent.
    pub fn debt_ratio(&self) -> Option<Decimal> {
        percent_of(self.total_liabilities, self.total_assets)
    }
}

/// `None` when `whole` is not positive or the ratio does not fit a `Decimal`.
fn percent_of(part: Decimal, whole: Decimal) -> Option<Decimal> {
    if whole <= Decimal::ZERO {
        return None;
    }
    part.checked_div(whole)?
        .checked_mul(Decimal::ONE_HUNDRED)
        .map(|ratio| ratio.round_dp(1))
}

/// Why a dataset cannot be used to build the financial tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetProblem {
    Empty,
    NonPositiveRevenue { quarter: String },
    NonPositiveAssets { quarter: String },
}

impl std::fmt::Display for DatasetProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatasetProblem::Empty => write!(f, "financial dataset has no rows"),
            DatasetProblem::NonPositiveRevenue { quarter } => {
                write!(f, "income revenue for {quarter} is not positive")
            }
            DatasetProblem::NonPositiveAssets { quarter } => {
                write!(f, "total assets for {quarter} are not positive")
            }
        }
    }
}

impl FinancialDataset {
    pub fn is_empty(&self) -> bool {
        self.eps.is_empty()
            && self.revenue.is_empty()
            && self.income.is_empty()
            && self.balance.is_empty()
    }

    /// Check the dataset can be rendered without guessing.
    pub fn validate(&self) -> Result<(), DatasetProblem> {
        if self.is_empty() {
            return Err(DatasetProblem::Empty);
        }
        if let Some(row) = self.income.iter().find(|r| r.revenue <= Decimal::ZERO) {
            return Err(DatasetProblem::NonPositiveRevenue {
                quarter: row.quarter.clone(),
            });
        }
        if let Some(row) = self.balance.iter().find(|r| r.total_assets <= Decimal::ZERO) {
            return Err(DatasetProblem::NonPositiveAssets {
                quarter: row.quarter.clone(),
            });
        }
        Ok(())
    }

    pub fn scores(&self) -> FinancialScores {
        FinancialScores::from_dataset(self)
    }

    /// One-paragraph summary of the latest quarter, used in prompts.
    pub fn latest_summary(&self) -> String {
        let mut parts = Vec::new();
        if let Some(eps) = self.eps.first() {
            parts.push(format!(
                "Latest EPS ({}) {} with {}% QoQ and {}% YoY.",
                eps.quarter, eps.eps, eps.quarterly_growth, eps.yearly_growth
            ));
        }
        if let Some(rev) = self.revenue.first() {
            parts.push(format!(
                "Latest revenue ({}) {} thousand with {}% QoQ and {}% YoY.",
                rev.quarter, rev.revenue, rev.quarterly_growth, rev.yearly_growth
            ));
        }
        if let Some(margin) = self.income.first().and_then(IncomeRow::gross_margin) {
            parts.push(format!("Gross margin {margin}%."));
        }
        if let Some(ratio) = self.balance.first().and_then(BalanceRow::debt_ratio) {
            parts.push(format!("Debt ratio {ratio}%."));
        }
        parts.join(" ")
    }
}

/// Heuristic 0-100 scores derived from the latest quarter.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FinancialScores {
    pub eps_score: u8,
    pub revenue_score: u8,
    pub margin_score: u8,
    pub overall_score: u8,
}

impl FinancialScores {
    pub fn from_dataset(dataset: &FinancialDataset) -> Self {
        let eps_score = dataset.eps.first().map(eps_score).unwrap_or(0);
        let revenue_score = dataset.revenue.first().map(revenue_score).unwrap_or(0);
        let margin_score = dataset
            .income
            .first()
            .and_then(IncomeRow::gross_margin)
            .map(margin_score)
            .unwrap_or(0);

        let overall =
            (u16::from(eps_score) + u16::from(revenue_score) + u16::from(margin_score)) / 3;

        Self {
            eps_score,
            revenue_score,
            margin_score,
            overall_score: overall as u8,
        }
    }
}

fn eps_score(row: &EpsRow) -> u8 {
    let eps = row.eps.to_f64().unwrap_or_default();
    let absolute = if eps > 2.0 {
        40
    } else if eps > 1.0 {
        30
    } else if eps > 0.5 {
        20
    } else {
        10
    };
    let mut growth = 0;
    if row.quarterly_growth > Decimal::ZERO {
        growth += 15;
    }
    if row.yearly_growth > Decimal::ZERO {
        growth += 15;
    }
    absolute + growth
}

fn revenue_score(row: &RevenueRow) -> u8 {
    let qoq = row.quarterly_growth.to_f64().unwrap_or_default();
    let yoy = row.yearly_growth.to_f64().unwrap_or_default();
    let mut score = 0;
    if qoq > 5.0 {
        score += 50;
    } else if qoq > 0.0 {
        score += 30;
    } else if qoq > -5.0 {
        score += 10;
    }
    if yoy > 10.0 {
        score += 50;
    } else if yoy > 5.0 {
        score += 30;
    } else if yoy > 0.0 {
        score += 10;
    }
    score
}

fn margin_score(margin: Decimal) -> u8 {
    match margin.to_f64().unwrap_or_default() {
        m if m > 50.0 => 100,
        m if m > 30.0 => 80,
        m if m > 20.0 => 60,
        m if m > 10.0 => 40,
        _ => 20,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    pub fn sample_dataset() -> FinancialDataset {
        FinancialDataset {
            eps: vec![
                EpsRow {
                    quarter: "2025Q1".to_string(),
                    eps: dec!(0.62),
                    quarterly_growth: dec!(-8.82),
                    yearly_growth: dec!(-26.19),
                    avg_price: Some(dec!(42.86)),
                },
                EpsRow {
                    quarter: "2024Q4".to_string(),
                    eps: dec!(0.68),
                    quarterly_growth: dec!(-41.38),
                    yearly_growth: dec!(-36.45),
                    avg_price: Some(dec!(51.00)),
                },
            ],
            revenue: vec![RevenueRow {
                quarter: "2025Q1".to_string(),
                revenue: dec!(57858957),
                quarterly_growth: dec!(-4.18),
                yearly_growth: dec!(5.91),
            }],
            income: vec![IncomeRow {
                quarter: "2025Q1".to_string(),
                revenue: dec!(57858957),
                gross_profit: dec!(15446645),
                operating_income: dec!(9785901),
                net_income: dec!(7743239),
            }],
            balance: vec![BalanceRow {
                quarter: "2024Q4".to_string(),
                total_assets: dec!(1000),
                total_liabilities: dec!(450),
                equity: dec!(550),
            }],
        }
    }

    #[test]
    fn derived_ratios() {
        let data = sample_dataset();
        assert_eq!(data.income[0].gross_margin(), Some(dec!(26.7)));
        assert_eq!(data.balance[0].debt_ratio(), Some(dec!(45.0)));
    }

    #[test]
    fn scores_follow_latest_quarter() {
        let scores = sample_dataset().scores();
        // eps 0.62 -> 20, no growth
        assert_eq!(scores.eps_score, 20);
        // qoq -4.18 -> 10, yoy 5.91 -> 30
        assert_eq!(scores.revenue_score, 40);
        // margin 26.7 -> 60
        assert_eq!(scores.margin_score, 60);
        assert_eq!(scores.overall_score, 40);
    }

    #[test]
    fn validate_rejects_empty_and_zero_denominators() {
        assert_eq!(
            FinancialDataset::default().validate(),
            Err(DatasetProblem::Empty)
        );

        let mut data = sample_dataset();
        data.balance[0].total_assets = Decimal::ZERO;
        assert!(matches!(
            data.validate(),
            Err(DatasetProblem::NonPositiveAssets { .. })
        ));

        assert!(sample_dataset().validate().is_ok());
    }

    #[test]
    fn oversized_ratios_are_unavailable() {
        let mut data = sample_dataset();
        data.income[0].revenue = Decimal::ONE;
        data.income[0].gross_profit = Decimal::MAX;
        data.balance[0].total_assets = Decimal::ONE;
        data.balance[0].total_liabilities = Decimal::MAX;
        assert!(data.validate().is_ok());

        assert_eq!(data.income[0].gross_margin(), None);
        assert_eq!(data.balance[0].debt_ratio(), None);
        assert_eq!(data.scores().margin_score, 0);
        assert!(!data.latest_summary().contains("Gross margin"));
    }

    #[test]
    fn summary_mentions_latest_values() {
        let summary = sample_dataset().latest_summary();
        assert!(summary.contains("2025Q1"));
        assert!(summary.contains("0.62"));
        assert!(summary.contains("Gross margin 26.7%"));
    }

    #[test]
    fn dataset_from_json_with_missing_tables() {
        let json = r#"{"eps": [{"quarter": "2025Q1", "eps": "1.5", "quarterly_growth": "3.2", "yearly_growth": "-1.0"}]}"#;
        let data: FinancialDataset = serde_json::from_str(json).unwrap();
        assert_eq!(data.eps.len(), 1);
        assert!(data.revenue.is_empty());
        assert_eq!(data.eps[0].avg_price, None);
    }
}

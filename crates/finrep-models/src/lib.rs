pub mod config;
pub mod context;
pub mod financial;
pub mod report;
pub mod section;
pub mod source;

pub use config::{ExecutionMode, OracleConfig, PipelineConfig, ReportConfig, RetryConfig};
pub use context::{MissingField, ReportContext, Subject};
pub use financial::{
    BalanceRow, DatasetProblem, EpsRow, FinancialDataset, FinancialScores, IncomeRow, RevenueRow,
};
pub use report::{PipelineResult, StageLog, StageOutcome, CONTEXT_STAGE, PARAPHRASE_STAGE};
pub use section::{Card, DataTable, Section, SectionContent, SectionKind, Tab};
pub use source::{dedup_by_link, normalize_link, site_name, FinancialSource, SourceRecord};

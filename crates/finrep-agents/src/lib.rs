pub mod aggregator;
pub mod attribution;
pub mod claude_cli;
pub mod error;
pub mod fallback;
pub mod generator;
pub mod generators;
pub mod oracle;
pub mod orchestrator;
pub mod parser;
pub mod prompts;
pub mod retry;

pub mod test_support;

pub use aggregator::aggregate;
pub use attribution::{attribute, Attribution};
pub use claude_cli::{ClaudeCliConfig, ClaudeCliOracle};
pub use error::ReportError;
pub use generator::{PriorOutputs, SectionGenerator, StageOutput, StageRuntime};
pub use generators::default_generators;
pub use oracle::{GenerationOracle, Prompt};
pub use orchestrator::Pipeline;
pub use retry::RetryPolicy;

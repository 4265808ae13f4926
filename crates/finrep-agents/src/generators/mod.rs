//! The eight section generators, one per report slot.

mod disclaimer;
mod financial;
mod institutional;
mod notice;
mod price_movement;
mod sentiment;
mod sources;
mod strategy;

use std::sync::Arc;

use finrep_models::{Card, SourceRecord};

use crate::attribution::attribute;
use crate::error::ReportError;
use crate::generator::SectionGenerator;

pub use disclaimer::DisclaimerGenerator;
pub use financial::FinancialGenerator;
pub use institutional::InstitutionalGenerator;
pub use notice::NoticeGenerator;
pub use price_movement::PriceMovementGenerator;
pub use sentiment::SentimentGenerator;
pub use sources::SourcesGenerator;
pub use strategy::StrategyGenerator;

/// One generator per section kind, in canonical order.
pub fn default_generators() -> Vec<Arc<dyn SectionGenerator>> {
    vec![
        Arc::new(PriceMovementGenerator),
        Arc::new(InstitutionalGenerator),
        Arc::new(FinancialGenerator),
        Arc::new(StrategyGenerator),
        Arc::new(SentimentGenerator),
        Arc::new(NoticeGenerator),
        Arc::new(SourcesGenerator),
        Arc::new(DisclaimerGenerator),
    ]
}

/// Trimmed `value`, or a `Malformed` error naming `field` when blank.
pub(crate) fn required(field: &str, value: &str) -> Result<String, ReportError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ReportError::Malformed(format!("{field} is empty")));
    }
    Ok(trimmed.to_string())
}

/// Build a card whose text is attributed against `sources`.
pub(crate) fn attributed_card(title: &str, text: &str, sources: &[SourceRecord]) -> Card {
    let attribution = attribute(text, sources);
    Card {
        title: title.to_string(),
        text: attribution.text,
        sources: attribution.used_sources,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use finrep_models::SectionKind;

    #[test]
    fn default_generators_cover_every_kind_in_order() {
        let kinds: Vec<SectionKind> = default_generators().iter().map(|g| g.kind()).collect();
        assert_eq!(kinds, SectionKind::ALL.to_vec());
    }

    #[test]
    fn required_rejects_blank() {
        assert!(matches!(required("summary", "  "), Err(ReportError::Malformed(_))));
        assert_eq!(required("summary", " ok ").unwrap(), "ok");
    }
}

use finrep_models::{PipelineResult, ReportContext, Section, SectionKind, StageLog};

use crate::fallback::{fallback_section, DEFAULT_MAX_SOURCES};

/// Assemble the final result from stage sections.
///
/// Purely structural: sections are placed in canonical order (the first section
/// of each kind wins), any missing slot gets its fallback, and metadata comes from
/// `ctx`. Identical inputs always produce identical output.
pub fn aggregate(
    sections: &[Section],
    paraphrase: &str,
    logs: &[StageLog],
    ctx: &ReportContext,
) -> PipelineResult {
    let ordered = SectionKind::ALL
        .into_iter()
        .map(|kind| {
            sections
                .iter()
                .find(|s| s.kind == kind)
                .cloned()
                .unwrap_or_else(|| fallback_section(kind, ctx, DEFAULT_MAX_SOURCES))
        })
        .collect();

    PipelineResult {
        completed: true,
        request_id: ctx.request_id,
        subject: ctx.subject.clone(),
        intent: ctx.intent.clone(),
        time_window: ctx.time_window.clone(),
        sections: ordered,
        paraphrase: paraphrase.to_string(),
        logs: logs.to_vec(),
    }
}

use std::collections::HashMap;
use std::sync::OnceLock;

use finrep_models::SourceRecord;
use regex::Regex;
use tracing::debug;

/// Text with citation markers resolved, plus the sources it actually cites.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribution {
    pub text: String,
    pub used_sources: Vec<SourceRecord>,
}

fn marker_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)\[(?:來源|source\s*)?\s*(\d+)\]").expect("valid citation marker regex")
    })
}

/// Resolve citation markers in `text` against `sources`.
///
/// Markers are 1-based positions into `sources` written as `[N]`, `[source N]` or
/// `[來源N]`. In-range markers are rewritten to `[k]` where `k` is the position of the
/// cited source in `used_sources`; sources sharing a link share one `k`. Out-of-range
/// markers are dropped. With no sources the text comes back untouched.
pub fn attribute(text: &str, sources: &[SourceRecord]) -> Attribution {
    if sources.is_empty() {
        return Attribution {
            text: text.to_string(),
            used_sources: Vec::new(),
        };
    }

    let mut used_sources: Vec<SourceRecord> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for caps in marker_pattern().captures_iter(text) {
        let Some(marker) = caps.get(0) else {
            continue;
        };
        out.push_str(&text[last..marker.start()]);
        last = marker.end();

        let cited = caps[1]
            .parse::<usize>()
            .ok()
            .filter(|n| (1..=sources.len()).contains(n))
            .map(|n| &sources[n - 1]);

        match cited {
            Some(source) => {
                let k = *positions.entry(source.key()).or_insert_with(|| {
                    used_sources.push(source.clone());
                    used_sources.len()
                });
                out.push_str(&format!("[{k}]"));
            }
            None => {
                debug!(marker = marker.as_str(), available = sources.len(), "Dropping out-of-range citation");
                last = close_gap(&mut out, text, last);
            }
        }
    }
    out.push_str(&text[last..]);

    Attribution {
        text: out,
        used_sources,
    }
}

/// Remove the spaces a dropped marker leaves behind, touching only its neighbours.
/// Returns the offset in `text` to resume copying from.
fn close_gap(out: &mut String, text: &str, resume: usize) -> usize {
    let rest = &text[resume..];
    if out.is_empty() {
        return resume + (rest.len() - rest.trim_start_matches(' ').len());
    }
    let closes = match rest.chars().next() {
        None => true,
        Some(ch) => matches!(ch, ' ' | '.' | ',' | ';' | ':' | '。' | '，'),
    };
    if closes {
        out.truncate(out.trim_end_matches(' ').len());
    }
    resume
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_sources() -> Vec<SourceRecord> {
        vec![
            SourceRecord::new("Earnings call recap", "https://news.example.com/a"),
            SourceRecord::new("Foundry outlook", "https://news.example.com/b"),
            SourceRecord::new("Dividend notice", "https://news.example.com/c"),
        ]
    }

    #[test]
    fn renumbers_by_first_appearance() {
        let result = attribute("Margins held [3] while orders rose [1].", &three_sources());
        assert_eq!(result.text, "Margins held [1] while orders rose [2].");
        assert_eq!(result.used_sources[0].title, "Dividend notice");
        assert_eq!(result.used_sources[1].title, "Earnings call recap");
    }

    #[test]
    fn out_of_range_marker_is_dropped() {
        let result = attribute("Shares rallied [9].", &three_sources());
        assert_eq!(result.text, "Shares rallied.");
        assert!(result.used_sources.is_empty());
    }

    #[test]
    fn leading_marker_is_dropped_without_leading_space() {
        let result = attribute("[7] Volume spiked [2].", &three_sources());
        assert_eq!(result.text, "Volume spiked [1].");
    }

    #[test]
    fn spacing_away_from_dropped_markers_is_kept() {
        let text = "  Margins  held , orders rose [1] ; outlook [9] dim.";
        let result = attribute(text, &three_sources());
        assert_eq!(result.text, "  Margins  held , orders rose [1] ; outlook dim.");

        let untouched = attribute("Two  spaces , here [1] ", &three_sources());
        assert_eq!(untouched.text, "Two  spaces , here [1] ");
    }

    #[test]
    fn zero_marker_is_out_of_range() {
        let result = attribute("Flat session [0]", &three_sources());
        assert_eq!(result.text, "Flat session");
        assert!(result.used_sources.is_empty());
    }

    #[test]
    fn accepts_all_marker_styles() {
        let result = attribute("A [source 2], B [來源2], C [Source3].", &three_sources());
        assert_eq!(result.text, "A [1], B [1], C [2].");
        assert_eq!(result.used_sources.len(), 2);
    }

    #[test]
    fn duplicate_links_share_a_position() {
        let sources = vec![
            SourceRecord::new("First copy", "http://x"),
            SourceRecord::new("Second copy", "http://x/"),
        ];
        let result = attribute("one [1] two [2]", &sources);
        assert_eq!(result.text, "one [1] two [1]");
        assert_eq!(result.used_sources.len(), 1);
        assert_eq!(result.used_sources[0].title, "First copy");
    }

    #[test]
    fn no_sources_leaves_text_alone() {
        let text = "Volume spiked [1] [7].";
        let result = attribute(text, &[]);
        assert_eq!(result.text, text);
        assert!(result.used_sources.is_empty());
    }

    #[test]
    fn used_sources_are_subset_of_input() {
        let sources = three_sources();
        let result = attribute("[2] [2] [3] [4] [1]", &sources);
        for used in &result.used_sources {
            assert!(sources.contains(used));
        }
        assert_eq!(result.text, "[1] [1] [2] [3]");
    }
}

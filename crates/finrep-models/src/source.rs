use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use url::Url;

/// A citation attributable to generated content. Identity is the normalized link.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceRecord {
    pub title: String,
    pub link: String,
}

impl SourceRecord {
    pub fn new(title: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
        }
    }

    /// Key used for deduplication.
    pub fn key(&self) -> String {
        normalize_link(&self.link)
    }
}

/// A financial-data citation as supplied by the data provider adapter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FinancialSource {
    #[serde(default)]
    pub title: Option<String>,
    pub name: String,
    pub url: String,
}

impl From<&FinancialSource> for SourceRecord {
    fn from(source: &FinancialSource) -> Self {
        let title = source
            .title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(&source.name);
        SourceRecord::new(title, source.url.clone())
    }
}

/// Normalize a link for identity comparison.
///
/// Parsable URLs get their scheme and host lower-cased (by `url`), the fragment
/// dropped, and trailing slashes trimmed. Anything else is compared trimmed.
pub fn normalize_link(link: &str) -> String {
    let trimmed = link.trim();
    match Url::parse(trimmed) {
        Ok(mut url) => {
            url.set_fragment(None);
            url.as_str().trim_end_matches('/').to_string()
        }
        Err(_) => trimmed.trim_end_matches('/').to_string(),
    }
}

/// Remove later duplicates (by normalized link), keeping first-appearance order.
pub fn dedup_by_link(sources: impl IntoIterator<Item = SourceRecord>) -> Vec<SourceRecord> {
    let mut seen = HashSet::new();
    sources
        .into_iter()
        .filter(|s| seen.insert(s.key()))
        .collect()
}

/// Display name of the publisher behind a link.
///
/// Known finance sites map to their common names; others fall back to the host
/// without a leading `www.`.
pub fn site_name(link: &str) -> String {
    const KNOWN_SITES: &[(&str, &str)] = &[
        ("yahoo.com", "Yahoo Finance"),
        ("cmoney.tw", "CMoney"),
        ("cnyes.com", "Anue"),
        ("moneydj.com", "MoneyDJ"),
        ("money.udn.com", "Economic Daily News"),
        ("ctee.com.tw", "Commercial Times"),
        ("ettoday.net", "ETtoday"),
        ("goodinfo.tw", "Goodinfo"),
        ("macromicro.me", "MacroMicro"),
        ("businessweekly.com.tw", "Business Weekly"),
        ("technews.tw", "TechNews"),
        ("nownews.com", "NOWnews"),
    ];

    let Ok(url) = Url::parse(link.trim()) else {
        return "Unknown site".to_string();
    };
    let Some(host) = url.host_str() else {
        return "Unknown site".to_string();
    };

    KNOWN_SITES
        .iter()
        .find(|(domain, _)| host == *domain || host.ends_with(&format!(".{domain}")))
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| host.trim_start_matches("www.").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_lowercases_host_and_trims() {
        assert_eq!(
            normalize_link("  HTTPS://Example.COM/News/1/#top "),
            "https://example.com/News/1"
        );
        assert_eq!(normalize_link("not a url/"), "not a url");
    }

    #[test]
    fn dedup_keeps_first_appearance() {
        let deduped = dedup_by_link(vec![
            SourceRecord::new("A", "http://x"),
            SourceRecord::new("B", "http://x/"),
            SourceRecord::new("C", "http://y"),
        ]);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].title, "A");
        assert_eq!(deduped[1].title, "C");
    }

    #[test]
    fn financial_source_title_falls_back_to_name() {
        let named = FinancialSource {
            title: None,
            name: "Yahoo Finance".to_string(),
            url: "https://finance.yahoo.com/quote/2303.TW".to_string(),
        };
        assert_eq!(SourceRecord::from(&named).title, "Yahoo Finance");

        let titled = FinancialSource {
            title: Some("Quarterly EPS".to_string()),
            ..named
        };
        assert_eq!(SourceRecord::from(&titled).title, "Quarterly EPS");
    }

    #[test]
    fn site_names() {
        assert_eq!(site_name("https://tw.finance.yahoo.com/news/1"), "Yahoo Finance");
        assert_eq!(site_name("https://www.cmoney.tw/notes/2"), "CMoney");
        assert_eq!(site_name("https://www.example.org/a"), "example.org");
        assert_eq!(site_name("no link"), "Unknown site");
    }
}

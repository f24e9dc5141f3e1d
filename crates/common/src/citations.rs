use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::OnceLock;

const DEFAULT_RELEVANCE: f64 = 0.8;

/// Sentence punctuation that `\S+` swallows after a URL
const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', ')', ']'];

/// A source referenced from a persona response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub title: String,
    pub url: String,
    pub relevance: f64,
}

/// A compiled citation pattern; `group` is the capture holding the URL
struct CitationPattern {
    regex: Regex,
    group: usize,
}

static PATTERNS: OnceLock<Vec<CitationPattern>> = OnceLock::new();

fn patterns() -> &'static [CitationPattern] {
    PATTERNS.get_or_init(|| {
        [
            (r"\[(\d+)\]:\s*(https?://\S+)", 2),
            (r"(?i)Source:\s*(https?://\S+)", 1),
            (r"(?i)Reference:\s*(https?://\S+)", 1),
            (r"(https?://\S+)", 1),
        ]
        .into_iter()
        .map(|(pattern, group)| CitationPattern {
            regex: Regex::new(pattern).expect("static pattern compiles"),
            group,
        })
        .collect()
    })
}

/// Extract cited URLs from a response.
///
/// Explicit forms (`[1]: url`, `Source: url`, `Reference: url`) are checked
/// before bare URLs; each URL is reported once, without trailing sentence
/// punctuation.
pub fn extract_citations(response: &str) -> Vec<Citation> {
    let mut seen = HashSet::new();
    let mut citations = Vec::new();

    for pattern in patterns() {
        for captures in pattern.regex.captures_iter(response) {
            let Some(url) = captures.get(pattern.group) else {
                continue;
            };
            let url = url.as_str().trim_end_matches(TRAILING_PUNCTUATION);
            if seen.insert(url.to_string()) {
                citations.push(Citation {
                    title: format!("Citation {}", citations.len() + 1),
                    url: url.to_string(),
                    relevance: DEFAULT_RELEVANCE,
                });
            }
        }
    }

    citations
}

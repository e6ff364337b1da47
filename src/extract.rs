// src/extract.rs
// Raw HTML -> bounded plain-text excerpt suitable for model input.

use scraper::{Html, Selector};

/// Character cap on the extracted excerpt. Keeps the model prompt within
/// a predictable context budget regardless of page size.
pub const MAX_EXCERPT_CHARS: usize = 12_000;

/// Elements whose text carries no analyzable business content.
const EXCLUDED_TAGS: &[&str] = &[
    "script", "style", "nav", "footer", "header", "iframe", "noscript",
];

/// Extract the visible body text of an HTML page.
///
/// Text under excluded elements is dropped, whitespace runs (including
/// newlines) collapse to single spaces, and the result is trimmed and
/// truncated to the first [`MAX_EXCERPT_CHARS`] characters. Returns an
/// empty string when the page has no readable content; the orchestrator
/// treats that as a terminal condition.
pub fn extract_readable_text(html: &str) -> String {
    let doc = Html::parse_document(html);
    let body_sel = Selector::parse("body").expect("static selector");

    let mut raw = String::new();
    if let Some(body) = doc.select(&body_sel).next() {
        for node in body.descendants() {
            let Some(text) = node.value().as_text() else {
                continue;
            };
            let excluded = node.ancestors().any(|a| {
                a.value()
                    .as_element()
                    .is_some_and(|e| EXCLUDED_TAGS.contains(&e.name()))
            });
            if !excluded {
                raw.push_str(text);
                raw.push(' ');
            }
        }
    }

    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.chars().take(MAX_EXCERPT_CHARS).collect()
}

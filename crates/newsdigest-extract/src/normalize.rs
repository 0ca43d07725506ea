//! Text normalization applied to every extraction candidate.

use std::sync::LazyLock;

use regex::Regex;

static HORIZONTAL_WS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t\r\f]+").expect("valid regex"));
static EXCESS_BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n\s*\n+").expect("valid regex"));
static BRACKET_ARTIFACT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[.*?\]").expect("valid regex"));
static PIPE_ARTIFACT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\|.*?\|").expect("valid regex"));
static QUOTED_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^>.*$").expect("valid regex"));
static BOILERPLATE_SENTENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)(Click here to view|This email was sent to|You received this|To unsubscribe).*$")
        .expect("valid regex")
});
static SEPARATOR_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*[*\-_=]{3,}\s*$").expect("valid regex"));
static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));
static ANY_TAG_MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));

/// Checks whether content looks like HTML rather than plain text.
#[must_use]
pub fn contains_html(content: &str) -> bool {
    content.to_lowercase().contains("<html") || ANY_TAG_MARKER.is_match(content)
}

/// Naive tag strip over the raw body, used by the quality-gate fallback.
#[must_use]
pub fn strip_tags(content: &str) -> String {
    HTML_TAG.replace_all(content, " ").into_owned()
}

/// Cleans and normalizes extracted text.
///
/// Collapses whitespace runs, caps consecutive blank lines, trims each line,
/// drops bracketed/pipe-delimited inline artifacts, quoted lines, common
/// boilerplate sentences, and punctuation-only separator lines.
#[must_use]
pub fn normalize(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let text = HORIZONTAL_WS.replace_all(text, " ");
    let text = EXCESS_BLANK_LINES.replace_all(&text, "\n\n");

    let text = text
        .split('\n')
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n");

    let text = BRACKET_ARTIFACT.replace_all(&text, "");
    let text = PIPE_ARTIFACT.replace_all(&text, "");
    let text = QUOTED_LINE.replace_all(&text, "");
    let text = BOILERPLATE_SENTENCE.replace_all(&text, "");
    let text = SEPARATOR_LINE.replace_all(&text, "");

    // Artifact removal can leave new blank-line runs behind.
    let text = EXCESS_BLANK_LINES.replace_all(&text, "\n\n");

    text.trim().to_string()
}

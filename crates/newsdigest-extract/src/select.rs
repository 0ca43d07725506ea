//! Main-content selection strategies.
//!
//! An ordered list of tagged selector groups, evaluated lazily: a later
//! strategy only runs when every earlier one failed to produce a candidate
//! that clears the content thresholds.

use std::collections::HashSet;

use ego_tree::NodeId;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::dom::visible_text;

/// Minimum visible characters for an accepted candidate.
const MIN_CHARS: usize = 100;

/// Minimum visible words for an accepted candidate.
///
/// The dual threshold keeps short captions that happen to match a selector
/// from being accepted as the main content.
const MIN_WORDS: usize = 15;

/// A selection strategy: one named group of structural selectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Strategy {
    /// Newsletter-specific containers (highest priority).
    NewsletterContainers,
    /// Generic content containers.
    GenericContent,
    /// Table-based layouts used by many email templates.
    TableLayouts,
    /// Nested container patterns.
    ContainerPatterns,
}

impl Strategy {
    /// All strategies, in evaluation order.
    pub(crate) const ALL: [Self; 4] = [
        Self::NewsletterContainers,
        Self::GenericContent,
        Self::TableLayouts,
        Self::ContainerPatterns,
    ];

    /// The selectors this strategy tries, in order.
    pub(crate) const fn selectors(self) -> &'static [&'static str] {
        match self {
            Self::NewsletterContainers => &[
                r#"[role="article"]"#,
                "article",
                ".article-content",
                ".newsletter-content",
                ".email-content",
                ".main-content",
                ".content-wrapper",
                ".email-body",
            ],
            Self::GenericContent => &[
                ".content",
                ".main",
                ".body",
                ".wrapper .content",
                r#"[role="main"]"#,
                "main",
                "#content",
                "#main",
            ],
            Self::TableLayouts => &[
                r#"table[role="presentation"] td"#,
                r#"table td[style*="padding"]"#,
                "table.email-container td",
                "table.newsletter td",
                "table[width] td",
            ],
            Self::ContainerPatterns => &[
                ".container .content",
                ".email-container .content",
                ".newsletter-container",
                ".email-wrapper .content",
            ],
        }
    }

    /// Tries this strategy against the document.
    ///
    /// Returns the first matched element whose visible text clears both
    /// thresholds, or `None`.
    pub(crate) fn find<'a>(
        self,
        doc: &'a Html,
        excluded: &HashSet<NodeId>,
    ) -> Option<ElementRef<'a>> {
        for raw in self.selectors() {
            let Ok(selector) = Selector::parse(raw) else {
                continue;
            };
            for candidate in doc.select(&selector) {
                if excluded.contains(&candidate.id()) {
                    continue;
                }
                let text = visible_text(candidate, excluded);
                if text.len() > MIN_CHARS && text.split_whitespace().count() > MIN_WORDS {
                    debug!(strategy = ?self, selector = raw, chars = text.len(), "selected main content");
                    return Some(candidate);
                }
            }
        }
        None
    }
}

/// Runs the full strategy chain.
pub(crate) fn select_main_content<'a>(
    doc: &'a Html,
    excluded: &HashSet<NodeId>,
) -> Option<ElementRef<'a>> {
    Strategy::ALL
        .into_iter()
        .find_map(|strategy| strategy.find(doc, excluded))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const LONG_BODY: &str = "The quick brown fox jumps over the lazy dog while seventeen \
        additional words pad this sentence out to comfortably clear both the character \
        minimum and the word minimum for content selection.";

    #[test]
    fn prefers_article_over_generic_content() {
        let html = format!(
            r#"<html><body>
                <div class="content">{LONG_BODY} generic</div>
                <article>{LONG_BODY} article</article>
            </body></html>"#
        );
        let doc = Html::parse_document(&html);
        let excluded = HashSet::new();

        let selected = select_main_content(&doc, &excluded).unwrap();
        let text = visible_text(selected, &excluded);
        assert!(text.contains("article"));
    }

    #[test]
    fn short_captions_are_rejected() {
        let doc = Html::parse_document(
            r#"<html><body><article>Too short.</article></body></html>"#,
        );
        let excluded = HashSet::new();
        assert!(select_main_content(&doc, &excluded).is_none());
    }

    #[test]
    fn word_count_alone_is_not_enough() {
        // Over 100 chars but only a handful of words would fail; conversely
        // many tiny words clearing 15 but not 100 chars must fail too.
        let doc = Html::parse_document(
            "<html><body><article>a b c d e f g h i j k l m n o p q r</article></body></html>",
        );
        let excluded = HashSet::new();
        assert!(select_main_content(&doc, &excluded).is_none());
    }

    #[test]
    fn table_layout_fallback() {
        let html = format!(
            r#"<html><body><table role="presentation"><tr><td>{LONG_BODY}</td></tr></table></body></html>"#
        );
        let doc = Html::parse_document(&html);
        let excluded = HashSet::new();

        let selected = select_main_content(&doc, &excluded).unwrap();
        assert_eq!(selected.value().name(), "td");
    }

    #[test]
    fn excluded_candidates_are_skipped() {
        let html = format!(r#"<html><body><article>{LONG_BODY}</article></body></html>"#);
        let doc = Html::parse_document(&html);

        let sel = Selector::parse("article").unwrap();
        let article = doc.select(&sel).next().unwrap();
        let mut excluded = HashSet::new();
        excluded.insert(article.id());

        assert!(select_main_content(&doc, &excluded).is_none());
    }
}

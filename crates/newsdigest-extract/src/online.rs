//! "View online" link detection.
//!
//! Many newsletters ship a stripped-down email body and link to a full web
//! version. When such a link is found, the fetched page usually extracts far
//! better than the email HTML. This is a best-effort enhancement: any
//! failure falls through silently to the regular pipeline.

use scraper::{Html, Selector};
use tracing::debug;

/// Link-text tokens that suggest an online version.
const TEXT_TOKENS: &[&str] = &["view", "browser", "online"];

/// Target-URL tokens that suggest an online version.
const HREF_TOKENS: &[&str] = &["view", "browser", "web", "newsletter", "email"];

/// Finds the first plausible "view online" link in the document.
///
/// A link qualifies when its visible text contains a text token, its href
/// contains an href token, and the href is absolute.
pub(crate) fn find_online_version(doc: &Html) -> Option<String> {
    let anchor = Selector::parse("a[href]").ok()?;

    for link in doc.select(&anchor) {
        let href = link.value().attr("href").unwrap_or("");
        let text = link.text().collect::<String>().trim().to_lowercase();

        let text_hit = TEXT_TOKENS.iter().any(|t| text.contains(t));
        let href_hit = HREF_TOKENS.iter().any(|t| href.contains(t));
        if text_hit && href_hit && (href.starts_with("http://") || href.starts_with("https://")) {
            debug!(url = href, "found online version link");
            return Some(href.to_string());
        }
    }
    None
}

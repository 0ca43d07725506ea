//! DOM pruning helpers.
//!
//! `scraper`'s DOM is immutable, so "removing" an element means recording its
//! node id in an exclusion set that later passes consult: visible-text
//! measurement and the filtered re-serialization both skip excluded subtrees.

use std::collections::HashSet;
use std::fmt::Write as _;
use std::sync::LazyLock;

use ego_tree::{NodeId, NodeRef};
use regex::Regex;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};

/// Elements that never carry content.
const NON_CONTENT_TAGS: &[&str] = &["script", "style", "noscript", "meta", "link"];

/// Case-insensitive substrings matched against class and id attributes.
const CRUFT_CLASS_TERMS: &[&str] = &[
    "unsubscribe",
    "footer",
    "social-links",
    "header-logo",
    "nav",
    "navigation",
    "sidebar",
    "advertisement",
    "ad",
    "promo",
    "sponsor",
    "banner",
    "tracking",
    "pixel",
    "beacon",
];

/// Anchor texts whose surrounding container is boilerplate.
const CRUFT_LINK_TEXTS: &[&str] = &[
    "unsubscribe",
    "manage preferences",
    "view in browser",
    "forward to a friend",
    "add to address book",
    "whitelist",
    "privacy policy",
    "terms",
    "contact us",
    "follow us",
    "like us",
    "tweet",
    "share",
    "facebook",
    "twitter",
    "linkedin",
    "instagram",
    "youtube",
    "update preferences",
    "email preferences",
];

static HIDDEN_STYLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)display\s*:\s*none|visibility\s*:\s*hidden").expect("valid regex")
});

/// Computes the set of structurally excluded nodes for a document.
///
/// Covers script/style/meta/link elements, 1px tracking pixels, elements
/// hidden by inline style, elements whose class or id matches the boilerplate
/// denylist, and the parent containers of cruft anchors (unsubscribe links
/// and friends).
pub(crate) fn excluded_nodes(doc: &Html) -> HashSet<NodeId> {
    let mut excluded = HashSet::new();

    for node in doc.root_element().descendants() {
        let Some(element) = ElementRef::wrap(node) else {
            continue;
        };
        let el = element.value();
        let tag = el.name();

        if NON_CONTENT_TAGS.contains(&tag) {
            excluded.insert(node.id());
            continue;
        }

        if tag == "img" && (el.attr("width") == Some("1") || el.attr("height") == Some("1")) {
            excluded.insert(node.id());
            continue;
        }

        if el.attr("style").is_some_and(|s| HIDDEN_STYLE.is_match(s)) {
            excluded.insert(node.id());
            continue;
        }

        let class_attr = el.attr("class").unwrap_or("").to_lowercase();
        let id_attr = el.attr("id").unwrap_or("").to_lowercase();
        if CRUFT_CLASS_TERMS
            .iter()
            .any(|term| class_attr.contains(term) || id_attr.contains(term))
        {
            excluded.insert(node.id());
            continue;
        }

        if tag == "a" {
            let link_text = element.text().collect::<String>().trim().to_lowercase();
            if CRUFT_LINK_TEXTS.iter().any(|cruft| link_text.contains(cruft)) {
                // Remove the parent container so the surrounding boilerplate
                // structure goes with the anchor.
                match node.parent().filter(|p| p.value().is_element()) {
                    Some(parent) => excluded.insert(parent.id()),
                    None => excluded.insert(node.id()),
                };
            }
        }
    }

    excluded
}

/// Adds the subtrees matched by `selectors` within `scope` to `excluded`.
pub(crate) fn exclude_selected(
    doc: &Html,
    scope: ElementRef<'_>,
    selectors: &[&str],
    excluded: &mut HashSet<NodeId>,
) {
    let scope_id = scope.id();
    for raw in selectors {
        let Ok(selector) = Selector::parse(raw) else {
            continue;
        };
        for matched in doc.select(&selector) {
            let in_scope = matched
                .ancestors()
                .any(|a| a.id() == scope_id)
                || matched.id() == scope_id;
            if in_scope {
                excluded.insert(matched.id());
            }
        }
    }
}

/// Collects the visible text of `element`, skipping excluded subtrees.
pub(crate) fn visible_text(element: ElementRef<'_>, excluded: &HashSet<NodeId>) -> String {
    let mut dead: HashSet<NodeId> = HashSet::new();
    let mut out = String::new();

    for node in element.descendants() {
        let id = node.id();
        let parent_dead = node.parent().is_some_and(|p| dead.contains(&p.id()));
        if parent_dead || excluded.contains(&id) {
            dead.insert(id);
            continue;
        }
        if let Node::Text(text) = node.value() {
            out.push_str(text);
            out.push(' ');
        }
    }

    out.trim().to_string()
}

/// Re-serializes `element` to HTML, omitting excluded subtrees.
///
/// The output only needs to be good enough for the text renderer, not
/// round-trip faithful: comments and doctypes are dropped, attributes are
/// emitted verbatim with minimal escaping.
pub(crate) fn serialize_excluding(element: ElementRef<'_>, excluded: &HashSet<NodeId>) -> String {
    let mut out = String::new();
    serialize_node(*element, excluded, &mut out);
    out
}

const VOID_TAGS: &[&str] = &["br", "hr", "img", "input", "area", "base", "col", "embed", "source", "track", "wbr"];

fn serialize_node(node: NodeRef<'_, Node>, excluded: &HashSet<NodeId>, out: &mut String) {
    if excluded.contains(&node.id()) {
        return;
    }

    match node.value() {
        Node::Element(el) => {
            let tag = el.name();
            out.push('<');
            out.push_str(tag);
            for (name, value) in el.attrs() {
                let _ = write!(out, " {name}=\"{}\"", escape_attr(value));
            }
            out.push('>');
            if !VOID_TAGS.contains(&tag) {
                for child in node.children() {
                    serialize_node(child, excluded, out);
                }
                let _ = write!(out, "</{tag}>");
            }
        }
        Node::Text(text) => out.push_str(&escape_text(text)),
        Node::Document | Node::Fragment => {
            for child in node.children() {
                serialize_node(child, excluded, out);
            }
        }
        _ => {}
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}

//! Markup serialization for extracted regions
//!
//! Walks a region's subtree and writes it back out as HTML, dropping page chrome
//! and rewriting image references to their mirrored copies. The region's own root
//! element is always kept, even when it would otherwise count as chrome.

use scraper::node::Element;
use scraper::{ElementRef, Node};
use std::collections::HashMap;

/// Elements removed wholesale from extracted regions
const CHROME_TAGS: &[&str] = &[
    "script", "style", "nav", "footer", "header", "aside", "noscript",
];

/// Class tokens marking decorative chrome
const CHROME_CLASSES: &[&str] = &[
    "nav",
    "navbar",
    "navigation",
    "menu",
    "article-info",
    "article-meta",
    "metadata",
    "meta",
    "pager",
    "icons",
];

/// Class prefix for breadcrumb trails (`breadcrumb`, `breadcrumbs`, ...)
const BREADCRUMB_PREFIX: &str = "breadcrumb";

/// Elements that never have a closing tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Attribute carrying the original absolute URL of a rewritten image
pub const ORIGINAL_SRC_ATTR: &str = "data-original-src";

/// How one `<img src>` value is rewritten
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRewrite {
    /// Local path written into `src`
    pub local: String,
    /// Absolute URL kept in `data-original-src`
    pub original: String,
}

/// Rewrites keyed by the raw `src` attribute value as it appears in the page
pub type Rewrites = HashMap<String, ImageRewrite>;

/// Returns true if the element is navigation, metadata or other chrome
pub fn is_chrome(element: &Element) -> bool {
    if CHROME_TAGS.contains(&element.name()) {
        return true;
    }
    element.classes().any(|class| {
        let class = class.to_ascii_lowercase();
        class.starts_with(BREADCRUMB_PREFIX) || CHROME_CLASSES.contains(&class.as_str())
    })
}

/// Collects `img[src]` values inside a region, in document order, skipping chrome
pub fn collect_image_sources(region: ElementRef<'_>, out: &mut Vec<String>) {
    visit_images(region, out);
}

fn visit_images(element: ElementRef<'_>, out: &mut Vec<String>) {
    if element.value().name() == "img" {
        if let Some(src) = element.value().attr("src") {
            out.push(src.to_string());
        }
    }
    for child in element.children().filter_map(ElementRef::wrap) {
        if !is_chrome(child.value()) {
            visit_images(child, out);
        }
    }
}

/// Serializes a region with chrome removed and images rewritten
pub fn render_region(region: ElementRef<'_>, rewrites: &Rewrites) -> String {
    let mut out = String::new();
    write_element(region, rewrites, &mut out);
    out
}

fn write_element(element: ElementRef<'_>, rewrites: &Rewrites, out: &mut String) {
    let el = element.value();
    let name = el.name();

    let rewrite = if name == "img" {
        el.attr("src").and_then(|src| rewrites.get(src))
    } else {
        None
    };

    // Keep namespace prefixes (`xlink:href`, `xml:lang`) from foreign content
    let mut attrs: Vec<(String, &str)> = el
        .attrs
        .iter()
        .map(|(name, value)| {
            let key = match &name.prefix {
                Some(prefix) => format!("{}:{}", prefix, name.local),
                None => name.local.to_string(),
            };
            (key, &**value)
        })
        .collect();
    attrs.sort_by(|a, b| a.0.cmp(&b.0));

    out.push('<');
    out.push_str(name);
    for (key, value) in attrs {
        match rewrite {
            Some(r) if key == "src" => push_attr(out, &key, &r.local),
            Some(_) if key == ORIGINAL_SRC_ATTR => {}
            _ => push_attr(out, &key, value),
        }
    }
    if let Some(r) = rewrite {
        push_attr(out, ORIGINAL_SRC_ATTR, &r.original);
    }
    out.push('>');

    if VOID_ELEMENTS.contains(&name) {
        return;
    }

    for child in element.children() {
        match child.value() {
            Node::Element(child_el) => {
                if is_chrome(child_el) {
                    continue;
                }
                if let Some(child_ref) = ElementRef::wrap(child) {
                    write_element(child_ref, rewrites, out);
                }
            }
            Node::Text(text) => push_text(out, text),
            Node::Comment(comment) => {
                out.push_str("<!--");
                out.push_str(comment);
                out.push_str("-->");
            }
            _ => {}
        }
    }

    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

fn push_attr(out: &mut String, key: &str, value: &str) {
    out.push(' ');
    out.push_str(key);
    out.push_str("=\"");
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out.push('"');
}

fn push_text(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

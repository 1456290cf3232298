//! Webpage text helpers used by the webpage reading tool

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

use crate::encoding::TokenEncoding;

/// Elements whose content never reaches the reader
const SKIPPED_ELEMENTS: &[&str] = &[
    "script", "style", "head", "nav", "noscript", "svg", "template", "iframe", "header",
    "footer", "aside", "form", "button", "select",
];

/// Landmark roles that mark page chrome rather than content
const SKIPPED_ROLES: &[&str] = &["navigation", "banner", "contentinfo", "complementary"];

/// Elements that end a line of text
const BLOCK_ELEMENTS: &[&str] = &[
    "p", "div", "li", "tr", "h1", "h2", "h3", "h4", "h5", "h6", "section", "article", "main",
    "blockquote", "pre", "ul", "ol", "table", "dd", "dt", "figcaption",
];

/// Containers tried in order for the main content of a page
static CONTENT_ROOTS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    ["article", "main", "[role=main]", "body"]
        .iter()
        .map(|css| Selector::parse(css).unwrap())
        .collect()
});
static MANY_NEWLINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{4,}").unwrap());
static MANY_SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" {3,}").unwrap());
static NEWLINE_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n+(\s*\n)*").unwrap());
static URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:https?://)?(?:www\.)?[a-zA-Z0-9-]+(?:\.[a-zA-Z]+)+(?::\d+)?(?:/\S*)?").unwrap()
});

/// Normalize whitespace of extracted page text
///
/// Long newline runs collapse, paragraph breaks become spaces, long space
/// runs shrink to two, tabs disappear and remaining blank lines merge.
pub fn clean_source_text(text: &str) -> String {
    let text = MANY_NEWLINES.replace_all(text.trim(), "\n\n\n");
    let text = text.replace("\n\n", " ");
    let text = MANY_SPACES.replace_all(&text, "  ");
    let text = text.replace('\t', "");
    NEWLINE_RUNS.replace_all(&text, "\n").into_owned()
}

fn skipped(element: ElementRef<'_>) -> bool {
    let value = element.value();
    SKIPPED_ELEMENTS.contains(&value.name())
        || value
            .attr("role")
            .is_some_and(|role| SKIPPED_ROLES.contains(&role))
        || value.attr("hidden").is_some()
        || value.attr("aria-hidden") == Some("true")
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
            continue;
        }
        let Some(child) = ElementRef::wrap(child) else {
            continue;
        };
        if skipped(child) {
            continue;
        }
        let name = child.value().name();
        if name == "br" {
            out.push('\n');
            continue;
        }
        collect_text(child, out);
        if BLOCK_ELEMENTS.contains(&name) {
            out.push('\n');
        }
    }
}

/// Readable text of an HTML document
///
/// The first `article`, `main` or `role=main` container with text is read;
/// otherwise the whole body. Navigation, headers, footers, sidebars, forms
/// and scripts are left out.
pub fn extract_text_from_html(html: &str) -> String {
    let document = Html::parse_document(html);

    let mut text = String::new();
    for selector in CONTENT_ROOTS.iter() {
        for root in document.select(selector) {
            text.clear();
            collect_text(root, &mut text);
            if !text.trim().is_empty() {
                return clean_source_text(&text.replace('\u{a0}', " "));
            }
        }
    }
    clean_source_text(&text.replace('\u{a0}', " "))
}

/// Split text into chunks of at most `chunk_tokens` tokens
pub fn chunk_text_by_token_size(
    encoding: &dyn TokenEncoding,
    text: &str,
    chunk_tokens: usize,
) -> Vec<String> {
    if chunk_tokens == 0 {
        return Vec::new();
    }
    encoding
        .encode(text)
        .chunks(chunk_tokens)
        .map(|chunk| encoding.decode(chunk))
        .collect()
}

/// First URL-looking substring of the input
///
/// A scheme-less match gets `https://` so it can be fetched.
pub fn extract_url(text: &str) -> Option<String> {
    URL.find(text).map(|m| {
        let url = m.as_str();
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("https://{}", url)
        }
    })
}

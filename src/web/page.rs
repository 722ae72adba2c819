//! Turns a fetched HTML page into a compact block of readable text.
//!
//! Structural noise (scripts, navigation, headers, footers, sidebars)
//! is dropped, a main/article/content region is preferred over the
//! whole body, and the result is flattened to single spaced text
//! capped at `MAX_CONTENT_CHARS`.

use std::collections::HashSet;
use std::sync::LazyLock;

use htmd::HtmlToMarkdown;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

pub const MAX_CONTENT_CHARS: usize = 8000;
pub const TRUNCATION_MARKER: &str = "\n\n[Content truncated...]";

// Elements that carry no text worth converting
const SKIPPED_TAGS: [&str; 2] = ["img", "svg"];

static NOISE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("script, style, noscript, nav, footer, header, aside, .nav, .menu, .sidebar")
        .unwrap()
});

static MAIN_REGION: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("main, article").unwrap());

static CONTENT_REGION: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".content, .post, .entry").unwrap());

static BODY: LazyLock<Selector> = LazyLock::new(|| Selector::parse("body").unwrap());

static MARKDOWN_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\([^)]*\)").unwrap());

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

fn remove_noise(document: &mut Html) {
    let ids: Vec<_> = document.select(&NOISE).map(|el| el.id()).collect();
    for id in ids {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }
}

/// Matching elements that aren't nested in another match, so a region
/// inside a region is only read once.
fn outermost<'a>(document: &'a Html, selector: &Selector) -> Vec<ElementRef<'a>> {
    let matches: Vec<ElementRef<'a>> = document.select(selector).collect();
    let ids: HashSet<_> = matches.iter().map(|el| el.id()).collect();
    matches
        .into_iter()
        .filter(|el| !el.ancestors().any(|a| ids.contains(&a.id())))
        .collect()
}

fn to_text(html: &str) -> Result<String, std::io::Error> {
    let converter = HtmlToMarkdown::builder()
        .skip_tags(SKIPPED_TAGS.to_vec())
        .build();
    let markdown = converter.convert(html)?;
    let text = MARKDOWN_LINK.replace_all(&markdown, "$1");
    Ok(WHITESPACE.replace_all(&text, " ").trim().to_string())
}

fn truncate(text: String) -> String {
    if text.chars().count() <= MAX_CONTENT_CHARS {
        return text;
    }
    let mut truncated: String = text.chars().take(MAX_CONTENT_CHARS).collect();
    truncated.push_str(TRUNCATION_MARKER);
    truncated
}

/// Readable text of an HTML document.
pub fn extract_page_text(html: &str) -> Result<String, std::io::Error> {
    let mut document = Html::parse_document(html);
    remove_noise(&mut document);

    for region in [&*MAIN_REGION, &*CONTENT_REGION] {
        let regions: Vec<String> = outermost(&document, region)
            .iter()
            .map(|el| el.html())
            .collect();
        if regions.is_empty() {
            continue;
        }
        let text = to_text(&regions.join("\n"))?;
        if !text.is_empty() {
            return Ok(truncate(text));
        }
    }

    let body = match document.select(&BODY).next() {
        Some(body) => body.inner_html(),
        None => document.root_element().inner_html(),
    };

    Ok(truncate(to_text(&body)?))
}

//! HTML content extraction for crawled pages.
//!
//! Turns raw page markup into normalized visible text plus the page title,
//! meta description, and H1–H3 headings. Extraction is pure: the same input
//! always yields the same output.

mod text;

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument};

pub use text::{count_words, normalize_whitespace, truncate_at_word_boundary};

/// Elements whose subtree never contributes text: non-visible markup and
/// navigation chrome.
const EXCLUDED_TAGS: &[&str] = &[
    "head", "script", "style", "noscript", "template", "svg", "iframe", "nav", "header", "footer",
    "aside",
];

/// Phrasing elements that sit inside running text and must not introduce a
/// word break.
const INLINE_TAGS: &[&str] = &[
    "a", "abbr", "b", "bdi", "bdo", "cite", "code", "data", "dfn", "em", "i", "kbd", "mark", "q",
    "s", "samp", "small", "span", "strong", "sub", "sup", "time", "u", "var",
];

/// Main content regions, tried in priority order before falling back to `<body>`.
const CONTENT_SELECTORS: &[&str] = &[
    "main",
    "article",
    r#"[role="main"]"#,
    ".content",
    ".main-content",
    ".post-content",
    ".entry-content",
    ".article-content",
    ".page-content",
];

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Structured text pulled out of an HTML page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedPage {
    /// Text of the `<title>` element.
    pub title: Option<String>,
    /// `<meta name="description">` content (or `og:description`).
    pub meta_description: Option<String>,
    /// Whitespace-normalized visible text of the main content region.
    pub content: String,
    /// H1–H3 heading texts in document order.
    pub headings: Vec<String>,
    /// Whitespace-delimited tokens in `content`.
    pub word_count: usize,
}

impl ExtractedPage {
    pub fn has_content(&self) -> bool {
        !self.content.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Extract title, description, headings, and full normalized text from HTML.
pub fn extract(html: &str) -> ExtractedPage {
    let doc = Html::parse_document(html);

    let content = extract_main_text(&doc);
    let word_count = count_words(&content);

    ExtractedPage {
        title: extract_title(&doc),
        meta_description: extract_meta_description(&doc),
        content,
        headings: extract_headings(&doc),
        word_count,
    }
}

/// Like [`extract`], with the content cut to `max_chars` characters on a word
/// boundary. `word_count` reflects the truncated content.
#[instrument(skip(html), fields(html_len = html.len()))]
pub fn extract_with_limit(html: &str, max_chars: usize) -> ExtractedPage {
    let mut page = extract(html);

    let full_len = page.content.chars().count();
    if full_len > max_chars {
        page.content = truncate_at_word_boundary(&page.content, max_chars);
        page.word_count = count_words(&page.content);
        debug!(full_len, max_chars, "content truncated");
    }

    page
}

fn extract_title(doc: &Html) -> Option<String> {
    static TITLE_SEL: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("title").expect("valid selector"));

    doc.select(&TITLE_SEL)
        .next()
        .map(|el| normalize_whitespace(&el.text().collect::<String>()))
        .filter(|t| !t.is_empty())
}

fn extract_meta_description(doc: &Html) -> Option<String> {
    static META_SEL: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("meta[content]").expect("valid selector"));

    let mut og_fallback = None;

    for el in doc.select(&META_SEL) {
        let attrs = el.value();
        let content = attrs.attr("content").unwrap_or_default();

        if attrs
            .attr("name")
            .is_some_and(|n| n.eq_ignore_ascii_case("description"))
        {
            let text = normalize_whitespace(content);
            if !text.is_empty() {
                return Some(text);
            }
        } else if og_fallback.is_none()
            && attrs
                .attr("property")
                .is_some_and(|p| p.eq_ignore_ascii_case("og:description"))
        {
            og_fallback = Some(normalize_whitespace(content)).filter(|t| !t.is_empty());
        }
    }

    og_fallback
}

fn extract_headings(doc: &Html) -> Vec<String> {
    static HEADING_SEL: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("h1, h2, h3").expect("valid selector"));

    doc.select(&HEADING_SEL)
        .filter(|el| !inside_excluded(el))
        .map(|el| normalize_whitespace(&visible_text(el)))
        .filter(|t| !t.is_empty())
        .collect()
}

/// Text of the first non-empty content region, falling back to `<body>`.
fn extract_main_text(doc: &Html) -> String {
    static CONTENT_SELS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
        CONTENT_SELECTORS
            .iter()
            .map(|s| Selector::parse(s).expect("valid selector"))
            .collect()
    });
    static BODY_SEL: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("body").expect("valid selector"));

    for sel in CONTENT_SELS.iter() {
        let region = doc
            .select(sel)
            .find(|el| !is_excluded(el.value().name()) && !inside_excluded(el))
            .map(|el| normalize_whitespace(&visible_text(el)));

        if let Some(text) = region.filter(|t| !t.is_empty()) {
            return text;
        }
    }

    doc.select(&BODY_SEL)
        .next()
        .map(|body| normalize_whitespace(&visible_text(body)))
        .unwrap_or_default()
}

/// Concatenate the text nodes under `el`, skipping excluded subtrees.
fn visible_text(el: ElementRef<'_>) -> String {
    let mut out = String::new();
    collect_visible_text(el, &mut out);
    out
}

fn collect_visible_text(el: ElementRef<'_>, out: &mut String) {
    for child in el.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child_el) = ElementRef::wrap(child) {
            let tag = child_el.value().name();
            if is_excluded(tag) {
                continue;
            }
            if INLINE_TAGS.contains(&tag) {
                collect_visible_text(child_el, out);
            } else {
                // Block boundaries (`<p>a</p><p>b</p>`) must not glue words together.
                out.push(' ');
                collect_visible_text(child_el, out);
                out.push(' ');
            }
        }
    }
}

fn inside_excluded(el: &ElementRef<'_>) -> bool {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .any(|a| is_excluded(a.value().name()))
}

fn is_excluded(tag: &str) -> bool {
    EXCLUDED_TAGS.contains(&tag)
}

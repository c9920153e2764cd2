//! Article text handling: front matter, polish passes, and HTML rendering.
//!
//! Edited article bodies are polished with a series of layout passes, then
//! rendered to HTML with `pulldown-cmark` (tables, footnotes, strikethrough,
//! and generated heading ids) before being spliced into a host page.

mod cleanup;
pub mod frontmatter;

use std::collections::HashMap;
use std::sync::LazyLock;

use pulldown_cmark::{CowStr, Event, Options, Parser, Tag, TagEnd, html};
use regex::Regex;
use tracing::{debug, instrument};

pub use frontmatter::{Document, FrontMatter, Metadata, decode, encode};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Result of preparing an article body for publication.
#[derive(Debug, Clone)]
pub struct ConvertResult {
    /// The polished Markdown body.
    pub markdown: String,
    /// The rendered HTML fragment.
    pub html: String,
    /// Text of the first H1, if any.
    pub title: Option<String>,
    /// Approximate word count of the polished body (excluding code blocks).
    pub word_count: usize,
}

// ---------------------------------------------------------------------------
// Converter
// ---------------------------------------------------------------------------

/// Polish an article body and render it to an HTML fragment.
#[instrument(skip(body), fields(body_len = body.len()))]
pub fn convert(body: &str) -> ConvertResult {
    let markdown = polish(body);
    let html = render_html(&markdown);
    let title = extract_title_from_markdown(&markdown);
    let word_count = count_words(&markdown);

    debug!(
        title = title.as_deref().unwrap_or(""),
        word_count,
        html_len = html.len(),
        "conversion complete"
    );

    ConvertResult {
        markdown,
        html,
        title,
        word_count,
    }
}

/// Normalize layout: trailing whitespace, blank-line runs, outer blank space.
pub fn polish(body: &str) -> String {
    cleanup::run_pipeline(body)
}

/// Render Markdown to an HTML fragment.
///
/// Headings without an explicit `{#id}` get a slug id derived from their
/// text; repeated slugs are suffixed `_1`, `_2`, ...
pub fn render_html(markdown: &str) -> String {
    let options = Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_HEADING_ATTRIBUTES;

    let events = with_heading_ids(Parser::new_ext(markdown, options).collect());

    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, events.into_iter());
    out
}

// ---------------------------------------------------------------------------
// Heading ids
// ---------------------------------------------------------------------------

fn with_heading_ids(mut events: Vec<Event<'_>>) -> Vec<Event<'_>> {
    let mut seen: HashMap<String, usize> = HashMap::new();

    let mut i = 0;
    while i < events.len() {
        let needs_id = matches!(&events[i], Event::Start(Tag::Heading { id: None, .. }));
        if needs_id {
            let mut text = String::new();
            for event in &events[i + 1..] {
                match event {
                    Event::End(TagEnd::Heading(_)) => break,
                    Event::Text(t) | Event::Code(t) => text.push_str(t),
                    _ => {}
                }
            }

            let slug = unique_slug(&slugify(&text), &mut seen);
            if let Event::Start(Tag::Heading { id, .. }) = &mut events[i] {
                *id = Some(CowStr::from(slug));
            }
        }
        i += 1;
    }

    events
}

fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;

    for c in text.trim().chars() {
        if c.is_alphanumeric() || c == '_' {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else if c.is_whitespace() || c == '-' {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        "section".to_string()
    } else {
        slug
    }
}

fn unique_slug(base: &str, seen: &mut HashMap<String, usize>) -> String {
    let count = seen.entry(base.to_string()).or_insert(0);
    let slug = if *count == 0 {
        base.to_string()
    } else {
        format!("{base}_{count}")
    };
    *count += 1;
    slug
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Extract title from the first H1 in the Markdown text.
fn extract_title_from_markdown(md: &str) -> Option<String> {
    static H1_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?m)^# (.+)$").expect("valid regex"));

    H1_RE.captures(md).map(|c| c[1].trim().to_string())
}

/// Count words in Markdown body (excluding code blocks).
fn count_words(md: &str) -> usize {
    static CODE_BLOCK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?s)```.*?```").expect("valid regex"));

    let without_code = CODE_BLOCK_RE.replace_all(md, "");
    without_code
        .split_whitespace()
        .filter(|w| !w.starts_with('#') || w.len() > 2)
        .count()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

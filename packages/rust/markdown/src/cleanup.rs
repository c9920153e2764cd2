//! Polish passes applied to an edited article body before conversion.
//!
//! Each pass is a function `&str -> String` applied in sequence. The passes
//! only normalize layout; wording is never touched.

use std::sync::LazyLock;

use regex::Regex;

/// Trailing spaces marking a Markdown hard line break.
const HARD_BREAK: &str = "  ";

/// Run the full polish pipeline on an article body.
pub(crate) fn run_pipeline(md: &str) -> String {
    let mut result = md.to_string();

    result = normalize_whitespace(&result);
    result = collapse_blank_lines(&result);
    result = trim_document(&result);

    result
}

// ---------------------------------------------------------------------------
// Pass 1: Normalize whitespace
// ---------------------------------------------------------------------------

/// Strip trailing whitespace (and stray `\r`) from every line, so
/// whitespace-only lines become empty.
///
/// Two or more trailing spaces before a non-blank line are a Markdown hard
/// line break and are kept as exactly two.
fn normalize_whitespace(md: &str) -> String {
    let lines: Vec<&str> = md.lines().collect();
    let mut out = Vec::with_capacity(lines.len());

    for (i, line) in lines.iter().enumerate() {
        let trimmed = line.trim_end();
        let next_has_text = lines
            .get(i + 1)
            .is_some_and(|next| !next.trim().is_empty());
        let hard_break = !trimmed.is_empty()
            && next_has_text
            && line.trim_end_matches('\r').ends_with(HARD_BREAK);

        if hard_break {
            out.push(format!("{trimmed}{HARD_BREAK}"));
        } else {
            out.push(trimmed.to_string());
        }
    }

    out.join("\n")
}

// ---------------------------------------------------------------------------
// Pass 2: Collapse blank lines
// ---------------------------------------------------------------------------

/// Collapse every run of blank lines into exactly one.
fn collapse_blank_lines(md: &str) -> String {
    static MULTI_BLANK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

    MULTI_BLANK_RE.replace_all(md, "\n\n").to_string()
}

// ---------------------------------------------------------------------------
// Pass 3: Trim
// ---------------------------------------------------------------------------

/// Drop leading and trailing blank space around the whole body.
fn trim_document(md: &str) -> String {
    md.trim().to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

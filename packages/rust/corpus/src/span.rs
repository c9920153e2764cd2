//! First-match span extraction around a subject mention.
//!
//! The first line mentioning the subject wins, even when a later mention
//! would be more relevant. Drafts generated from the same corpus must come
//! out identical, so any smarter matching is a behavior change.

use tracing::{debug, warn};

/// Tuning for [`extract_span`].
#[derive(Debug, Clone)]
pub struct SpanOptions {
    /// Lines kept on each side of the matching line.
    pub context_lines: usize,
    /// Abbreviated genus token that may precede the subject (`P.`).
    pub taxon_prefix: String,
}

impl Default for SpanOptions {
    fn default() -> Self {
        Self {
            context_lines: 50,
            taxon_prefix: "P.".into(),
        }
    }
}

/// Outcome of a span extraction. Both variants carry non-empty text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// The subject was mentioned; `start..=end` is the window around `line`.
    Found {
        line: usize,
        start: usize,
        end: usize,
        text: String,
    },
    /// No line mentioned the subject; `text` is the placeholder notice.
    NotFound { text: String },
}

impl Extraction {
    pub fn text(&self) -> &str {
        match self {
            Self::Found { text, .. } | Self::NotFound { text } => text,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Self::Found { text, .. } | Self::NotFound { text } => text,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found { .. })
    }
}

/// Placeholder passage used when the subject does not occur in the corpus.
pub fn not_found_placeholder(subject: &str) -> String {
    format!("# No source text found for {subject}\n\nCheck the full corpus text manually.")
}

/// Return the window of lines around the first mention of `subject`.
pub fn extract_span(text: &str, subject: &str, opts: &SpanOptions) -> Extraction {
    let lines: Vec<&str> = text.split('\n').collect();
    let needle = subject.to_lowercase();
    let prefixed = format!("{} {subject}", opts.taxon_prefix);

    let hit = lines
        .iter()
        .position(|line| line.to_lowercase().contains(&needle) || line.contains(&prefixed));

    let Some(line) = hit else {
        warn!(subject, "subject not found in corpus, using placeholder");
        return Extraction::NotFound {
            text: not_found_placeholder(subject),
        };
    };

    let start = line.saturating_sub(opts.context_lines);
    let end = line
        .saturating_add(opts.context_lines)
        .min(lines.len() - 1);

    debug!(subject, line, start, end, "extracted span");
    Extraction::Found {
        line,
        start,
        end,
        text: lines[start..=end].join("\n"),
    }
}

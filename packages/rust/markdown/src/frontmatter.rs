//! Front matter codec for article files.
//!
//! Format: a `---` line, one `key: value` pair per line, a closing `---`
//! line, one blank separator line, then the body. Parsing is permissive:
//! text without a complete block decodes as [`FrontMatter::Absent`] with the
//! whole input as body.

use indexmap::IndexMap;

const DELIMITER: &str = "---";

/// Ordered string metadata. Re-inserting a key keeps its position and
/// replaces the value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata(IndexMap<String, String>);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut meta = Self::new();
        for (k, v) in iter {
            meta.insert(k, v);
        }
        meta
    }
}

/// Whether a document carried a front matter block at all.
///
/// `Present` with empty metadata (`---\n---\n`) is distinct from `Absent`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrontMatter {
    Absent,
    Present(Metadata),
}

impl FrontMatter {
    pub fn metadata(&self) -> Option<&Metadata> {
        match self {
            Self::Absent => None,
            Self::Present(meta) => Some(meta),
        }
    }

    /// Look up a key; always `None` when the block is absent.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.metadata().and_then(|m| m.get(key))
    }
}

/// A decoded article file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub front_matter: FrontMatter,
    pub body: String,
}

/// Split `text` into front matter and body.
pub fn decode(text: &str) -> Document {
    match split_block(text) {
        Some((block, body)) => Document {
            front_matter: FrontMatter::Present(parse_block(&block)),
            body: body.to_string(),
        },
        None => Document {
            front_matter: FrontMatter::Absent,
            body: text.to_string(),
        },
    }
}

/// Render metadata and body in the front matter format.
///
/// Inverse of [`decode`] for trimmed keys without `:` and values without
/// line breaks.
pub fn encode(meta: &Metadata, body: &str) -> String {
    let mut out = String::with_capacity(body.len() + 32 * meta.len());
    out.push_str(DELIMITER);
    out.push('\n');
    for (key, value) in meta.iter() {
        out.push_str(key);
        out.push_str(": ");
        out.push_str(value);
        out.push('\n');
    }
    out.push_str(DELIMITER);
    out.push_str("\n\n");
    out.push_str(body);
    out
}

/// Scan for the opening and closing delimiter lines.
///
/// Returns the metadata lines and the body with one separator blank line
/// removed, or `None` when no complete block opens the text.
fn split_block(text: &str) -> Option<(Vec<&str>, &str)> {
    let (first, rest) = next_line(text);
    if first != DELIMITER {
        return None;
    }
    let mut rest = rest?;

    let mut lines = Vec::new();
    loop {
        let (line, next) = next_line(rest);
        if line == DELIMITER {
            let body = next.unwrap_or("");
            let body = body
                .strip_prefix("\r\n")
                .or_else(|| body.strip_prefix('\n'))
                .unwrap_or(body);
            return Some((lines, body));
        }
        lines.push(line);
        rest = next?;
    }
}

/// One line (without its terminator) and the remainder after it.
fn next_line(text: &str) -> (&str, Option<&str>) {
    match text.find('\n') {
        Some(i) => (text[..i].trim_end_matches('\r'), Some(&text[i + 1..])),
        None => (text.trim_end_matches('\r'), None),
    }
}

fn parse_block(lines: &[&str]) -> Metadata {
    let mut meta = Metadata::new();
    for line in lines {
        if let Some((key, value)) = line.split_once(':') {
            meta.insert(key.trim(), value.trim());
        }
    }
    meta
}

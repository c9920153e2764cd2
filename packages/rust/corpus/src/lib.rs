//! OCR corpus access: snapshot lookup and subject span extraction.
//!
//! The corpus is a directory of pre-extracted OCR snapshots, one directory per
//! scan named `<source><timestamp>`. [`CorpusLocator`] picks the newest
//! snapshot for a source and [`extract_span`] cuts the passage about one
//! subject out of its full text.

mod locator;
mod span;

pub use locator::{CorpusLocator, Snapshot};
pub use span::{Extraction, SpanOptions, extract_span, not_found_placeholder};

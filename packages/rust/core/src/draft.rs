//! Draft article template.

use chrono::NaiveDate;

use carebook_markdown::{Metadata, encode};
use carebook_shared::SubjectId;

/// Status written into every new draft.
pub const DRAFT_STATUS: &str = "draft";

const WRITE_FROM_SOURCE: &str = "(Write this from the extracted text above.)";

/// Everything a draft is built from.
#[derive(Debug, Clone)]
pub struct DraftInput<'a> {
    pub subject: &'a SubjectId,
    /// Passage cut from the corpus, or the not-found placeholder.
    pub excerpt: &'a str,
    pub created: NaiveDate,
    pub genus: &'a str,
    pub taxon_prefix: &'a str,
    pub source_label: &'a str,
    pub target_page: &'a str,
}

/// Build the full text of a new draft: front matter, then the template body.
pub fn compose_draft(input: &DraftInput<'_>) -> String {
    let subject = input.subject.as_str();

    let meta: Metadata = [
        ("subject_id", subject.to_string()),
        ("common_name", subject.to_string()),
        ("status", DRAFT_STATUS.to_string()),
        ("created", input.created.format("%Y-%m-%d").to_string()),
        ("source", input.source_label.to_string()),
        ("target_page", input.target_page.to_string()),
    ]
    .into_iter()
    .collect();

    let mut body = String::with_capacity(input.excerpt.len() + 1024);
    body.push_str(&format!(
        "# {subject} ({prefix} {subject})\n\n",
        prefix = input.taxon_prefix
    ));

    body.push_str("## Extracted from source\n\n");
    body.push_str(input.excerpt);
    body.push_str("\n\n---\n\n");

    body.push_str("## Basic info\n");
    body.push_str(&format!(
        "- **Scientific name**: {} {subject}\n",
        input.genus
    ));
    body.push_str("- **Common name**:\n");
    body.push_str("- **Origin**:\n");
    body.push_str("- **Difficulty**: ⭐☆☆☆☆\n\n");

    body.push_str("## Characteristics\n");
    body.push_str(WRITE_FROM_SOURCE);
    body.push_str("\n\n## Cultivation\n");
    for heading in ["Watering", "Light", "Temperature", "Fertilizer"] {
        body.push_str(&format!("\n### {heading}\n{WRITE_FROM_SOURCE}\n"));
    }

    body.push_str("\n## Addendum: growing experience\n");
    body.push_str("(Add notes from your own plants here.)\n\n");

    body.push_str("---\n");
    body.push_str(&format!("📚 Reference: {}\n", input.source_label));

    encode(&meta, &body)
}

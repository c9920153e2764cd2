//! Marker-delimited region splicing for host HTML documents.
//!
//! A region is the text between `<!-- ARTICLE_START:<id> -->` and
//! `<!-- ARTICLE_END:<id> -->`. The splicer owns everything strictly between
//! the two markers and never touches anything outside them.
//!
//! Regions are located by a linear scan: the first start marker, then the
//! first end marker after it. That pair is authoritative even when markers
//! repeat or nest. When the host has no region yet, a new marker pair is
//! seeded just before the first `</div>` following the configured anchor.
//!
//! Splicing the same content twice yields the same text as splicing once.

use std::path::Path;

use tracing::{debug, info, instrument, warn};

use carebook_shared::{CarebookError, RegionId, Result};

/// Closing boundary of the anchor's container.
const CONTAINER_CLOSE: &str = "</div>";

const START_PREFIX: &str = "<!-- ARTICLE_START:";
const END_PREFIX: &str = "<!-- ARTICLE_END:";
const MARKER_SUFFIX: &str = " -->";

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// The start and end marker tokens for one region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Markers {
    pub start: String,
    pub end: String,
}

impl Markers {
    pub fn for_region(region: &RegionId) -> Self {
        Self {
            start: format!("{START_PREFIX}{region}{MARKER_SUFFIX}"),
            end: format!("{END_PREFIX}{region}{MARKER_SUFFIX}"),
        }
    }
}

/// How a splice changed the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpliceOutcome {
    /// An existing region's contents were replaced.
    Replaced,
    /// A new marker pair was inserted at the anchor.
    Inserted,
}

impl SpliceOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Replaced => "replaced",
            Self::Inserted => "inserted",
        }
    }
}

/// Result of splicing host text in memory.
#[derive(Debug, Clone)]
pub struct Spliced {
    pub text: String,
    pub outcome: SpliceOutcome,
}

/// Replaces or seeds named regions inside host documents.
#[derive(Debug, Clone)]
pub struct Splicer {
    anchor: String,
}

// ---------------------------------------------------------------------------
// Splicer
// ---------------------------------------------------------------------------

impl Splicer {
    /// `anchor` is the literal tag that opens the insertion container,
    /// e.g. `<div id="care-guide-section">`.
    pub fn new(anchor: impl Into<String>) -> Self {
        Self {
            anchor: anchor.into(),
        }
    }

    /// Return `host` with `region` holding `content`.
    pub fn splice(&self, host: &str, region: &RegionId, content: &str) -> Result<Spliced> {
        let markers = Markers::for_region(region);

        if content.contains(START_PREFIX) || content.contains(END_PREFIX) {
            return Err(CarebookError::validation(format!(
                "content for region '{region}' contains an article marker"
            )));
        }

        let wrapped = wrap_content(content);

        if let Some((inner_start, inner_end)) = locate_region(host, region, &markers)? {
            debug!(%region, inner_start, inner_end, "replacing existing region");
            let mut text = String::with_capacity(host.len() + wrapped.len());
            text.push_str(&host[..inner_start]);
            text.push_str(&wrapped);
            text.push_str(&host[inner_end..]);
            return Ok(Spliced {
                text,
                outcome: SpliceOutcome::Replaced,
            });
        }

        let at = self.insertion_point(host, region)?;
        debug!(%region, at, "seeding new region");

        let block = format!("\n    {}{wrapped}{}\n", markers.start, markers.end);
        let mut text = String::with_capacity(host.len() + block.len());
        text.push_str(&host[..at]);
        text.push_str(&block);
        text.push_str(&host[at..]);

        Ok(Spliced {
            text,
            outcome: SpliceOutcome::Inserted,
        })
    }

    /// Splice `content` into the host file at `path`, rewriting it in place.
    ///
    /// The new text goes to a temporary sibling first and is renamed over
    /// the host, so a failed write never truncates the page. An unchanged
    /// result is not written at all.
    #[instrument(skip(self, content), fields(path = %path.display(), %region))]
    pub fn splice_file(
        &self,
        path: &Path,
        region: &RegionId,
        content: &str,
    ) -> Result<SpliceOutcome> {
        if !path.is_file() {
            return Err(CarebookError::HostNotFound {
                path: path.to_path_buf(),
            });
        }

        let host = std::fs::read_to_string(path).map_err(|e| CarebookError::io(path, e))?;
        let spliced = self.splice(&host, region, content)?;

        if spliced.outcome == SpliceOutcome::Inserted {
            warn!("region markers not found, inserted a new region at the anchor");
        }

        if spliced.text == host {
            info!(outcome = spliced.outcome.as_str(), "host already up to date");
            return Ok(spliced.outcome);
        }

        write_atomic(path, &spliced.text)?;
        info!(
            outcome = spliced.outcome.as_str(),
            bytes = spliced.text.len(),
            "host document updated"
        );

        Ok(spliced.outcome)
    }

    /// Byte offset of the first container close after the anchor.
    ///
    /// Closes inside regions already seeded in the container are skipped, so
    /// a new region never lands inside another region's wrapper.
    fn insertion_point(&self, host: &str, region: &RegionId) -> Result<usize> {
        let not_found = || CarebookError::InsertionPointNotFound {
            region: region.to_string(),
            anchor: self.anchor.clone(),
        };

        if self.anchor.is_empty() {
            return Err(not_found());
        }

        let anchor_at = host.find(&self.anchor).ok_or_else(not_found)?;
        let mut pos = anchor_at + self.anchor.len();

        loop {
            let close = host[pos..]
                .find(CONTAINER_CLOSE)
                .map(|i| pos + i)
                .ok_or_else(not_found)?;

            match next_region(host, pos) {
                Some((region_start, region_end)) if region_start < close => pos = region_end,
                _ => return Ok(close),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Fixed wrapper placed between the markers.
fn wrap_content(content: &str) -> String {
    format!(
        "\n    <div class=\"article-content prose max-w-none\">\n{content}\n    </div>\n    "
    )
}

/// Find the byte range strictly between the region's markers.
///
/// `Ok(None)` when neither marker occurs. A start marker without a later end
/// marker, or an end marker without any start marker, is malformed.
fn locate_region(
    host: &str,
    region: &RegionId,
    markers: &Markers,
) -> Result<Option<(usize, usize)>> {
    let malformed = |message: &str| CarebookError::MalformedRegion {
        region: region.to_string(),
        message: message.to_string(),
    };

    match host.find(&markers.start) {
        Some(start_at) => {
            let inner_start = start_at + markers.start.len();
            let end_rel = host[inner_start..]
                .find(&markers.end)
                .ok_or_else(|| malformed("start marker has no matching end marker"))?;
            Ok(Some((inner_start, inner_start + end_rel)))
        }
        None if host.contains(&markers.end) => {
            Err(malformed("end marker present without a start marker"))
        }
        None => Ok(None),
    }
}

/// Byte span (markers included) of the next complete region at or after
/// `from`, whatever its identifier.
fn next_region(host: &str, from: usize) -> Option<(usize, usize)> {
    let start_at = from + host[from..].find(START_PREFIX)?;
    let id_from = start_at + START_PREFIX.len();
    let id_len = host[id_from..].find(MARKER_SUFFIX)?;
    let end_marker = format!("{END_PREFIX}{}{MARKER_SUFFIX}", &host[id_from..id_from + id_len]);
    let end_at = id_from + host[id_from..].find(&end_marker)?;
    Some((start_at, end_at + end_marker.len()))
}

/// Write through a dot-prefixed temporary sibling, then rename over `path`.
fn write_atomic(path: &Path, text: &str) -> Result<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| CarebookError::validation(format!("not a file path: {}", path.display())))?;
    let temp = path.with_file_name(format!(".{file_name}.tmp"));

    std::fs::write(&temp, text).map_err(|e| CarebookError::io(&temp, e))?;
    if let Err(e) = std::fs::rename(&temp, path) {
        let _ = std::fs::remove_file(&temp);
        return Err(CarebookError::io(path, e));
    }

    debug!(path = %path.display(), "wrote host document");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use carebook_shared::SubjectId;
    use scraper::{Html, Selector};
    use std::path::PathBuf;

    const ANCHOR: &str = r#"<div id="care-guide-section">"#;

    fn region(subject: &str) -> RegionId {
        RegionId::for_subject(&SubjectId::new(subject).unwrap())
    }

    fn splicer() -> Splicer {
        Splicer::new(ANCHOR)
    }

    fn fixture_path(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../../fixtures")
            .join(name)
    }

    fn load_fixture(name: &str) -> String {
        std::fs::read_to_string(fixture_path(name))
            .unwrap_or_else(|e| panic!("failed to read fixture {name}: {e}"))
    }

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "carebook-splice-test-{}",
            uuid::Uuid::now_v7()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    /// Remove the region (markers included) so the remainder can be compared.
    fn outside_region(text: &str, region: &RegionId) -> (String, String) {
        let markers = Markers::for_region(region);
        let start = text.find(&markers.start).expect("start marker");
        let end = text[start..].find(&markers.end).expect("end marker") + start;
        (
            text[..start].to_string(),
            text[end + markers.end.len()..].to_string(),
        )
    }

    // --- Replacement ---

    #[test]
    fn replaces_existing_region_contents() {
        let host = "<main>\n<!-- ARTICLE_START:alpha-care -->old<!-- ARTICLE_END:alpha-care -->\n</main>";
        let spliced = splicer().splice(host, &region("alpha"), "<p>new</p>").unwrap();

        assert_eq!(spliced.outcome, SpliceOutcome::Replaced);
        assert_eq!(
            spliced.text,
            "<main>\n<!-- ARTICLE_START:alpha-care -->\n    <div class=\"article-content prose max-w-none\">\n<p>new</p>\n    </div>\n    <!-- ARTICLE_END:alpha-care -->\n</main>"
        );
    }

    #[test]
    fn replacement_does_not_need_an_anchor() {
        let host = "<!-- ARTICLE_START:alpha-care --><!-- ARTICLE_END:alpha-care -->";
        let spliced = Splicer::new("<nowhere>").splice(host, &region("alpha"), "x").unwrap();
        assert_eq!(spliced.outcome, SpliceOutcome::Replaced);
    }

    #[test]
    fn other_regions_are_untouched() {
        let host = concat!(
            "<!-- ARTICLE_START:beta-care -->B<!-- ARTICLE_END:beta-care -->\n",
            "<!-- ARTICLE_START:alpha-care -->A<!-- ARTICLE_END:alpha-care -->\n",
            "<!-- ARTICLE_START:alphabet-care -->C<!-- ARTICLE_END:alphabet-care -->",
        );
        let spliced = splicer().splice(host, &region("alpha"), "new").unwrap();

        assert!(spliced.text.contains("ARTICLE_START:beta-care -->B<!--"));
        assert!(spliced.text.contains("ARTICLE_START:alphabet-care -->C<!--"));
        assert!(!spliced.text.contains("-->A<!--"));
    }

    #[test]
    fn first_start_and_first_following_end_are_authoritative() {
        let host = concat!(
            "<!-- ARTICLE_START:alpha-care -->one<!-- ARTICLE_END:alpha-care -->",
            "|middle|",
            "<!-- ARTICLE_START:alpha-care -->two<!-- ARTICLE_END:alpha-care -->",
        );
        let spliced = splicer().splice(host, &region("alpha"), "new").unwrap();

        assert!(!spliced.text.contains("one"));
        assert!(spliced.text.contains("|middle|"));
        assert!(spliced.text.contains("-->two<!--"));
    }

    // --- Insertion ---

    #[test]
    fn inserts_before_first_close_after_anchor() {
        let host = "<div id=\"care-guide-section\">\n  <p>intro</p>\n</div>\n<div>after</div>";
        let spliced = splicer().splice(host, &region("alpha"), "<p>care</p>").unwrap();

        assert_eq!(spliced.outcome, SpliceOutcome::Inserted);
        assert_eq!(
            spliced.text,
            concat!(
                "<div id=\"care-guide-section\">\n  <p>intro</p>\n",
                "\n    <!-- ARTICLE_START:alpha-care -->",
                "\n    <div class=\"article-content prose max-w-none\">\n<p>care</p>\n    </div>\n    ",
                "<!-- ARTICLE_END:alpha-care -->\n",
                "</div>\n<div>after</div>",
            )
        );
    }

    #[test]
    fn missing_anchor_is_insertion_point_not_found() {
        let err = splicer()
            .splice("<main><p>no anchor</p></main>", &region("alpha"), "x")
            .unwrap_err();
        assert!(matches!(err, CarebookError::InsertionPointNotFound { .. }));
    }

    #[test]
    fn anchor_without_close_is_insertion_point_not_found() {
        let host = "<div id=\"care-guide-section\"><p>unterminated";
        let err = splicer().splice(host, &region("alpha"), "x").unwrap_err();
        assert!(matches!(err, CarebookError::InsertionPointNotFound { .. }));
    }

    #[test]
    fn inserted_region_lands_inside_anchor_container() {
        let host = load_fixture("html/species-detail.html");
        let spliced = splicer()
            .splice(&host, &region("alpha"), "<h2 id=\"care-title\">Alpha care</h2>")
            .unwrap();

        let doc = Html::parse_document(&spliced.text);
        let sel = Selector::parse("#care-guide-section > .article-content > h2#care-title").unwrap();
        let heading = doc.select(&sel).next().expect("article inside care section");
        assert_eq!(heading.text().collect::<String>(), "Alpha care");

        let lead = Selector::parse("#care-guide-section > p.lead").unwrap();
        assert_eq!(doc.select(&lead).count(), 1);
    }

    #[test]
    fn second_region_is_seeded_after_the_first() {
        let host = "<div id=\"care-guide-section\"><p>intro</p></div><div>after</div>";
        let with_alpha = splicer().splice(host, &region("alpha"), "<p>a</p>").unwrap();
        let with_both = splicer()
            .splice(&with_alpha.text, &region("beta"), "<p>b</p>")
            .unwrap();
        assert_eq!(with_both.outcome, SpliceOutcome::Inserted);

        let (alpha_before, alpha_after) = outside_region(&with_both.text, &region("alpha"));
        let (alpha_before_orig, _) = outside_region(&with_alpha.text, &region("alpha"));
        assert_eq!(alpha_before, alpha_before_orig);
        assert!(alpha_after.contains("ARTICLE_START:beta-care"));

        let doc = Html::parse_document(&with_both.text);
        let sel = Selector::parse("#care-guide-section > .article-content > p").unwrap();
        let texts: Vec<String> = doc.select(&sel).map(|p| p.text().collect()).collect();
        assert_eq!(texts, vec!["a", "b"]);
    }

    // --- Malformed regions ---

    #[test]
    fn start_without_end_is_malformed() {
        let host = "<div id=\"care-guide-section\"><!-- ARTICLE_START:alpha-care --></div>";
        let err = splicer().splice(host, &region("alpha"), "x").unwrap_err();
        assert!(matches!(err, CarebookError::MalformedRegion { .. }));
    }

    #[test]
    fn end_before_start_only_is_malformed() {
        let host = "<!-- ARTICLE_END:alpha-care --><div id=\"care-guide-section\"></div>";
        let err = splicer().splice(host, &region("alpha"), "x").unwrap_err();
        assert!(matches!(err, CarebookError::MalformedRegion { .. }));
    }

    #[test]
    fn content_containing_its_marker_is_rejected() {
        let host = "<div id=\"care-guide-section\"></div>";
        let err = splicer()
            .splice(host, &region("alpha"), "<!-- ARTICLE_END:alpha-care -->")
            .unwrap_err();
        assert!(matches!(err, CarebookError::Validation { .. }));
    }

    #[test]
    fn content_containing_another_regions_marker_is_rejected() {
        let host = "<div id=\"care-guide-section\"></div>";
        for content in [
            "<p>a</p><!-- ARTICLE_START:beta-care -->",
            "<p>a</p><!-- ARTICLE_END:beta-care -->",
        ] {
            let err = splicer()
                .splice(host, &region("alpha"), content)
                .unwrap_err();
            assert!(matches!(err, CarebookError::Validation { .. }), "{content}");
        }
    }

    // --- Properties ---

    #[test]
    fn splice_is_idempotent() {
        let fixture = load_fixture("html/species-detail.html");
        let with_region = format!(
            "<p>x</p><!-- ARTICLE_START:alpha-care -->stale<!-- ARTICLE_END:alpha-care -->{}",
            fixture
        );
        let hosts = [
            fixture.as_str(),
            with_region.as_str(),
            "<div id=\"care-guide-section\"></div>",
        ];
        let contents = ["", "<p>one</p>", "line\n\n  indented\n"];

        for host in hosts {
            for content in contents {
                let once = splicer().splice(host, &region("alpha"), content).unwrap();
                let twice = splicer().splice(&once.text, &region("alpha"), content).unwrap();
                assert_eq!(twice.text, once.text);
                assert_eq!(twice.outcome, SpliceOutcome::Replaced);
            }
        }
    }

    #[test]
    fn splice_leaves_text_outside_region_alone() {
        let host = "HEAD<!-- ARTICLE_START:alpha-care -->old body<!-- ARTICLE_END:alpha-care -->TAIL";
        let spliced = splicer().splice(host, &region("alpha"), "new body").unwrap();
        let (before, after) = outside_region(&spliced.text, &region("alpha"));
        assert_eq!(before, "HEAD");
        assert_eq!(after, "TAIL");

        let fixture = load_fixture("html/species-detail.html");
        let spliced = splicer().splice(&fixture, &region("alpha"), "new body").unwrap();
        let (before, after) = outside_region(&spliced.text, &region("alpha"));
        // Only the seeding whitespace around the new pair is added.
        let before = before.strip_suffix("\n    ").expect("seeded indent");
        let after = after.strip_prefix('\n').expect("seeded newline");
        assert_eq!(format!("{before}{after}"), fixture);
    }

    // --- File form ---

    #[test]
    fn splice_file_missing_host_is_host_not_found() {
        let err = splicer()
            .splice_file(Path::new("/nonexistent/detail.html"), &region("alpha"), "x")
            .unwrap_err();
        assert!(matches!(err, CarebookError::HostNotFound { .. }));
    }

    #[test]
    fn splice_file_rewrites_host_without_temp_files() {
        let tmp = temp_dir();
        let host_path = tmp.join("detail.html");
        std::fs::write(&host_path, load_fixture("html/species-detail.html")).unwrap();

        let outcome = splicer()
            .splice_file(&host_path, &region("alpha"), "<p>care</p>")
            .unwrap();
        assert_eq!(outcome, SpliceOutcome::Inserted);

        let written = std::fs::read_to_string(&host_path).unwrap();
        assert!(written.contains("<!-- ARTICLE_START:alpha-care -->"));
        assert!(written.contains("<p>care</p>"));

        let outcome = splicer()
            .splice_file(&host_path, &region("alpha"), "<p>care</p>")
            .unwrap();
        assert_eq!(outcome, SpliceOutcome::Replaced);
        assert_eq!(std::fs::read_to_string(&host_path).unwrap(), written);

        for entry in std::fs::read_dir(&tmp).unwrap() {
            let name = entry.unwrap().file_name().to_string_lossy().to_string();
            assert!(!name.starts_with('.'), "temp file left behind: {name}");
        }

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn splice_file_failure_leaves_host_unchanged() {
        let tmp = temp_dir();
        let host_path = tmp.join("detail.html");
        let original = "<main><p>no anchor here</p></main>";
        std::fs::write(&host_path, original).unwrap();

        let err = splicer()
            .splice_file(&host_path, &region("alpha"), "<p>care</p>")
            .unwrap_err();
        assert!(matches!(err, CarebookError::InsertionPointNotFound { .. }));
        assert_eq!(std::fs::read_to_string(&host_path).unwrap(), original);

        let _ = std::fs::remove_dir_all(&tmp);
    }
}

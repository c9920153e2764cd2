//! End-to-end article workflows: corpus → draft, draft → editing,
//! editing → host page → published.

use std::path::{Component, Path, PathBuf};
use std::time::Instant;

use chrono::NaiveDate;
use tracing::{info, instrument, warn};

use carebook_corpus::{CorpusLocator, Extraction, Snapshot, SpanOptions, extract_span};
use carebook_shared::{AppConfig, CarebookError, RegionId, Result, Stage, SubjectId};
use carebook_splice::{SpliceOutcome, Splicer};
use carebook_storage::{ArticleFile, StageStore, TransitionRecord, WriteMode};

use crate::draft::{DraftInput, compose_draft};

/// Front matter key naming the host page an article is merged into.
pub const TARGET_PAGE_KEY: &str = "target_page";

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called once with a one-line summary when a workflow completes.
    fn done(&self, summary: &str);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn done(&self, _summary: &str) {}
}

/// Result of [`Pipeline::generate_draft`].
#[derive(Debug)]
pub struct DraftOutcome {
    pub file: ArticleFile,
    pub snapshot: Snapshot,
    /// `false` when the corpus never mentions the subject and the draft
    /// carries the placeholder passage.
    pub found: bool,
}

/// Result of [`Pipeline::publish`].
#[derive(Debug)]
pub struct PublishOutcome {
    pub subject: SubjectId,
    pub region: RegionId,
    pub host: PathBuf,
    pub splice: SpliceOutcome,
    pub file: ArticleFile,
    pub title: Option<String>,
    pub word_count: usize,
    pub elapsed: std::time::Duration,
}

/// The configured collaborators behind every workflow.
#[derive(Debug, Clone)]
pub struct Pipeline {
    store: StageStore,
    locator: CorpusLocator,
    splicer: Splicer,
    span: SpanOptions,
    site_root: PathBuf,
    default_source: String,
    genus: String,
    source_label: String,
    default_target_page: String,
}

impl Pipeline {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        validate_target_page(&config.draft.target_page)?;

        Ok(Self {
            store: StageStore::open(&config.paths.vault, config.stages.clone())?,
            locator: CorpusLocator::new(&config.paths.corpus, &config.corpus.full_text_file),
            splicer: Splicer::new(&config.splice.anchor),
            span: SpanOptions {
                context_lines: config.corpus.context_lines,
                taxon_prefix: config.corpus.taxon_prefix.clone(),
            },
            site_root: config.paths.site.clone(),
            default_source: config.corpus.source_name.clone(),
            genus: config.draft.genus.clone(),
            source_label: config.draft.source_label.clone(),
            default_target_page: config.draft.target_page.clone(),
        })
    }

    pub fn store(&self) -> &StageStore {
        &self.store
    }

    /// Extract the subject's passage from the newest corpus snapshot and
    /// write a fresh draft, replacing any existing one.
    #[instrument(skip(self, progress), fields(%subject))]
    pub fn generate_draft(
        &self,
        subject: &SubjectId,
        source: Option<&str>,
        today: NaiveDate,
        progress: &dyn ProgressReporter,
    ) -> Result<DraftOutcome> {
        let source = source.unwrap_or(self.default_source.as_str());

        progress.phase("Locating corpus snapshot");
        let (snapshot, text) = self.locator.read_text(source)?;

        progress.phase("Extracting source passage");
        let extraction = extract_span(&text, subject.as_str(), &self.span);
        if let Extraction::Found { line, start, end, .. } = &extraction {
            info!(line, start, end, "source passage found");
        }
        let found = extraction.is_found();

        progress.phase("Writing draft");
        let content = compose_draft(&DraftInput {
            subject,
            excerpt: extraction.text(),
            created: today,
            genus: &self.genus,
            taxon_prefix: &self.span.taxon_prefix,
            source_label: &self.source_label,
            target_page: &self.default_target_page,
        });
        let file = self
            .store
            .create(Stage::Draft, subject, &content, WriteMode::Overwrite)?;

        self.record(TransitionRecord::new(subject.clone(), None, Stage::Draft, &content));

        progress.done(&format!("Draft written to {}", file.path().display()));
        info!(snapshot = %snapshot.name, found, "draft generated");

        Ok(DraftOutcome {
            file,
            snapshot,
            found,
        })
    }

    /// Move a subject's draft into the Editing stage.
    #[instrument(skip(self, progress), fields(%subject))]
    pub fn start_editing(
        &self,
        subject: &SubjectId,
        progress: &dyn ProgressReporter,
    ) -> Result<ArticleFile> {
        let draft = self.store.require(Stage::Draft, subject)?;

        progress.phase("Moving draft to editing");
        let editing = self.store.advance(&draft, Stage::Draft, Stage::Editing, subject)?;

        let content = self.store.read(&editing)?.raw;
        self.record(TransitionRecord::new(
            subject.clone(),
            Some(Stage::Draft),
            Stage::Editing,
            &content,
        ));

        progress.done(&format!("Editing {}", editing.path().display()));
        Ok(editing)
    }

    /// Articles waiting in Editing, sorted by file name.
    pub fn editing_queue(&self) -> Result<Vec<ArticleFile>> {
        let mut files = self.store.list(Stage::Editing)?;
        files.sort_by_key(ArticleFile::file_name);
        Ok(files)
    }

    /// Merge an edited article into its host page, then move it to
    /// Published.
    ///
    /// The article stays in Editing unless the host page was updated.
    #[instrument(skip(self, file, progress), fields(path = %file.path().display()))]
    pub fn publish(
        &self,
        file: &ArticleFile,
        progress: &dyn ProgressReporter,
    ) -> Result<PublishOutcome> {
        let start = Instant::now();

        if file.stage() != Stage::Editing {
            return Err(CarebookError::validation(format!(
                "{} is in stage {}; only editing articles can be published",
                file.path().display(),
                file.stage()
            )));
        }

        progress.phase("Reading article");
        let article = self.store.read(file)?;
        let subject = article.subject_id.clone();

        let target_page = article
            .meta(TARGET_PAGE_KEY)
            .unwrap_or(self.default_target_page.as_str())
            .to_string();
        let host = self.site_root.join(validate_target_page(&target_page)?);

        progress.phase("Converting to HTML");
        let converted = carebook_markdown::convert(&article.body);

        progress.phase("Updating host page");
        let region = RegionId::for_subject(&subject);
        let splice = self.splicer.splice_file(&host, &region, &converted.html)?;

        progress.phase("Moving article to published");
        let published = self
            .store
            .advance(file, Stage::Editing, Stage::Published, &subject)?;

        self.record(
            TransitionRecord::new(
                subject.clone(),
                Some(Stage::Editing),
                Stage::Published,
                &article.raw,
            )
            .with_target(&target_page, &region),
        );

        let outcome = PublishOutcome {
            subject,
            region,
            host,
            splice,
            file: published,
            title: converted.title,
            word_count: converted.word_count,
            elapsed: start.elapsed(),
        };

        progress.done(&format!(
            "{} {} in {}",
            outcome.splice.as_str(),
            outcome.region,
            outcome.host.display()
        ));
        info!(
            subject = %outcome.subject,
            region = %outcome.region,
            splice = outcome.splice.as_str(),
            word_count = outcome.word_count,
            elapsed_ms = outcome.elapsed.as_millis(),
            "publish complete"
        );

        Ok(outcome)
    }

    /// Append to the ledger. The transition already happened, so a ledger
    /// failure is logged rather than returned.
    fn record(&self, record: TransitionRecord) {
        if let Err(e) = self.store.ledger().append(&record) {
            warn!(error = %e, subject = %record.subject_id, "failed to record transition");
        }
    }
}

/// Parse a 1-based selection into an index into a list of `len` items.
pub fn parse_selection(input: &str, len: usize) -> Result<usize> {
    let invalid = || CarebookError::InvalidSelection {
        input: input.trim().to_string(),
        max: len,
    };

    let n: usize = input.trim().parse().map_err(|_| invalid())?;
    if n == 0 || n > len {
        return Err(invalid());
    }
    Ok(n - 1)
}

/// Check that a host page path stays under the site root.
pub fn validate_target_page(page: &str) -> Result<&Path> {
    let path = Path::new(page.trim());
    if path.as_os_str().is_empty() {
        return Err(CarebookError::validation("target_page must not be empty"));
    }

    let escapes = path.components().any(|c| {
        matches!(
            c,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });
    if escapes {
        return Err(CarebookError::validation(format!(
            "target_page '{page}' must be a relative path inside the site root"
        )));
    }

    Ok(path)
}

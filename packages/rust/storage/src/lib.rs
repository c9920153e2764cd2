//! Folder-backed article lifecycle store.
//!
//! The [`StageStore`] maps each [`Stage`] to one folder under the vault root.
//! An article is exactly one Markdown file in exactly one of those folders;
//! moving it between stages is a single `rename`, never a copy.
//!
//! **Access rules:**
//! - Callers never build stage paths themselves; they go through
//!   [`StageStore::create`], [`StageStore::find`], and [`StageStore::list`].
//! - [`StageStore::advance`] is the only transition primitive and only moves
//!   forward. Published is terminal.

mod ledger;

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use carebook_markdown::FrontMatter;
use carebook_shared::{CarebookError, Result, Stage, StagesConfig, SubjectId};

pub use ledger::{LEDGER_FILE_NAME, TransitionLog, TransitionRecord, content_sha256};

/// Front matter key holding the article's subject id.
pub const SUBJECT_KEY: &str = "subject_id";

/// What to do when `create` finds an existing file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Replace the file silently (regenerating a draft).
    Overwrite,
    /// Fail with [`CarebookError::AlreadyExists`].
    CreateNew,
}

/// Handle to an article's backing file in one stage folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleFile {
    stage: Stage,
    path: PathBuf,
    subject_hint: Option<SubjectId>,
}

impl ArticleFile {
    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    /// Subject derived from the file name with any stage suffix removed.
    pub fn subject_hint(&self) -> Option<&SubjectId> {
        self.subject_hint.as_ref()
    }
}

/// A loaded article: its file plus decoded front matter and body.
#[derive(Debug, Clone)]
pub struct Article {
    pub file: ArticleFile,
    pub subject_id: SubjectId,
    pub front_matter: FrontMatter,
    pub body: String,
    /// The raw file content, as read.
    pub raw: String,
}

impl Article {
    /// Front matter value for `key`, if the block exists and has it.
    pub fn meta(&self, key: &str) -> Option<&str> {
        self.front_matter.get(key)
    }
}

/// Stage folders under a vault root.
#[derive(Debug, Clone)]
pub struct StageStore {
    root: PathBuf,
    layout: StagesConfig,
}

impl StageStore {
    /// Open a store over `root`. Folders are created lazily on first write.
    pub fn open(root: impl Into<PathBuf>, layout: StagesConfig) -> Result<Self> {
        layout.validate()?;
        Ok(Self {
            root: root.into(),
            layout,
        })
    }

    /// Transition ledger stored alongside the stage folders.
    pub fn ledger(&self) -> TransitionLog {
        TransitionLog::in_vault(&self.root)
    }

    /// All Markdown files in a stage folder, in directory listing order.
    ///
    /// The order is whatever the filesystem returns; sort by file name for a
    /// stable listing. A missing folder is an empty stage.
    pub fn list(&self, stage: Stage) -> Result<Vec<ArticleFile>> {
        let dir = self.stage_dir(stage);
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(CarebookError::io(&dir, e)),
        };

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| CarebookError::io(&dir, e))?;
            let path = entry.path();
            let is_markdown = path.extension().is_some_and(|ext| ext == "md");
            if is_markdown && path.is_file() {
                files.push(self.article_file(stage, path));
            }
        }

        debug!(%stage, count = files.len(), "listed stage");
        Ok(files)
    }

    /// The subject's file in `stage`, if it exists under the stage naming
    /// convention.
    pub fn find(&self, stage: Stage, subject: &SubjectId) -> Option<ArticleFile> {
        let path = self.path_for(stage, subject);
        path.is_file().then(|| ArticleFile {
            stage,
            path,
            subject_hint: Some(subject.clone()),
        })
    }

    /// Like [`find`](Self::find), but a missing file is
    /// [`CarebookError::StageFileMissing`] naming the expected path.
    pub fn require(&self, stage: Stage, subject: &SubjectId) -> Result<ArticleFile> {
        self.find(stage, subject)
            .ok_or_else(|| CarebookError::StageFileMissing {
                path: self.path_for(stage, subject),
            })
    }

    /// Write a new backing file for `subject` in `stage`.
    #[instrument(skip(self, content), fields(%stage, %subject))]
    pub fn create(
        &self,
        stage: Stage,
        subject: &SubjectId,
        content: &str,
        mode: WriteMode,
    ) -> Result<ArticleFile> {
        let dir = self.stage_dir(stage);
        std::fs::create_dir_all(&dir).map_err(|e| CarebookError::io(&dir, e))?;

        let path = self.path_for(stage, subject);
        match mode {
            WriteMode::Overwrite => {
                if path.exists() {
                    info!(path = %path.display(), "replacing existing file");
                }
                std::fs::write(&path, content).map_err(|e| CarebookError::io(&path, e))?;
            }
            WriteMode::CreateNew => {
                let mut file = OpenOptions::new()
                    .write(true)
                    .create_new(true)
                    .open(&path)
                    .map_err(|e| match e.kind() {
                        std::io::ErrorKind::AlreadyExists => {
                            CarebookError::AlreadyExists { path: path.clone() }
                        }
                        _ => CarebookError::io(&path, e),
                    })?;
                file.write_all(content.as_bytes())
                    .map_err(|e| CarebookError::io(&path, e))?;
            }
        }

        info!(path = %path.display(), bytes = content.len(), "wrote article");
        Ok(ArticleFile {
            stage,
            path,
            subject_hint: Some(subject.clone()),
        })
    }

    /// Load an article's front matter and body.
    ///
    /// The subject comes from the `subject_id` front matter key, falling back
    /// to the file name.
    pub fn read(&self, file: &ArticleFile) -> Result<Article> {
        let raw = match std::fs::read_to_string(&file.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CarebookError::StageFileMissing {
                    path: file.path.clone(),
                });
            }
            Err(e) => return Err(CarebookError::io(&file.path, e)),
        };

        let doc = carebook_markdown::decode(&raw);
        let subject_id = match doc.front_matter.get(SUBJECT_KEY) {
            Some(value) => SubjectId::new(value)?,
            None => file.subject_hint.clone().ok_or_else(|| {
                CarebookError::validation(format!(
                    "cannot determine subject of {}",
                    file.path.display()
                ))
            })?,
        };

        Ok(Article {
            file: file.clone(),
            subject_id,
            front_matter: doc.front_matter,
            body: doc.body,
            raw,
        })
    }

    /// Move an article from `from` to `to` by renaming its backing file.
    ///
    /// The file keeps its content and takes the destination stage's naming
    /// convention for `subject`, which is the article's resolved subject
    /// (see [`read`](Self::read)), not necessarily its current file name.
    /// On any failure the source file is left where it was.
    #[instrument(skip(self, file), fields(path = %file.path.display(), %from, %to, %subject))]
    pub fn advance(
        &self,
        file: &ArticleFile,
        from: Stage,
        to: Stage,
        subject: &SubjectId,
    ) -> Result<ArticleFile> {
        if to <= from {
            return Err(CarebookError::InvalidTransition { from, to });
        }
        if file.stage != from {
            return Err(CarebookError::validation(format!(
                "{} is in stage {}, not {from}",
                file.path.display(),
                file.stage
            )));
        }
        if !file.path.is_file() {
            return Err(CarebookError::StageFileMissing {
                path: file.path.clone(),
            });
        }

        let dir = self.stage_dir(to);
        std::fs::create_dir_all(&dir).map_err(|e| CarebookError::io(&dir, e))?;

        let dest = self.path_for(to, subject);
        if dest.exists() {
            warn!(dest = %dest.display(), "destination exists and will be replaced");
        }

        std::fs::rename(&file.path, &dest).map_err(|e| CarebookError::io(&file.path, e))?;

        info!(dest = %dest.display(), "advanced article");
        Ok(ArticleFile {
            stage: to,
            path: dest,
            subject_hint: Some(subject.clone()),
        })
    }

    fn stage_dir(&self, stage: Stage) -> PathBuf {
        self.root.join(&self.layout.get(stage).dir)
    }

    fn path_for(&self, stage: Stage, subject: &SubjectId) -> PathBuf {
        self.stage_dir(stage)
            .join(format!("{subject}{}", self.layout.get(stage).suffix))
    }

    /// Wrap a listed path, deriving the subject from its file name.
    ///
    /// The stage's own suffix is tried first, then the other stages' (a file
    /// moved by hand keeps its old suffix), then the bare `.md` stem.
    fn article_file(&self, stage: Stage, path: PathBuf) -> ArticleFile {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let own = self.layout.get(stage).suffix.as_str();
        let others = Stage::ALL
            .into_iter()
            .filter(|s| *s != stage)
            .map(|s| self.layout.get(s).suffix.as_str());

        let stem = std::iter::once(own)
            .chain(others)
            .chain(std::iter::once(".md"))
            .find_map(|suffix| name.strip_suffix(suffix));

        let subject_hint = stem.and_then(|s| SubjectId::new(s).ok());
        ArticleFile {
            stage,
            path,
            subject_hint,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "carebook-storage-test-{}",
            uuid::Uuid::now_v7()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn store(root: &Path) -> StageStore {
        StageStore::open(root, StagesConfig::default()).unwrap()
    }

    fn subject(s: &str) -> SubjectId {
        SubjectId::new(s).unwrap()
    }

    fn names(files: &[ArticleFile]) -> Vec<String> {
        let mut names: Vec<String> = files.iter().map(ArticleFile::file_name).collect();
        names.sort();
        names
    }

    #[test]
    fn list_missing_stage_is_empty() {
        let tmp = temp_dir();
        assert!(store(&tmp).list(Stage::Editing).unwrap().is_empty());
        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn create_writes_into_stage_folder() {
        let tmp = temp_dir();
        let store = store(&tmp);

        let file = store
            .create(Stage::Draft, &subject("alpha"), "hello", WriteMode::Overwrite)
            .unwrap();

        assert_eq!(file.path(), tmp.join("01-draft/alpha_draft.md"));
        assert_eq!(std::fs::read_to_string(file.path()).unwrap(), "hello");
        assert_eq!(names(&store.list(Stage::Draft).unwrap()), vec!["alpha_draft.md"]);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn overwrite_replaces_existing_draft() {
        let tmp = temp_dir();
        let store = store(&tmp);
        let alpha = subject("alpha");

        store.create(Stage::Draft, &alpha, "v1", WriteMode::Overwrite).unwrap();
        let file = store.create(Stage::Draft, &alpha, "v2", WriteMode::Overwrite).unwrap();

        assert_eq!(std::fs::read_to_string(file.path()).unwrap(), "v2");
        assert_eq!(store.list(Stage::Draft).unwrap().len(), 1);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn create_new_conflicts_with_existing_file() {
        let tmp = temp_dir();
        let store = store(&tmp);
        let alpha = subject("alpha");

        store.create(Stage::Editing, &alpha, "v1", WriteMode::CreateNew).unwrap();
        let err = store
            .create(Stage::Editing, &alpha, "v2", WriteMode::CreateNew)
            .unwrap_err();

        assert!(matches!(err, CarebookError::AlreadyExists { .. }));
        let file = store.find(Stage::Editing, &alpha).unwrap();
        assert_eq!(std::fs::read_to_string(file.path()).unwrap(), "v1");

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn list_skips_non_markdown_entries() {
        let tmp = temp_dir();
        let store = store(&tmp);
        store.create(Stage::Draft, &subject("alpha"), "x", WriteMode::Overwrite).unwrap();
        std::fs::write(tmp.join("01-draft/notes.txt"), "x").unwrap();
        std::fs::create_dir_all(tmp.join("01-draft/attachments.md")).unwrap();

        assert_eq!(names(&store.list(Stage::Draft).unwrap()), vec!["alpha_draft.md"]);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn advance_moves_file_exactly_once() {
        let tmp = temp_dir();
        let store = store(&tmp);
        let draft = store
            .create(Stage::Draft, &subject("alpha"), "body", WriteMode::Overwrite)
            .unwrap();

        let editing = store
            .advance(&draft, Stage::Draft, Stage::Editing, &subject("alpha"))
            .unwrap();

        assert_eq!(editing.stage(), Stage::Editing);
        assert_eq!(editing.path(), tmp.join("02-editing/alpha_editing.md"));
        assert!(store.list(Stage::Draft).unwrap().is_empty());
        assert_eq!(names(&store.list(Stage::Editing).unwrap()), vec!["alpha_editing.md"]);
        assert_eq!(std::fs::read_to_string(editing.path()).unwrap(), "body");

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn failed_advance_leaves_listings_unchanged() {
        let tmp = temp_dir();
        let store = store(&tmp);
        let alpha = store
            .create(Stage::Draft, &subject("alpha"), "a", WriteMode::Overwrite)
            .unwrap();
        store.create(Stage::Draft, &subject("beta"), "b", WriteMode::Overwrite).unwrap();
        std::fs::remove_file(alpha.path()).unwrap();

        let before_draft = names(&store.list(Stage::Draft).unwrap());
        let before_editing = names(&store.list(Stage::Editing).unwrap());

        let err = store
            .advance(&alpha, Stage::Draft, Stage::Editing, &subject("alpha"))
            .unwrap_err();
        assert!(matches!(err, CarebookError::StageFileMissing { .. }));

        assert_eq!(names(&store.list(Stage::Draft).unwrap()), before_draft);
        assert_eq!(names(&store.list(Stage::Editing).unwrap()), before_editing);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn advance_only_moves_forward() {
        let tmp = temp_dir();
        let store = store(&tmp);
        let draft = store
            .create(Stage::Draft, &subject("alpha"), "a", WriteMode::Overwrite)
            .unwrap();
        let published = store
            .advance(&draft, Stage::Draft, Stage::Published, &subject("alpha"))
            .unwrap();

        let err = store
            .advance(&published, Stage::Published, Stage::Editing, &subject("alpha"))
            .unwrap_err();
        assert!(matches!(err, CarebookError::InvalidTransition { .. }));

        let err = store
            .advance(&published, Stage::Published, Stage::Published, &subject("alpha"))
            .unwrap_err();
        assert!(matches!(err, CarebookError::InvalidTransition { .. }));
        assert!(published.path().is_file());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn advance_checks_recorded_stage() {
        let tmp = temp_dir();
        let store = store(&tmp);
        let draft = store
            .create(Stage::Draft, &subject("alpha"), "a", WriteMode::Overwrite)
            .unwrap();

        let err = store
            .advance(&draft, Stage::Editing, Stage::Published, &subject("alpha"))
            .unwrap_err();
        assert!(matches!(err, CarebookError::Validation { .. }));
        assert!(draft.path().is_file());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn require_reports_expected_path() {
        let tmp = temp_dir();
        let store = store(&tmp);

        let err = store.require(Stage::Draft, &subject("alpha")).unwrap_err();
        match err {
            CarebookError::StageFileMissing { path } => {
                assert_eq!(path, tmp.join("01-draft/alpha_draft.md"));
            }
            other => panic!("unexpected error: {other}"),
        }

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn hand_moved_file_keeps_its_subject() {
        let tmp = temp_dir();
        let store = store(&tmp);
        let draft = store
            .create(Stage::Draft, &subject("alpha"), "a", WriteMode::Overwrite)
            .unwrap();

        std::fs::create_dir_all(tmp.join("02-editing")).unwrap();
        std::fs::rename(draft.path(), tmp.join("02-editing/alpha_draft.md")).unwrap();
        std::fs::write(tmp.join("02-editing/loose note.md"), "b").unwrap();

        let mut listed = store.list(Stage::Editing).unwrap();
        listed.sort_by_key(ArticleFile::file_name);
        assert_eq!(listed[0].subject_hint().map(SubjectId::as_str), Some("alpha"));
        assert_eq!(listed[1].subject_hint().map(SubjectId::as_str), Some("loose note"));

        let published = store
            .advance(&listed[0], Stage::Editing, Stage::Published, &subject("alpha"))
            .unwrap();
        assert_eq!(published.path(), tmp.join("03-published/alpha_published.md"));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn advance_names_destination_after_resolved_subject() {
        let tmp = temp_dir();
        let store = store(&tmp);
        std::fs::create_dir_all(tmp.join("02-editing")).unwrap();
        std::fs::write(
            tmp.join("02-editing/my notes.md"),
            "---\nsubject_id: alpha\n---\n\nx",
        )
        .unwrap();

        let listed = store.list(Stage::Editing).unwrap();
        let article = store.read(&listed[0]).unwrap();
        let published = store
            .advance(&listed[0], Stage::Editing, Stage::Published, &article.subject_id)
            .unwrap();

        assert_eq!(published.path(), tmp.join("03-published/alpha_published.md"));
        assert!(store.find(Stage::Published, &subject("alpha")).is_some());
        assert!(store.list(Stage::Editing).unwrap().is_empty());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn read_prefers_front_matter_subject() {
        let tmp = temp_dir();
        let store = store(&tmp);
        let file = store
            .create(
                Stage::Editing,
                &subject("file-name"),
                "---\nsubject_id: alpha\nstatus: draft\n---\n\n# Alpha\n",
                WriteMode::Overwrite,
            )
            .unwrap();

        let article = store.read(&file).unwrap();
        assert_eq!(article.subject_id.as_str(), "alpha");
        assert_eq!(article.meta("status"), Some("draft"));
        assert_eq!(article.body, "# Alpha\n");

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn read_falls_back_to_file_name() {
        let tmp = temp_dir();
        let store = store(&tmp);
        let file = store
            .create(Stage::Editing, &subject("beta"), "# Beta\n", WriteMode::Overwrite)
            .unwrap();

        let article = store.read(&file).unwrap();
        assert_eq!(article.subject_id.as_str(), "beta");
        assert_eq!(article.front_matter, FrontMatter::Absent);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn read_missing_file_is_stage_file_missing() {
        let tmp = temp_dir();
        let store = store(&tmp);
        let file = store
            .create(Stage::Editing, &subject("beta"), "x", WriteMode::Overwrite)
            .unwrap();
        std::fs::remove_file(file.path()).unwrap();

        let err = store.read(&file).unwrap_err();
        assert!(matches!(err, CarebookError::StageFileMissing { .. }));

        let _ = std::fs::remove_dir_all(&tmp);
    }
}

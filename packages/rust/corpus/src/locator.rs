//! Snapshot lookup under the corpus root.

use std::path::PathBuf;

use tracing::{debug, info, instrument};

use carebook_shared::{CarebookError, Result};

/// A resolved OCR snapshot directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Directory name (`<source><timestamp>`).
    pub name: String,
    /// Absolute or root-relative path of the snapshot directory.
    pub dir: PathBuf,
    /// Path of the full-text file inside the snapshot.
    pub text_path: PathBuf,
}

/// Finds the newest snapshot for a named source. Never writes.
#[derive(Debug, Clone)]
pub struct CorpusLocator {
    root: PathBuf,
    full_text_file: String,
}

impl CorpusLocator {
    pub fn new(root: impl Into<PathBuf>, full_text_file: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            full_text_file: full_text_file.into(),
        }
    }

    /// Resolve the newest snapshot whose directory name starts with `source`.
    ///
    /// Newest means lexicographically greatest name, which only holds when the
    /// timestamp suffix sorts chronologically.
    #[instrument(skip(self), fields(root = %self.root.display()))]
    pub fn locate(&self, source: &str) -> Result<Snapshot> {
        let not_found = || CarebookError::CorpusNotFound {
            root: self.root.clone(),
            source_name: source.to_string(),
        };

        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(not_found()),
            Err(e) => return Err(CarebookError::io(&self.root, e)),
        };

        let mut candidates: Vec<(String, PathBuf)> = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| CarebookError::io(&self.root, e))?;
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if !name.starts_with(source) {
                continue;
            }
            let path = entry.path();
            if path.is_dir() {
                candidates.push((name, path));
            }
        }

        candidates.sort_by(|a, b| b.0.cmp(&a.0));
        debug!(
            candidates = ?candidates.iter().map(|(n, _)| n.as_str()).collect::<Vec<_>>(),
            "matching snapshots, newest first"
        );

        let (name, dir) = candidates.into_iter().next().ok_or_else(not_found)?;

        let text_path = dir.join(&self.full_text_file);
        if !text_path.is_file() {
            return Err(CarebookError::CorpusFileMissing { path: text_path });
        }

        info!(snapshot = %name, "using corpus snapshot");
        Ok(Snapshot {
            name,
            dir,
            text_path,
        })
    }

    /// Locate the newest snapshot and read its full text.
    pub fn read_text(&self, source: &str) -> Result<(Snapshot, String)> {
        let snapshot = self.locate(source)?;
        let text = std::fs::read_to_string(&snapshot.text_path)
            .map_err(|e| CarebookError::io(&snapshot.text_path, e))?;
        debug!(bytes = text.len(), "read corpus text");
        Ok((snapshot, text))
    }
}

//! Append-only record of stage transitions.
//!
//! One JSON object per line in `<vault>/transitions.jsonl`. A record is
//! appended after each successful transition; the stage folders remain the
//! source of truth and the ledger is never read back to decide anything.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;
use uuid::Uuid;

use carebook_shared::{CarebookError, RegionId, Result, Stage, SubjectId};

pub const LEDGER_FILE_NAME: &str = "transitions.jsonl";

/// One line of the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub id: Uuid,
    pub subject_id: SubjectId,
    /// `None` when the article was created.
    pub from: Option<Stage>,
    pub to: Stage,
    pub at: DateTime<Utc>,
    pub content_sha256: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_page: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

impl TransitionRecord {
    pub fn new(subject_id: SubjectId, from: Option<Stage>, to: Stage, content: &str) -> Self {
        Self {
            id: Uuid::now_v7(),
            subject_id,
            from,
            to,
            at: Utc::now(),
            content_sha256: content_sha256(content),
            target_page: None,
            region: None,
        }
    }

    /// Attach the page and region a published article was spliced into.
    pub fn with_target(mut self, page: impl Into<String>, region: &RegionId) -> Self {
        self.target_page = Some(page.into());
        self.region = Some(region.to_string());
        self
    }
}

/// Hex SHA-256 of article content.
pub fn content_sha256(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Handle to a ledger file.
#[derive(Debug, Clone)]
pub struct TransitionLog {
    path: PathBuf,
}

impl TransitionLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_vault(vault_root: &Path) -> Self {
        Self::new(vault_root.join(LEDGER_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, record: &TransitionRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CarebookError::io(parent, e))?;
        }

        let mut line = serde_json::to_string(record)
            .map_err(|e| CarebookError::validation(format!("cannot encode transition: {e}")))?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| CarebookError::io(&self.path, e))?;
        file.write_all(line.as_bytes())
            .map_err(|e| CarebookError::io(&self.path, e))?;

        debug!(
            subject = %record.subject_id,
            from = record.from.map(|s| s.as_str()).unwrap_or("-"),
            to = %record.to,
            "recorded transition"
        );
        Ok(())
    }

    /// Every record in file order. A missing ledger is empty.
    pub fn read_all(&self) -> Result<Vec<TransitionRecord>> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(CarebookError::io(&self.path, e)),
        };

        text.lines()
            .filter(|line| !line.trim().is_empty())
            .enumerate()
            .map(|(i, line)| {
                serde_json::from_str(line).map_err(|e| {
                    CarebookError::validation(format!(
                        "{} line {}: {e}",
                        self.path.display(),
                        i + 1
                    ))
                })
            })
            .collect()
    }

    /// Records for one subject, oldest first.
    pub fn history(&self, subject: &SubjectId) -> Result<Vec<TransitionRecord>> {
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|r| &r.subject_id == subject)
            .collect())
    }
}

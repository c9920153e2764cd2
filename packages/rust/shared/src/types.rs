//! Core domain types for the article pipeline.

use serde::{Deserialize, Serialize};

use crate::error::{CarebookError, Result};

// ---------------------------------------------------------------------------
// SubjectId
// ---------------------------------------------------------------------------

/// Stable identifier of an article's subject (e.g. a species epithet).
///
/// Used verbatim in file names and region markers, so it must be non-empty,
/// free of path separators and control characters, and must not contain the
/// HTML comment terminator `-->`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SubjectId(String);

impl SubjectId {
    /// Validate and wrap a subject identifier. Surrounding whitespace is trimmed.
    pub fn new(raw: impl AsRef<str>) -> Result<Self> {
        let trimmed = raw.as_ref().trim();

        if trimmed.is_empty() {
            return Err(CarebookError::validation("subject id must not be empty"));
        }
        if trimmed.contains(['/', '\\']) || trimmed == "." || trimmed == ".." {
            return Err(CarebookError::validation(format!(
                "subject id '{trimmed}' must not contain path separators"
            )));
        }
        if trimmed.chars().any(char::is_control) {
            return Err(CarebookError::validation(
                "subject id must not contain control characters",
            ));
        }
        if trimmed.contains("-->") {
            return Err(CarebookError::validation(format!(
                "subject id '{trimmed}' must not contain '-->'"
            )));
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SubjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for SubjectId {
    type Err = CarebookError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for SubjectId {
    type Error = CarebookError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<SubjectId> for String {
    fn from(id: SubjectId) -> Self {
        id.0
    }
}

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// Lifecycle phase of an article. Declaration order is lifecycle order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Draft,
    Editing,
    Published,
}

impl Stage {
    /// All stages in lifecycle order.
    pub const ALL: [Stage; 3] = [Stage::Draft, Stage::Editing, Stage::Published];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Editing => "editing",
            Self::Published => "published",
        }
    }

    /// The stage that follows this one, or `None` for the terminal stage.
    pub fn next(&self) -> Option<Stage> {
        match self {
            Self::Draft => Some(Self::Editing),
            Self::Editing => Some(Self::Published),
            Self::Published => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.next().is_none()
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Stage {
    type Err = CarebookError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(Self::Draft),
            "editing" => Ok(Self::Editing),
            "published" => Ok(Self::Published),
            other => Err(CarebookError::validation(format!(
                "unknown stage '{other}': expected draft, editing, or published"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// RegionId
// ---------------------------------------------------------------------------

/// Suffix appended to a subject id to name its host-document region.
const REGION_SUFFIX: &str = "-care";

/// Identifier of a marker-delimited region inside a host document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegionId(String);

impl RegionId {
    /// The region owned by a subject's care article.
    pub fn for_subject(subject: &SubjectId) -> Self {
        Self(format!("{subject}{REGION_SUFFIX}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RegionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

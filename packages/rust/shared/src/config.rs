//! Application configuration for carebook.
//!
//! Every field has a default that reproduces the fixed folder layout, so no
//! config file is required. A file is read only from an explicit `--config`
//! path or from `./carebook.toml` when it exists. CLI flags override config
//! file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CarebookError, Result};
use crate::types::Stage;

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "carebook.toml";

// ---------------------------------------------------------------------------
// Config structs (matching carebook.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Filesystem roots.
    #[serde(default)]
    pub paths: PathsConfig,

    /// Corpus lookup and span extraction.
    #[serde(default)]
    pub corpus: CorpusConfig,

    /// Draft template labels.
    #[serde(default)]
    pub draft: DraftConfig,

    /// Stage folder layout.
    #[serde(default)]
    pub stages: StagesConfig,

    /// Host document splicing.
    #[serde(default)]
    pub splice: SpliceConfig,
}

/// `[paths]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Vault root holding the three stage folders.
    #[serde(default = "default_vault")]
    pub vault: PathBuf,

    /// Root directory containing OCR snapshot directories.
    #[serde(default = "default_corpus_root")]
    pub corpus: PathBuf,

    /// Site root that `target_page` values are resolved against.
    #[serde(default = "default_site_root")]
    pub site: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            vault: default_vault(),
            corpus: default_corpus_root(),
            site: default_site_root(),
        }
    }
}

fn default_vault() -> PathBuf {
    PathBuf::from("../Platycerium-Articles")
}
fn default_corpus_root() -> PathBuf {
    PathBuf::from("../kindle-ocr/output")
}
fn default_site_root() -> PathBuf {
    PathBuf::from(".")
}

/// `[corpus]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusConfig {
    /// Source name used when `draft` is run without `--source`.
    #[serde(default = "default_source_name")]
    pub source_name: String,

    /// Name of the full-text file inside each snapshot directory.
    #[serde(default = "default_full_text_file")]
    pub full_text_file: String,

    /// Lines of context taken on each side of the first match.
    #[serde(default = "default_context_lines")]
    pub context_lines: usize,

    /// Abbreviated genus token that may precede the subject (`P. bifurcatum`).
    #[serde(default = "default_taxon_prefix")]
    pub taxon_prefix: String,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            source_name: default_source_name(),
            full_text_file: default_full_text_file(),
            context_lines: default_context_lines(),
            taxon_prefix: default_taxon_prefix(),
        }
    }
}

fn default_source_name() -> String {
    "NHK_Shumi_no_Engei_Platycerium".into()
}
fn default_full_text_file() -> String {
    "full_text.txt".into()
}
fn default_context_lines() -> usize {
    50
}
fn default_taxon_prefix() -> String {
    "P.".into()
}

/// `[draft]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftConfig {
    /// Genus written in front of the subject in the scientific-name field.
    #[serde(default = "default_genus")]
    pub genus: String,

    /// Human-readable source label written to front matter and the footer.
    #[serde(default = "default_source_label")]
    pub source_label: String,

    /// Host page (relative to the site root) new drafts are merged into.
    #[serde(default = "default_target_page")]
    pub target_page: String,
}

impl Default for DraftConfig {
    fn default() -> Self {
        Self {
            genus: default_genus(),
            source_label: default_source_label(),
            target_page: default_target_page(),
        }
    }
}

fn default_genus() -> String {
    "Platycerium".into()
}
fn default_source_label() -> String {
    "NHK Shumi no Engei: Platycerium".into()
}
fn default_target_page() -> String {
    "species/detail.html".into()
}

/// Folder name and file suffix for one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageDirConfig {
    /// Folder name under the vault root.
    pub dir: String,
    /// Suffix appended to the subject id to form the file name.
    pub suffix: String,
}

/// `[stages]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagesConfig {
    #[serde(default = "default_draft_dir")]
    pub draft: StageDirConfig,
    #[serde(default = "default_editing_dir")]
    pub editing: StageDirConfig,
    #[serde(default = "default_published_dir")]
    pub published: StageDirConfig,
}

impl StagesConfig {
    /// Layout entry for a stage.
    pub fn get(&self, stage: Stage) -> &StageDirConfig {
        match stage {
            Stage::Draft => &self.draft,
            Stage::Editing => &self.editing,
            Stage::Published => &self.published,
        }
    }

    /// Reject layouts where two stages share a folder or a suffix cannot
    /// produce a Markdown file name.
    pub fn validate(&self) -> Result<()> {
        for stage in Stage::ALL {
            let entry = self.get(stage);
            if entry.dir.trim().is_empty() {
                return Err(CarebookError::config(format!(
                    "stages.{stage}.dir must not be empty"
                )));
            }
            if !entry.suffix.ends_with(".md") {
                return Err(CarebookError::config(format!(
                    "stages.{stage}.suffix must end with .md"
                )));
            }
        }

        let dirs = [&self.draft.dir, &self.editing.dir, &self.published.dir];
        if dirs[0] == dirs[1] || dirs[1] == dirs[2] || dirs[0] == dirs[2] {
            return Err(CarebookError::config("stage folders must be distinct"));
        }

        Ok(())
    }
}

impl Default for StagesConfig {
    fn default() -> Self {
        Self {
            draft: default_draft_dir(),
            editing: default_editing_dir(),
            published: default_published_dir(),
        }
    }
}

fn default_draft_dir() -> StageDirConfig {
    StageDirConfig {
        dir: "01-draft".into(),
        suffix: "_draft.md".into(),
    }
}
fn default_editing_dir() -> StageDirConfig {
    StageDirConfig {
        dir: "02-editing".into(),
        suffix: "_editing.md".into(),
    }
}
fn default_published_dir() -> StageDirConfig {
    StageDirConfig {
        dir: "03-published".into(),
        suffix: "_published.md".into(),
    }
}

/// `[splice]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpliceConfig {
    /// Tag marking the container new regions are seeded into.
    #[serde(default = "default_anchor")]
    pub anchor: String,
}

impl Default for SpliceConfig {
    fn default() -> Self {
        Self {
            anchor: default_anchor(),
        }
    }
}

fn default_anchor() -> String {
    r#"<div id="care-guide-section">"#.into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Load the application config.
///
/// An explicit path must exist. Without one, `./carebook.toml` is used when
/// present and defaults otherwise.
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig> {
    let config = match explicit {
        Some(path) => load_config_from(path)?,
        None => {
            let path = PathBuf::from(CONFIG_FILE_NAME);
            if path.exists() {
                load_config_from(&path)?
            } else {
                tracing::debug!(?path, "config file not found, using defaults");
                AppConfig::default()
            }
        }
    };

    config.stages.validate()?;
    Ok(config)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| CarebookError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        CarebookError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Write a default config file to `path`, refusing to clobber an existing one.
pub fn init_config(path: &Path) -> Result<PathBuf> {
    if path.exists() {
        return Err(CarebookError::AlreadyExists {
            path: path.to_path_buf(),
        });
    }

    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| CarebookError::config(e.to_string()))?;

    std::fs::write(path, content).map_err(|e| CarebookError::io(path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path.to_path_buf())
}

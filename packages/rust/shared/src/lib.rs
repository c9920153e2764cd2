//! Shared types, error model, and configuration for carebook.
//!
//! This crate is the foundation depended on by all other carebook crates.
//! It provides:
//! - [`CarebookError`]: the unified error type
//! - Domain types ([`SubjectId`], [`Stage`], [`RegionId`])
//! - Configuration ([`AppConfig`] and its sections, config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CONFIG_FILE_NAME, CorpusConfig, DraftConfig, PathsConfig, SpliceConfig,
    StageDirConfig, StagesConfig, init_config, load_config, load_config_from,
};
pub use error::{CarebookError, Result};
pub use types::{RegionId, Stage, SubjectId};

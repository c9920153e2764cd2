//! Core pipeline orchestration and domain logic for carebook.
//!
//! This crate ties together corpus lookup, draft composition, the stage
//! store, Markdown conversion, and host-page splicing into end-to-end
//! workflows (e.g., `Pipeline::publish`).

pub mod draft;
pub mod pipeline;

pub use draft::{DraftInput, compose_draft};
pub use pipeline::{
    DraftOutcome, Pipeline, ProgressReporter, PublishOutcome, SilentProgress, parse_selection,
    validate_target_page,
};

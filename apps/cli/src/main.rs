//! carebook CLI: species care articles from OCR corpus to published page.
//!
//! Drafts are generated from the newest corpus snapshot, edited by hand in
//! the vault, and merged into the site's host page on publish.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli)
}

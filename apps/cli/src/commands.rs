//! CLI command definitions, routing, and tracing setup.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use carebook_core::{Pipeline, ProgressReporter, parse_selection};
use carebook_shared::{AppConfig, CONFIG_FILE_NAME, Stage, SubjectId, init_config, load_config};
use carebook_storage::ArticleFile;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// carebook: move species care articles from scanned source to site page.
#[derive(Parser)]
#[command(
    name = "carebook",
    version,
    about = "Draft, edit, and publish species care articles.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file (defaults to ./carebook.toml when present).
    #[arg(long, global = true, env = "CAREBOOK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Vault root holding the stage folders.
    #[arg(long, global = true, env = "CAREBOOK_VAULT")]
    pub vault: Option<PathBuf>,

    /// Root directory of the OCR corpus snapshots.
    #[arg(long, global = true, env = "CAREBOOK_CORPUS")]
    pub corpus: Option<PathBuf>,

    /// Site root that host pages are resolved against.
    #[arg(long, global = true, env = "CAREBOOK_SITE")]
    pub site: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Generate a draft for a subject from the newest corpus snapshot.
    Draft {
        /// Subject to draft (prompted for when omitted).
        subject: Option<String>,

        /// Corpus source name (defaults to the configured source).
        #[arg(short, long)]
        source: Option<String>,
    },

    /// Move a subject's draft into the editing stage.
    Edit {
        /// Subject whose draft to move.
        subject: String,
    },

    /// Merge an edited article into its host page and mark it published.
    Publish {
        /// 1-based position in the editing list (prompted for when omitted).
        selection: Option<String>,
    },

    /// List articles in one stage, or in all of them.
    List {
        /// draft, editing, or published.
        stage: Option<Stage>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "carebook=info",
        1 => "carebook=debug",
        _ => "carebook=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) fn run(cli: Cli) -> Result<()> {
    if let Command::Config { action } = &cli.command {
        return match action {
            ConfigAction::Init => cmd_config_init(cli.config.as_deref()),
            ConfigAction::Show => cmd_config_show(&resolve_config(&cli)?),
        };
    }

    let config = resolve_config(&cli)?;
    let pipeline = Pipeline::from_config(&config)?;

    match cli.command {
        Command::Draft { subject, source } => {
            cmd_draft(&pipeline, subject.as_deref(), source.as_deref())
        }
        Command::Edit { subject } => cmd_edit(&pipeline, &subject),
        Command::Publish { selection } => cmd_publish(&pipeline, selection.as_deref()),
        Command::List { stage } => cmd_list(&pipeline, stage),
        Command::Config { .. } => Ok(()),
    }
}

/// Load the config file, then apply path overrides from flags.
fn resolve_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = load_config(cli.config.as_deref())?;

    if let Some(vault) = &cli.vault {
        config.paths.vault = vault.clone();
    }
    if let Some(corpus) = &cli.corpus {
        config.paths.corpus = corpus.clone();
    }
    if let Some(site) = &cli.site {
        config.paths.site = site.clone();
    }

    Ok(config)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn cmd_draft(pipeline: &Pipeline, subject: Option<&str>, source: Option<&str>) -> Result<()> {
    let raw = match subject {
        Some(s) => s.to_string(),
        None => prompt(
            &mut std::io::stdin().lock(),
            &mut std::io::stderr(),
            "Subject name: ",
        )?,
    };
    let subject = SubjectId::new(&raw)?;

    info!(%subject, source = source.unwrap_or("(default)"), "generating draft");

    let reporter = CliProgress::new();
    let today = chrono::Local::now().date_naive();
    let outcome = pipeline.generate_draft(&subject, source, today, &reporter)?;

    println!();
    println!("  Draft created.");
    println!("  Subject:  {subject}");
    println!("  Snapshot: {}", outcome.snapshot.name);
    if !outcome.found {
        println!("  Note:     subject not found in corpus, placeholder inserted");
    }
    println!("  Path:     {}", outcome.file.path().display());
    println!();
    println!("  Next: edit the draft, then run `carebook edit {subject}`.");
    println!();

    Ok(())
}

fn cmd_edit(pipeline: &Pipeline, subject: &str) -> Result<()> {
    let subject = SubjectId::new(subject)?;
    let reporter = CliProgress::new();
    let file = pipeline.start_editing(&subject, &reporter)?;

    println!("  Moved to editing: {}", file.path().display());
    Ok(())
}

fn cmd_publish(pipeline: &Pipeline, selection: Option<&str>) -> Result<()> {
    let queue = pipeline.editing_queue()?;
    if queue.is_empty() {
        return Err(eyre!(
            "no articles in the editing stage; move a draft there first"
        ));
    }

    let chosen = match selection {
        Some(s) => s.to_string(),
        None => {
            let mut err = std::io::stderr();
            print_listing(&mut err, &queue)?;
            prompt(&mut std::io::stdin().lock(), &mut err, "Publish which article? ")?
        }
    };
    let file = &queue[parse_selection(&chosen, queue.len())?];

    info!(file = %file.file_name(), "publishing");

    let reporter = CliProgress::new();
    let outcome = pipeline.publish(file, &reporter)?;

    println!();
    println!("  Article published.");
    println!("  Subject: {}", outcome.subject);
    println!("  Region:  {} ({})", outcome.region, outcome.splice.as_str());
    println!("  Host:    {}", outcome.host.display());
    println!("  Words:   {}", outcome.word_count);
    println!("  Path:    {}", outcome.file.path().display());
    println!("  Time:    {:.1}s", outcome.elapsed.as_secs_f64());
    println!();

    Ok(())
}

fn cmd_list(pipeline: &Pipeline, stage: Option<Stage>) -> Result<()> {
    let stages = match stage {
        Some(stage) => vec![stage],
        None => Stage::ALL.to_vec(),
    };

    let mut out = std::io::stdout().lock();
    for stage in stages {
        let mut files = pipeline.store().list(stage)?;
        files.sort_by_key(ArticleFile::file_name);

        writeln!(out, "{stage} ({})", files.len())?;
        print_listing(&mut out, &files)?;
    }

    Ok(())
}

fn cmd_config_init(explicit: Option<&Path>) -> Result<()> {
    let path = explicit.unwrap_or(Path::new(CONFIG_FILE_NAME));
    let path = init_config(path)?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Terminal helpers
// ---------------------------------------------------------------------------

/// Ask a question and return the trimmed answer.
fn prompt(input: &mut impl BufRead, output: &mut impl Write, question: &str) -> Result<String> {
    write!(output, "{question}")?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// Numbered file listing, 1-based to match selection input.
fn print_listing(out: &mut impl Write, files: &[ArticleFile]) -> Result<()> {
    for (i, file) in files.iter().enumerate() {
        writeln!(out, "  {:>3}. {}", i + 1, file.file_name())?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn done(&self, summary: &str) {
        self.spinner.finish_with_message(summary.to_string());
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}

//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use teamscrape_core::{Collaborators, PipelineReport, ProgressReporter, run_consolidation, run_pipeline};
use teamscrape_crawler::{DirectoryPageResolver, LlmTeamExtractor, Session};
use teamscrape_discovery::{ContactSource, CsvContactSource, DirectoryContactSource};
use teamscrape_shared::{AppConfig, RunConfig, init_config, load_config, load_config_from};
use teamscrape_storage::{CONSOLIDATED_KEY, CheckpointStore};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// teamscrape: directory → team pages → one table of people.
#[derive(Parser, Debug)]
#[command(
    name = "teamscrape",
    version,
    about = "Collect team members from organization websites into one CSV.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ~/.teamscrape/teamscrape.toml).
    #[arg(long, global = true, env = "TEAMSCRAPE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Checkpoint directory holding every artifact.
    #[arg(long, global = true, env = "TEAMSCRAPE_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Concurrent collaborator calls per stage.
    #[arg(long, global = true)]
    pub concurrency: Option<u32>,

    /// Per-call timeout in seconds.
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Run every stage, resuming from existing checkpoints (the default).
    Run {
        /// Read seeds from this CSV instead of crawling the directory.
        #[arg(long)]
        seeds: Option<PathBuf>,
    },

    /// Rebuild the consolidated CSV from artifacts already on disk.
    Consolidate,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
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
        0 => "teamscrape=info",
        1 => "teamscrape=debug",
        _ => "teamscrape=trace",
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
// Config resolution
// ---------------------------------------------------------------------------

impl Cli {
    /// Load the config file, then apply flag overrides.
    fn app_config(&self) -> Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => load_config_from(path)?,
            None => load_config()?,
        };

        if let Some(dir) = &self.data_dir {
            config.defaults.data_dir = dir.display().to_string();
        }
        if let Some(n) = self.concurrency {
            config.defaults.concurrency = n;
        }
        if let Some(secs) = self.timeout {
            config.defaults.call_timeout_secs = secs;
        }
        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match &cli.command {
        None => cmd_run(&cli.app_config()?, None).await,
        Some(Command::Run { seeds }) => cmd_run(&cli.app_config()?, seeds.clone()).await,
        Some(Command::Consolidate) => cmd_consolidate(&cli.app_config()?),
        Some(Command::Config { action }) => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(&cli.app_config()?),
        },
    }
}

async fn cmd_run(config: &AppConfig, seeds: Option<PathBuf>) -> Result<()> {
    let run = RunConfig::from(config);

    // Fails on a missing API key before the data dir is touched.
    let collaborators = {
        let session = Arc::new(Session::new(&config.http)?);
        let source: Arc<dyn ContactSource> = match seeds {
            Some(path) => Arc::new(CsvContactSource::new(path)),
            None => Arc::new(DirectoryContactSource::new(
                Arc::clone(&session),
                &config.directory,
            )),
        };
        Collaborators {
            source,
            resolver: Arc::new(DirectoryPageResolver::new(
                Arc::clone(&session),
                &config.directory.website_selector,
            )?),
            extractor: Arc::new(LlmTeamExtractor::from_env(
                Arc::clone(&session),
                &config.llm,
            )?),
        }
    };
    let store = Arc::new(CheckpointStore::open(&run.data_dir)?);

    info!(
        data_dir = %run.data_dir.display(),
        concurrency = run.concurrency,
        model = %config.llm.model,
        "starting run"
    );

    let reporter = CliProgress::new();
    let report = run_pipeline(store, &run, &collaborators, &reporter).await?;

    print_report(&report, &run);
    Ok(())
}

fn cmd_consolidate(config: &AppConfig) -> Result<()> {
    let run = RunConfig::from(config);
    let store = CheckpointStore::open(&run.data_dir)?;
    let rows = run_consolidation(&store)?;

    println!(
        "Wrote {} rows to {}",
        rows.len(),
        run.data_dir.join(CONSOLIDATED_KEY).display()
    );
    Ok(())
}

fn print_report(report: &PipelineReport, run: &RunConfig) {
    println!();
    println!("  Run complete.");
    println!("  Seeds:      {}", report.seeds);
    println!(
        "  Pages:      {} ({} unresolved)",
        report.pages, report.unresolved
    );
    println!(
        "  Extracted:  {} new, {} cached, {} failed",
        report.artifacts_written, report.artifacts_skipped, report.failed_extractions
    );
    println!("  Rows:       {}", report.rows);
    println!(
        "  Output:     {}",
        run.data_dir.join(CONSOLIDATED_KEY).display()
    );
    println!("  Time:       {:.1}s", report.elapsed.as_secs_f64());
    println!();
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
    phase: std::sync::Mutex<String>,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self {
            spinner,
            phase: std::sync::Mutex::new(String::new()),
        }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        if let Ok(mut phase) = self.phase.lock() {
            *phase = name.to_string();
        }
        self.spinner.set_message(name.to_string());
    }

    fn item(&self, current: usize, total: usize, detail: &str) {
        let phase = self.phase.lock().map(|p| p.clone()).unwrap_or_default();
        self.spinner
            .set_message(format!("{phase} [{current}/{total}] {detail}"));
    }

    fn done(&self, _report: &PipelineReport) {
        self.spinner.finish_and_clear();
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}

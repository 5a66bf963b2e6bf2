//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use aragorn_core::pipeline::{Pipeline, PipelineResult, PipelineRun, ProgressReporter, Stage};
use aragorn_core::query::one_hop_message;
use aragorn_core::snapshot::{DirectorySnapshots, NoSnapshots, SnapshotSink};
use aragorn_shared::{
    AppConfig, ExpansionSource, MergeStrategy, Message, PipelineConfig, init_config, load_config,
};
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Aragorn: expand, coalesce, overlay, weight and score biomedical queries.
#[derive(Parser)]
#[command(
    name = "aragorn",
    version,
    about = "Chain knowledge-graph services into a ranked, annotated answer set.",
    long_about = None,
)]
pub(crate) struct Cli {
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
    /// Run a query message through the full service pipeline.
    Run {
        /// Path to a JSON query message.
        #[arg(short, long)]
        input: PathBuf,

        /// Answer coalesce strategy (none, all, graph, property, ontology).
        #[arg(short, long)]
        strategy: Option<String>,

        /// Write intermediate answers to this directory.
        #[arg(long)]
        snapshot_dir: Option<PathBuf>,

        /// Read the Strider answer from this file instead of calling the service.
        #[arg(long)]
        fixture: Option<PathBuf>,

        /// HTTP timeout in seconds for every service call.
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Write the result here instead of stdout.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Build a one-hop query message.
    #[command(name = "one-hop")]
    OneHop {
        /// CURIE bound to the first node.
        #[arg(long)]
        curie_a: String,

        /// Semantic type of the first node.
        #[arg(long)]
        type_a: String,

        /// Semantic type of the second (unbound) node.
        #[arg(long)]
        type_b: String,

        /// Edge predicate type.
        #[arg(long)]
        edge_type: Option<String>,

        /// Point the edge from b to a (only applies with --edge-type).
        #[arg(long)]
        reverse: bool,

        /// Write the message here instead of stdout.
        #[arg(short, long)]
        out: Option<PathBuf>,
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

/// Initialize tracing based on CLI flags. Logs go to stderr; stdout carries JSON results.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "aragorn=info",
        1 => "aragorn=debug",
        _ => "aragorn=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
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
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run {
            input,
            strategy,
            snapshot_dir,
            fixture,
            timeout_secs,
            out,
        } => {
            let opts = RunOptions {
                input,
                strategy,
                snapshot_dir,
                fixture,
                timeout_secs,
                out,
            };
            cmd_run(opts).await
        }
        Command::OneHop {
            curie_a,
            type_a,
            type_b,
            edge_type,
            reverse,
            out,
        } => cmd_one_hop(
            &curie_a,
            &type_a,
            &type_b,
            edge_type.as_deref(),
            reverse,
            out.as_deref(),
        ),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

struct RunOptions {
    input: PathBuf,
    strategy: Option<String>,
    snapshot_dir: Option<PathBuf>,
    fixture: Option<PathBuf>,
    timeout_secs: Option<u64>,
    out: Option<PathBuf>,
}

async fn cmd_run(opts: RunOptions) -> Result<()> {
    let config = load_config()?;
    let mut pipeline_config = PipelineConfig::try_from(&config)?;

    if let Some(path) = opts.fixture {
        pipeline_config.expansion = ExpansionSource::Fixture(path);
    }
    if opts.timeout_secs.is_some() {
        pipeline_config.timeout_secs = opts.timeout_secs;
    }

    let strategy: MergeStrategy = match opts.strategy.as_deref() {
        Some(s) => s.parse()?,
        None => pipeline_config.merge_strategy.clone(),
    };

    let raw = std::fs::read_to_string(&opts.input)
        .wrap_err_with(|| format!("cannot read query message '{}'", opts.input.display()))?;
    let message: Message = serde_json::from_str(&raw)
        .wrap_err_with(|| format!("'{}' is not a valid query message", opts.input.display()))?;

    let snapshot_dir = opts
        .snapshot_dir
        .or_else(|| config.defaults.snapshot_dir.as_ref().map(PathBuf::from));
    let snapshots: Box<dyn SnapshotSink> = match snapshot_dir {
        Some(dir) => {
            info!(dir = %dir.display(), "writing intermediate snapshots");
            Box::new(DirectorySnapshots::new(dir))
        }
        None => Box::new(NoSnapshots),
    };

    info!(
        input = %opts.input.display(),
        %strategy,
        "running pipeline"
    );

    let pipeline = Pipeline::new(pipeline_config)?;
    let reporter = CliProgress::new();
    let outcome = pipeline
        .run(&message, &strategy, snapshots.as_ref(), &reporter)
        .await;

    if let Err(failure) = &outcome {
        reporter.spinner.finish_and_clear();
        warn!(stage = %failure.stage, cause = %failure.cause, "pipeline aborted");
    }

    let result = PipelineResult::from(outcome);
    let failed = result.is_error();
    emit_json(&result.into_json(), opts.out.as_deref())?;

    if failed {
        return Err(eyre!("pipeline aborted, see error mapping above"));
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
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

fn stage_title(stage: Stage) -> &'static str {
    match stage {
        Stage::Expand => "Expanding query via Strider",
        Stage::Merge => "Coalescing answers",
        Stage::Annotate => "Overlaying omnicorp co-occurrence",
        Stage::Weight => "Weighting answer correctness",
        Stage::Score => "Scoring answers",
    }
}

impl ProgressReporter for CliProgress {
    fn stage_started(&self, stage: Stage) {
        self.spinner.set_message(stage_title(stage));
    }

    fn stage_finished(&self, stage: Stage) {
        self.spinner.println(format!("  ✓ {}", stage_title(stage)));
    }

    fn stage_skipped(&self, stage: Stage) {
        self.spinner
            .println(format!("  - {} (skipped)", stage_title(stage)));
    }

    fn done(&self, run: &PipelineRun) {
        self.spinner.finish_and_clear();
        info!(
            correlation_id = %run.correlation_id,
            started_at = %run.started_at.to_rfc3339(),
            elapsed_ms = run.elapsed.as_millis(),
            "answers scored"
        );
    }
}

// ---------------------------------------------------------------------------
// one-hop
// ---------------------------------------------------------------------------

fn cmd_one_hop(
    curie_a: &str,
    type_a: &str,
    type_b: &str,
    edge_type: Option<&str>,
    reverse: bool,
    out: Option<&Path>,
) -> Result<()> {
    if reverse && edge_type.is_none() {
        warn!("--reverse has no effect without --edge-type");
    }

    let message = one_hop_message(curie_a, type_a, type_b, edge_type, reverse);
    emit_json(&serde_json::to_value(&message)?, out)
}

/// Pretty-print JSON to a file or stdout.
fn emit_json(value: &serde_json::Value, out: Option<&Path>) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    match out {
        Some(path) => {
            std::fs::write(path, format!("{text}\n"))
                .wrap_err_with(|| format!("cannot write '{}'", path.display()))?;
            info!(path = %path.display(), "wrote result");
        }
        None => println!("{text}"),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

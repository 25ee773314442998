#![warn(missing_docs)]
//! Splitlab CLI Library
//!
//! Command-line front end of the analysis engine: configuration discovery
//! (`splitlab.toml` plus flag overrides), table loading, the analysis
//! pipeline and report output.
//!
//! # Example
//!
//! ```text
//! splitlab analyze orders.csv --line-items order_products.csv --format json
//! splitlab assign orders.csv > assignments.csv
//! splitlab init > splitlab.toml
//! ```

mod config;
mod loader;
mod pipeline;

pub use config::*;
pub use loader::{load_assignments_csv, load_line_items_csv, load_orders_csv, FileSource};
pub use pipeline::{
    build_report, collect_metrics, compute_outcomes, format_human_output, guardrail_config,
    run_analysis, run_bootstrap, run_cuped, run_power, run_significance, MetricSamples,
    OutcomeSet, CUPED_METRIC,
};

use anyhow::Context;
use clap::{Parser, Subcommand};
use rayon::ThreadPoolBuilder;
use splitlab_core::{assign_users, AnalysisConfig, OrderSource};
use splitlab_report::{generate_csv_report, generate_json_report, OutputFormat, Report};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Splitlab CLI arguments
#[derive(Parser, Debug)]
#[command(name = "splitlab")]
#[command(author, version, about = "Splitlab - A/B experiment analysis")]
pub struct Cli {
    /// What to do
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (default: discover splitlab.toml upwards from cwd)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format: json, csv, human
    #[arg(long, global = true)]
    pub format: Option<String>,

    /// Output file (stdout if not specified)
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    /// Assignment salt
    #[arg(long, global = true)]
    pub salt: Option<String>,

    /// Share of users assigned to variant B
    #[arg(long, global = true)]
    pub split_ratio: Option<f64>,

    /// Outcome window length in days
    #[arg(long, global = true)]
    pub window_days: Option<u32>,

    /// Significance level
    #[arg(long, global = true)]
    pub alpha: Option<f64>,

    /// Bootstrap replicate count
    #[arg(long, global = true)]
    pub replicates: Option<usize>,

    /// Bootstrap seed
    #[arg(long, global = true)]
    pub seed: Option<u64>,

    /// Skip bootstrap intervals
    #[arg(long, global = true)]
    pub no_bootstrap: bool,

    /// Number of threads for parallel computation
    /// 0 = use all available cores (default), 1 = single-threaded
    #[arg(long, short = 'j', default_value = "0", global = true)]
    pub threads: usize,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full analysis and print the report
    Analyze {
        /// Orders table (CSV or JSON)
        orders: PathBuf,
        /// Line-item table; without it every order has volume 0
        #[arg(long)]
        line_items: Option<PathBuf>,
        /// Previously recorded assignments, checked for contamination
        #[arg(long)]
        assignments: Option<PathBuf>,
        /// Exit with an error when any guardrail fails
        #[arg(long)]
        strict: bool,
    },
    /// Print the assignment table for every user in the orders table
    Assign {
        /// Orders table (CSV or JSON)
        orders: PathBuf,
    },
    /// Print a default splitlab.toml
    Init,
}

/// Run the Splitlab CLI with the process arguments.
///
/// # Returns
/// Returns `Ok(())` on success, or an error if something goes wrong.
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run_with_cli(cli)
}

/// Run the Splitlab CLI with pre-parsed arguments.
pub fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    // Initialize logging
    let filter = if cli.verbose {
        "splitlab=debug"
    } else {
        "splitlab=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Commands::Init = cli.command {
        return emit(&cli.output, &SplitConfig::default_toml());
    }

    // Configure Rayon thread pool for resampling and aggregation
    if cli.threads > 0 {
        ThreadPoolBuilder::new()
            .num_threads(cli.threads)
            .build_global()
            .ok();
    }

    let file_config = load_config(cli.config.as_deref())?;
    let config = build_analysis_config(&cli, &file_config)?;

    match &cli.command {
        Commands::Analyze {
            orders,
            line_items,
            assignments,
            strict,
        } => {
            let mut source = FileSource::new(orders);
            if let Some(path) = line_items {
                source = source.with_line_items(path);
            }
            if let Some(path) = assignments {
                source = source.with_assignments(path);
            }

            let format = cli
                .format
                .as_deref()
                .unwrap_or(&file_config.output.format)
                .parse::<OutputFormat>()
                .map_err(anyhow::Error::msg)?;

            let report = run_analysis(&source, &config)?;
            emit(&cli.output, &render(&report, format)?)?;

            if *strict && !report.summary.trustworthy {
                anyhow::bail!(
                    "{} guardrail(s) failed",
                    report.summary.guardrail_failures
                );
            }
        }
        Commands::Assign { orders } => {
            let source = FileSource::new(orders);
            let assignments = assign_users(
                source.orders()?.iter().map(|o| o.user_id),
                &config.assignment,
            );
            info!(users = assignments.len(), "Assigned users");

            let mut table = String::from("user_id,variant,assigned_at\n");
            for a in &assignments {
                table.push_str(&format!("{},{},{}\n", a.user_id, a.variant, a.assigned_at));
            }
            emit(&cli.output, &table)?;
        }
        Commands::Init => {}
    }

    Ok(())
}

/// Explicit path, else discovered splitlab.toml, else defaults
fn load_config(path: Option<&Path>) -> anyhow::Result<SplitConfig> {
    match path {
        Some(path) => SplitConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(SplitConfig::discover()
            .context("Failed to load discovered splitlab.toml")?
            .unwrap_or_default()),
    }
}

/// Layer CLI flags over the file configuration and validate the result
pub fn build_analysis_config(cli: &Cli, file: &SplitConfig) -> anyhow::Result<AnalysisConfig> {
    let mut file = file.clone();
    if let Some(salt) = &cli.salt {
        file.experiment.salt = salt.clone();
    }
    if let Some(ratio) = cli.split_ratio {
        file.experiment.split_ratio = ratio;
    }
    if let Some(days) = cli.window_days {
        file.window.days = i64::from(days);
    }
    if let Some(alpha) = cli.alpha {
        file.inference.alpha = alpha;
    }
    if let Some(replicates) = cli.replicates {
        file.bootstrap.replicates = replicates;
    }
    if let Some(seed) = cli.seed {
        file.bootstrap.seed = seed;
    }
    if cli.no_bootstrap {
        file.bootstrap.enabled = false;
    }
    Ok(file.to_analysis_config()?)
}

fn render(report: &Report, format: OutputFormat) -> anyhow::Result<String> {
    Ok(match format {
        OutputFormat::Json => generate_json_report(report)?,
        OutputFormat::Csv => generate_csv_report(report),
        OutputFormat::Human => format_human_output(report),
    })
}

fn emit(output: &Option<PathBuf>, content: &str) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), "Report written");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(content.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}

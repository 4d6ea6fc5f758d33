use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::prelude::*;

use rust_sqladvisor::catalog::load_schema_file;
use rust_sqladvisor::input::collect_sql_files;
use rust_sqladvisor::report::{render_json, render_text, OutputFormat};
use rust_sqladvisor::rules::RULES;
use rust_sqladvisor::runtime::load_stats_file;
use rust_sqladvisor::{analyze_files, AnalysisOptions, RuleConfig, Severity};

#[derive(Parser)]
#[command(name = "rust-sqladvisor")]
#[command(author, version, about = "Static T-SQL analyzer and index advisor for SQL Server")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum FailOn {
    Info,
    Warning,
    Error,
    None,
}

impl FailOn {
    fn threshold(self) -> Option<Severity> {
        match self {
            FailOn::Info => Some(Severity::Info),
            FailOn::Warning => Some(Severity::Warning),
            FailOn::Error => Some(Severity::Error),
            FailOn::None => None,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze SQL files against a schema
    Analyze {
        /// SQL files, directories (searched for *.sql) or glob patterns
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Schema DDL script, or a JSON snapshot when the file ends in .json
        #[arg(short, long)]
        schema: PathBuf,

        /// Runtime statistics JSON file
        #[arg(long)]
        stats: Option<PathBuf>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,

        /// Lowest severity that makes the run fail with exit status 1
        #[arg(long, value_enum, default_value = "error")]
        fail_on: FailOn,

        /// Disable a rule (repeatable)
        #[arg(long = "disable", value_name = "RULE")]
        disabled: Vec<String>,

        /// Override a rule's severity, e.g. SELECT_STAR=error (repeatable)
        #[arg(long = "severity", value_name = "RULE=LEVEL")]
        severities: Vec<String>,

        /// Logical reads above which a non-SARGable predicate is an error
        #[arg(long)]
        logical_reads_threshold: Option<u64>,

        /// Enable verbose output
        #[arg(short, long)]
        verbose: bool,
    },
    /// List the rule catalog
    Rules,
}

/// Log to stderr; RUST_LOG takes precedence over --verbose
fn init_logging(verbose: bool) {
    let filter = if verbose {
        "rust_sqladvisor=debug"
    } else {
        "rust_sqladvisor=warn"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

struct AnalyzeArgs {
    inputs: Vec<String>,
    schema: PathBuf,
    stats: Option<PathBuf>,
    format: OutputFormat,
    fail_on: FailOn,
    disabled: Vec<String>,
    severities: Vec<String>,
    logical_reads_threshold: Option<u64>,
}

/// Returns true when a diagnostic reached the fail-on threshold
fn run_analyze(args: AnalyzeArgs) -> Result<bool> {
    let rules = RuleConfig::from_args(
        &args.disabled,
        &args.severities,
        args.logical_reads_threshold,
    )?;
    let stats = args
        .stats
        .as_deref()
        .map(load_stats_file)
        .transpose()?;
    let catalog = load_schema_file(&args.schema)
        .with_context(|| format!("Failed to load schema from {}", args.schema.display()))?;
    let files = collect_sql_files(&args.inputs)?;

    let options = AnalysisOptions {
        rules,
        stats,
        ..Default::default()
    };
    let report = analyze_files(&files, &catalog, &options)?;

    let output = match args.format {
        OutputFormat::Text => render_text(&report),
        OutputFormat::Json => render_json(&report).context("Failed to serialize report")?,
    };
    print!("{}", output);

    Ok(report.fails_at(args.fail_on.threshold()))
}

fn print_rules() {
    let width = RULES.iter().map(|r| r.id.len()).max().unwrap_or(0);
    for rule in RULES {
        println!(
            "{:width$}  {:<11}  {:<7}  {}",
            rule.id,
            rule.category.as_str(),
            rule.default_severity.as_str(),
            rule.description,
            width = width
        );
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            inputs,
            schema,
            stats,
            format,
            fail_on,
            disabled,
            severities,
            logical_reads_threshold,
            verbose,
        } => {
            init_logging(verbose);

            let args = AnalyzeArgs {
                inputs,
                schema,
                stats,
                format,
                fail_on,
                disabled,
                severities,
                logical_reads_threshold,
            };
            match run_analyze(args) {
                Ok(false) => ExitCode::SUCCESS,
                Ok(true) => ExitCode::from(1),
                Err(err) => {
                    eprintln!("Error: {:#}", err);
                    ExitCode::from(2)
                }
            }
        }
        Commands::Rules => {
            print_rules();
            ExitCode::SUCCESS
        }
    }
}

// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// deid: operator command line for de-identifying a CSV export

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use deid_rust::deid::anonymity::{anonymity_level, normalize_quasi_identifiers};
use deid_rust::deid::csv_io::{read_csv_path, write_csv_path, write_csv_string};
use deid_rust::deid::{
    run_pipeline, AgeStrategy, DeidConfig, PipelineSpec, Step, OUTPUT_FILE_NAME, OUTPUT_MIME,
};

#[derive(Parser)]
#[command(author, version, about = "De-identify tabular healthcare data")]
struct Cli {
    /// Log filter, e.g. "info" or "deid_rust=debug" (RUST_LOG takes precedence)
    #[arg(short, long, global = true, default_value = "info")]
    verbosity: String,

    /// Path to a JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply de-identification steps and export the result
    Run(RunArgs),
    /// Show columns, inferred types and the current anonymity level
    Inspect(InspectArgs),
}

#[derive(Clone, Copy, ValueEnum)]
enum AgeMethod {
    AgeGroup,
    RandomAdjust,
}

impl From<AgeMethod> for AgeStrategy {
    fn from(method: AgeMethod) -> Self {
        match method {
            AgeMethod::AgeGroup => AgeStrategy::AgeGroup,
            AgeMethod::RandomAdjust => AgeStrategy::RandomAdjust,
        }
    }
}

#[derive(Args)]
struct RunArgs {
    /// CSV file with a header row
    #[arg(short, long)]
    input: Option<PathBuf>,

    #[arg(short, long, default_value = OUTPUT_FILE_NAME)]
    output: PathBuf,

    /// Write a JSON report of the applied steps to this path
    #[arg(long)]
    report: Option<PathBuf>,

    /// JSON pipeline to run instead of the step flags below
    #[arg(long, conflicts_with_all = ["age_column", "k", "quasi", "geo", "hash", "drop"])]
    pipeline: Option<PathBuf>,

    /// Age column to adjust
    #[arg(long)]
    age_column: Option<String>,

    #[arg(long, value_enum, default_value_t = AgeMethod::AgeGroup)]
    age_strategy: AgeMethod,

    /// Minimum group size (defaults to the configured k)
    #[arg(short)]
    k: Option<usize>,

    /// Quasi-identifier column ("Age Group" derives a binned age column)
    #[arg(long)]
    quasi: Vec<String>,

    /// Geographic column to mask (one of the configured geo_column_choices)
    #[arg(long)]
    geo: Vec<String>,

    /// Column to replace with SHA-256 digests
    #[arg(long)]
    hash: Vec<String>,

    /// Column to delete from the output
    #[arg(long)]
    drop: Vec<String>,
}

#[derive(Args)]
struct InspectArgs {
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Quasi-identifier columns to measure the anonymity level over
    #[arg(long)]
    quasi: Vec<String>,

    /// Print the first N rows as CSV (only the --quasi columns when given)
    #[arg(long, value_name = "N")]
    head: Option<usize>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.verbosity))
        .context("invalid log filter")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => DeidConfig::from_path(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => DeidConfig::default(),
    };

    match cli.command {
        Command::Run(args) => execute_run(args, &config),
        Command::Inspect(args) => execute_inspect(args),
    }
}

fn require_input(input: Option<PathBuf>) -> Result<PathBuf> {
    match input {
        Some(path) if path.exists() => Ok(path),
        Some(path) => bail!("input file {} does not exist", path.display()),
        None => bail!("please supply a CSV file with healthcare data (--input <path>)"),
    }
}

/// Steps in the order the operator form applies them
fn steps_from_flags(args: &RunArgs, config: &DeidConfig) -> Result<Vec<Step>> {
    let mut steps = Vec::new();

    if let Some(column) = &args.age_column {
        steps.push(Step::AdjustAge {
            column: column.clone(),
            strategy: args.age_strategy.into(),
        });
    }

    if args.k.is_some() || !args.quasi.is_empty() {
        let k = args.k.unwrap_or(config.default_k);
        if k == 0 {
            bail!("k must be at least 1");
        }
        steps.push(Step::KAnonymity {
            k,
            columns: args.quasi.clone(),
        });
    }

    if !args.geo.is_empty() {
        steps.push(Step::MaskGeo {
            columns: args.geo.clone(),
        });
    }

    if !args.hash.is_empty() {
        steps.push(Step::Hash {
            columns: args.hash.clone(),
        });
    }

    if !args.drop.is_empty() {
        steps.push(Step::DropColumns {
            columns: args.drop.clone(),
        });
    }

    Ok(steps)
}

fn execute_run(args: RunArgs, config: &DeidConfig) -> Result<()> {
    let input = require_input(args.input.clone())?;

    let spec = match &args.pipeline {
        Some(path) => PipelineSpec::from_path(path)
            .with_context(|| format!("failed to load pipeline {}", path.display()))?,
        None => PipelineSpec {
            name: "command line".to_string(),
            steps: steps_from_flags(&args, config)?,
        },
    };
    if spec.steps.is_empty() {
        warn!("no de-identification steps selected, exporting the input unchanged");
    }

    let table = read_csv_path(&input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    info!(
        rows = table.num_rows(),
        columns = table.num_columns(),
        "loaded {}",
        input.display()
    );

    let output = run_pipeline(&spec, table, config).context("de-identification failed")?;
    for report in &output.steps {
        info!(
            step = report.step,
            rows_before = report.rows_before,
            rows_after = report.rows_after,
            "step complete"
        );
    }

    if let Some(path) = &args.report {
        let json = serde_json::to_string_pretty(&output.steps)?;
        fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
        info!(steps = output.steps.len(), "wrote report {}", path.display());
    }

    write_output(&args.output, &output.table)
}

fn write_output(path: &Path, table: &deid_rust::deid::Table) -> Result<()> {
    write_csv_path(path, table).with_context(|| format!("failed to write {}", path.display()))?;
    info!(
        rows = table.num_rows(),
        mime = OUTPUT_MIME,
        "wrote {}",
        path.display()
    );
    Ok(())
}

fn execute_inspect(args: InspectArgs) -> Result<()> {
    let input = require_input(args.input)?;
    let table = read_csv_path(&input)
        .with_context(|| format!("failed to read {}", input.display()))?;

    println!("{}: {} rows", input.display(), table.num_rows());
    for column in table.columns() {
        println!("  {:<32} {}", column.name(), column.kind().as_str());
    }

    if !args.quasi.is_empty() {
        match anonymity_level(&table, &args.quasi)? {
            Some(level) => println!("k-anonymity over {:?}: {}", args.quasi, level),
            None => println!("k-anonymity over {:?}: table is empty", args.quasi),
        }
    }

    if let Some(n) = args.head {
        let preview = if args.quasi.is_empty() {
            table.clone()
        } else {
            table.select(&normalize_quasi_identifiers(&args.quasi))?
        };
        let rows: Vec<usize> = (0..n.min(preview.num_rows())).collect();
        print!("{}", write_csv_string(&preview.take_rows(&rows))?);
    }

    Ok(())
}

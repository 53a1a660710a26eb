// loganon - main.rs
//
// Command-line entry point. Handles:
// 1. CLI argument parsing
// 2. config.toml loading and logging initialisation (debug mode support)
// 3. Dispatch to the pipeline (infer, preview, run, job, methods)

use clap::{Args, Parser, Subcommand};
use loganon::app::{job, pipeline};
use loganon::core::anonymize::{
    AnonymityMethod, ColumnRef, ColumnSelector, MethodParams, RemovingMethod,
};
use loganon::core::bucket::Bucketing;
use loganon::core::model::{LogRecord, RunSummary};
use loganon::core::table::{LogTable, ParseConfig};
use loganon::platform::config::{self, AppConfig, PlatformPaths};
use loganon::util::constants;
use loganon::util::error::{AnonymizeError, FormatError, LogAnonError, Result};
use loganon::util::logging;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// loganon - anonymise delimited log files.
///
/// Parse a log with a format string, blank, replace, delete or aggregate the
/// chosen columns, and write the result next to the original.
#[derive(Parser, Debug)]
#[command(name = "loganon", version, about)]
struct Cli {
    /// Enable debug logging (equivalent to RUST_LOG=debug).
    #[arg(short = 'd', long = "debug", global = true)]
    debug: bool,

    /// Read config.toml from this directory instead of the platform default.
    #[arg(long = "config-dir", global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the format string suggested by a file's first line.
    Infer { input: PathBuf },

    /// Parse a file and print its first rows.
    Preview {
        input: PathBuf,

        /// Format string (defaults to the file's first line).
        #[arg(short = 'f', long)]
        format: Option<String>,

        /// Number of rows to print.
        #[arg(short = 'n', long, default_value_t = constants::DEFAULT_PREVIEW_ROWS)]
        limit: usize,

        /// Print JSON instead of a text table.
        #[arg(long)]
        json: bool,
    },

    /// Anonymise a file.
    Run(RunArgs),

    /// Run a TOML job file.
    Job {
        file: PathBuf,

        /// Print the run summary as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List methods, removal policies and bucketing kinds.
    Methods,
}

#[derive(Args, Debug)]
struct RunArgs {
    input: PathBuf,
    output: PathBuf,

    /// Format string (defaults to the input's first line).
    #[arg(short = 'f', long)]
    format: Option<String>,

    /// Anonymization method: aggregation or removing.
    #[arg(short = 'm', long)]
    method: String,

    /// Target column, by name or 0-based index. Repeatable or comma-separated.
    #[arg(short = 'c', long = "column", value_delimiter = ',')]
    columns: Vec<String>,

    /// Removing policy: blank, placeholder, delete-rows, delete-rows-matching.
    #[arg(long, default_value = "blank")]
    policy: String,

    /// Placeholder token (policy placeholder).
    #[arg(long)]
    value: Option<String>,

    /// Row pattern (policy delete-rows-matching).
    #[arg(long)]
    pattern: Option<String>,

    /// Aggregation kind: identity, round, range, prefix, time-window.
    #[arg(long, default_value = "identity")]
    bucket: String,

    /// Rounding step (bucket round).
    #[arg(long)]
    step: Option<f64>,

    /// Interval width (bucket range).
    #[arg(long)]
    width: Option<f64>,

    /// Characters kept unmasked (bucket prefix).
    #[arg(long)]
    keep: Option<usize>,

    /// Mask character (bucket prefix).
    #[arg(long)]
    mask: Option<char>,

    /// strftime format of the timestamps (bucket time-window).
    #[arg(long = "time-format")]
    time_format: Option<String>,

    /// Window length in seconds (bucket time-window).
    #[arg(long)]
    seconds: Option<u64>,

    /// Print the run summary as JSON.
    #[arg(long)]
    json: bool,
}

fn main() {
    let cli = Cli::parse();

    let paths = match &cli.config_dir {
        Some(dir) => PlatformPaths::with_config_dir(dir),
        None => PlatformPaths::resolve(),
    };
    let (app_config, config_warnings) = config::load_config(&paths.config_dir);

    logging::init(
        cli.debug,
        app_config.log_level.as_deref(),
        app_config.log_file.as_deref(),
    );
    for warning in &config_warnings {
        tracing::warn!("{warning}");
    }

    tracing::debug!(
        version = constants::APP_VERSION,
        config_dir = %paths.config_dir.display(),
        "loganon starting"
    );

    if let Err(e) = execute(cli.command, &app_config) {
        tracing::error!(error = %e, "Command failed");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn execute(command: Command, app_config: &AppConfig) -> Result<()> {
    let parse_config = ParseConfig::from(app_config);

    match command {
        Command::Infer { input } => {
            let format = pipeline::suggest_format(&input)?.ok_or(FormatError::Empty)?;
            println!("{format}");
        }
        Command::Preview {
            input,
            format,
            limit,
            json,
        } => {
            let format = resolve_format(&input, format)?;
            let table = pipeline::preview(&input, &format, &parse_config)?;
            if json {
                print_json(&PreviewOutput::new(&table, limit))?;
            } else {
                print_table(&table, limit);
            }
        }
        Command::Run(args) => {
            let json = args.json;
            let request = build_request(args, app_config)?.with_parse_config(parse_config);
            let summary = pipeline::run(&request)?;
            print_summary(&summary, json)?;
        }
        Command::Job { file, json } => {
            let request = job::load_job(&file, &app_config.placeholder)?
                .with_parse_config(parse_config);
            let summary = pipeline::run(&request)?;
            print_summary(&summary, json)?;
        }
        Command::Methods => print_methods(),
    }
    Ok(())
}

fn resolve_format(input: &Path, format: Option<String>) -> Result<String> {
    match format {
        Some(format) => Ok(format),
        None => Ok(pipeline::suggest_format(input)?.ok_or(FormatError::Empty)?),
    }
}

fn build_request(args: RunArgs, app_config: &AppConfig) -> Result<pipeline::PipelineRequest> {
    let method: AnonymityMethod = args.method.parse()?;
    let params = match method {
        AnonymityMethod::Removing => MethodParams::Removing(RemovingMethod::from_parts(
            &args.policy,
            args.value.clone(),
            args.pattern.clone(),
            &app_config.placeholder,
        )?),
        AnonymityMethod::Aggregation => MethodParams::Aggregation(bucketing_from_args(&args)?),
    };
    let columns: ColumnSelector = args
        .columns
        .iter()
        .filter(|c| !c.trim().is_empty())
        .map(|c| ColumnRef::from(c.as_str()))
        .collect();
    let format = resolve_format(&args.input, args.format)?;

    Ok(pipeline::PipelineRequest::new(
        args.input,
        format,
        args.output,
        params,
        columns,
    ))
}

fn bucketing_from_args(args: &RunArgs) -> std::result::Result<Bucketing, AnonymizeError> {
    let needs = |flag: &str, kind: &str| AnonymizeError::InvalidParameters {
        method: "aggregation",
        reason: format!("bucket '{kind}' needs --{flag}"),
    };
    let kind = args.bucket.trim().to_ascii_lowercase();
    let bucketing = match kind.as_str() {
        "identity" => Bucketing::Identity,
        "round" => Bucketing::Round {
            step: args.step.ok_or_else(|| needs("step", "round"))?,
        },
        "range" => Bucketing::Range {
            width: args.width.ok_or_else(|| needs("width", "range"))?,
        },
        "prefix" => Bucketing::Prefix {
            keep: args.keep.ok_or_else(|| needs("keep", "prefix"))?,
            mask: args.mask.unwrap_or(constants::DEFAULT_MASK_CHAR),
        },
        "time-window" => Bucketing::TimeWindow {
            format: args
                .time_format
                .clone()
                .ok_or_else(|| needs("time-format", "time-window"))?,
            seconds: args.seconds.ok_or_else(|| needs("seconds", "time-window"))?,
        },
        other => {
            return Err(AnonymizeError::InvalidParameters {
                method: "aggregation",
                reason: format!(
                    "unknown bucket '{other}' (expected one of: {})",
                    Bucketing::kinds().join(", ")
                ),
            })
        }
    };
    Ok(bucketing)
}

// =============================================================================
// Output
// =============================================================================

#[derive(Serialize)]
struct PreviewOutput<'a> {
    format: &'a str,
    columns: Vec<&'a str>,
    header: Option<&'a str>,
    total_rows: usize,
    skipped_lines: usize,
    rows: &'a [LogRecord],
}

impl<'a> PreviewOutput<'a> {
    fn new(table: &'a LogTable, limit: usize) -> Self {
        let shown = limit.min(table.len());
        Self {
            format: table.spec().source(),
            columns: table.columns(),
            header: table.header(),
            total_rows: table.len(),
            skipped_lines: table.skipped_lines(),
            rows: &table.records()[..shown],
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).map_err(|e| LogAnonError::Io {
        path: PathBuf::from("<stdout>"),
        operation: "serialise",
        source: e.into(),
    })?;
    println!("{text}");
    Ok(())
}

fn print_table(table: &LogTable, limit: usize) {
    let columns = table.columns();
    let rows = &table.records()[..limit.min(table.len())];

    let mut widths: Vec<usize> = columns.iter().map(|c| c.chars().count()).collect();
    for record in rows {
        for (width, field) in widths.iter_mut().zip(record.fields()) {
            *width = (*width).max(field.chars().count());
        }
    }

    let render = |cells: Vec<&str>| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{cell:<w$}", w = *width))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    println!("{}", render(columns.clone()));
    println!(
        "{}",
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-")
    );
    for record in rows {
        println!(
            "{}",
            render(record.fields().iter().map(String::as_str).collect())
        );
    }
    println!(
        "({} of {} rows shown, {} malformed lines skipped)",
        rows.len(),
        table.len(),
        table.skipped_lines()
    );
}

fn print_summary(summary: &RunSummary, json: bool) -> Result<()> {
    if json {
        return print_json(summary);
    }
    println!(
        "Wrote {} rows to {} ({} read, {} removed, {} malformed lines skipped)",
        summary.rows_processed,
        summary.output.display(),
        summary.rows_read,
        summary.rows_removed,
        summary.rows_skipped
    );
    Ok(())
}

fn print_methods() {
    println!("Methods:");
    for method in AnonymityMethod::all() {
        println!("  {:<12} {}", method.name(), method.label());
    }
    println!("Removing policies (--policy):");
    for kind in RemovingMethod::kinds() {
        println!("  {kind}");
    }
    println!("Aggregation buckets (--bucket):");
    for kind in Bucketing::kinds() {
        println!("  {kind}");
    }
}

//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "hts",
    version,
    about = "Harmonize household travel surveys into one canonical schema",
    long_about = "Harmonize household travel survey extracts into canonical households,\n\
                  persons and trip chains.\n\n\
                  Codes are recoded through per-survey codebooks, bracketed values are\n\
                  sampled to point values, trip legs are merged and each person's trips\n\
                  are placed on one continuous timeline before integrity filtering."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format.
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Harmonize one survey wave described by a run configuration.
    Harmonize(HarmonizeArgs),

    /// Check harmonized tables against a schema template.
    Verify(VerifyArgs),

    /// Compare harmonized tables from several surveys to a reference.
    Compare(CompareArgs),

    /// Print the codebook fields resolved for one survey year.
    Codebook(CodebookArgs),
}

#[derive(Parser)]
pub struct HarmonizeArgs {
    /// Path to the TOML run configuration.
    #[arg(value_name = "RUN_CONFIG")]
    pub config: PathBuf,

    /// Output directory (overrides the run configuration).
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Seed for de-bucketing (overrides the run configuration).
    #[arg(long = "seed")]
    pub seed: Option<u64>,

    /// Run every stage and report without writing output files.
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

#[derive(Parser)]
pub struct VerifyArgs {
    /// Harmonized attributes CSV.
    #[arg(value_name = "ATTRIBUTES")]
    pub attributes: PathBuf,

    /// Harmonized trips CSV.
    #[arg(value_name = "TRIPS")]
    pub trips: PathBuf,

    /// Schema template YAML.
    #[arg(long = "template", value_name = "YAML")]
    pub template: PathBuf,
}

#[derive(Parser)]
pub struct CompareArgs {
    /// Reference table CSV.
    #[arg(value_name = "REFERENCE")]
    pub reference: PathBuf,

    /// Tables to compare against the reference.
    #[arg(value_name = "OTHER", required = true)]
    pub others: Vec<PathBuf>,

    /// Values listed per difference before truncation.
    #[arg(long = "max-values", default_value_t = 10)]
    pub max_values: usize,

    /// Relative drift above which a numeric statistic is reported.
    #[arg(long = "tolerance", default_value_t = 0.05)]
    pub tolerance: f64,
}

#[derive(Parser)]
pub struct CodebookArgs {
    /// Codebook YAML.
    #[arg(value_name = "YAML")]
    pub codebook: PathBuf,

    /// Survey year used to resolve year-keyed fields.
    #[arg(long = "year", default_value = "default")]
    pub year: String,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

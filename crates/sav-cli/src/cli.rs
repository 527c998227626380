//! CLI argument definitions for the junction repair tool.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "junction-fix",
    version,
    about = "Repair collapsed drone lane junctions in a save file",
    long_about = "Repair collapsed drone lane junctions in a save file.\n\n\
                  Every lane through a multi-lane junction gets its own invisible pole,\n\
                  so lanes stop merging when the save is loaded. Runs are dry by default;\n\
                  pass --apply to write the repaired save (a backup is kept)."
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

    /// Log output format (pretty for human, json for machine parsing).
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
    /// Give every junction lane its own pole.
    Fix(RepairArgs),

    /// Point pole references back at their junctions and drop the poles.
    Revert(RepairArgs),

    /// Count the entities, junctions, splines and poles in a save.
    Inspect(InspectArgs),
}

#[derive(Args)]
pub struct RepairArgs {
    /// Save file to repair.
    #[arg(value_name = "SAVE")]
    pub save: PathBuf,

    /// Write the result back to SAVE after copying it to a backup.
    #[arg(long = "apply")]
    pub apply: bool,

    /// Also write the payload as pretty JSON to <SAVE>.json: the save as it is
    /// on a dry run, the repaired save with --apply.
    #[arg(long = "json")]
    pub json: bool,

    /// List every change and warning, not just the totals.
    #[arg(long = "details")]
    pub details: bool,

    /// Largest gap between two spline ends of the same lane.
    #[arg(long = "tolerance", value_name = "UNITS", default_value_t = sav_repair::DEFAULT_TOLERANCE)]
    pub tolerance: f64,

    /// Largest pole-to-junction distance accepted by `revert`.
    #[arg(long = "radius", value_name = "UNITS", default_value_t = sav_repair::DEFAULT_REVERT_RADIUS)]
    pub radius: f64,

    /// Keep splines whose endpoints are missing from the save.
    #[arg(long = "keep-dangling")]
    pub keep_dangling: bool,

    /// Keep poles and drones that no spline references.
    #[arg(long = "no-gc")]
    pub no_gc: bool,

    /// zlib compression level for the written save (0-9).
    #[arg(
        long = "compression",
        value_name = "LEVEL",
        value_parser = clap::value_parser!(u32).range(0..=9)
    )]
    pub compression: Option<u32>,
}

#[derive(Args)]
pub struct InspectArgs {
    /// Save file to inspect.
    #[arg(value_name = "SAVE")]
    pub save: PathBuf,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
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

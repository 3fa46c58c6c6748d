use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "aliquot - plan and dry-run liquid transfers against a simulated pipette.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Execute the transfer described by a run plan on a simulated pipette.
    Run(RunArgs),
    /// Inspect the volume/height relationship of a labware well.
    Geometry(GeometryArgs),
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the run plan in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub plan: PathBuf,

    /// Override the pipette working volume, in µL.
    #[arg(short, long, value_name = "UL")]
    pub working_volume: Option<f64>,

    /// Override the conditioning volume used by distributes, in µL.
    #[arg(long, value_name = "UL")]
    pub conditioning_volume: Option<f64>,

    /// Override the disposal volume used by distributes, in µL.
    #[arg(long, value_name = "UL")]
    pub disposal_volume: Option<f64>,

    /// Override `options.add-final-air-gap` from the plan file.
    #[command(flatten)]
    pub final_air_gap: FinalAirGap,

    /// Enable liquid presence detection on the simulated pipette.
    #[arg(long)]
    pub liquid_presence_detection: bool,

    /// Print every instrument command issued during the run.
    #[arg(long)]
    pub show_calls: bool,

    /// Set a specific plan value, overriding the plan file.
    /// Can be used multiple times. Example: -S pipette.working-volume=300
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Mutually exclusive flags for the final air gap.
#[derive(Args, Debug, Clone, Copy)]
#[group(required = false, multiple = false)]
pub struct FinalAirGap {
    /// Leave an air gap in the tip after the last retract.
    #[arg(long)]
    pub with_final_air_gap: bool,
    /// Leave the tip without an air gap after the last retract.
    #[arg(long)]
    pub no_final_air_gap: bool,
}

/// Arguments for the `geometry` subcommand.
#[derive(Args, Debug)]
pub struct GeometryArgs {
    /// Path to the labware definition in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub labware: PathBuf,

    /// Name of the well to inspect (e.g., A1).
    #[arg(short, long, required = true, value_name = "NAME")]
    pub well: String,

    #[command(flatten)]
    pub query: GeometryQuery,
}

/// What to compute. Without either flag the well's capacity table is printed.
#[derive(Args, Debug, Clone, Copy)]
#[group(required = false, multiple = false)]
pub struct GeometryQuery {
    /// Liquid height above the well bottom, in mm.
    #[arg(long, value_name = "MM")]
    pub height: Option<f64>,
    /// Liquid volume in the well, in µL.
    #[arg(long, value_name = "UL")]
    pub volume: Option<f64>,
}

use crate::error::{CliError, Result};
use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::Subscriber;
use tracing_subscriber::{
    Layer,
    filter::{LevelFilter, Targets},
    fmt,
    prelude::*,
    registry::LookupSpan,
};

/// Events from this target prefix cover both the library and the binary.
const APP_TARGET: &str = "aliquot";

/// Installs the global subscriber: a compact stderr layer driven by `-v` and
/// `--quiet`, plus an optional plain-text file layer.
///
/// The file layer never records less than INFO, so warnings such as skipped
/// touch-tips and the run summary still reach the log file on `--quiet` runs.
pub fn setup_logging(verbosity: u8, quiet: bool, log_file: Option<PathBuf>) -> Result<()> {
    let file_layer = match log_file {
        Some(path) => Some(file_layer(File::create(&path)?, verbosity)),
        None => None,
    };

    tracing_subscriber::registry()
        .with(console_layer(verbosity, quiet))
        .with(file_layer)
        .try_init()
        .map_err(|e| CliError::Other(e.into()))
}

fn console_level(verbosity: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::OFF;
    }
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

fn file_level(verbosity: u8) -> LevelFilter {
    console_level(verbosity, false).max(LevelFilter::INFO)
}

/// Our own events pass at `level`; other crates are capped at WARN.
fn app_targets(level: LevelFilter) -> Targets {
    Targets::new()
        .with_target(APP_TARGET, level)
        .with_default(level.min(LevelFilter::WARN))
}

fn console_layer<S>(verbosity: u8, quiet: bool) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .with_filter(app_targets(console_level(verbosity, quiet)))
}

fn file_layer<S>(file: File, verbosity: u8) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_thread_ids(true)
        .with_target(true)
        .with_filter(app_targets(file_level(verbosity)))
}

use super::file::TransferKind;
use aliquot::engine::config::TransferConfig;
use std::path::PathBuf;

/// A fully resolved run: every path is absolute or relative to the working
/// directory, every option has a value.
#[derive(Debug)]
pub struct AppConfig {
    pub kind: TransferKind,
    pub source_labware: PathBuf,
    pub destination_labware: PathBuf,
    pub liquid_class: PathBuf,
    pub sources: Vec<String>,
    pub destinations: Vec<String>,
    pub volumes: Vec<f64>,
    pub liquid_presence_detection: bool,
    pub show_calls: bool,
    pub core_config: TransferConfig,
}

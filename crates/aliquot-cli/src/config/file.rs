use crate::error::{CliError, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TransferKind {
    Transfer,
    Consolidate,
    Distribute,
}

impl fmt::Display for TransferKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransferKind::Transfer => "transfer",
            TransferKind::Consolidate => "consolidate",
            TransferKind::Distribute => "distribute",
        };
        f.write_str(s)
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileTransferConfig {
    pub kind: TransferKind,
    pub source_labware: PathBuf,
    /// Defaults to the source labware.
    pub destination_labware: Option<PathBuf>,
    pub liquid_class: PathBuf,
    pub sources: Vec<String>,
    pub destinations: Vec<String>,
    pub volumes: Vec<f64>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FilePipetteConfig {
    pub working_volume: Option<f64>,
    pub liquid_presence_detection: Option<bool>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileOptionsConfig {
    pub add_final_air_gap: Option<bool>,
    pub conditioning_volume: Option<f64>,
    pub disposal_volume: Option<f64>,
    pub trash: Option<[f64; 3]>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub transfer: FileTransferConfig,
    #[serde(default)]
    pub pipette: FilePipetteConfig,
    #[serde(default)]
    pub options: FileOptionsConfig,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading run plan from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }
}

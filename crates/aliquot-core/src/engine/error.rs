use thiserror::Error;

use super::config::ConfigError;
use super::planner::PlanError;
use crate::core::geometry::GeometryError;
use crate::core::instrument::InstrumentError;
use crate::core::liquid::PropertiesError;
use crate::core::models::tip::TipStateError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Instrument command failed: {source}")]
    Instrument {
        #[from]
        source: InstrumentError,
    },

    #[error("Tip state violation: {source}")]
    TipState {
        #[from]
        source: TipStateError,
    },

    #[error("Well geometry error: {source}")]
    Geometry {
        #[from]
        source: GeometryError,
    },

    #[error("Transfer properties error: {source}")]
    Properties {
        #[from]
        source: PropertiesError,
    },

    #[error("Transfer plan error: {source}")]
    Plan {
        #[from]
        source: PlanError,
    },

    #[error("Configuration error: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error(
        "The {phase} position in well '{well}' (z = {z:.3}) is inside the liquid (meniscus at z = {meniscus_z:.3})"
    )]
    LocationInsideLiquid {
        phase: &'static str,
        well: String,
        z: f64,
        meniscus_z: f64,
    },

    #[error(
        "The {phase} position in well '{well}' (z = {z:.3}) is below the pipetting position (z = {target_z:.3})"
    )]
    RetractBelowTarget {
        phase: &'static str,
        well: String,
        z: f64,
        target_z: f64,
    },

    #[error("Missing location: {0}")]
    MissingLocation(String),

    #[error("Internal logic error: {0}")]
    Internal(String),
}

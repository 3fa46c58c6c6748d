use crate::core::models::location::Location;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

/// Run-level settings that are not part of a liquid class.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferConfig {
    /// Largest volume the pipette/tip combination can hold, in µL.
    pub working_volume: f64,
    pub trash_location: Location,
    /// Whether the very last retract of the run leaves an air gap in the tip.
    pub add_final_air_gap: bool,
    /// Overrides the liquid class's conditioning volume for distributes.
    pub conditioning_volume: Option<f64>,
    /// Overrides the liquid class's disposal volume for distributes.
    pub disposal_volume: Option<f64>,
}

#[derive(Default)]
pub struct TransferConfigBuilder {
    working_volume: Option<f64>,
    trash_location: Option<Location>,
    add_final_air_gap: Option<bool>,
    conditioning_volume: Option<f64>,
    disposal_volume: Option<f64>,
}

impl TransferConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn working_volume(mut self, volume: f64) -> Self {
        self.working_volume = Some(volume);
        self
    }
    pub fn trash_location(mut self, location: Location) -> Self {
        self.trash_location = Some(location);
        self
    }
    pub fn add_final_air_gap(mut self, add: bool) -> Self {
        self.add_final_air_gap = Some(add);
        self
    }
    pub fn conditioning_volume(mut self, volume: Option<f64>) -> Self {
        self.conditioning_volume = volume;
        self
    }
    pub fn disposal_volume(mut self, volume: Option<f64>) -> Self {
        self.disposal_volume = volume;
        self
    }

    pub fn build(self) -> Result<TransferConfig, ConfigError> {
        let working_volume = self
            .working_volume
            .ok_or(ConfigError::MissingParameter("working_volume"))?;
        if !(working_volume.is_finite() && working_volume > 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "working_volume",
                reason: format!("must be positive, got {}", working_volume),
            });
        }
        for (name, volume) in [
            ("conditioning_volume", self.conditioning_volume),
            ("disposal_volume", self.disposal_volume),
        ] {
            if let Some(v) = volume {
                if !(v.is_finite() && v >= 0.0) {
                    return Err(ConfigError::InvalidParameter {
                        name,
                        reason: format!("must be non-negative, got {}", v),
                    });
                }
            }
        }

        Ok(TransferConfig {
            working_volume,
            trash_location: self
                .trash_location
                .ok_or(ConfigError::MissingParameter("trash_location"))?,
            add_final_air_gap: self.add_final_air_gap.unwrap_or(true),
            conditioning_volume: self.conditioning_volume,
            disposal_volume: self.disposal_volume,
        })
    }
}

use super::curve::ByVolumeCurve;
use crate::core::utils::identifiers::{
    UnknownAliasError, parse_blowout_location, parse_position_reference,
};
use nalgebra::Vector3;
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PropertiesError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
    #[error("Invalid transfer property '{field}': {reason}")]
    InvalidProperty { field: String, reason: String },
    #[error("The liquid class has no multi-dispense properties")]
    MissingMultiDispense,
}

fn invalid(field: impl fmt::Display, reason: &str) -> PropertiesError {
    PropertiesError::InvalidProperty {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

/// The well feature an offset is measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum PositionReference {
    WellTop,
    WellBottom,
    WellCenter,
    LiquidMeniscus,
}

impl TryFrom<String> for PositionReference {
    type Error = UnknownAliasError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        parse_position_reference(&value)
    }
}

impl fmt::Display for PositionReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PositionReference::WellTop => "well-top",
            PositionReference::WellBottom => "well-bottom",
            PositionReference::WellCenter => "well-center",
            PositionReference::LiquidMeniscus => "liquid-meniscus",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum BlowoutLocation {
    Source,
    Destination,
    Trash,
}

impl TryFrom<String> for BlowoutLocation {
    type Error = UnknownAliasError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        parse_blowout_location(&value)
    }
}

impl fmt::Display for BlowoutLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BlowoutLocation::Source => "source",
            BlowoutLocation::Destination => "destination",
            BlowoutLocation::Trash => "trash",
        };
        write!(f, "{}", s)
    }
}

/// Offset in mm from a [`PositionReference`]. Omitted axes default to zero.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Offset {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Offset {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn to_vector(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct DelayProperties {
    #[serde(default)]
    pub enabled: bool,
    pub duration: Option<f64>,
}

impl DelayProperties {
    pub fn seconds(duration: f64) -> Self {
        Self {
            enabled: true,
            duration: Some(duration),
        }
    }

    /// The delay to apply, or `None` when disabled. An enabled delay without
    /// a duration is an error, not a no-op.
    pub fn active_duration(&self) -> Result<Option<f64>, PropertiesError> {
        if !self.enabled {
            return Ok(None);
        }
        self.duration
            .map(Some)
            .ok_or_else(|| invalid("delay.duration", "required when the delay is enabled"))
    }

    fn validate(&self, field: &str) -> Result<(), PropertiesError> {
        if !self.enabled {
            return Ok(());
        }
        match self.duration {
            None => Err(invalid(
                format_args!("{field}.duration"),
                "required when the delay is enabled",
            )),
            Some(d) if !d.is_finite() || d < 0.0 => Err(invalid(
                format_args!("{field}.duration"),
                "must be a non-negative number of seconds",
            )),
            Some(_) => Ok(()),
        }
    }
}

/// Touch-tip parameters that are guaranteed to be present.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchTipSettings {
    pub z_offset: f64,
    pub mm_from_edge: f64,
    pub speed: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct TouchTipProperties {
    #[serde(default)]
    pub enabled: bool,
    pub z_offset: Option<f64>,
    pub mm_from_edge: Option<f64>,
    pub speed: Option<f64>,
}

impl TouchTipProperties {
    /// `None` when touch-tip is disabled or not fully specified.
    pub fn settings(&self) -> Option<TouchTipSettings> {
        if !self.enabled {
            return None;
        }
        Some(TouchTipSettings {
            z_offset: self.z_offset?,
            mm_from_edge: self.mm_from_edge?,
            speed: self.speed?,
        })
    }

    fn validate(&self, field: &str) -> Result<(), PropertiesError> {
        if !self.enabled {
            return Ok(());
        }
        if self.z_offset.is_none() {
            return Err(invalid(
                format_args!("{field}.z-offset"),
                "required when touch-tip is enabled",
            ));
        }
        if self.mm_from_edge.is_none() {
            return Err(invalid(
                format_args!("{field}.mm-from-edge"),
                "required when touch-tip is enabled",
            ));
        }
        match self.speed {
            Some(speed) if speed > 0.0 => Ok(()),
            Some(_) => Err(invalid(format_args!("{field}.speed"), "must be positive")),
            None => Err(invalid(
                format_args!("{field}.speed"),
                "required when touch-tip is enabled",
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct BlowoutProperties {
    #[serde(default)]
    pub enabled: bool,
    pub location: Option<BlowoutLocation>,
    pub flow_rate: Option<f64>,
}

impl BlowoutProperties {
    /// Where to blow out and at which flow rate, or `None` when disabled.
    pub fn target(&self) -> Result<Option<(BlowoutLocation, f64)>, PropertiesError> {
        if !self.enabled {
            return Ok(None);
        }
        let location = self
            .location
            .ok_or_else(|| invalid("blowout.location", "required when blow-out is enabled"))?;
        let flow_rate = self
            .flow_rate
            .ok_or_else(|| invalid("blowout.flow-rate", "required when blow-out is enabled"))?;
        Ok(Some((location, flow_rate)))
    }

    fn validate(&self, field: &str) -> Result<(), PropertiesError> {
        if !self.enabled {
            return Ok(());
        }
        if self.location.is_none() {
            return Err(invalid(
                format_args!("{field}.location"),
                "required when blow-out is enabled",
            ));
        }
        match self.flow_rate {
            Some(rate) if rate > 0.0 => Ok(()),
            Some(_) => Err(invalid(
                format_args!("{field}.flow-rate"),
                "must be positive",
            )),
            None => Err(invalid(
                format_args!("{field}.flow-rate"),
                "required when blow-out is enabled",
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct MixProperties {
    #[serde(default)]
    pub enabled: bool,
    pub repetitions: Option<u32>,
    pub volume: Option<f64>,
}

impl MixProperties {
    pub fn new(repetitions: u32, volume: f64) -> Self {
        Self {
            enabled: true,
            repetitions: Some(repetitions),
            volume: Some(volume),
        }
    }

    /// `(repetitions, volume)`, or `None` when mixing is disabled.
    pub fn settings(&self) -> Option<(u32, f64)> {
        if !self.enabled {
            return None;
        }
        Some((self.repetitions?, self.volume?))
    }

    fn validate(&self, field: &str) -> Result<(), PropertiesError> {
        if !self.enabled {
            return Ok(());
        }
        match self.repetitions {
            Some(n) if n >= 1 => {}
            _ => {
                return Err(invalid(
                    format_args!("{field}.repetitions"),
                    "must be at least 1 when mixing is enabled",
                ));
            }
        }
        match self.volume {
            Some(v) if v > 0.0 => Ok(()),
            _ => Err(invalid(
                format_args!("{field}.volume"),
                "must be positive when mixing is enabled",
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct SubmergeProperties {
    pub position_reference: PositionReference,
    #[serde(default)]
    pub offset: Offset,
    pub speed: f64,
    #[serde(default)]
    pub delay: DelayProperties,
}

impl SubmergeProperties {
    fn validate(&self, field: &str) -> Result<(), PropertiesError> {
        validate_speed(self.speed, field)?;
        self.delay.validate(&format!("{field}.delay"))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RetractAspirateProperties {
    pub position_reference: PositionReference,
    #[serde(default)]
    pub offset: Offset,
    pub speed: f64,
    #[serde(default = "zero_curve")]
    pub air_gap_by_volume: ByVolumeCurve,
    #[serde(default)]
    pub touch_tip: TouchTipProperties,
    #[serde(default)]
    pub delay: DelayProperties,
}

impl RetractAspirateProperties {
    fn validate(&self, field: &str) -> Result<(), PropertiesError> {
        validate_speed(self.speed, field)?;
        self.touch_tip.validate(&format!("{field}.touch-tip"))?;
        self.delay.validate(&format!("{field}.delay"))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RetractDispenseProperties {
    pub position_reference: PositionReference,
    #[serde(default)]
    pub offset: Offset,
    pub speed: f64,
    #[serde(default = "zero_curve")]
    pub air_gap_by_volume: ByVolumeCurve,
    #[serde(default)]
    pub touch_tip: TouchTipProperties,
    #[serde(default)]
    pub blowout: BlowoutProperties,
    #[serde(default)]
    pub delay: DelayProperties,
}

impl RetractDispenseProperties {
    fn validate(&self, field: &str) -> Result<(), PropertiesError> {
        validate_speed(self.speed, field)?;
        self.touch_tip.validate(&format!("{field}.touch-tip"))?;
        self.blowout.validate(&format!("{field}.blowout"))?;
        self.delay.validate(&format!("{field}.delay"))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct AspirateProperties {
    pub submerge: SubmergeProperties,
    pub retract: RetractAspirateProperties,
    pub position_reference: PositionReference,
    #[serde(default)]
    pub offset: Offset,
    pub flow_rate_by_volume: ByVolumeCurve,
    #[serde(default = "zero_curve")]
    pub correction_by_volume: ByVolumeCurve,
    #[serde(default)]
    pub pre_wet: bool,
    #[serde(default)]
    pub mix: MixProperties,
    #[serde(default)]
    pub delay: DelayProperties,
}

impl AspirateProperties {
    fn validate(&self) -> Result<(), PropertiesError> {
        self.submerge.validate("aspirate.submerge")?;
        self.retract.validate("aspirate.retract")?;
        self.mix.validate("aspirate.mix")?;
        self.delay.validate("aspirate.delay")
    }
}

/// Settings for a dispense. Used both for single dispenses and, under the
/// `multi-dispense` key, for each dispense of a distribute.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct DispenseProperties {
    pub submerge: SubmergeProperties,
    pub retract: RetractDispenseProperties,
    pub position_reference: PositionReference,
    #[serde(default)]
    pub offset: Offset,
    pub flow_rate_by_volume: ByVolumeCurve,
    #[serde(default = "zero_curve")]
    pub correction_by_volume: ByVolumeCurve,
    #[serde(default = "zero_curve")]
    pub push_out_by_volume: ByVolumeCurve,
    #[serde(default)]
    pub mix: MixProperties,
    #[serde(default)]
    pub delay: DelayProperties,
    #[serde(default = "zero_curve")]
    pub conditioning_by_volume: ByVolumeCurve,
    #[serde(default = "zero_curve")]
    pub disposal_by_volume: ByVolumeCurve,
}

impl DispenseProperties {
    fn validate(&self, field: &str) -> Result<(), PropertiesError> {
        self.submerge.validate(&format!("{field}.submerge"))?;
        self.retract.validate(&format!("{field}.retract"))?;
        self.mix.validate(&format!("{field}.mix"))?;
        self.delay.validate(&format!("{field}.delay"))
    }
}

/// Everything a liquid class specifies for moving one liquid with one
/// pipette/tip combination.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct TransferProperties {
    pub aspirate: AspirateProperties,
    pub dispense: DispenseProperties,
    pub multi_dispense: Option<DispenseProperties>,
}

impl TransferProperties {
    pub fn load(path: &Path) -> Result<Self, PropertiesError> {
        let content = std::fs::read_to_string(path).map_err(|e| PropertiesError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        let properties: Self = toml::from_str(&content).map_err(|e| PropertiesError::Toml {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        properties.validate()?;
        Ok(properties)
    }

    /// Checks the cross-field rules serde cannot express, such as "an enabled
    /// delay needs a duration".
    pub fn validate(&self) -> Result<(), PropertiesError> {
        self.aspirate.validate()?;
        self.dispense.validate("dispense")?;
        if let Some(multi) = &self.multi_dispense {
            multi.validate("multi-dispense")?;
        }
        Ok(())
    }

    pub fn multi_dispense(&self) -> Result<&DispenseProperties, PropertiesError> {
        self.multi_dispense
            .as_ref()
            .ok_or(PropertiesError::MissingMultiDispense)
    }
}

fn zero_curve() -> ByVolumeCurve {
    ByVolumeCurve::constant(0.0)
}

fn validate_speed(speed: f64, field: &str) -> Result<(), PropertiesError> {
    if speed.is_finite() && speed > 0.0 {
        Ok(())
    } else {
        Err(invalid(format_args!("{field}.speed"), "must be positive"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const WATER: &str = r#"
        [aspirate]
        position-reference = "well-bottom"
        offset = { z = 1.0 }
        flow-rate-by-volume = [[10.0, 20.0], [100.0, 50.0]]
        correction-by-volume = [[0.0, 0.0], [100.0, 0.5]]
        pre-wet = true
        delay = { enabled = true, duration = 0.2 }

        [aspirate.submerge]
        position-reference = "top"
        offset = { z = 2.0 }
        speed = 100.0

        [aspirate.retract]
        position-reference = "well-top"
        offset = { z = 2.0 }
        speed = 50.0
        air-gap-by-volume = [[0.0, 5.0]]
        touch-tip = { enabled = true, z-offset = -1.0, mm-from-edge = 0.5, speed = 30.0 }

        [dispense]
        position-reference = "well-bottom"
        offset = { z = 2.0 }
        flow-rate-by-volume = [[0.0, 50.0]]
        push-out-by-volume = [[0.0, 2.0]]

        [dispense.submerge]
        position-reference = "well-top"
        offset = { z = 2.0 }
        speed = 100.0

        [dispense.retract]
        position-reference = "well-top"
        offset = { z = 2.0 }
        speed = 50.0
        blowout = { enabled = true, location = "trash", flow-rate = 100.0 }
    "#;

    fn write(contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("water.toml");
        fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn load_succeeds_with_valid_liquid_class() {
        let (_dir, path) = write(WATER);
        let props = TransferProperties::load(&path).unwrap();

        assert_eq!(
            props.aspirate.position_reference,
            PositionReference::WellBottom
        );
        assert_eq!(props.aspirate.offset, Offset::new(0.0, 0.0, 1.0));
        assert_eq!(
            props.aspirate.submerge.position_reference,
            PositionReference::WellTop
        );
        assert!(props.aspirate.pre_wet);
        assert_eq!(props.aspirate.delay.active_duration().unwrap(), Some(0.2));
        assert_eq!(props.aspirate.flow_rate_by_volume.get_for_volume(55.0), 35.0);
        assert_eq!(
            props.aspirate.retract.touch_tip.settings(),
            Some(TouchTipSettings {
                z_offset: -1.0,
                mm_from_edge: 0.5,
                speed: 30.0
            })
        );
        assert_eq!(
            props.dispense.retract.blowout.target().unwrap(),
            Some((BlowoutLocation::Trash, 100.0))
        );
        assert!(props.multi_dispense.is_none());
    }

    #[test]
    fn omitted_sections_default_to_disabled() {
        let (_dir, path) = write(WATER);
        let props = TransferProperties::load(&path).unwrap();

        assert_eq!(props.aspirate.mix, MixProperties::default());
        assert_eq!(props.dispense.delay.active_duration().unwrap(), None);
        assert_eq!(props.dispense.retract.touch_tip.settings(), None);
        assert_eq!(props.dispense.correction_by_volume.get_for_volume(30.0), 0.0);
        assert_eq!(props.dispense.retract.air_gap_by_volume.get_for_volume(30.0), 0.0);
        assert!(matches!(
            props.multi_dispense(),
            Err(PropertiesError::MissingMultiDispense)
        ));
    }

    #[test]
    fn load_fails_for_missing_file() {
        let dir = tempdir().unwrap();
        let result = TransferProperties::load(&dir.path().join("missing.toml"));
        assert!(matches!(result, Err(PropertiesError::Io { .. })));
    }

    #[test]
    fn load_fails_for_unknown_position_reference() {
        let (_dir, path) = write(&WATER.replace("\"top\"", "\"rim\""));
        assert!(matches!(
            TransferProperties::load(&path),
            Err(PropertiesError::Toml { .. })
        ));
    }

    #[test]
    fn load_fails_for_empty_curve() {
        let (_dir, path) = write(&WATER.replace(
            "flow-rate-by-volume = [[0.0, 50.0]]",
            "flow-rate-by-volume = []",
        ));
        assert!(matches!(
            TransferProperties::load(&path),
            Err(PropertiesError::Toml { .. })
        ));
    }

    #[test]
    fn load_rejects_enabled_delay_without_duration() {
        let (_dir, path) = write(&WATER.replace(
            "delay = { enabled = true, duration = 0.2 }",
            "delay = { enabled = true }",
        ));
        match TransferProperties::load(&path) {
            Err(PropertiesError::InvalidProperty { field, .. }) => {
                assert_eq!(field, "aspirate.delay.duration")
            }
            other => panic!("expected InvalidProperty, got {:?}", other),
        }
    }

    #[test]
    fn load_rejects_enabled_touch_tip_without_speed() {
        let (_dir, path) = write(&WATER.replace(", speed = 30.0 }", " }"));
        match TransferProperties::load(&path) {
            Err(PropertiesError::InvalidProperty { field, .. }) => {
                assert_eq!(field, "aspirate.retract.touch-tip.speed")
            }
            other => panic!("expected InvalidProperty, got {:?}", other),
        }
    }

    #[test]
    fn load_rejects_enabled_blowout_without_location() {
        let (_dir, path) = write(&WATER.replace("location = \"trash\", ", ""));
        match TransferProperties::load(&path) {
            Err(PropertiesError::InvalidProperty { field, .. }) => {
                assert_eq!(field, "dispense.retract.blowout.location")
            }
            other => panic!("expected InvalidProperty, got {:?}", other),
        }
    }

    #[test]
    fn validate_rejects_enabled_mix_without_repetitions() {
        let (_dir, path) = write(WATER);
        let mut props = TransferProperties::load(&path).unwrap();
        props.dispense.mix = MixProperties {
            enabled: true,
            repetitions: Some(0),
            volume: Some(10.0),
        };
        assert!(matches!(
            props.validate(),
            Err(PropertiesError::InvalidProperty { field, .. }) if field == "dispense.mix.repetitions"
        ));
    }

    #[test]
    fn validate_rejects_non_positive_speed() {
        let (_dir, path) = write(WATER);
        let mut props = TransferProperties::load(&path).unwrap();
        props.aspirate.submerge.speed = 0.0;
        assert!(matches!(
            props.validate(),
            Err(PropertiesError::InvalidProperty { field, .. }) if field == "aspirate.submerge.speed"
        ));
    }

    #[test]
    fn disabled_sub_settings_report_nothing_even_when_filled_in() {
        let touch_tip = TouchTipProperties {
            enabled: false,
            z_offset: Some(-1.0),
            mm_from_edge: Some(0.5),
            speed: Some(30.0),
        };
        assert_eq!(touch_tip.settings(), None);

        let delay = DelayProperties {
            enabled: false,
            duration: Some(1.0),
        };
        assert_eq!(delay.active_duration().unwrap(), None);
        assert_eq!(
            DelayProperties::seconds(1.5).active_duration().unwrap(),
            Some(1.5)
        );
        assert_eq!(MixProperties::new(3, 20.0).settings(), Some((3, 20.0)));
    }

    #[test]
    fn enabled_but_incomplete_settings_are_errors_at_use() {
        let delay = DelayProperties {
            enabled: true,
            duration: None,
        };
        assert!(matches!(
            delay.active_duration(),
            Err(PropertiesError::InvalidProperty { field, .. }) if field == "delay.duration"
        ));

        let blowout = BlowoutProperties {
            enabled: true,
            location: Some(BlowoutLocation::Trash),
            flow_rate: None,
        };
        assert!(matches!(
            blowout.target(),
            Err(PropertiesError::InvalidProperty { field, .. }) if field == "blowout.flow-rate"
        ));
        assert_eq!(BlowoutProperties::default().target().unwrap(), None);
    }
}

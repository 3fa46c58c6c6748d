use crate::core::liquid::properties::{BlowoutLocation, PositionReference};
use phf::{Map, phf_map};
use thiserror::Error;

static POSITION_REFERENCE_ALIASES: Map<&'static str, PositionReference> = phf_map! {
    "well-top" => PositionReference::WellTop,
    "top" => PositionReference::WellTop,
    "well-bottom" => PositionReference::WellBottom,
    "bottom" => PositionReference::WellBottom,
    "well-center" => PositionReference::WellCenter,
    "center" => PositionReference::WellCenter,
    "centre" => PositionReference::WellCenter,
    "liquid-meniscus" => PositionReference::LiquidMeniscus,
    "meniscus" => PositionReference::LiquidMeniscus,
};

static BLOWOUT_LOCATION_ALIASES: Map<&'static str, BlowoutLocation> = phf_map! {
    "source" => BlowoutLocation::Source,
    "source-well" => BlowoutLocation::Source,
    "destination" => BlowoutLocation::Destination,
    "destination-well" => BlowoutLocation::Destination,
    "trash" => BlowoutLocation::Trash,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Unknown {kind} '{value}'")]
pub struct UnknownAliasError {
    pub kind: &'static str,
    pub value: String,
}

/// Lower-cases and maps `_`/space to `-`, so `Well_Top` and `well top` both
/// resolve like `well-top`.
fn normalize(alias: &str) -> String {
    alias
        .trim()
        .chars()
        .map(|c| match c {
            '_' | ' ' => '-',
            other => other.to_ascii_lowercase(),
        })
        .collect()
}

pub fn parse_position_reference(alias: &str) -> Result<PositionReference, UnknownAliasError> {
    POSITION_REFERENCE_ALIASES
        .get(normalize(alias).as_str())
        .copied()
        .ok_or_else(|| UnknownAliasError {
            kind: "position reference",
            value: alias.to_string(),
        })
}

pub fn parse_blowout_location(alias: &str) -> Result<BlowoutLocation, UnknownAliasError> {
    BLOWOUT_LOCATION_ALIASES
        .get(normalize(alias).as_str())
        .copied()
        .ok_or_else(|| UnknownAliasError {
            kind: "blow-out location",
            value: alias.to_string(),
        })
}

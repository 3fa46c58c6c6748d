use super::error::EngineError;
use crate::core::geometry::GeometryError;
use crate::core::liquid::{Offset, PositionReference};
use crate::core::models::well::{LiquidHeight, WellCore};
use nalgebra::Point3;
use tracing::debug;

/// Height above the well top at which a liquid probe starts.
pub const LIQUID_PROBE_START_OFFSET_FROM_WELL_TOP: f64 = 2.0;

/// Positions this close to the meniscus or target count as level with it.
const Z_TOLERANCE: f64 = 1e-6;

/// Resolves `position_reference + offset` to a deck point.
///
/// `well_volume_difference` is the net volume already moved in (positive) or
/// out (negative) of the well, so meniscus-relative points follow the
/// post-pipetting liquid level. An unresolved meniscus falls back to the well
/// centre.
pub fn absolute_point_from_position_reference_and_offset(
    well: &dyn WellCore,
    well_volume_difference: f64,
    position_reference: PositionReference,
    offset: &Offset,
) -> Result<Point3<f64>, GeometryError> {
    let reference_point = match position_reference {
        PositionReference::WellTop => well.get_top(0.0),
        PositionReference::WellBottom => well.get_bottom(0.0),
        PositionReference::WellCenter => well.get_center(),
        PositionReference::LiquidMeniscus => {
            match well.estimate_meniscus(well_volume_difference)? {
                LiquidHeight::Concrete(point) => point,
                LiquidHeight::Unresolved => {
                    debug!(
                        well = well.name(),
                        "Liquid height unknown; using the well centre as the meniscus."
                    );
                    well.get_center()
                }
            }
        }
    };
    Ok(reference_point + offset.to_vector())
}

/// Fails when `point` lies below the (projected) liquid surface.
pub fn ensure_above_liquid(
    phase: &'static str,
    well: &dyn WellCore,
    well_volume_difference: f64,
    point: &Point3<f64>,
) -> Result<(), EngineError> {
    match well.estimate_meniscus(well_volume_difference)? {
        LiquidHeight::Concrete(meniscus) if point.z < meniscus.z - Z_TOLERANCE => {
            Err(EngineError::LocationInsideLiquid {
                phase,
                well: well.name().to_string(),
                z: point.z,
                meniscus_z: meniscus.z,
            })
        }
        _ => Ok(()),
    }
}

/// Fails when a retract `point` lies below the position it retracts from.
pub fn ensure_not_below_target(
    phase: &'static str,
    well: &dyn WellCore,
    point: &Point3<f64>,
    target: &Point3<f64>,
) -> Result<(), EngineError> {
    if point.z < target.z - Z_TOLERANCE {
        return Err(EngineError::RetractBelowTarget {
            phase,
            well: well.name().to_string(),
            z: point.z,
            target_z: target.z,
        });
    }
    Ok(())
}

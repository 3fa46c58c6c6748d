use crate::core::geometry::{GeometryError, WellGeometry, find_height_at_volume};
use nalgebra::{Point3, Vector3};

/// Volumes this far below zero (or above capacity) are treated as rounding
/// noise and clamped instead of rejected.
const VOLUME_TOLERANCE: f64 = 1e-9;

/// The height of the liquid surface in a well, if it can be known.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LiquidHeight {
    Concrete(Point3<f64>),
    /// The well's liquid volume has not been recorded, so no meniscus can be
    /// computed.
    Unresolved,
}

impl LiquidHeight {
    pub fn point(&self) -> Option<Point3<f64>> {
        match self {
            LiquidHeight::Concrete(point) => Some(*point),
            LiquidHeight::Unresolved => None,
        }
    }
}

/// Read-only view of a well used by the transfer engine for position lookups.
pub trait WellCore {
    fn name(&self) -> &str;

    fn labware(&self) -> Option<&str>;

    fn get_top(&self, z_offset: f64) -> Point3<f64>;

    fn get_bottom(&self, z_offset: f64) -> Point3<f64>;

    fn get_center(&self) -> Point3<f64>;

    /// Predicts the meniscus after `operation_volume` µL has been added
    /// (positive) or removed (negative) relative to the recorded volume.
    fn estimate_meniscus(&self, operation_volume: f64) -> Result<LiquidHeight, GeometryError>;

    fn get_meniscus(&self) -> Result<LiquidHeight, GeometryError> {
        self.estimate_meniscus(0.0)
    }
}

/// A physical well: its inner geometry, where its bottom centre sits on the
/// deck, and (optionally) how much liquid it holds.
#[derive(Debug, Clone, PartialEq)]
pub struct LabwareWell {
    name: String,
    labware: Option<String>,
    bottom_center: Point3<f64>,
    geometry: WellGeometry,
    liquid_volume: Option<f64>,
}

impl LabwareWell {
    pub fn new(
        name: &str,
        labware: Option<&str>,
        bottom_center: Point3<f64>,
        geometry: WellGeometry,
    ) -> Self {
        Self {
            name: name.to_string(),
            labware: labware.map(str::to_string),
            bottom_center,
            geometry,
            liquid_volume: None,
        }
    }

    pub fn with_liquid_volume(mut self, volume: f64) -> Self {
        self.liquid_volume = Some(volume);
        self
    }

    pub fn set_liquid_volume(&mut self, volume: Option<f64>) {
        self.liquid_volume = volume;
    }

    pub fn liquid_volume(&self) -> Option<f64> {
        self.liquid_volume
    }

    pub fn geometry(&self) -> &WellGeometry {
        &self.geometry
    }

    pub fn depth(&self) -> f64 {
        self.geometry.depth()
    }

    pub fn bottom_center(&self) -> Point3<f64> {
        self.bottom_center
    }
}

impl WellCore for LabwareWell {
    fn name(&self) -> &str {
        &self.name
    }

    fn labware(&self) -> Option<&str> {
        self.labware.as_deref()
    }

    fn get_top(&self, z_offset: f64) -> Point3<f64> {
        self.bottom_center + Vector3::new(0.0, 0.0, self.depth() + z_offset)
    }

    fn get_bottom(&self, z_offset: f64) -> Point3<f64> {
        self.bottom_center + Vector3::new(0.0, 0.0, z_offset)
    }

    fn get_center(&self) -> Point3<f64> {
        self.bottom_center + Vector3::new(0.0, 0.0, self.depth() / 2.0)
    }

    fn estimate_meniscus(&self, operation_volume: f64) -> Result<LiquidHeight, GeometryError> {
        let Some(current) = self.liquid_volume else {
            return Ok(LiquidHeight::Unresolved);
        };

        let mut projected = current + operation_volume;
        if projected < 0.0 && projected > -VOLUME_TOLERANCE {
            projected = 0.0;
        }
        let max_volume = self.geometry.max_volume()?;
        if projected > max_volume && projected < max_volume + VOLUME_TOLERANCE {
            projected = max_volume;
        }
        let height = find_height_at_volume(projected, &self.geometry)?;
        Ok(LiquidHeight::Concrete(self.get_bottom(height)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::WellSection;
    use std::f64::consts::PI;

    fn cylinder_well() -> LabwareWell {
        let geometry = WellGeometry::new(vec![WellSection::Conical {
            bottom_diameter: 10.0,
            top_diameter: 10.0,
            bottom_height: 0.0,
            top_height: 40.0,
        }])
        .unwrap();
        LabwareWell::new("A1", Some("tube_rack"), Point3::new(10.0, 20.0, 5.0), geometry)
    }

    #[test]
    fn top_bottom_and_center_are_relative_to_bottom_center() {
        let well = cylinder_well();
        assert_eq!(well.get_top(0.0), Point3::new(10.0, 20.0, 45.0));
        assert_eq!(well.get_top(-2.0), Point3::new(10.0, 20.0, 43.0));
        assert_eq!(well.get_bottom(1.0), Point3::new(10.0, 20.0, 6.0));
        assert_eq!(well.get_center(), Point3::new(10.0, 20.0, 25.0));
    }

    #[test]
    fn meniscus_is_unresolved_without_liquid_volume() {
        let well = cylinder_well();
        assert_eq!(well.get_meniscus().unwrap(), LiquidHeight::Unresolved);
        assert!(well.get_meniscus().unwrap().point().is_none());
    }

    #[test]
    fn meniscus_tracks_projected_volume() {
        let area = PI * 25.0;
        let well = cylinder_well().with_liquid_volume(area * 10.0);

        let current = well.get_meniscus().unwrap().point().unwrap();
        assert!((current.z - 15.0).abs() < 1e-3);

        let after_aspirate = well.estimate_meniscus(-area * 4.0).unwrap().point().unwrap();
        assert!((after_aspirate.z - 11.0).abs() < 1e-3);

        let after_dispense = well.estimate_meniscus(area * 2.0).unwrap().point().unwrap();
        assert!((after_dispense.z - 17.0).abs() < 1e-3);
    }

    #[test]
    fn meniscus_of_overdrawn_well_is_an_error() {
        let well = cylinder_well().with_liquid_volume(100.0);
        assert!(matches!(
            well.estimate_meniscus(-150.0),
            Err(GeometryError::InvalidLiquidHeightFound(_))
        ));
    }

    #[test]
    fn meniscus_of_exactly_emptied_well_is_at_bottom() {
        let well = cylinder_well().with_liquid_volume(100.0);
        let meniscus = well.estimate_meniscus(-100.0).unwrap().point().unwrap();
        assert_eq!(meniscus, well.get_bottom(0.0));
    }

    #[test]
    fn meniscus_just_past_capacity_is_clamped_to_the_top() {
        let full = cylinder_well().geometry().max_volume().unwrap();
        let well = cylinder_well().with_liquid_volume(full);

        let meniscus = well.estimate_meniscus(1e-12).unwrap().point().unwrap();
        assert!((meniscus.z - well.get_top(0.0).z).abs() < 1e-9);

        assert!(matches!(
            well.estimate_meniscus(1.0),
            Err(GeometryError::InvalidLiquidHeightFound(_))
        ));
    }
}

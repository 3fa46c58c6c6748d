use nalgebra::{Point3, Vector3};
use std::fmt;

/// An absolute deck position, optionally tagged with the labware it lies in.
///
/// Locations are plain values: moving the pipette never mutates one, and
/// offsets are applied by building a new location with [`Location::translated`].
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub point: Point3<f64>,
    pub labware: Option<String>,
}

impl Location {
    pub fn new(point: Point3<f64>, labware: Option<&str>) -> Self {
        Self {
            point,
            labware: labware.map(str::to_string),
        }
    }

    /// A location that is not associated with any labware (e.g. a trash chute).
    pub fn free(point: Point3<f64>) -> Self {
        Self {
            point,
            labware: None,
        }
    }

    /// Same labware, different point.
    pub fn with_point(&self, point: Point3<f64>) -> Self {
        Self {
            point,
            labware: self.labware.clone(),
        }
    }

    pub fn translated(&self, offset: Vector3<f64>) -> Self {
        self.with_point(self.point + offset)
    }

    #[inline]
    pub fn z(&self) -> f64 {
        self.point.z
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({:.3}, {:.3}, {:.3})",
            self.point.x, self.point.y, self.point.z
        )?;
        if let Some(labware) = &self.labware {
            write!(f, " in {}", labware)?;
        }
        Ok(())
    }
}

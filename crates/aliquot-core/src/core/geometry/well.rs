use super::error::GeometryError;
use super::frustum::{
    Boundary, FrustumPolynomial, cross_section_area, spherical_cap_height, spherical_cap_volume,
    volume_between,
};
use serde::Deserialize;

/// Heights closer than this are treated as the same section boundary when
/// checking that sections stack without gaps.
const BOUNDARY_TOLERANCE: f64 = 1e-9;

/// One horizontal slab of a well, between `bottom_height` and `top_height`
/// (both measured from the well bottom, in mm).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "shape", rename_all = "kebab-case")]
pub enum WellSection {
    /// Truncated cone (a cylinder when both diameters match).
    #[serde(rename_all = "kebab-case")]
    Conical {
        bottom_diameter: f64,
        top_diameter: f64,
        bottom_height: f64,
        top_height: f64,
    },
    /// Truncated rectangular pyramid (a cuboid when both faces match).
    #[serde(rename_all = "kebab-case")]
    Cuboidal {
        bottom_x_dimension: f64,
        bottom_y_dimension: f64,
        top_x_dimension: f64,
        top_y_dimension: f64,
        bottom_height: f64,
        top_height: f64,
    },
    /// Spherical cap; only valid as the lowest section of a well.
    #[serde(rename_all = "kebab-case")]
    Spherical {
        radius_of_curvature: f64,
        #[serde(default)]
        bottom_height: f64,
        top_height: f64,
    },
    /// Section joining two faces of different shape, e.g. a round bottom
    /// opening into a square top.
    #[serde(rename_all = "kebab-case")]
    Transition {
        bottom: Boundary,
        top: Boundary,
        bottom_height: f64,
        top_height: f64,
    },
}

impl WellSection {
    pub fn bottom_height(&self) -> f64 {
        match *self {
            Self::Conical { bottom_height, .. }
            | Self::Cuboidal { bottom_height, .. }
            | Self::Spherical { bottom_height, .. }
            | Self::Transition { bottom_height, .. } => bottom_height,
        }
    }

    pub fn top_height(&self) -> f64 {
        match *self {
            Self::Conical { top_height, .. }
            | Self::Cuboidal { top_height, .. }
            | Self::Spherical { top_height, .. }
            | Self::Transition { top_height, .. } => top_height,
        }
    }

    pub fn height(&self) -> f64 {
        self.top_height() - self.bottom_height()
    }

    fn polynomial(&self) -> Result<FrustumPolynomial, GeometryError> {
        let height = self.height();
        match *self {
            Self::Conical {
                bottom_diameter,
                top_diameter,
                ..
            } => Ok(FrustumPolynomial::circular(
                bottom_diameter / 2.0,
                top_diameter / 2.0,
                height,
            )),
            Self::Cuboidal {
                bottom_x_dimension,
                bottom_y_dimension,
                top_x_dimension,
                top_y_dimension,
                ..
            } => Ok(FrustumPolynomial::rectangular(
                bottom_y_dimension,
                bottom_x_dimension,
                top_y_dimension,
                top_x_dimension,
                height,
            )),
            Self::Transition { bottom, top, .. } => Ok(FrustumPolynomial::from_areas(
                cross_section_area(&bottom)?,
                cross_section_area(&top)?,
                height,
            )),
            Self::Spherical { .. } => Err(GeometryError::InvalidWellDefinition(
                "a spherical section has no frustum polynomial".to_string(),
            )),
        }
    }

    /// Total liquid volume the section holds when full.
    pub fn volume(&self) -> Result<f64, GeometryError> {
        match *self {
            Self::Transition { bottom, top, .. } => Ok(volume_between(
                cross_section_area(&bottom)?,
                cross_section_area(&top)?,
                self.height(),
            )),
            _ => self.volume_at(self.height()),
        }
    }

    /// Volume between the section bottom and `relative_height` above it.
    pub fn volume_at(&self, relative_height: f64) -> Result<f64, GeometryError> {
        if let Self::Spherical {
            radius_of_curvature,
            ..
        } = *self
        {
            return Ok(spherical_cap_volume(relative_height, radius_of_curvature));
        }
        Ok(self.polynomial()?.volume_at(relative_height))
    }

    /// Height above the section bottom at which it holds `relative_volume`.
    pub fn height_at(&self, relative_volume: f64) -> Result<f64, GeometryError> {
        if let Self::Spherical {
            radius_of_curvature,
            ..
        } = *self
        {
            return spherical_cap_height(relative_volume, radius_of_curvature, self.height());
        }
        self.polynomial()?.height_at(relative_volume, self.height())
    }

    fn validate(&self, index: usize) -> Result<(), GeometryError> {
        let invalid = |reason: String| {
            Err(GeometryError::InvalidWellDefinition(format!(
                "section {} ({:?}): {}",
                index, self, reason
            )))
        };

        if !(self.bottom_height().is_finite() && self.top_height().is_finite()) {
            return invalid("section heights must be finite".to_string());
        }
        if self.height() <= 0.0 {
            return invalid("top height must be above bottom height".to_string());
        }

        let dimensions: Vec<f64> = match *self {
            Self::Conical {
                bottom_diameter,
                top_diameter,
                ..
            } => vec![bottom_diameter, top_diameter],
            Self::Cuboidal {
                bottom_x_dimension,
                bottom_y_dimension,
                top_x_dimension,
                top_y_dimension,
                ..
            } => vec![
                bottom_x_dimension,
                bottom_y_dimension,
                top_x_dimension,
                top_y_dimension,
            ],
            Self::Spherical {
                radius_of_curvature,
                ..
            } => {
                if index != 0 || self.bottom_height() != 0.0 {
                    return invalid("a spherical section must be the well bottom".to_string());
                }
                if self.height() > radius_of_curvature {
                    return invalid(format!(
                        "cap height {} exceeds radius of curvature {}",
                        self.height(),
                        radius_of_curvature
                    ));
                }
                vec![radius_of_curvature]
            }
            Self::Transition { bottom, top, .. } => {
                vec![cross_section_area(&bottom)?, cross_section_area(&top)?]
            }
        };

        if dimensions.iter().any(|d| !d.is_finite() || *d < 0.0) {
            return invalid("dimensions must be finite and non-negative".to_string());
        }
        Ok(())
    }
}

/// The inner shape of a well as a bottom-to-top stack of sections.
///
/// Sections are kept sorted by height and are guaranteed to cover
/// `[0, depth]` without gaps or overlaps.
#[derive(Debug, Clone, PartialEq)]
pub struct WellGeometry {
    sections: Vec<WellSection>,
}

impl WellGeometry {
    pub fn new(mut sections: Vec<WellSection>) -> Result<Self, GeometryError> {
        if sections.is_empty() {
            return Err(GeometryError::InvalidWellDefinition(
                "a well needs at least one section".to_string(),
            ));
        }
        sections.sort_by(|a, b| a.top_height().total_cmp(&b.top_height()));

        let mut expected_bottom = 0.0;
        for (index, section) in sections.iter().enumerate() {
            section.validate(index)?;
            if (section.bottom_height() - expected_bottom).abs() > BOUNDARY_TOLERANCE {
                return Err(GeometryError::InvalidWellDefinition(format!(
                    "section {} starts at {} but the section below ends at {}",
                    index,
                    section.bottom_height(),
                    expected_bottom
                )));
            }
            expected_bottom = section.top_height();
        }

        Ok(Self { sections })
    }

    pub fn sections(&self) -> &[WellSection] {
        &self.sections
    }

    pub fn depth(&self) -> f64 {
        self.sections
            .last()
            .map(WellSection::top_height)
            .unwrap_or_default()
    }

    pub fn max_volume(&self) -> Result<f64, GeometryError> {
        Ok(get_well_volumetric_capacity(self)?
            .iter()
            .map(|(_, volume)| volume)
            .sum())
    }
}

/// Returns `(top_height, section_volume)` for every section, bottom to top.
///
/// The volumes are per section, not cumulative; summing a prefix of the
/// table gives the volume held below that section's top.
pub fn get_well_volumetric_capacity(
    well: &WellGeometry,
) -> Result<Vec<(f64, f64)>, GeometryError> {
    well.sections
        .iter()
        .map(|section| Ok((section.top_height(), section.volume()?)))
        .collect()
}

/// Liquid volume held in the well when filled to `target_height`.
pub fn find_volume_at_height(target_height: f64, well: &WellGeometry) -> Result<f64, GeometryError> {
    let capacity = get_well_volumetric_capacity(well)?;
    let max_height = well.depth();
    if !(0.0..=max_height).contains(&target_height) {
        return Err(GeometryError::InvalidLiquidHeightFound(format!(
            "target height {} is outside [0, {}]",
            target_height, max_height
        )));
    }
    if target_height == 0.0 {
        return Ok(0.0);
    }

    let mut closed_section_volume = 0.0;
    for (section, (boundary_height, section_volume)) in well.sections.iter().zip(&capacity) {
        if *boundary_height < target_height {
            closed_section_volume += section_volume;
            continue;
        }
        if *boundary_height == target_height {
            return Ok(closed_section_volume + section_volume);
        }
        let relative_height = target_height - section.bottom_height();
        return Ok(closed_section_volume + section.volume_at(relative_height)?);
    }

    Err(GeometryError::InvalidLiquidHeightFound(format!(
        "no section contains height {}",
        target_height
    )))
}

/// Liquid height in the well when it holds `target_volume`.
pub fn find_height_at_volume(target_volume: f64, well: &WellGeometry) -> Result<f64, GeometryError> {
    let capacity = get_well_volumetric_capacity(well)?;
    let max_volume: f64 = capacity.iter().map(|(_, volume)| volume).sum();
    if !(0.0..=max_volume).contains(&target_volume) {
        return Err(GeometryError::InvalidLiquidHeightFound(format!(
            "target volume {} is outside [0, {}]",
            target_volume, max_volume
        )));
    }
    if target_volume == 0.0 {
        return Ok(0.0);
    }

    let mut closed_section_volume = 0.0;
    for (section, (boundary_height, section_volume)) in well.sections.iter().zip(&capacity) {
        let enclosed = closed_section_volume + section_volume;
        if target_volume == enclosed {
            return Ok(*boundary_height);
        }
        if target_volume < enclosed {
            let relative_volume = target_volume - closed_section_volume;
            return Ok(section.bottom_height() + section.height_at(relative_volume)?);
        }
        closed_section_volume = enclosed;
    }

    // Only reachable when summation order leaves target a rounding error above
    // the last cumulative boundary.
    Ok(well.depth())
}

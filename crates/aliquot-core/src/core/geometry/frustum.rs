use super::error::GeometryError;
use crate::core::utils::polynomial::{real_roots, round_to_4_decimals};
use serde::Deserialize;
use std::f64::consts::PI;

/// Roots this far outside `[0, section_height]` are still accepted (and
/// clamped); they come from floating-point noise at the section edges.
const HEIGHT_RANGE_EPSILON: f64 = 1e-9;

/// The shape of a horizontal boundary (the top or bottom face) of a well section.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "shape", rename_all = "kebab-case")]
pub enum Boundary {
    Circular {
        diameter: f64,
    },
    #[serde(rename_all = "kebab-case")]
    Rectangular { x_dimension: f64, y_dimension: f64 },
    #[serde(rename_all = "kebab-case")]
    Spherical { radius_of_curvature: f64 },
}

/// Area of a horizontal cross-section.
///
/// Only circular and rectangular faces have a planar area; a spherical
/// boundary is rejected as an invalid well definition.
pub fn cross_section_area(boundary: &Boundary) -> Result<f64, GeometryError> {
    match *boundary {
        Boundary::Circular { diameter } => Ok(PI * (diameter / 2.0).powi(2)),
        Boundary::Rectangular {
            x_dimension,
            y_dimension,
        } => Ok(x_dimension * y_dimension),
        Boundary::Spherical { .. } => Err(GeometryError::InvalidWellDefinition(format!(
            "Cross-section area is undefined for boundary {:?}",
            boundary
        ))),
    }
}

/// Volume of a frustum bounded by two parallel faces of the given areas.
#[inline]
pub fn volume_between(area_bottom: f64, area_top: f64, height: f64) -> f64 {
    (height / 3.0) * (area_bottom + area_top + (area_bottom * area_top).sqrt())
}

/// Coefficients of `V(h) = a·h³ + b·h² + c·h`, the volume enclosed between the
/// bottom face of a frustum and a plane at height `h` above it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrustumPolynomial {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl FrustumPolynomial {
    /// Truncated cone.
    pub fn circular(bottom_radius: f64, top_radius: f64, height: f64) -> Self {
        let dr = top_radius - bottom_radius;
        Self {
            a: PI * dr.powi(2) / (3.0 * height.powi(2)),
            b: PI * bottom_radius * dr / height,
            c: PI * bottom_radius.powi(2),
        }
    }

    /// Truncated rectangular pyramid with independently tapering sides.
    pub fn rectangular(
        bottom_length: f64,
        bottom_width: f64,
        top_length: f64,
        top_width: f64,
        height: f64,
    ) -> Self {
        let dl = top_length - bottom_length;
        let dw = top_width - bottom_width;
        Self {
            a: dl * dw / (3.0 * height.powi(2)),
            b: (bottom_length * dw + bottom_width * dl) / (2.0 * height),
            c: bottom_length * bottom_width,
        }
    }

    /// Section between two faces of arbitrary shape, assuming the square root
    /// of the cross-section area varies linearly with height. This reduces to
    /// the circular case for two round faces, and its full-height volume equals
    /// [`volume_between`] for the two boundary areas.
    pub fn from_areas(area_bottom: f64, area_top: f64, height: f64) -> Self {
        let s_bottom = area_bottom.sqrt();
        let ds = area_top.sqrt() - s_bottom;
        Self {
            a: ds.powi(2) / (3.0 * height.powi(2)),
            b: s_bottom * ds / height,
            c: area_bottom,
        }
    }

    #[inline]
    pub fn volume_at(&self, height: f64) -> f64 {
        self.a * height.powi(3) + self.b * height.powi(2) + self.c * height
    }

    /// Inverts [`Self::volume_at`] within `[0, max_height]`.
    pub fn height_at(&self, volume: f64, max_height: f64) -> Result<f64, GeometryError> {
        let candidates = real_roots(&[self.a, self.b, self.c, -volume]);
        select_unique_height(&candidates, max_height)
    }
}

/// Volume of a spherical cap of height `height` cut from a sphere of radius
/// `radius_of_curvature`.
#[inline]
pub fn spherical_cap_volume(height: f64, radius_of_curvature: f64) -> f64 {
    (PI / 3.0) * height.powi(2) * (3.0 * radius_of_curvature - height)
}

/// Solves `−(π/3)·h³ + π·R·h² = volume` for the cap height within `[0, max_height]`.
pub fn spherical_cap_height(
    volume: f64,
    radius_of_curvature: f64,
    max_height: f64,
) -> Result<f64, GeometryError> {
    let candidates = real_roots(&[-PI / 3.0, PI * radius_of_curvature, 0.0, -volume]);
    select_unique_height(&candidates, max_height)
}

/// Keeps the real roots that fall inside the section, rounds them to four
/// decimals, and requires exactly one distinct survivor.
pub(crate) fn select_unique_height(
    candidates: &[f64],
    max_height: f64,
) -> Result<f64, GeometryError> {
    let mut valid: Vec<f64> = candidates
        .iter()
        .filter(|h| **h >= -HEIGHT_RANGE_EPSILON && **h <= max_height + HEIGHT_RANGE_EPSILON)
        .map(|h| round_to_4_decimals(h.clamp(0.0, max_height)))
        .collect();
    valid.sort_by(|a, b| a.total_cmp(b));
    valid.dedup();

    match valid.as_slice() {
        [height] => Ok(*height),
        [] => Err(GeometryError::InvalidLiquidHeightFound(format!(
            "no root of the volume polynomial lies within [0, {}]",
            max_height
        ))),
        many => Err(GeometryError::InvalidLiquidHeightFound(format!(
            "{} candidate heights {:?} lie within [0, {}]",
            many.len(),
            many,
            max_height
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-9;

    fn f64_approx_equal(a: f64, b: f64) -> bool {
        (a - b).abs() < TOLERANCE
    }

    #[test]
    fn circular_cross_section_area_uses_radius_squared() {
        let area = cross_section_area(&Boundary::Circular { diameter: 10.0 }).unwrap();
        assert!(f64_approx_equal(area, PI * 25.0));
    }

    #[test]
    fn rectangular_cross_section_area_is_product_of_sides() {
        let area = cross_section_area(&Boundary::Rectangular {
            x_dimension: 8.0,
            y_dimension: 4.5,
        })
        .unwrap();
        assert!(f64_approx_equal(area, 36.0));
    }

    #[test]
    fn spherical_boundary_has_no_cross_section_area() {
        let result = cross_section_area(&Boundary::Spherical {
            radius_of_curvature: 3.0,
        });
        assert!(matches!(
            result,
            Err(GeometryError::InvalidWellDefinition(_))
        ));
    }

    #[test]
    fn volume_between_equal_areas_is_a_prism() {
        assert!(f64_approx_equal(volume_between(10.0, 10.0, 3.0), 30.0));
    }

    #[test]
    fn volume_between_zero_top_area_is_a_cone() {
        assert!(f64_approx_equal(volume_between(9.0, 0.0, 3.0), 9.0));
    }

    #[test]
    fn cylinder_polynomial_is_linear_in_height() {
        let poly = FrustumPolynomial::circular(5.0, 5.0, 40.0);
        assert_eq!(poly.a, 0.0);
        assert_eq!(poly.b, 0.0);
        assert!(f64_approx_equal(poly.c, PI * 25.0));
        assert!((poly.volume_at(10.0) - 785.398).abs() < 1e-3);
    }

    #[test]
    fn circular_polynomial_full_height_matches_frustum_formula() {
        let poly = FrustumPolynomial::circular(2.0, 4.0, 6.0);
        let expected = volume_between(PI * 4.0, PI * 16.0, 6.0);
        assert!((poly.volume_at(6.0) - expected).abs() < 1e-9);
    }

    #[test]
    fn rectangular_polynomial_full_height_matches_integrated_volume() {
        // Sides taper 2→4 and 3→3 over 5mm: ∫ (2 + 0.4h)·3 dh = 45.
        let poly = FrustumPolynomial::rectangular(2.0, 3.0, 4.0, 3.0, 5.0);
        assert!(f64_approx_equal(poly.a, 0.0));
        assert!(f64_approx_equal(poly.volume_at(5.0), 45.0));
    }

    #[test]
    fn from_areas_reduces_to_circular_polynomial_for_round_faces() {
        let circular = FrustumPolynomial::circular(1.5, 3.0, 8.0);
        let by_area = FrustumPolynomial::from_areas(PI * 2.25, PI * 9.0, 8.0);
        assert!((circular.a - by_area.a).abs() < 1e-12);
        assert!((circular.b - by_area.b).abs() < 1e-12);
        assert!((circular.c - by_area.c).abs() < 1e-12);
    }

    #[test]
    fn frustum_height_at_inverts_volume_at() {
        let poly = FrustumPolynomial::circular(1.0, 3.5, 12.0);
        let volume = poly.volume_at(7.25);
        let height = poly.height_at(volume, 12.0).unwrap();
        assert!((height - 7.25).abs() < 1e-4);
    }

    #[test]
    fn narrowing_frustum_height_at_inverts_volume_at() {
        let poly = FrustumPolynomial::rectangular(8.0, 8.0, 5.0, 6.0, 10.0);
        let volume = poly.volume_at(3.3);
        let height = poly.height_at(volume, 10.0).unwrap();
        assert!((height - 3.3).abs() < 1e-4);
    }

    #[test]
    fn height_at_volume_beyond_section_fails() {
        let poly = FrustumPolynomial::circular(5.0, 5.0, 10.0);
        let result = poly.height_at(poly.volume_at(10.0) * 2.0, 10.0);
        assert!(matches!(
            result,
            Err(GeometryError::InvalidLiquidHeightFound(_))
        ));
    }

    #[test]
    fn spherical_cap_of_full_hemisphere_is_half_sphere() {
        let volume = spherical_cap_volume(2.0, 2.0);
        assert!(f64_approx_equal(volume, 2.0 / 3.0 * PI * 8.0));
    }

    #[test]
    fn spherical_cap_height_inverts_volume() {
        let volume = spherical_cap_volume(1.2, 3.0);
        let height = spherical_cap_height(volume, 3.0, 3.0).unwrap();
        assert!((height - 1.2).abs() < 1e-4);
    }

    #[test]
    fn select_unique_height_merges_roots_equal_after_rounding() {
        let height = select_unique_height(&[2.000_001, 2.000_002, -1.0, 15.0], 10.0).unwrap();
        assert_eq!(height, 2.0);
    }

    #[test]
    fn select_unique_height_rejects_two_distinct_candidates() {
        let result = select_unique_height(&[1.0, 2.0], 10.0);
        assert!(matches!(
            result,
            Err(GeometryError::InvalidLiquidHeightFound(_))
        ));
    }
}

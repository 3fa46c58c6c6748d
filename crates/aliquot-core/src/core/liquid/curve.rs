use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CurveError {
    #[error("A by-volume curve needs at least one breakpoint")]
    Empty,
    #[error("Breakpoint [{volume}, {value}] is not finite")]
    NonFinite { volume: f64, value: f64 },
    #[error("Volume {0} appears more than once in the curve")]
    DuplicateVolume(f64),
}

/// A property that varies with the pipetted volume, given as `[volume, value]`
/// breakpoints.
///
/// Lookups interpolate linearly between neighbouring breakpoints and hold the
/// first/last value outside the defined range.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Vec<[f64; 2]>")]
pub struct ByVolumeCurve {
    points: Vec<(f64, f64)>,
}

impl ByVolumeCurve {
    pub fn new(points: impl IntoIterator<Item = (f64, f64)>) -> Result<Self, CurveError> {
        let mut points: Vec<(f64, f64)> = points.into_iter().collect();
        if points.is_empty() {
            return Err(CurveError::Empty);
        }
        if let Some(&(volume, value)) = points
            .iter()
            .find(|(volume, value)| !volume.is_finite() || !value.is_finite())
        {
            return Err(CurveError::NonFinite { volume, value });
        }

        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        if let Some(pair) = points.windows(2).find(|pair| pair[0].0 == pair[1].0) {
            return Err(CurveError::DuplicateVolume(pair[0].0));
        }

        Ok(Self { points })
    }

    /// A curve that evaluates to `value` for every volume.
    pub fn constant(value: f64) -> Self {
        Self {
            points: vec![(0.0, value)],
        }
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    pub fn get_for_volume(&self, volume: f64) -> f64 {
        let (first_volume, first_value) = self.points[0];
        if volume <= first_volume {
            return first_value;
        }

        for pair in self.points.windows(2) {
            let (v0, y0) = pair[0];
            let (v1, y1) = pair[1];
            if volume <= v1 {
                return y0 + (y1 - y0) * (volume - v0) / (v1 - v0);
            }
        }

        self.points[self.points.len() - 1].1
    }

    /// Largest value anywhere on the curve.
    pub fn max_value(&self) -> f64 {
        self.points
            .iter()
            .map(|(_, value)| *value)
            .fold(f64::NEG_INFINITY, f64::max)
    }
}

impl TryFrom<Vec<[f64; 2]>> for ByVolumeCurve {
    type Error = CurveError;

    fn try_from(points: Vec<[f64; 2]>) -> Result<Self, Self::Error> {
        Self::new(points.into_iter().map(|[volume, value]| (volume, value)))
    }
}

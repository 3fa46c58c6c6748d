//! Well geometry: liquid volume ↔ liquid height conversion for wells modelled
//! as a stack of frusta over an optional spherical bottom.

pub mod error;
pub mod frustum;
pub mod well;

pub use error::GeometryError;
pub use frustum::{Boundary, cross_section_area, volume_between};
pub use well::{
    WellGeometry, WellSection, find_height_at_volume, find_volume_at_height,
    get_well_volumetric_capacity,
};

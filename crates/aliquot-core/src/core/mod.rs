//! # Core Module
//!
//! Stateless building blocks of the transfer engine.
//!
//! - **Well geometry** ([`geometry`]) - Height/volume conversion for wells built from stacked frusta
//! - **Models** ([`models`]) - Locations, tip contents, wells and labware definitions
//! - **Liquid classes** ([`liquid`]) - By-volume curves and per-phase transfer properties
//! - **Instrument contract** ([`instrument`]) - The pipette interface plus a recording simulator
//! - **Utilities** ([`utils`]) - Polynomial roots and alias tables

pub mod geometry;
pub mod instrument;
pub mod liquid;
pub mod models;
pub mod utils;

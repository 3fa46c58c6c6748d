//! # Core Models Module
//!
//! Plain data types shared by every layer of the transfer engine.
//!
//! - [`location`] - Absolute deck positions tagged with their labware
//! - [`tip`] - The tip's liquid/air-gap contents and plunger readiness
//! - [`well`] - The well position resolver trait and the geometry-backed well
//! - [`labware`] - Labware definitions loaded from TOML

pub mod labware;
pub mod location;
pub mod tip;
pub mod well;

//! # aliquot
//!
//! A liquid-handling transfer engine. Given labware geometry, a liquid class
//! and an instrument, it plans and executes transfers, consolidations and
//! distributions phase by phase, tracking what the tip holds at every step.
//!
//! ## Architecture
//!
//! The library keeps a strict three-layer split:
//!
//! - **[`core`]: The Foundation.** Stateless models and math: well geometry and
//!   the volume/height solver, labware loading, tip state, liquid-class
//!   properties, and the [`Instrument`](core::instrument::Instrument) contract
//!   together with a recording simulator.
//!
//! - **[`engine`]: The Logic Core.** The stateful
//!   [`TransferComponentsExecutor`](engine::executor::TransferComponentsExecutor)
//!   that runs one well visit (submerge, aspirate, dispense, mix, retract), the
//!   per-topology policy, volume planning, configuration and progress reporting.
//!
//! - **[`workflows`]: The Public API.** Ties the two together into complete
//!   transfer, consolidate and distribute runs.

pub mod core;
pub mod engine;
pub mod workflows;

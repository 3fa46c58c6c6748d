//! # Engine Module
//!
//! The stateful layer of aliquot. It drives an [`Instrument`](crate::core::instrument::Instrument)
//! through the pipetting phases of a liquid transfer while keeping a model of
//! what the tip holds.
//!
//! ## Architecture
//!
//! - **Executor** ([`executor`]) - Per-well state machine: submerge, aspirate,
//!   dispense, mix, pre-wet and the three retract variants
//! - **Transfer Types** ([`transfer_type`]) - Phase policy for transfer,
//!   consolidate and distribute
//! - **Planning** ([`planner`]) - Splits and groups volumes into tip loads
//! - **Positions** ([`positions`]) - Resolves position references and checks
//!   locations against the liquid surface
//! - **Configuration** ([`config`]) - Run-level settings such as working volume
//!   and trash location
//! - **Progress Monitoring** ([`progress`]) - Callback-based progress events
//! - **Error Handling** ([`error`]) - The engine error type wrapping every
//!   lower-layer error

pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod planner;
pub mod positions;
pub mod progress;
pub mod transfer_type;

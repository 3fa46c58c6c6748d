//! # Workflows Module
//!
//! The public entry points of aliquot. Each workflow plans a liquid transfer,
//! then walks the plan one well visit at a time, handing the tip state from
//! one visit's executor to the next.
//!
//! - **Transfer** ([`transfer::transfer`]) - Pairs sources with destinations
//! - **Consolidate** ([`transfer::consolidate`]) - Many sources into one destination
//! - **Distribute** ([`transfer::distribute`]) - One source into many destinations
//!
//! All three report progress through the
//! [`ProgressReporter`](crate::engine::progress::ProgressReporter) in their
//! [`TransferContext`](crate::engine::context::TransferContext) and return a
//! [`TransferReport`](transfer::TransferReport).

pub mod transfer;

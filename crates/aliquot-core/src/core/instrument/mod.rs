//! The pipette contract consumed by the transfer engine, a scoped flow-rate
//! override, and a recording simulator for dry runs and tests.

pub mod flow_rate;
pub mod simulated;
pub mod traits;

pub use flow_rate::BlowOutFlowRate;
pub use simulated::{InstrumentCall, SimulatedInstrument};
pub use traits::{
    AspirateParams, DispenseParams, FlowRates, Instrument, InstrumentError, TouchTipParams,
};

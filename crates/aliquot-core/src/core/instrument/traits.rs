use crate::core::models::location::Location;
use crate::core::models::well::WellCore;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum InstrumentError {
    #[error("Touch tip is disabled for well '{well}'")]
    TouchTipDisabled { well: String },
    #[error("Cannot take up {requested} µL: only {available} µL of tip capacity remains")]
    VolumeExceeded { requested: f64, available: f64 },
    #[error("Cannot dispense {requested} µL: the tip only holds {available} µL")]
    InsufficientVolume { requested: f64, available: f64 },
    #[error("The plunger is not prepared to aspirate")]
    NotPreparedToAspirate,
    #[error("Hardware error: {0}")]
    Hardware(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AspirateParams {
    pub volume: f64,
    pub rate: f64,
    pub flow_rate: f64,
    pub correction_volume: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DispenseParams {
    pub volume: f64,
    pub rate: f64,
    pub flow_rate: f64,
    pub push_out: Option<f64>,
    pub correction_volume: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchTipParams {
    pub radius: f64,
    pub z_offset: f64,
    pub speed: f64,
    pub mm_from_edge: f64,
}

/// Per-action flow-rate overrides; `None` leaves that rate unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FlowRates {
    pub aspirate: Option<f64>,
    pub dispense: Option<f64>,
    pub blow_out: Option<f64>,
}

/// The pipette the transfer engine drives.
///
/// Every call blocks until the motion or plunger action has completed.
/// Volumes are in µL, flow rates in µL/s, speeds in mm/s and durations in
/// seconds.
pub trait Instrument {
    fn move_to(
        &mut self,
        location: &Location,
        well: Option<&dyn WellCore>,
        force_direct: bool,
        minimum_z_height: Option<f64>,
        speed: Option<f64>,
    ) -> Result<(), InstrumentError>;

    fn aspirate(
        &mut self,
        location: &Location,
        well: Option<&dyn WellCore>,
        in_place: bool,
        params: AspirateParams,
    ) -> Result<(), InstrumentError>;

    fn dispense(
        &mut self,
        location: &Location,
        well: Option<&dyn WellCore>,
        in_place: bool,
        params: DispenseParams,
    ) -> Result<(), InstrumentError>;

    fn blow_out(
        &mut self,
        location: &Location,
        well: Option<&dyn WellCore>,
        in_place: bool,
    ) -> Result<(), InstrumentError>;

    /// May fail with [`InstrumentError::TouchTipDisabled`] for labware that
    /// forbids touching its walls.
    fn touch_tip(
        &mut self,
        location: &Location,
        well: &dyn WellCore,
        params: TouchTipParams,
    ) -> Result<(), InstrumentError>;

    fn delay(&mut self, seconds: f64) -> Result<(), InstrumentError>;

    fn get_current_volume(&self) -> f64;

    fn prepare_to_aspirate(&mut self) -> Result<(), InstrumentError>;

    fn configure_for_volume(&mut self, volume: f64) -> Result<(), InstrumentError>;

    fn liquid_probe_with_recovery(
        &mut self,
        well: &dyn WellCore,
        location: &Location,
    ) -> Result<(), InstrumentError>;

    fn get_liquid_presence_detection(&self) -> bool;

    fn set_flow_rate(&mut self, rates: FlowRates);

    /// Replaces every flow rate with `rates` verbatim; `None` clears a rate
    /// back to the instrument's own default.
    fn restore_flow_rates(&mut self, rates: FlowRates);

    fn flow_rates(&self) -> FlowRates;

    fn air_gap_in_place(
        &mut self,
        volume: f64,
        flow_rate: f64,
        correction_volume: f64,
    ) -> Result<(), InstrumentError>;
}

use super::traits::{
    AspirateParams, DispenseParams, FlowRates, Instrument, InstrumentError, TouchTipParams,
};
use crate::core::models::location::Location;
use crate::core::models::well::WellCore;
use nalgebra::Point3;
use std::collections::HashSet;
use tracing::trace;

const DEFAULT_ASPIRATE_FLOW_RATE: f64 = 50.0;
const DEFAULT_DISPENSE_FLOW_RATE: f64 = 50.0;
const DEFAULT_BLOW_OUT_FLOW_RATE: f64 = 80.0;
const VOLUME_TOLERANCE: f64 = 1e-9;

/// One call received by a [`SimulatedInstrument`].
#[derive(Debug, Clone, PartialEq)]
pub enum InstrumentCall {
    MoveTo {
        point: Point3<f64>,
        well: Option<String>,
        force_direct: bool,
        minimum_z_height: Option<f64>,
        speed: Option<f64>,
    },
    Aspirate {
        point: Point3<f64>,
        well: Option<String>,
        in_place: bool,
        params: AspirateParams,
    },
    Dispense {
        point: Point3<f64>,
        well: Option<String>,
        in_place: bool,
        params: DispenseParams,
    },
    BlowOut {
        point: Point3<f64>,
        well: Option<String>,
        in_place: bool,
        flow_rate: f64,
    },
    TouchTip {
        well: String,
        params: TouchTipParams,
    },
    Delay {
        seconds: f64,
    },
    PrepareToAspirate,
    ConfigureForVolume {
        volume: f64,
    },
    LiquidProbe {
        well: String,
    },
    SetFlowRate {
        rates: FlowRates,
    },
    RestoreFlowRates {
        rates: FlowRates,
    },
    AirGapInPlace {
        volume: f64,
        flow_rate: f64,
        correction_volume: f64,
    },
}

/// A dry-run pipette that records every call and enforces the plunger and
/// capacity rules a real pipette would.
#[derive(Debug, Clone)]
pub struct SimulatedInstrument {
    calls: Vec<InstrumentCall>,
    position: Option<Point3<f64>>,
    working_volume: f64,
    current_volume: f64,
    ready_to_aspirate: bool,
    liquid_presence_detection: bool,
    flow_rates: FlowRates,
    touch_tip_disabled: HashSet<String>,
    configured_volume: Option<f64>,
}

impl SimulatedInstrument {
    pub fn new(working_volume: f64) -> Self {
        Self {
            calls: Vec::new(),
            position: None,
            working_volume,
            current_volume: 0.0,
            ready_to_aspirate: true,
            liquid_presence_detection: false,
            flow_rates: FlowRates {
                aspirate: Some(DEFAULT_ASPIRATE_FLOW_RATE),
                dispense: Some(DEFAULT_DISPENSE_FLOW_RATE),
                blow_out: Some(DEFAULT_BLOW_OUT_FLOW_RATE),
            },
            touch_tip_disabled: HashSet::new(),
            configured_volume: None,
        }
    }

    pub fn with_liquid_presence_detection(mut self, enabled: bool) -> Self {
        self.liquid_presence_detection = enabled;
        self
    }

    /// Makes `touch_tip` fail with [`InstrumentError::TouchTipDisabled`] for
    /// the named well.
    pub fn disable_touch_tip(&mut self, well: &str) {
        self.touch_tip_disabled.insert(well.to_string());
    }

    pub fn calls(&self) -> &[InstrumentCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn take_calls(&mut self) -> Vec<InstrumentCall> {
        std::mem::take(&mut self.calls)
    }

    pub fn position(&self) -> Option<Point3<f64>> {
        self.position
    }

    pub fn working_volume(&self) -> f64 {
        self.working_volume
    }

    pub fn is_ready_to_aspirate(&self) -> bool {
        self.ready_to_aspirate
    }

    pub fn configured_volume(&self) -> Option<f64> {
        self.configured_volume
    }

    fn record(&mut self, call: InstrumentCall) {
        trace!(?call, "Instrument call.");
        self.calls.push(call);
    }

    fn take_up(&mut self, volume: f64) -> Result<(), InstrumentError> {
        let available = self.working_volume - self.current_volume;
        if volume > available + VOLUME_TOLERANCE {
            return Err(InstrumentError::VolumeExceeded {
                requested: volume,
                available,
            });
        }
        self.current_volume += volume;
        Ok(())
    }
}

fn well_name(well: Option<&dyn WellCore>) -> Option<String> {
    well.map(|w| w.name().to_string())
}

impl Instrument for SimulatedInstrument {
    fn move_to(
        &mut self,
        location: &Location,
        well: Option<&dyn WellCore>,
        force_direct: bool,
        minimum_z_height: Option<f64>,
        speed: Option<f64>,
    ) -> Result<(), InstrumentError> {
        self.position = Some(location.point);
        self.record(InstrumentCall::MoveTo {
            point: location.point,
            well: well_name(well),
            force_direct,
            minimum_z_height,
            speed,
        });
        Ok(())
    }

    fn aspirate(
        &mut self,
        location: &Location,
        well: Option<&dyn WellCore>,
        in_place: bool,
        params: AspirateParams,
    ) -> Result<(), InstrumentError> {
        if !self.ready_to_aspirate {
            return Err(InstrumentError::NotPreparedToAspirate);
        }
        self.take_up(params.volume)?;
        if !in_place {
            self.position = Some(location.point);
        }
        self.record(InstrumentCall::Aspirate {
            point: location.point,
            well: well_name(well),
            in_place,
            params,
        });
        Ok(())
    }

    fn dispense(
        &mut self,
        location: &Location,
        well: Option<&dyn WellCore>,
        in_place: bool,
        params: DispenseParams,
    ) -> Result<(), InstrumentError> {
        if params.volume > self.current_volume + VOLUME_TOLERANCE {
            return Err(InstrumentError::InsufficientVolume {
                requested: params.volume,
                available: self.current_volume,
            });
        }
        self.current_volume = (self.current_volume - params.volume).max(0.0);
        if params.push_out.is_some_and(|p| p > 0.0) {
            self.ready_to_aspirate = false;
        }
        if !in_place {
            self.position = Some(location.point);
        }
        self.record(InstrumentCall::Dispense {
            point: location.point,
            well: well_name(well),
            in_place,
            params,
        });
        Ok(())
    }

    fn blow_out(
        &mut self,
        location: &Location,
        well: Option<&dyn WellCore>,
        in_place: bool,
    ) -> Result<(), InstrumentError> {
        self.current_volume = 0.0;
        self.ready_to_aspirate = false;
        if !in_place {
            self.position = Some(location.point);
        }
        let flow_rate = self
            .flow_rates
            .blow_out
            .unwrap_or(DEFAULT_BLOW_OUT_FLOW_RATE);
        self.record(InstrumentCall::BlowOut {
            point: location.point,
            well: well_name(well),
            in_place,
            flow_rate,
        });
        Ok(())
    }

    fn touch_tip(
        &mut self,
        _location: &Location,
        well: &dyn WellCore,
        params: TouchTipParams,
    ) -> Result<(), InstrumentError> {
        if self.touch_tip_disabled.contains(well.name()) {
            return Err(InstrumentError::TouchTipDisabled {
                well: well.name().to_string(),
            });
        }
        self.record(InstrumentCall::TouchTip {
            well: well.name().to_string(),
            params,
        });
        Ok(())
    }

    fn delay(&mut self, seconds: f64) -> Result<(), InstrumentError> {
        self.record(InstrumentCall::Delay { seconds });
        Ok(())
    }

    fn get_current_volume(&self) -> f64 {
        self.current_volume
    }

    fn prepare_to_aspirate(&mut self) -> Result<(), InstrumentError> {
        self.ready_to_aspirate = true;
        self.record(InstrumentCall::PrepareToAspirate);
        Ok(())
    }

    fn configure_for_volume(&mut self, volume: f64) -> Result<(), InstrumentError> {
        if volume > self.working_volume + VOLUME_TOLERANCE {
            return Err(InstrumentError::VolumeExceeded {
                requested: volume,
                available: self.working_volume,
            });
        }
        self.configured_volume = Some(volume);
        self.record(InstrumentCall::ConfigureForVolume { volume });
        Ok(())
    }

    fn liquid_probe_with_recovery(
        &mut self,
        well: &dyn WellCore,
        _location: &Location,
    ) -> Result<(), InstrumentError> {
        self.record(InstrumentCall::LiquidProbe {
            well: well.name().to_string(),
        });
        Ok(())
    }

    fn get_liquid_presence_detection(&self) -> bool {
        self.liquid_presence_detection
    }

    fn set_flow_rate(&mut self, rates: FlowRates) {
        if rates.aspirate.is_some() {
            self.flow_rates.aspirate = rates.aspirate;
        }
        if rates.dispense.is_some() {
            self.flow_rates.dispense = rates.dispense;
        }
        if rates.blow_out.is_some() {
            self.flow_rates.blow_out = rates.blow_out;
        }
        self.record(InstrumentCall::SetFlowRate { rates });
    }

    fn restore_flow_rates(&mut self, rates: FlowRates) {
        self.flow_rates = rates;
        self.record(InstrumentCall::RestoreFlowRates { rates });
    }

    fn flow_rates(&self) -> FlowRates {
        self.flow_rates
    }

    fn air_gap_in_place(
        &mut self,
        volume: f64,
        flow_rate: f64,
        correction_volume: f64,
    ) -> Result<(), InstrumentError> {
        self.take_up(volume)?;
        self.record(InstrumentCall::AirGapInPlace {
            volume,
            flow_rate,
            correction_volume,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn here() -> Location {
        Location::free(Point3::new(1.0, 2.0, 3.0))
    }

    fn aspirate_params(volume: f64) -> AspirateParams {
        AspirateParams {
            volume,
            rate: 1.0,
            flow_rate: 50.0,
            correction_volume: 0.0,
        }
    }

    fn dispense_params(volume: f64, push_out: Option<f64>) -> DispenseParams {
        DispenseParams {
            volume,
            rate: 1.0,
            flow_rate: 50.0,
            push_out,
            correction_volume: 0.0,
        }
    }

    #[test]
    fn aspirate_and_dispense_track_plunger_volume() {
        let mut pipette = SimulatedInstrument::new(200.0);
        pipette
            .aspirate(&here(), None, true, aspirate_params(120.0))
            .unwrap();
        pipette
            .dispense(&here(), None, true, dispense_params(20.0, Some(0.0)))
            .unwrap();

        assert_eq!(pipette.get_current_volume(), 100.0);
        assert_eq!(pipette.calls().len(), 2);
        assert!(pipette.is_ready_to_aspirate());
    }

    #[test]
    fn aspirate_beyond_working_volume_fails() {
        let mut pipette = SimulatedInstrument::new(50.0);
        pipette
            .aspirate(&here(), None, true, aspirate_params(40.0))
            .unwrap();
        let result = pipette.air_gap_in_place(15.0, 10.0, 0.0);
        assert!(matches!(
            result,
            Err(InstrumentError::VolumeExceeded { .. })
        ));
        assert_eq!(pipette.get_current_volume(), 40.0);
    }

    #[test]
    fn dispense_more_than_held_fails() {
        let mut pipette = SimulatedInstrument::new(200.0);
        let result = pipette.dispense(&here(), None, true, dispense_params(1.0, None));
        assert!(matches!(
            result,
            Err(InstrumentError::InsufficientVolume { .. })
        ));
    }

    #[test]
    fn push_out_requires_re_preparing_before_aspirate() {
        let mut pipette = SimulatedInstrument::new(200.0);
        pipette
            .aspirate(&here(), None, true, aspirate_params(10.0))
            .unwrap();
        pipette
            .dispense(&here(), None, true, dispense_params(10.0, Some(2.0)))
            .unwrap();

        assert!(!pipette.is_ready_to_aspirate());
        assert_eq!(
            pipette.aspirate(&here(), None, true, aspirate_params(5.0)),
            Err(InstrumentError::NotPreparedToAspirate)
        );

        pipette.prepare_to_aspirate().unwrap();
        assert!(
            pipette
                .aspirate(&here(), None, true, aspirate_params(5.0))
                .is_ok()
        );
    }

    #[test]
    fn blow_out_empties_tip_and_moves_when_not_in_place() {
        let mut pipette = SimulatedInstrument::new(200.0);
        pipette
            .aspirate(&here(), None, true, aspirate_params(30.0))
            .unwrap();
        let trash = Location::free(Point3::new(0.0, 0.0, 80.0));
        pipette.blow_out(&trash, None, false).unwrap();

        assert_eq!(pipette.get_current_volume(), 0.0);
        assert_eq!(pipette.position(), Some(trash.point));
        assert!(!pipette.is_ready_to_aspirate());
        assert!(matches!(
            pipette.calls().last(),
            Some(InstrumentCall::BlowOut { flow_rate, in_place: false, .. }) if *flow_rate == DEFAULT_BLOW_OUT_FLOW_RATE
        ));
    }

    #[test]
    fn configure_for_volume_rejects_volume_above_working_volume() {
        let mut pipette = SimulatedInstrument::new(50.0);
        assert!(pipette.configure_for_volume(60.0).is_err());
        pipette.configure_for_volume(20.0).unwrap();
        assert_eq!(pipette.configured_volume(), Some(20.0));
    }

    #[test]
    fn take_calls_drains_the_log() {
        let mut pipette = SimulatedInstrument::new(200.0);
        pipette.delay(1.0).unwrap();
        let calls = pipette.take_calls();
        assert_eq!(calls, vec![InstrumentCall::Delay { seconds: 1.0 }]);
        assert!(pipette.calls().is_empty());
    }
}

use super::error::EngineError;
use super::positions::{
    LIQUID_PROBE_START_OFFSET_FROM_WELL_TOP, absolute_point_from_position_reference_and_offset,
    ensure_above_liquid, ensure_not_below_target,
};
use super::transfer_type::TransferType;
use crate::core::instrument::{
    AspirateParams, BlowOutFlowRate, DispenseParams, Instrument, InstrumentError, TouchTipParams,
};
use crate::core::liquid::{
    BlowoutLocation, ByVolumeCurve, DelayProperties, DispenseProperties, MixProperties, Offset,
    PositionReference, PropertiesError, SubmergeProperties, TouchTipProperties, TouchTipSettings,
    TransferProperties,
};
use crate::core::models::location::Location;
use crate::core::models::tip::TipState;
use crate::core::models::well::WellCore;
use nalgebra::Point3;
use tracing::{debug, warn};

const TOUCH_TIP_RADIUS: f64 = 1.0;
const PLUNGER_RATE: f64 = 1.0;

/// What the tip does once it has reached the target location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostSubmergeAction {
    Aspirate,
    Dispense,
}

/// Runs the pipetting phases of one well visit.
///
/// An executor is bound to a single target well and location. It works on its
/// own copy of the tip state; callers that chain visits read it back with
/// [`Self::tip_state`] or [`Self::into_tip_state`] and seed the next executor
/// with it.
pub struct TransferComponentsExecutor<'a, I: Instrument + ?Sized> {
    instrument: &'a mut I,
    transfer_properties: &'a TransferProperties,
    target_location: Location,
    target_well: &'a dyn WellCore,
    tip_state: TipState,
    transfer_type: TransferType,
    /// Net volume this executor (and any earlier visits the caller seeded it
    /// with) has moved into the target well. Negative after aspirating.
    well_volume_difference: f64,
}

impl<'a, I: Instrument + ?Sized> TransferComponentsExecutor<'a, I> {
    pub fn new(
        instrument: &'a mut I,
        transfer_properties: &'a TransferProperties,
        target_location: Location,
        target_well: &'a dyn WellCore,
        tip_state: &TipState,
        transfer_type: TransferType,
    ) -> Self {
        Self {
            instrument,
            transfer_properties,
            target_location,
            target_well,
            tip_state: tip_state.clone(),
            transfer_type,
            well_volume_difference: 0.0,
        }
    }

    /// Seeds the volume already moved in or out of the target well by earlier
    /// visits, so meniscus positions account for it.
    pub fn with_well_volume_difference(mut self, difference: f64) -> Self {
        self.well_volume_difference = difference;
        self
    }

    pub fn tip_state(&self) -> &TipState {
        &self.tip_state
    }

    pub fn into_tip_state(self) -> TipState {
        self.tip_state
    }

    pub fn well_volume_difference(&self) -> f64 {
        self.well_volume_difference
    }

    pub fn target_location(&self) -> &Location {
        &self.target_location
    }

    pub fn submerge(
        &mut self,
        submerge_properties: &SubmergeProperties,
        post_submerge_action: PostSubmergeAction,
        volume_for_pipette_mode_configuration: Option<f64>,
    ) -> Result<(), EngineError> {
        debug!(
            well = self.target_well.name(),
            action = ?post_submerge_action,
            "Submerging."
        );
        let well = self.target_well;
        let start_point = self.resolve(
            submerge_properties.position_reference,
            &submerge_properties.offset,
        )?;
        let submerge_start = self.target_location.with_point(start_point);

        let mut air_gap_removed = false;
        if post_submerge_action == PostSubmergeAction::Aspirate {
            if let Some(volume) = volume_for_pipette_mode_configuration {
                let probe_start = self
                    .target_location
                    .with_point(well.get_top(LIQUID_PROBE_START_OFFSET_FROM_WELL_TOP));
                self.instrument
                    .move_to(&probe_start, Some(well), false, None, None)?;
                self.remove_air_gap(&probe_start)?;
                air_gap_removed = true;
                if self.transfer_type.probes_liquid()
                    && self.instrument.get_liquid_presence_detection()
                {
                    self.instrument
                        .liquid_probe_with_recovery(well, &self.target_location)?;
                }
                self.instrument.configure_for_volume(volume)?;
                self.instrument.prepare_to_aspirate()?;
                self.tip_state.ready_to_aspirate = true;
            }
        }

        ensure_above_liquid("submerge", well, self.well_volume_difference, &start_point)?;
        self.instrument
            .move_to(&submerge_start, Some(well), true, None, None)?;
        if !air_gap_removed {
            self.remove_air_gap(&submerge_start)?;
        }
        if post_submerge_action == PostSubmergeAction::Aspirate
            && !self.tip_state.ready_to_aspirate
        {
            self.instrument.prepare_to_aspirate()?;
            self.tip_state.ready_to_aspirate = true;
        }

        self.instrument.move_to(
            &self.target_location,
            Some(well),
            true,
            None,
            Some(submerge_properties.speed),
        )?;
        self.apply_delay(&submerge_properties.delay)
    }

    pub fn aspirate_and_wait(&mut self, volume: f64) -> Result<(), EngineError> {
        let props = self.transfer_properties;
        let aspirate = &props.aspirate;
        let current_volume = self.instrument.get_current_volume();
        let correction_volume = correction_delta(
            &aspirate.correction_by_volume,
            current_volume,
            current_volume + volume,
        );
        let params = AspirateParams {
            volume,
            rate: PLUNGER_RATE,
            flow_rate: aspirate.flow_rate_by_volume.get_for_volume(volume),
            correction_volume,
        };

        self.tip_state.append_liquid(volume)?;
        self.instrument
            .aspirate(&self.target_location, Some(self.target_well), true, params)?;
        self.well_volume_difference -= volume;
        self.apply_delay(&aspirate.delay)
    }

    pub fn dispense_and_wait(
        &mut self,
        dispense_properties: &DispenseProperties,
        volume: f64,
        push_out_override: Option<f64>,
    ) -> Result<(), EngineError> {
        let current_volume = self.instrument.get_current_volume();
        let correction_volume = correction_delta(
            &dispense_properties.correction_by_volume,
            current_volume,
            current_volume - volume,
        );
        let push_out = push_out_override
            .unwrap_or_else(|| dispense_properties.push_out_by_volume.get_for_volume(volume));
        let params = DispenseParams {
            volume,
            rate: PLUNGER_RATE,
            flow_rate: dispense_properties.flow_rate_by_volume.get_for_volume(volume),
            push_out: Some(push_out),
            correction_volume,
        };

        self.tip_state.delete_liquid(volume)?;
        self.instrument
            .dispense(&self.target_location, Some(self.target_well), true, params)?;
        if push_out > 0.0 {
            self.tip_state.ready_to_aspirate = false;
        }
        self.well_volume_difference += volume;
        self.apply_delay(&dispense_properties.delay)
    }

    /// Aspirates and dispenses the mix volume in place, `repetitions` times.
    /// Only the final dispense may push out, and only when
    /// `last_dispense_push_out` is set.
    pub fn mix(
        &mut self,
        mix_properties: &MixProperties,
        last_dispense_push_out: bool,
    ) -> Result<(), EngineError> {
        if !mix_properties.enabled {
            return Ok(());
        }
        let (repetitions, volume) =
            mix_properties
                .settings()
                .ok_or_else(|| PropertiesError::InvalidProperty {
                    field: "mix".to_string(),
                    reason: "enabled without repetitions and volume".to_string(),
                })?;
        debug!(
            well = self.target_well.name(),
            repetitions, volume, "Mixing."
        );

        let props = self.transfer_properties;
        let dispense = &props.dispense;
        let push_out = dispense.push_out_by_volume.get_for_volume(volume);
        for remaining in (1..=repetitions).rev() {
            self.aspirate_and_wait(volume)?;
            let push_out_override = if last_dispense_push_out && remaining == 1 {
                push_out
            } else {
                0.0
            };
            self.dispense_and_wait(dispense, volume, Some(push_out_override))?;
        }
        Ok(())
    }

    pub fn pre_wet(&mut self, volume: f64) -> Result<(), EngineError> {
        if !self.transfer_properties.aspirate.pre_wet {
            return Ok(());
        }
        debug!(well = self.target_well.name(), volume, "Pre-wetting tip.");
        self.mix(&MixProperties::new(1, volume), false)
    }

    pub fn retract_after_aspiration(
        &mut self,
        volume: f64,
        add_air_gap: bool,
    ) -> Result<(), EngineError> {
        let props = self.transfer_properties;
        let retract = &props.aspirate.retract;
        let well = self.target_well;
        let retract_location = self.move_to_retract_point(
            retract.position_reference,
            &retract.offset,
            retract.speed,
            true,
        )?;
        self.apply_delay(&retract.delay)?;

        if let Some(settings) = touch_tip_settings(&retract.touch_tip)? {
            self.touch_tip(settings, &retract_location, well)?;
            self.instrument
                .move_to(&retract_location, Some(well), true, None, None)?;
        }

        if add_air_gap {
            let basis = self
                .transfer_type
                .air_gap_basis(volume, self.tip_state.liquid());
            self.add_air_gap(retract.air_gap_by_volume.get_for_volume(basis))?;
        }
        Ok(())
    }

    pub fn retract_after_dispensing(
        &mut self,
        trash_location: &Location,
        source_location: Option<&Location>,
        source_well: Option<&dyn WellCore>,
        add_final_air_gap: bool,
    ) -> Result<(), EngineError> {
        let props = self.transfer_properties;
        let retract = &props.dispense.retract;
        let retract_location = self.move_to_retract_point(
            retract.position_reference,
            &retract.offset,
            retract.speed,
            false,
        )?;
        self.apply_delay(&retract.delay)?;

        let blowout = retract.blowout.target()?;
        self.finish_dispense_retract(
            blowout,
            &retract_location,
            &retract.touch_tip,
            &retract.air_gap_by_volume,
            trash_location,
            source_location,
            source_well,
            true,
            add_final_air_gap,
        )
    }

    /// Retract between the dispenses of a distribute. Blow-out only happens
    /// on the last retract, and while a conditioning volume stays in the tip
    /// no intermediate air gap is drawn.
    #[allow(clippy::too_many_arguments)]
    pub fn retract_during_multi_dispense(
        &mut self,
        trash_location: &Location,
        source_location: Option<&Location>,
        source_well: Option<&dyn WellCore>,
        conditioning_volume: f64,
        add_final_air_gap: bool,
        is_last_retract: bool,
    ) -> Result<(), EngineError> {
        let props = self.transfer_properties;
        let retract = &props.multi_dispense()?.retract;
        let retract_location = self.move_to_retract_point(
            retract.position_reference,
            &retract.offset,
            retract.speed,
            false,
        )?;
        self.apply_delay(&retract.delay)?;

        let blowout = if self.transfer_type.blows_out_on_retract(is_last_retract) {
            retract.blowout.target()?
        } else {
            None
        };
        let intermediate_air_gap = is_last_retract || conditioning_volume <= 0.0;
        self.finish_dispense_retract(
            blowout,
            &retract_location,
            &retract.touch_tip,
            &retract.air_gap_by_volume,
            trash_location,
            source_location,
            source_well,
            intermediate_air_gap,
            if is_last_retract {
                add_final_air_gap
            } else {
                intermediate_air_gap
            },
        )
    }

    /// Shared tail of the dispense-side retracts: blow-out, touch-tip and
    /// air gap at the retract point, then (for source/trash blow-outs) the
    /// same again wherever the blow-out happened.
    #[allow(clippy::too_many_arguments)]
    fn finish_dispense_retract(
        &mut self,
        blowout: Option<(BlowoutLocation, f64)>,
        retract_location: &Location,
        touch_tip: &TouchTipProperties,
        air_gap_by_volume: &ByVolumeCurve,
        trash_location: &Location,
        source_location: Option<&Location>,
        source_well: Option<&dyn WellCore>,
        air_gap_before_moving_away: bool,
        add_final_air_gap: bool,
    ) -> Result<(), EngineError> {
        let well = self.target_well;

        if let Some((BlowoutLocation::Destination, flow_rate)) = blowout {
            self.blow_out(retract_location, Some(well), true, flow_rate)?;
        }

        let away = match blowout {
            Some((location @ (BlowoutLocation::Source | BlowoutLocation::Trash), rate)) => {
                Some((location, rate))
            }
            _ => None,
        };
        let add_air_gap = if away.is_some() {
            air_gap_before_moving_away
        } else {
            add_final_air_gap
        };
        self.touch_tip_and_air_gap(
            touch_tip,
            air_gap_by_volume,
            retract_location,
            Some(well),
            add_air_gap,
        )?;

        match away {
            Some((BlowoutLocation::Source, flow_rate)) => {
                let (Some(source_location), Some(source_well)) = (source_location, source_well)
                else {
                    return Err(EngineError::MissingLocation(
                        "blow-out location is 'source' but no source well was given".to_string(),
                    ));
                };
                let source_top = source_location.with_point(source_well.get_top(0.0));
                self.instrument
                    .move_to(&source_top, Some(source_well), false, None, None)?;
                self.blow_out(&source_top, Some(source_well), true, flow_rate)?;
                self.touch_tip_and_air_gap(
                    touch_tip,
                    air_gap_by_volume,
                    &source_top,
                    Some(source_well),
                    add_final_air_gap,
                )
            }
            Some((_, flow_rate)) => {
                self.blow_out(trash_location, None, false, flow_rate)?;
                self.touch_tip_and_air_gap(
                    touch_tip,
                    air_gap_by_volume,
                    trash_location,
                    None,
                    add_final_air_gap,
                )
            }
            None => Ok(()),
        }
    }

    fn touch_tip_and_air_gap(
        &mut self,
        touch_tip: &TouchTipProperties,
        air_gap_by_volume: &ByVolumeCurve,
        location: &Location,
        well: Option<&dyn WellCore>,
        add_air_gap: bool,
    ) -> Result<(), EngineError> {
        if let (Some(settings), Some(well)) = (touch_tip_settings(touch_tip)?, well) {
            self.touch_tip(settings, location, well)?;
            self.instrument
                .move_to(location, Some(well), true, None, None)?;
        }
        if add_air_gap {
            let volume = air_gap_by_volume.get_for_volume(self.tip_state.liquid());
            self.add_air_gap(volume)?;
        }
        Ok(())
    }

    fn touch_tip(
        &mut self,
        settings: TouchTipSettings,
        location: &Location,
        well: &dyn WellCore,
    ) -> Result<(), EngineError> {
        let params = TouchTipParams {
            radius: TOUCH_TIP_RADIUS,
            z_offset: settings.z_offset,
            speed: settings.speed,
            mm_from_edge: settings.mm_from_edge,
        };
        match self.instrument.touch_tip(location, well, params) {
            Err(InstrumentError::TouchTipDisabled { well }) => {
                warn!(%well, "Touch tip is disabled for this labware; skipping.");
                Ok(())
            }
            result => Ok(result?),
        }
    }

    /// Blows out under a scoped flow-rate override. The tip is emptied, so
    /// the tracked contents are cleared and the plunger needs re-preparing.
    fn blow_out(
        &mut self,
        location: &Location,
        well: Option<&dyn WellCore>,
        in_place: bool,
        flow_rate: f64,
    ) -> Result<(), EngineError> {
        debug!(%location, flow_rate, "Blowing out.");
        {
            let mut scoped = BlowOutFlowRate::apply(&mut *self.instrument, flow_rate);
            scoped.blow_out(location, well, in_place)?;
        }

        let air_gap = self.tip_state.air_gap();
        if air_gap != 0.0 {
            self.tip_state.delete_air_gap(air_gap)?;
        }
        let liquid = self.tip_state.liquid();
        if liquid > 0.0 {
            self.tip_state.delete_liquid(liquid)?;
        }
        self.tip_state.ready_to_aspirate = false;
        Ok(())
    }

    fn add_air_gap(&mut self, volume: f64) -> Result<(), EngineError> {
        if volume <= 0.0 {
            return Ok(());
        }
        let props = self.transfer_properties;
        let aspirate = &props.aspirate;
        let current_volume = self.instrument.get_current_volume();
        let correction_volume = correction_delta(
            &aspirate.correction_by_volume,
            current_volume,
            current_volume + volume,
        );
        let flow_rate = aspirate.flow_rate_by_volume.get_for_volume(volume).min(volume);

        self.tip_state.append_air_gap(volume)?;
        self.instrument
            .air_gap_in_place(volume, flow_rate, correction_volume)?;
        self.apply_delay(&aspirate.delay)
    }

    fn remove_air_gap(&mut self, location: &Location) -> Result<(), EngineError> {
        let air_gap = self.tip_state.air_gap();
        if air_gap == 0.0 {
            return Ok(());
        }
        let props = self.transfer_properties;
        let dispense = &props.dispense;
        let current_volume = self.instrument.get_current_volume();
        let correction_volume = correction_delta(
            &dispense.correction_by_volume,
            current_volume,
            current_volume - air_gap,
        );
        let params = DispenseParams {
            volume: air_gap,
            rate: PLUNGER_RATE,
            flow_rate: dispense.flow_rate_by_volume.get_for_volume(air_gap).min(air_gap),
            push_out: Some(0.0),
            correction_volume,
        };

        self.tip_state.delete_air_gap(air_gap)?;
        self.instrument.dispense(location, None, true, params)?;
        self.apply_delay(&dispense.delay)
    }

    fn resolve(
        &self,
        position_reference: PositionReference,
        offset: &Offset,
    ) -> Result<Point3<f64>, EngineError> {
        Ok(absolute_point_from_position_reference_and_offset(
            self.target_well,
            self.well_volume_difference,
            position_reference,
            offset,
        )?)
    }

    fn move_to_retract_point(
        &mut self,
        position_reference: PositionReference,
        offset: &Offset,
        speed: f64,
        check_against_target: bool,
    ) -> Result<Location, EngineError> {
        let well = self.target_well;
        let point = self.resolve(position_reference, offset)?;
        ensure_above_liquid("retract", well, self.well_volume_difference, &point)?;
        if check_against_target {
            ensure_not_below_target("retract", well, &point, &self.target_location.point)?;
        }

        let location = self.target_location.with_point(point);
        self.instrument
            .move_to(&location, Some(well), true, None, Some(speed))?;
        Ok(location)
    }

    fn apply_delay(&mut self, delay: &DelayProperties) -> Result<(), EngineError> {
        if let Some(seconds) = delay.active_duration()? {
            self.instrument.delay(seconds)?;
        }
        Ok(())
    }
}

/// The correction volume for moving the plunger from `from` to `to` µL.
fn correction_delta(curve: &ByVolumeCurve, from: f64, to: f64) -> f64 {
    curve.get_for_volume(to) - curve.get_for_volume(from)
}

fn touch_tip_settings(
    touch_tip: &TouchTipProperties,
) -> Result<Option<TouchTipSettings>, PropertiesError> {
    if !touch_tip.enabled {
        return Ok(None);
    }
    touch_tip
        .settings()
        .map(Some)
        .ok_or_else(|| PropertiesError::InvalidProperty {
            field: "touch-tip".to_string(),
            reason: "enabled without z-offset, mm-from-edge and speed".to_string(),
        })
}

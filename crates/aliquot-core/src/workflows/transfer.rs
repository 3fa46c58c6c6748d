use crate::core::instrument::Instrument;
use crate::core::liquid::{Offset, PositionReference, PropertiesError, TransferProperties};
use crate::core::models::location::Location;
use crate::core::models::tip::TipState;
use crate::core::models::well::WellCore;
use crate::engine::config::TransferConfig;
use crate::engine::context::TransferContext;
use crate::engine::error::EngineError;
use crate::engine::executor::{PostSubmergeAction, TransferComponentsExecutor};
use crate::engine::planner::{
    DistributeGroup, plan_consolidate, plan_distribute, plan_transfer, usable_tip_volume,
};
use crate::engine::positions::absolute_point_from_position_reference_and_offset;
use crate::engine::progress::Progress;
use crate::engine::transfer_type::TransferType;
use std::collections::HashMap;
use tracing::{debug, info, instrument};

/// Outcome of a transfer run.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferReport {
    /// What the tip holds once the last retract has finished.
    pub tip_state: TipState,
    /// Planned steps: one per aspirate/dispense pair for a transfer, one per
    /// tip load for consolidate and distribute.
    pub steps: usize,
    pub aspirated_volume: f64,
    pub dispensed_volume: f64,
}

/// Moves `volumes` from each source to its paired destination.
///
/// A single source or a single destination is paired with every well on the
/// other side; `volumes` holds one value for every pair or a single value
/// for all of them.
#[instrument(skip_all, name = "transfer_workflow")]
pub fn transfer<I: Instrument + ?Sized>(
    instrument: &mut I,
    context: &TransferContext,
    sources: &[&dyn WellCore],
    destinations: &[&dyn WellCore],
    volumes: &[f64],
) -> Result<TransferReport, EngineError> {
    context.properties.validate()?;
    let reporter = context.reporter;
    let steps = reporter.phase("Planning", || -> Result<_, EngineError> {
        let usable = usable_volume(context)?;
        Ok(plan_transfer(
            volumes,
            sources.len(),
            destinations.len(),
            usable,
        )?)
    })?;
    info!(
        sources = sources.len(),
        destinations = destinations.len(),
        steps = steps.len(),
        "Planned transfer."
    );

    let mut run = TransferRun::new(instrument, context, TransferType::OneToOne);
    reporter.phase("Transferring", || -> Result<(), EngineError> {
        reporter.report(Progress::TaskStart {
            total_steps: steps.len() as u64,
        });
        for (index, step) in steps.iter().enumerate() {
            let is_last = index + 1 == steps.len();
            let source = sources[step.source];
            let destination = destinations[step.destination];

            run.aspirate(source, step.volume, Some(step.volume), true)?;
            run.dispense(
                destination,
                step.volume,
                source,
                !is_last || context.config.add_final_air_gap,
            )?;
            reporter.report(Progress::TaskIncrement);
        }
        reporter.report(Progress::TaskFinish);
        Ok(())
    })?;

    Ok(run.finish(steps.len()))
}

/// Collects `volumes` from every source into one destination, filling each
/// tip load as far as it goes before dispensing.
#[instrument(skip_all, name = "consolidate_workflow")]
pub fn consolidate<I: Instrument + ?Sized>(
    instrument: &mut I,
    context: &TransferContext,
    sources: &[&dyn WellCore],
    destination: &dyn WellCore,
    volumes: &[f64],
) -> Result<TransferReport, EngineError> {
    context.properties.validate()?;
    let reporter = context.reporter;
    let groups = reporter.phase("Planning", || -> Result<_, EngineError> {
        let usable = usable_volume(context)?;
        Ok(plan_consolidate(volumes, sources.len(), usable)?)
    })?;
    info!(
        sources = sources.len(),
        tip_loads = groups.len(),
        "Planned consolidate."
    );

    let mut run = TransferRun::new(instrument, context, TransferType::ManyToOne);
    reporter.phase("Transferring", || -> Result<(), EngineError> {
        reporter.report(Progress::TaskStart {
            total_steps: groups.len() as u64,
        });
        for (index, group) in groups.iter().enumerate() {
            let is_last = index + 1 == groups.len();
            let total = group.total_volume();

            let mut last_source = None;
            for (position, &(source, volume)) in group.aspirates.iter().enumerate() {
                let pipette_mode_volume = (position == 0).then_some(total);
                run.aspirate(sources[source], volume, pipette_mode_volume, true)?;
                last_source = Some(sources[source]);
            }
            let last_source = last_source.ok_or_else(|| {
                EngineError::Internal("consolidate group without aspirates".to_string())
            })?;

            run.dispense(
                destination,
                total,
                last_source,
                !is_last || context.config.add_final_air_gap,
            )?;
            reporter.report(Progress::TaskIncrement);
        }
        reporter.report(Progress::TaskFinish);
        Ok(())
    })?;

    Ok(run.finish(groups.len()))
}

/// Spreads liquid from one source over several destinations, dispensing
/// from a single aspirate as long as the tip holds enough.
///
/// Each tip load also aspirates the conditioning and disposal volumes; they
/// stay in the tip and leave it with the final blow-out.
#[instrument(skip_all, name = "distribute_workflow")]
pub fn distribute<I: Instrument + ?Sized>(
    instrument: &mut I,
    context: &TransferContext,
    source: &dyn WellCore,
    destinations: &[&dyn WellCore],
    volumes: &[f64],
) -> Result<TransferReport, EngineError> {
    context.properties.validate()?;
    let reporter = context.reporter;
    let properties = context.properties;
    let multi = properties.multi_dispense()?;

    let reference_volume = volumes.first().copied().unwrap_or(0.0);
    let conditioning_volume = context
        .config
        .conditioning_volume
        .unwrap_or_else(|| multi.conditioning_by_volume.get_for_volume(reference_volume));
    let disposal_volume = context
        .config
        .disposal_volume
        .unwrap_or_else(|| multi.disposal_by_volume.get_for_volume(reference_volume));
    if conditioning_volume + disposal_volume > 0.0 && multi.retract.blowout.target()?.is_none() {
        return Err(PropertiesError::InvalidProperty {
            field: "multi-dispense.retract.blowout".to_string(),
            reason: "must be enabled when a conditioning or disposal volume is used".to_string(),
        }
        .into());
    }

    let groups = reporter.phase("Planning", || -> Result<_, EngineError> {
        let usable = usable_volume(context)?;
        Ok(plan_distribute(
            volumes,
            destinations.len(),
            usable,
            conditioning_volume,
            disposal_volume,
        )?)
    })?;
    info!(
        destinations = destinations.len(),
        tip_loads = groups.len(),
        conditioning_volume,
        disposal_volume,
        "Planned distribute."
    );

    let mut run = TransferRun::new(instrument, context, TransferType::OneToMany);
    reporter.phase("Transferring", || -> Result<(), EngineError> {
        reporter.report(Progress::TaskStart {
            total_steps: groups.len() as u64,
        });
        for (index, group) in groups.iter().enumerate() {
            let is_last_group = index + 1 == groups.len();
            run.distribute_group(
                source,
                destinations,
                group,
                !is_last_group || context.config.add_final_air_gap,
            )?;
            reporter.report(Progress::TaskIncrement);
        }
        reporter.report(Progress::TaskFinish);
        Ok(())
    })?;

    Ok(run.finish(groups.len()))
}

fn usable_volume(context: &TransferContext) -> Result<f64, EngineError> {
    Ok(usable_tip_volume(
        context.config.working_volume,
        &context.properties.aspirate.retract.air_gap_by_volume,
    )?)
}

/// Identifies a well across visits.
type WellKey = (Option<String>, String);

fn well_key(well: &dyn WellCore) -> WellKey {
    (well.labware().map(str::to_string), well.name().to_string())
}

fn target_location(
    well: &dyn WellCore,
    well_volume_difference: f64,
    position_reference: PositionReference,
    offset: &Offset,
) -> Result<Location, EngineError> {
    let point = absolute_point_from_position_reference_and_offset(
        well,
        well_volume_difference,
        position_reference,
        offset,
    )?;
    Ok(Location::new(point, well.labware()))
}

/// State threaded through the well visits of one run: the tip contents and
/// the net volume moved in or out of every well visited so far.
struct TransferRun<'r, I: Instrument + ?Sized> {
    instrument: &'r mut I,
    properties: &'r TransferProperties,
    config: &'r TransferConfig,
    transfer_type: TransferType,
    tip_state: TipState,
    volume_ledger: HashMap<WellKey, f64>,
    aspirated_volume: f64,
    dispensed_volume: f64,
}

impl<'r, I: Instrument + ?Sized> TransferRun<'r, I> {
    fn new(instrument: &'r mut I, context: &TransferContext<'r>, transfer_type: TransferType) -> Self {
        Self {
            instrument,
            properties: context.properties,
            config: context.config,
            transfer_type,
            tip_state: TipState::new(),
            volume_ledger: HashMap::new(),
            aspirated_volume: 0.0,
            dispensed_volume: 0.0,
        }
    }

    fn volume_difference(&self, well: &dyn WellCore) -> f64 {
        self.volume_ledger
            .get(&well_key(well))
            .copied()
            .unwrap_or(0.0)
    }

    fn record_volume_difference(&mut self, well: &dyn WellCore, difference: f64) {
        self.volume_ledger.insert(well_key(well), difference);
    }

    /// Submerge, optional mix and pre-wet, aspirate, retract.
    fn aspirate(
        &mut self,
        well: &dyn WellCore,
        volume: f64,
        pipette_mode_volume: Option<f64>,
        add_air_gap: bool,
    ) -> Result<(), EngineError> {
        debug!(well = well.name(), volume, "Aspirate visit.");
        let props = self.properties;
        let difference = self.volume_difference(well);
        let target = target_location(
            well,
            difference,
            props.aspirate.position_reference,
            &props.aspirate.offset,
        )?;

        let mut executor = TransferComponentsExecutor::new(
            &mut *self.instrument,
            props,
            target,
            well,
            &self.tip_state,
            self.transfer_type,
        )
        .with_well_volume_difference(difference);
        executor.submerge(
            &props.aspirate.submerge,
            PostSubmergeAction::Aspirate,
            pipette_mode_volume,
        )?;
        if self.transfer_type.mixes_before_aspirate() {
            executor.mix(&props.aspirate.mix, false)?;
        }
        if self.transfer_type.pre_wets() {
            executor.pre_wet(volume)?;
        }
        executor.aspirate_and_wait(volume)?;
        executor.retract_after_aspiration(volume, add_air_gap)?;

        let difference = executor.well_volume_difference();
        self.tip_state = executor.into_tip_state();
        self.record_volume_difference(well, difference);
        self.aspirated_volume += volume;
        Ok(())
    }

    /// Submerge, dispense, optional mix, retract after a single dispense.
    fn dispense(
        &mut self,
        well: &dyn WellCore,
        volume: f64,
        source: &dyn WellCore,
        add_final_air_gap: bool,
    ) -> Result<(), EngineError> {
        debug!(well = well.name(), volume, "Dispense visit.");
        let props = self.properties;
        let dispense = &props.dispense;
        let difference = self.volume_difference(well);
        let target = target_location(
            well,
            difference,
            dispense.position_reference,
            &dispense.offset,
        )?;
        let source_location = Location::new(source.get_top(0.0), source.labware());

        let mut executor = TransferComponentsExecutor::new(
            &mut *self.instrument,
            props,
            target,
            well,
            &self.tip_state,
            self.transfer_type,
        )
        .with_well_volume_difference(difference);
        executor.submerge(&dispense.submerge, PostSubmergeAction::Dispense, None)?;
        let push_out_override = dispense.mix.enabled.then_some(0.0);
        executor.dispense_and_wait(dispense, volume, push_out_override)?;
        executor.mix(&dispense.mix, true)?;
        executor.retract_after_dispensing(
            &self.config.trash_location,
            Some(&source_location),
            Some(source),
            add_final_air_gap,
        )?;

        let difference = executor.well_volume_difference();
        self.tip_state = executor.into_tip_state();
        self.record_volume_difference(well, difference);
        self.dispensed_volume += volume;
        Ok(())
    }

    /// One tip load of a distribute: a single aspirate followed by a
    /// multi-dispense visit per destination.
    fn distribute_group(
        &mut self,
        source: &dyn WellCore,
        destinations: &[&dyn WellCore],
        group: &DistributeGroup,
        add_final_air_gap: bool,
    ) -> Result<(), EngineError> {
        let props = self.properties;
        let multi = props.multi_dispense()?;
        let aspirate_volume = group.aspirate_volume();
        let conditioning_volume = group.conditioning_volume;
        let keeps_excess = conditioning_volume + group.disposal_volume > 0.0;

        self.aspirate(
            source,
            aspirate_volume,
            Some(aspirate_volume),
            conditioning_volume <= 0.0,
        )?;

        let source_location = Location::new(source.get_top(0.0), source.labware());
        for (position, &(destination, volume)) in group.dispenses.iter().enumerate() {
            let is_last = position + 1 == group.dispenses.len();
            let well = destinations[destination];
            debug!(well = well.name(), volume, is_last, "Multi-dispense visit.");

            let difference = self.volume_difference(well);
            let target = target_location(
                well,
                difference,
                multi.position_reference,
                &multi.offset,
            )?;
            let push_out_override = if is_last && !keeps_excess {
                None
            } else {
                Some(0.0)
            };

            let mut executor = TransferComponentsExecutor::new(
                &mut *self.instrument,
                props,
                target,
                well,
                &self.tip_state,
                self.transfer_type,
            )
            .with_well_volume_difference(difference);
            executor.submerge(&multi.submerge, PostSubmergeAction::Dispense, None)?;
            executor.dispense_and_wait(multi, volume, push_out_override)?;
            executor.retract_during_multi_dispense(
                &self.config.trash_location,
                Some(&source_location),
                Some(source),
                conditioning_volume,
                add_final_air_gap,
                is_last,
            )?;

            let difference = executor.well_volume_difference();
            self.tip_state = executor.into_tip_state();
            self.record_volume_difference(well, difference);
            self.dispensed_volume += volume;
        }
        Ok(())
    }

    fn finish(self, steps: usize) -> TransferReport {
        info!(
            kind = %self.transfer_type,
            steps,
            aspirated = self.aspirated_volume,
            dispensed = self.dispensed_volume,
            "Transfer finished."
        );
        TransferReport {
            tip_state: self.tip_state,
            steps,
            aspirated_volume: self.aspirated_volume,
            dispensed_volume: self.dispensed_volume,
        }
    }
}

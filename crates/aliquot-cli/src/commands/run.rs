use crate::cli::RunArgs;
use crate::config::builder::build_config;
use crate::config::file::TransferKind;
use crate::config::models::AppConfig;
use crate::error::{CliError, Result};
use crate::utils::progress::TransferProgress;
use aliquot::{
    core::{
        instrument::SimulatedInstrument,
        liquid::TransferProperties,
        models::{labware::Labware, well::WellCore},
    },
    engine::{context::TransferContext, progress::ProgressReporter},
    workflows::transfer::{self, TransferReport},
};
use std::path::Path;
use tracing::{debug, info};

pub fn run(args: RunArgs, show_progress: bool) -> Result<()> {
    let app = build_config(&args)?;
    info!(
        "Running {} from {:?} with liquid class {:?}.",
        app.kind, &app.source_labware, &app.liquid_class
    );

    let source_labware = load_labware(&app.source_labware)?;
    let destination_labware = if app.destination_labware == app.source_labware {
        None
    } else {
        Some(load_labware(&app.destination_labware)?)
    };
    let destination_labware = destination_labware.as_ref().unwrap_or(&source_labware);

    let properties =
        TransferProperties::load(&app.liquid_class).map_err(|e| CliError::FileParsing {
            path: app.liquid_class.clone(),
            source: e.into(),
        })?;

    let sources = resolve_wells(&source_labware, &app.sources)?;
    let destinations = resolve_wells(destination_labware, &app.destinations)?;

    let mut pipette = SimulatedInstrument::new(app.core_config.working_volume)
        .with_liquid_presence_detection(app.liquid_presence_detection);

    let progress = if show_progress {
        TransferProgress::stderr()
    } else {
        TransferProgress::hidden()
    };
    let reporter = ProgressReporter::with_callback(progress.callback());
    let context = TransferContext::new(&properties, &app.core_config, &reporter);

    println!("Starting {}...", app.kind);
    let report = execute(&app, &mut pipette, &context, &sources, &destinations)?;
    debug!(phases = ?progress.finished_phases(), "Workflow phases completed.");

    print_report(&app, &report);
    if app.show_calls {
        println!("\nInstrument commands:");
        for (i, call) in pipette.calls().iter().enumerate() {
            println!("  {:>4}  {:?}", i + 1, call);
        }
    }
    Ok(())
}

fn execute(
    app: &AppConfig,
    pipette: &mut SimulatedInstrument,
    context: &TransferContext,
    sources: &[&dyn WellCore],
    destinations: &[&dyn WellCore],
) -> Result<TransferReport> {
    let report = match app.kind {
        TransferKind::Transfer => {
            transfer::transfer(pipette, context, sources, destinations, &app.volumes)?
        }
        TransferKind::Consolidate => {
            let destination = single_well(destinations, "destination")?;
            transfer::consolidate(pipette, context, sources, destination, &app.volumes)?
        }
        TransferKind::Distribute => {
            let source = single_well(sources, "source")?;
            transfer::distribute(pipette, context, source, destinations, &app.volumes)?
        }
    };
    Ok(report)
}

fn load_labware(path: &Path) -> Result<Labware> {
    info!("Loading labware from {:?}", path);
    Labware::load(path).map_err(|e| CliError::FileParsing {
        path: path.to_path_buf(),
        source: e.into(),
    })
}

fn resolve_wells<'l>(labware: &'l Labware, names: &[String]) -> Result<Vec<&'l dyn WellCore>> {
    names
        .iter()
        .map(|name| {
            labware
                .well(name)
                .map(|well| well as &dyn WellCore)
                .ok_or_else(|| {
                    CliError::Argument(format!(
                        "Labware '{}' has no well named '{}'",
                        labware.name(),
                        name
                    ))
                })
        })
        .collect()
}

fn single_well<'w>(wells: &[&'w dyn WellCore], role: &str) -> Result<&'w dyn WellCore> {
    match wells {
        [well] => Ok(*well),
        _ => Err(CliError::Argument(format!(
            "Expected exactly one {} well, got {}",
            role,
            wells.len()
        ))),
    }
}

fn print_report(app: &AppConfig, report: &TransferReport) {
    println!(
        "✓ {} finished: {} step(s), {:.2} µL aspirated, {:.2} µL dispensed.",
        app.kind, report.steps, report.aspirated_volume, report.dispensed_volume
    );
    println!(
        "  Tip now holds {:.2} µL liquid and a {:.2} µL air gap.",
        report.tip_state.liquid(),
        report.tip_state.air_gap()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::FinalAirGap;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::{TempDir, tempdir};

    const PLATE: &str = r#"
        name = "tube-rack"

        [[geometries.tube]]
        shape = "cuboidal"
        bottom-x-dimension = 10.0
        bottom-y-dimension = 10.0
        top-x-dimension = 10.0
        top-y-dimension = 10.0
        bottom-height = 0.0
        top-height = 30.0

        [wells.A1]
        position = [5.0, 5.0, 1.0]
        depth = 30.0
        geometry = "tube"
        initial-volume = 1000.0

        [wells.B1]
        position = [25.0, 5.0, 1.0]
        depth = 30.0
        geometry = "tube"
        initial-volume = 0.0

        [wells.B2]
        position = [45.0, 5.0, 1.0]
        depth = 30.0
        geometry = "tube"
        initial-volume = 0.0
    "#;

    const WATER: &str = r#"
        [aspirate]
        position-reference = "well-bottom"
        offset = { z = 1.0 }
        flow-rate-by-volume = [[0.0, 40.0]]

        [aspirate.submerge]
        position-reference = "well-top"
        offset = { z = 2.0 }
        speed = 100.0

        [aspirate.retract]
        position-reference = "well-top"
        offset = { z = 2.0 }
        speed = 50.0
        air-gap-by-volume = [[0.0, 5.0]]

        [dispense]
        position-reference = "well-bottom"
        offset = { z = 1.0 }
        flow-rate-by-volume = [[0.0, 60.0]]

        [dispense.submerge]
        position-reference = "well-top"
        offset = { z = 2.0 }
        speed = 100.0

        [dispense.retract]
        position-reference = "well-top"
        offset = { z = 2.0 }
        speed = 50.0
    "#;

    fn setup(kind: &str, destinations: &str) -> (TempDir, PathBuf) {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("rack.toml"), PLATE).unwrap();
        fs::write(dir.path().join("water.toml"), WATER).unwrap();
        let plan = dir.path().join("plan.toml");
        fs::write(
            &plan,
            format!(
                r#"
                    [transfer]
                    kind = "{kind}"
                    source-labware = "rack.toml"
                    liquid-class = "water.toml"
                    sources = ["A1"]
                    destinations = {destinations}
                    volumes = [40.0]
                "#
            ),
        )
        .unwrap();
        (dir, plan)
    }

    fn args(plan: PathBuf) -> RunArgs {
        RunArgs {
            plan,
            working_volume: None,
            conditioning_volume: None,
            disposal_volume: None,
            final_air_gap: FinalAirGap {
                with_final_air_gap: false,
                no_final_air_gap: false,
            },
            liquid_presence_detection: false,
            show_calls: true,
            set_values: vec![],
        }
    }

    #[test]
    fn run_executes_a_plan_against_the_simulator() {
        let (_dir, plan) = setup("transfer", r#"["B1", "B2"]"#);
        run(args(plan), false).unwrap();
    }

    #[test]
    fn unknown_well_is_an_argument_error() {
        let (_dir, plan) = setup("transfer", r#"["Z9"]"#);
        let result = run(args(plan), false);
        assert!(matches!(result, Err(CliError::Argument(msg)) if msg.contains("Z9")));
    }

    #[test]
    fn consolidate_needs_a_single_destination() {
        let (_dir, plan) = setup("consolidate", r#"["B1", "B2"]"#);
        let result = run(args(plan), false);
        assert!(matches!(result, Err(CliError::Argument(_))));
    }

    #[test]
    fn distribute_without_multi_dispense_settings_fails_in_core() {
        let (_dir, plan) = setup("distribute", r#"["B1", "B2"]"#);
        let result = run(args(plan), false);
        assert!(matches!(result, Err(CliError::Core(_))));
    }

    #[test]
    fn missing_labware_file_is_reported_with_its_path() {
        let (dir, plan) = setup("transfer", r#"["B1"]"#);
        fs::remove_file(dir.path().join("rack.toml")).unwrap();
        let result = run(args(plan), false);
        assert!(
            matches!(result, Err(CliError::FileParsing { path, .. }) if path.ends_with("rack.toml"))
        );
    }
}

use super::defaults::DefaultsConfig;
use super::file::FileConfig;
use super::models::AppConfig;
use crate::cli::RunArgs;
use crate::error::{CliError, Result};
use aliquot::core::models::location::Location;
use aliquot::engine::config::TransferConfigBuilder;
use nalgebra::Point3;
use std::path::{Path, PathBuf};

pub fn build_config(args: &RunArgs) -> Result<AppConfig> {
    let defaults = DefaultsConfig::default();
    let file_config = FileConfig::from_file(&args.plan)?;
    let file_config = apply_set_values(file_config, &args.set_values)?;
    let plan_dir = args.plan.parent().unwrap_or_else(|| Path::new(""));

    let transfer = file_config.transfer;
    let pipette = file_config.pipette;
    let options = file_config.options;

    let working_volume = args
        .working_volume
        .or(pipette.working_volume)
        .unwrap_or(defaults.working_volume);
    let liquid_presence_detection = args.liquid_presence_detection
        || pipette
            .liquid_presence_detection
            .unwrap_or(defaults.liquid_presence_detection);
    let add_final_air_gap = match (
        args.final_air_gap.with_final_air_gap,
        args.final_air_gap.no_final_air_gap,
    ) {
        (true, false) => true,
        (false, true) => false,
        _ => options
            .add_final_air_gap
            .unwrap_or(defaults.add_final_air_gap),
    };
    let [x, y, z] = options.trash.unwrap_or(defaults.trash);

    let core_config = TransferConfigBuilder::new()
        .working_volume(working_volume)
        .trash_location(Location::new(Point3::new(x, y, z), Some("trash")))
        .add_final_air_gap(add_final_air_gap)
        .conditioning_volume(args.conditioning_volume.or(options.conditioning_volume))
        .disposal_volume(args.disposal_volume.or(options.disposal_volume))
        .build()
        .map_err(|e| CliError::Config(e.to_string()))?;

    let source_labware = resolve_relative(plan_dir, &transfer.source_labware);
    let destination_labware = transfer
        .destination_labware
        .as_deref()
        .map(|p| resolve_relative(plan_dir, p))
        .unwrap_or_else(|| source_labware.clone());

    Ok(AppConfig {
        kind: transfer.kind,
        liquid_class: resolve_relative(plan_dir, &transfer.liquid_class),
        source_labware,
        destination_labware,
        sources: transfer.sources,
        destinations: transfer.destinations,
        volumes: transfer.volumes,
        liquid_presence_detection,
        show_calls: args.show_calls,
        core_config,
    })
}

/// Paths in a plan file are relative to the plan, not to the working directory.
fn resolve_relative(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str, kind: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| CliError::Config(format!("Invalid {} value for {}: {}", kind, key, value)))
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    for kv_pair in set_values {
        let Some((key, value_str)) = kv_pair.split_once('=') else {
            return Err(CliError::Config(format!(
                "Invalid --set format: '{}'. Expected KEY=VALUE.",
                kv_pair
            )));
        };

        match key {
            "pipette.working-volume" => {
                config.pipette.working_volume = Some(parse_value(key, value_str, "float")?);
            }
            "pipette.liquid-presence-detection" => {
                config.pipette.liquid_presence_detection =
                    Some(parse_value(key, value_str, "boolean")?);
            }
            "options.add-final-air-gap" => {
                config.options.add_final_air_gap = Some(parse_value(key, value_str, "boolean")?);
            }
            "options.conditioning-volume" => {
                config.options.conditioning_volume = Some(parse_value(key, value_str, "float")?);
            }
            "options.disposal-volume" => {
                config.options.disposal_volume = Some(parse_value(key, value_str, "float")?);
            }
            _ => {
                return Err(CliError::Config(format!(
                    "Unsupported configuration key for --set: '{}'",
                    key
                )));
            }
        }
    }
    Ok(config)
}

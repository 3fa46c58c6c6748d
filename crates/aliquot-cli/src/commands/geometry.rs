use crate::cli::GeometryArgs;
use crate::error::{CliError, Result};
use aliquot::core::geometry::{
    WellGeometry, find_height_at_volume, find_volume_at_height, get_well_volumetric_capacity,
};
use aliquot::core::models::labware::Labware;
use aliquot::engine::error::EngineError;
use tracing::{debug, info};

pub fn run(args: GeometryArgs) -> Result<()> {
    info!("Loading labware from {:?}", &args.labware);
    let labware = Labware::load(&args.labware).map_err(|e| CliError::FileParsing {
        path: args.labware.clone(),
        source: e.into(),
    })?;
    let well = labware.well(&args.well).ok_or_else(|| {
        CliError::Argument(format!(
            "Labware '{}' has no well named '{}'",
            labware.name(),
            args.well
        ))
    })?;
    let geometry = well.geometry();
    debug!(well = %args.well, sections = geometry.sections().len(), "Resolved well geometry.");

    for line in describe(geometry, args.query.height, args.query.volume)? {
        println!("{}", line);
    }
    Ok(())
}

/// Renders the answer to a geometry query as output lines.
fn describe(
    geometry: &WellGeometry,
    height: Option<f64>,
    volume: Option<f64>,
) -> Result<Vec<String>> {
    let lines = match (height, volume) {
        (Some(height), _) => {
            let volume = find_volume_at_height(height, geometry).map_err(EngineError::from)?;
            vec![format!("{:.4} µL at {:.4} mm", volume, height)]
        }
        (None, Some(volume)) => {
            let height = find_height_at_volume(volume, geometry).map_err(EngineError::from)?;
            vec![format!("{:.4} mm at {:.4} µL", height, volume)]
        }
        (None, None) => {
            let capacity = get_well_volumetric_capacity(geometry).map_err(EngineError::from)?;
            let mut lines = vec![format!("{:>12}  {:>14}", "top (mm)", "section (µL)")];
            lines.extend(
                capacity
                    .iter()
                    .map(|(top, section_volume)| format!("{:>12.4}  {:>14.4}", top, section_volume)),
            );
            let max_volume = geometry.max_volume().map_err(EngineError::from)?;
            lines.push(format!(
                "depth {:.4} mm, max volume {:.4} µL",
                geometry.depth(),
                max_volume
            ));
            lines
        }
    };
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aliquot::core::geometry::WellSection;

    fn tube() -> WellGeometry {
        WellGeometry::new(vec![
            WellSection::Cuboidal {
                bottom_x_dimension: 10.0,
                bottom_y_dimension: 10.0,
                top_x_dimension: 10.0,
                top_y_dimension: 10.0,
                bottom_height: 0.0,
                top_height: 10.0,
            },
            WellSection::Cuboidal {
                bottom_x_dimension: 10.0,
                bottom_y_dimension: 10.0,
                top_x_dimension: 10.0,
                top_y_dimension: 10.0,
                bottom_height: 10.0,
                top_height: 20.0,
            },
        ])
        .unwrap()
    }

    #[test]
    fn height_query_prints_the_volume() {
        let lines = describe(&tube(), Some(5.0), None).unwrap();
        assert_eq!(lines, vec!["500.0000 µL at 5.0000 mm"]);
    }

    #[test]
    fn volume_query_prints_the_height() {
        let lines = describe(&tube(), None, Some(1500.0)).unwrap();
        assert_eq!(lines, vec!["15.0000 mm at 1500.0000 µL"]);
    }

    #[test]
    fn no_query_prints_the_capacity_table() {
        let lines = describe(&tube(), None, None).unwrap();
        assert_eq!(lines.len(), 4);
        assert!(lines[1].contains("10.0000") && lines[1].contains("1000.0000"));
        assert_eq!(lines[3], "depth 20.0000 mm, max volume 2000.0000 µL");
    }

    #[test]
    fn out_of_range_queries_are_core_errors() {
        assert!(matches!(
            describe(&tube(), Some(25.0), None),
            Err(CliError::Core(EngineError::Geometry { .. }))
        ));
        assert!(matches!(
            describe(&tube(), None, Some(2500.0)),
            Err(CliError::Core(EngineError::Geometry { .. }))
        ));
    }
}

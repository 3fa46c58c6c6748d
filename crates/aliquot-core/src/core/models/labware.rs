use super::well::LabwareWell;
use crate::core::geometry::{GeometryError, WellGeometry, WellSection};
use nalgebra::Point3;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// A declared depth may differ from the geometry's top by this much.
const DEPTH_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Error)]
pub enum LabwareError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
    #[error("Well '{well}' references unknown geometry '{geometry}'")]
    UnknownGeometry { well: String, geometry: String },
    #[error("Well '{well}' declares depth {depth} mm but its geometry ends at {geometry_depth} mm")]
    DepthMismatch {
        well: String,
        depth: f64,
        geometry_depth: f64,
    },
    #[error("Invalid geometry for well '{well}': {source}")]
    Geometry {
        well: String,
        source: GeometryError,
    },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct LabwareDefinition {
    name: String,
    geometries: HashMap<String, Vec<WellSection>>,
    wells: BTreeMap<String, WellDefinition>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct WellDefinition {
    position: [f64; 3],
    depth: f64,
    geometry: String,
    initial_volume: Option<f64>,
}

/// A named piece of labware and its wells, keyed by well name.
#[derive(Debug, Clone, PartialEq)]
pub struct Labware {
    name: String,
    wells: BTreeMap<String, LabwareWell>,
}

impl Labware {
    pub fn load(path: &Path) -> Result<Self, LabwareError> {
        let content = std::fs::read_to_string(path).map_err(|e| LabwareError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        let definition: LabwareDefinition =
            toml::from_str(&content).map_err(|e| LabwareError::Toml {
                path: path.to_string_lossy().to_string(),
                source: e,
            })?;
        Self::from_definition(definition)
    }

    fn from_definition(definition: LabwareDefinition) -> Result<Self, LabwareError> {
        let mut geometries: HashMap<&str, WellGeometry> = HashMap::new();
        let mut wells = BTreeMap::new();

        for (well_name, well_def) in &definition.wells {
            let geometry = match geometries.get(well_def.geometry.as_str()) {
                Some(geometry) => geometry.clone(),
                None => {
                    let (id, sections) = definition
                        .geometries
                        .get_key_value(&well_def.geometry)
                        .ok_or_else(|| LabwareError::UnknownGeometry {
                            well: well_name.clone(),
                            geometry: well_def.geometry.clone(),
                        })?;
                    let geometry = WellGeometry::new(sections.clone()).map_err(|e| {
                        LabwareError::Geometry {
                            well: well_name.clone(),
                            source: e,
                        }
                    })?;
                    geometries.insert(id.as_str(), geometry.clone());
                    geometry
                }
            };

            if (geometry.depth() - well_def.depth).abs() > DEPTH_TOLERANCE {
                return Err(LabwareError::DepthMismatch {
                    well: well_name.clone(),
                    depth: well_def.depth,
                    geometry_depth: geometry.depth(),
                });
            }

            let [x, y, z] = well_def.position;
            let mut well = LabwareWell::new(
                well_name,
                Some(definition.name.as_str()),
                Point3::new(x, y, z),
                geometry,
            );
            well.set_liquid_volume(well_def.initial_volume);
            wells.insert(well_name.clone(), well);
        }

        debug!(
            labware = %definition.name,
            wells = wells.len(),
            geometries = geometries.len(),
            "Loaded labware definition."
        );

        Ok(Self {
            name: definition.name,
            wells,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn well(&self, name: &str) -> Option<&LabwareWell> {
        self.wells.get(name)
    }

    pub fn well_mut(&mut self, name: &str) -> Option<&mut LabwareWell> {
        self.wells.get_mut(name)
    }

    pub fn wells(&self) -> impl Iterator<Item = &LabwareWell> {
        self.wells.values()
    }

    pub fn well_names(&self) -> impl Iterator<Item = &str> {
        self.wells.keys().map(String::as_str)
    }
}

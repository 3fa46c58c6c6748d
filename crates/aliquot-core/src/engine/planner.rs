use crate::core::liquid::ByVolumeCurve;
use thiserror::Error;

/// Slack allowed when checking whether a group still fits in the tip.
const FIT_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PlanError {
    #[error("No {0} wells were given")]
    NoWells(&'static str),
    #[error("Cannot pair {sources} source wells with {destinations} destination wells")]
    WellCountMismatch { sources: usize, destinations: usize },
    #[error("Expected 1 or {expected} volumes but got {actual}")]
    VolumeCountMismatch { expected: usize, actual: usize },
    #[error("Transfer volumes must be positive and finite, got {0}")]
    InvalidVolume(f64),
    #[error("A usable tip volume of {usable} µL cannot hold {required} µL")]
    InsufficientTipVolume { usable: f64, required: f64 },
}

/// One aspirate from `source` and one dispense into `destination`. Wells are
/// indices into the caller's source and destination lists.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransferStep {
    pub source: usize,
    pub destination: usize,
    pub volume: f64,
}

/// Aspirates collected into one tip load and dispensed together.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsolidateGroup {
    pub aspirates: Vec<(usize, f64)>,
}

impl ConsolidateGroup {
    pub fn total_volume(&self) -> f64 {
        self.aspirates.iter().map(|(_, v)| v).sum()
    }
}

/// One aspirate from the source feeding several dispenses.
#[derive(Debug, Clone, PartialEq)]
pub struct DistributeGroup {
    pub dispenses: Vec<(usize, f64)>,
    pub conditioning_volume: f64,
    pub disposal_volume: f64,
}

impl DistributeGroup {
    pub fn dispensed_volume(&self) -> f64 {
        self.dispenses.iter().map(|(_, v)| v).sum()
    }

    pub fn aspirate_volume(&self) -> f64 {
        self.dispensed_volume() + self.conditioning_volume + self.disposal_volume
    }
}

/// The largest liquid volume a step may move while leaving room for the
/// post-aspirate air gap.
pub fn usable_tip_volume(
    working_volume: f64,
    air_gap_by_volume: &ByVolumeCurve,
) -> Result<f64, PlanError> {
    let usable = working_volume - air_gap_by_volume.get_for_volume(working_volume);
    if usable.is_nan() || usable <= 0.0 {
        return Err(PlanError::InsufficientTipVolume {
            usable,
            required: working_volume,
        });
    }
    Ok(usable)
}

/// Splits volumes that do not fit in one tip load.
///
/// While more than two loads remain, full `max_volume` loads are emitted; a
/// remainder between one and two loads is split into equal halves so no step
/// ends up uselessly small.
pub fn expand_for_volume_constraints<T: Clone>(
    volumes: &[f64],
    targets: &[T],
    max_volume: f64,
) -> Vec<(f64, T)> {
    let mut expanded = Vec::with_capacity(volumes.len());
    for (&volume, target) in volumes.iter().zip(targets) {
        let mut remaining = volume;
        while remaining > 2.0 * max_volume {
            expanded.push((max_volume, target.clone()));
            remaining -= max_volume;
        }
        if remaining > max_volume {
            let half = remaining / 2.0;
            expanded.push((half, target.clone()));
            expanded.push((half, target.clone()));
        } else {
            expanded.push((remaining, target.clone()));
        }
    }
    expanded
}

fn broadcast_volumes(volumes: &[f64], count: usize) -> Result<Vec<f64>, PlanError> {
    let broadcast = match volumes.len() {
        1 => vec![volumes[0]; count],
        n if n == count => volumes.to_vec(),
        n => {
            return Err(PlanError::VolumeCountMismatch {
                expected: count,
                actual: n,
            });
        }
    };
    if let Some(bad) = broadcast
        .iter()
        .find(|v| !(v.is_finite() && **v > 0.0))
    {
        return Err(PlanError::InvalidVolume(*bad));
    }
    Ok(broadcast)
}

fn ensure_positive_capacity(max_volume: f64, required: f64) -> Result<(), PlanError> {
    if max_volume > 0.0 {
        Ok(())
    } else {
        Err(PlanError::InsufficientTipVolume {
            usable: max_volume,
            required,
        })
    }
}

/// Pairs sources with destinations one-to-one. A single source (or single
/// destination) is paired with every well on the other side.
pub fn plan_transfer(
    volumes: &[f64],
    source_count: usize,
    destination_count: usize,
    max_volume: f64,
) -> Result<Vec<TransferStep>, PlanError> {
    if source_count == 0 {
        return Err(PlanError::NoWells("source"));
    }
    if destination_count == 0 {
        return Err(PlanError::NoWells("destination"));
    }

    let pairs: Vec<(usize, usize)> = if source_count == destination_count {
        (0..source_count).map(|i| (i, i)).collect()
    } else if source_count == 1 {
        (0..destination_count).map(|d| (0, d)).collect()
    } else if destination_count == 1 {
        (0..source_count).map(|s| (s, 0)).collect()
    } else {
        return Err(PlanError::WellCountMismatch {
            sources: source_count,
            destinations: destination_count,
        });
    };

    let volumes = broadcast_volumes(volumes, pairs.len())?;
    ensure_positive_capacity(max_volume, volumes[0])?;

    Ok(expand_for_volume_constraints(&volumes, &pairs, max_volume)
        .into_iter()
        .map(|(volume, (source, destination))| TransferStep {
            source,
            destination,
            volume,
        })
        .collect())
}

/// Groups per-source volumes into tip loads for a single destination.
pub fn plan_consolidate(
    volumes: &[f64],
    source_count: usize,
    max_volume: f64,
) -> Result<Vec<ConsolidateGroup>, PlanError> {
    if source_count == 0 {
        return Err(PlanError::NoWells("source"));
    }
    let volumes = broadcast_volumes(volumes, source_count)?;
    ensure_positive_capacity(max_volume, volumes[0])?;

    let sources: Vec<usize> = (0..source_count).collect();
    let mut groups: Vec<ConsolidateGroup> = Vec::new();
    let mut current: Vec<(usize, f64)> = Vec::new();
    let mut current_total = 0.0;

    for (volume, source) in expand_for_volume_constraints(&volumes, &sources, max_volume) {
        if !current.is_empty() && current_total + volume > max_volume + FIT_TOLERANCE {
            groups.push(ConsolidateGroup {
                aspirates: std::mem::take(&mut current),
            });
            current_total = 0.0;
        }
        current.push((source, volume));
        current_total += volume;
    }
    if !current.is_empty() {
        groups.push(ConsolidateGroup { aspirates: current });
    }
    Ok(groups)
}

/// Groups per-destination volumes into tip loads from a single source. Each
/// load also carries the conditioning and disposal volumes.
pub fn plan_distribute(
    volumes: &[f64],
    destination_count: usize,
    max_volume: f64,
    conditioning_volume: f64,
    disposal_volume: f64,
) -> Result<Vec<DistributeGroup>, PlanError> {
    if destination_count == 0 {
        return Err(PlanError::NoWells("destination"));
    }
    let volumes = broadcast_volumes(volumes, destination_count)?;

    let overhead = conditioning_volume + disposal_volume;
    let dispense_capacity = max_volume - overhead;
    if dispense_capacity <= 0.0 {
        return Err(PlanError::InsufficientTipVolume {
            usable: max_volume,
            required: overhead + volumes[0],
        });
    }

    let destinations: Vec<usize> = (0..destination_count).collect();
    let mut groups: Vec<DistributeGroup> = Vec::new();
    let mut current: Vec<(usize, f64)> = Vec::new();
    let mut current_total = 0.0;

    let new_group = |dispenses| DistributeGroup {
        dispenses,
        conditioning_volume,
        disposal_volume,
    };

    for (volume, destination) in
        expand_for_volume_constraints(&volumes, &destinations, dispense_capacity)
    {
        if !current.is_empty() && current_total + volume > dispense_capacity + FIT_TOLERANCE {
            groups.push(new_group(std::mem::take(&mut current)));
            current_total = 0.0;
        }
        current.push((destination, volume));
        current_total += volume;
    }
    if !current.is_empty() {
        groups.push(new_group(current));
    }
    Ok(groups)
}

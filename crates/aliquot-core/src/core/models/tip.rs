use thiserror::Error;

/// Slack allowed when removing liquid so accumulated floating-point error in
/// a series of dispenses does not trip the non-negativity check.
const LIQUID_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TipStateError {
    #[error("Cannot change the liquid in the tip while a {air_gap} µL air gap sits below it")]
    AirGapPresent { air_gap: f64 },
    #[error("Tried to remove a {removed} µL air gap but the tip holds a {tracked} µL air gap")]
    AirGapMismatch { tracked: f64, removed: f64 },
    #[error("Cannot remove {removed} µL of liquid from a tip that holds {liquid} µL")]
    NegativeLiquid { liquid: f64, removed: f64 },
}

/// What the tip currently holds: a column of liquid with an optional air gap
/// drawn in underneath it.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LiquidAndAirGapPair {
    pub liquid: f64,
    pub air_gap: f64,
}

/// Tracks the contents of the tip and whether the plunger is positioned to
/// aspirate.
///
/// The tip never holds more than one air gap, and liquid is only added or
/// removed once the air gap has been dispensed. Every mutator returns a
/// [`TipStateError`] instead of silently corrupting the tracked contents when
/// those rules are broken.
#[derive(Debug, Clone, PartialEq)]
pub struct TipState {
    pub ready_to_aspirate: bool,
    pub last_liquid_and_air_gap_in_tip: LiquidAndAirGapPair,
}

impl Default for TipState {
    fn default() -> Self {
        Self {
            ready_to_aspirate: true,
            last_liquid_and_air_gap_in_tip: LiquidAndAirGapPair::default(),
        }
    }
}

impl TipState {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn liquid(&self) -> f64 {
        self.last_liquid_and_air_gap_in_tip.liquid
    }

    #[inline]
    pub fn air_gap(&self) -> f64 {
        self.last_liquid_and_air_gap_in_tip.air_gap
    }

    pub fn append_liquid(&mut self, volume: f64) -> Result<(), TipStateError> {
        self.ensure_no_air_gap()?;
        self.last_liquid_and_air_gap_in_tip.liquid += volume;
        Ok(())
    }

    pub fn delete_liquid(&mut self, volume: f64) -> Result<(), TipStateError> {
        self.ensure_no_air_gap()?;
        let liquid = self.last_liquid_and_air_gap_in_tip.liquid;
        if volume > liquid + LIQUID_TOLERANCE {
            return Err(TipStateError::NegativeLiquid {
                liquid,
                removed: volume,
            });
        }
        self.last_liquid_and_air_gap_in_tip.liquid = (liquid - volume).max(0.0);
        Ok(())
    }

    pub fn append_air_gap(&mut self, volume: f64) -> Result<(), TipStateError> {
        self.ensure_no_air_gap()?;
        self.last_liquid_and_air_gap_in_tip.air_gap = volume;
        Ok(())
    }

    /// Removes the tracked air gap. The volume must match what was appended.
    pub fn delete_air_gap(&mut self, volume: f64) -> Result<(), TipStateError> {
        let tracked = self.last_liquid_and_air_gap_in_tip.air_gap;
        if tracked != volume {
            return Err(TipStateError::AirGapMismatch {
                tracked,
                removed: volume,
            });
        }
        self.last_liquid_and_air_gap_in_tip.air_gap = 0.0;
        Ok(())
    }

    fn ensure_no_air_gap(&self) -> Result<(), TipStateError> {
        let air_gap = self.last_liquid_and_air_gap_in_tip.air_gap;
        if air_gap != 0.0 {
            return Err(TipStateError::AirGapPresent { air_gap });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_tip_is_empty_and_ready() {
        let tip = TipState::new();
        assert!(tip.ready_to_aspirate);
        assert_eq!(tip.liquid(), 0.0);
        assert_eq!(tip.air_gap(), 0.0);
    }

    #[test]
    fn liquid_then_air_gap_then_removal_tracks_contents() {
        let mut tip = TipState::new();
        tip.append_liquid(40.0).unwrap();
        tip.append_air_gap(5.0).unwrap();
        assert_eq!(
            tip.last_liquid_and_air_gap_in_tip,
            LiquidAndAirGapPair {
                liquid: 40.0,
                air_gap: 5.0
            }
        );

        tip.delete_air_gap(5.0).unwrap();
        tip.delete_liquid(40.0).unwrap();
        assert_eq!(
            tip.last_liquid_and_air_gap_in_tip,
            LiquidAndAirGapPair {
                liquid: 0.0,
                air_gap: 0.0
            }
        );
    }

    #[test]
    fn append_liquid_below_air_gap_is_rejected() {
        let mut tip = TipState::new();
        tip.append_air_gap(5.0).unwrap();

        let result = tip.append_liquid(10.0);
        assert_eq!(result, Err(TipStateError::AirGapPresent { air_gap: 5.0 }));
        assert_eq!(tip.liquid(), 0.0);
    }

    #[test]
    fn delete_liquid_below_air_gap_is_rejected() {
        let mut tip = TipState::new();
        tip.append_liquid(10.0).unwrap();
        tip.append_air_gap(2.0).unwrap();

        assert!(matches!(
            tip.delete_liquid(10.0),
            Err(TipStateError::AirGapPresent { .. })
        ));
        assert_eq!(tip.liquid(), 10.0);
    }

    #[test]
    fn second_air_gap_is_rejected() {
        let mut tip = TipState::new();
        tip.append_air_gap(5.0).unwrap();
        assert!(matches!(
            tip.append_air_gap(3.0),
            Err(TipStateError::AirGapPresent { .. })
        ));
        assert_eq!(tip.air_gap(), 5.0);
    }

    #[test]
    fn delete_air_gap_requires_exact_volume() {
        let mut tip = TipState::new();
        tip.append_air_gap(5.0).unwrap();

        let result = tip.delete_air_gap(4.0);
        assert_eq!(
            result,
            Err(TipStateError::AirGapMismatch {
                tracked: 5.0,
                removed: 4.0
            })
        );
        assert_eq!(tip.air_gap(), 5.0);
    }

    #[test]
    fn delete_more_liquid_than_held_is_rejected() {
        let mut tip = TipState::new();
        tip.append_liquid(10.0).unwrap();
        assert!(matches!(
            tip.delete_liquid(10.5),
            Err(TipStateError::NegativeLiquid { .. })
        ));
    }

    #[test]
    fn repeated_small_dispenses_do_not_go_negative() {
        let mut tip = TipState::new();
        tip.append_liquid(0.3).unwrap();
        tip.delete_liquid(0.1).unwrap();
        tip.delete_liquid(0.1).unwrap();
        tip.delete_liquid(0.1).unwrap();
        assert!(tip.liquid() >= 0.0);
        assert!(tip.liquid() < 1e-9);
    }
}

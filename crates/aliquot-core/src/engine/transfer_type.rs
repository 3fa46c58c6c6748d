use std::fmt;

/// The topology of a transfer. Each variant decides the phase-level policy
/// the executor applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferType {
    OneToOne,
    /// Consolidate: several aspirates into one dispense.
    ManyToOne,
    /// Distribute: one aspirate into several dispenses.
    OneToMany,
}

impl TransferType {
    /// Volume the post-aspirate air gap is looked up at. A consolidating tip
    /// carries everything aspirated so far, so the gap must cover all of it.
    pub fn air_gap_basis(self, step_volume: f64, liquid_in_tip: f64) -> f64 {
        match self {
            TransferType::ManyToOne => liquid_in_tip,
            TransferType::OneToOne | TransferType::OneToMany => step_volume,
        }
    }

    /// Consolidation never mixes in a source, since the tip already carries
    /// liquid from the previous one.
    pub fn mixes_before_aspirate(self) -> bool {
        !matches!(self, TransferType::ManyToOne)
    }

    pub fn pre_wets(self) -> bool {
        !matches!(self, TransferType::ManyToOne)
    }

    pub fn probes_liquid(self) -> bool {
        !matches!(self, TransferType::ManyToOne)
    }

    /// A distribute only blows out once its last dispense is done.
    pub fn blows_out_on_retract(self, is_last_retract: bool) -> bool {
        match self {
            TransferType::OneToMany => is_last_retract,
            TransferType::OneToOne | TransferType::ManyToOne => true,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TransferType::OneToOne => "transfer",
            TransferType::ManyToOne => "consolidate",
            TransferType::OneToMany => "distribute",
        }
    }
}

impl fmt::Display for TransferType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consolidate_uses_cumulative_tip_volume_for_air_gap() {
        assert_eq!(TransferType::ManyToOne.air_gap_basis(25.0, 50.0), 50.0);
    }

    #[test]
    fn transfer_and_distribute_use_step_volume_for_air_gap() {
        assert_eq!(TransferType::OneToOne.air_gap_basis(40.0, 40.0), 40.0);
        assert_eq!(TransferType::OneToMany.air_gap_basis(120.0, 0.0), 120.0);
    }

    #[test]
    fn only_consolidate_skips_mix_pre_wet_and_probe() {
        for kind in [TransferType::OneToOne, TransferType::OneToMany] {
            assert!(kind.mixes_before_aspirate());
            assert!(kind.pre_wets());
            assert!(kind.probes_liquid());
        }
        assert!(!TransferType::ManyToOne.mixes_before_aspirate());
        assert!(!TransferType::ManyToOne.pre_wets());
        assert!(!TransferType::ManyToOne.probes_liquid());
    }

    #[test]
    fn distribute_blows_out_only_on_last_retract() {
        assert!(!TransferType::OneToMany.blows_out_on_retract(false));
        assert!(TransferType::OneToMany.blows_out_on_retract(true));
        assert!(TransferType::OneToOne.blows_out_on_retract(false));
        assert!(TransferType::ManyToOne.blows_out_on_retract(false));
    }

    #[test]
    fn display_uses_workflow_name() {
        assert_eq!(TransferType::ManyToOne.to_string(), "consolidate");
    }
}

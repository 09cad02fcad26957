//! Flavour families of the calibration and the table naming scheme.

use std::fmt;

use tq_core::{SystCode, SystDirection, SystType};

use crate::binning::{N_ETA_BINS_HF, N_ETA_BINS_LF, N_PT_BINS_HF, N_PT_BINS_LF};

/// Flavour family of a jet, as seen by the calibration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlavourClass {
    /// Jets from b quarks (|flavour| = 5).
    Bottom,
    /// Jets from c quarks (|flavour| = 4).
    Charm,
    /// Everything else, including jets of unknown flavour.
    Light,
}

impl FlavourClass {
    /// All families.
    pub const ALL: [FlavourClass; 3] = [FlavourClass::Bottom, FlavourClass::Charm, FlavourClass::Light];

    /// Classify a jet flavour code (PDG ID).
    pub fn from_pdg(flavour: i32) -> Self {
        match flavour.abs() {
            5 => FlavourClass::Bottom,
            4 => FlavourClass::Charm,
            _ => FlavourClass::Light,
        }
    }

    /// Number of pt bins in the tables of this family.
    pub fn n_pt_bins(self) -> usize {
        match self {
            FlavourClass::Bottom | FlavourClass::Charm => N_PT_BINS_HF,
            FlavourClass::Light => N_PT_BINS_LF,
        }
    }

    /// Number of |eta| bins in the tables of this family.
    pub fn n_eta_bins(self) -> usize {
        match self {
            FlavourClass::Bottom | FlavourClass::Charm => N_ETA_BINS_HF,
            FlavourClass::Light => N_ETA_BINS_LF,
        }
    }

    /// Systematic sources with dedicated tables, and the stem of their name suffix.
    ///
    /// The nominal table has no suffix; a variation appends `<stem>Up` or `<stem>Down`.
    pub fn variations(self) -> &'static [(SystType, &'static str)] {
        match self {
            FlavourClass::Bottom => &[
                (SystType::Jec, "_JES"),
                (SystType::BTagPurityHF, "_LF"),
                (SystType::BTagStatHF1, "_Stats1"),
                (SystType::BTagStatHF2, "_Stats2"),
            ],
            FlavourClass::Charm => {
                &[(SystType::BTagCharmUnc1, "_cErr1"), (SystType::BTagCharmUnc2, "_cErr2")]
            }
            FlavourClass::Light => &[
                (SystType::Jec, "_JES"),
                (SystType::BTagPurityLF, "_HF"),
                (SystType::BTagStatLF1, "_Stats1"),
                (SystType::BTagStatLF2, "_Stats2"),
            ],
        }
    }

    /// Every systematic code with a table for this family, nominal first.
    pub fn codes(self) -> Vec<SystCode> {
        let mut codes = vec![SystCode::NOMINAL];
        for &(kind, _) in self.variations() {
            for dir in SystDirection::BOTH {
                codes.push(SystCode::encode(kind, dir));
            }
        }
        codes
    }

    /// Name of the calibration histogram for a given code and bin.
    ///
    /// Returns `None` for codes without a table in this family.
    pub fn table_name(self, code: SystCode, pt_bin: usize, eta_bin: usize) -> Option<String> {
        let base = match self {
            FlavourClass::Bottom => format!("csv_ratio_Pt{pt_bin}_Eta0_final"),
            FlavourClass::Charm => format!("c_csv_ratio_Pt{pt_bin}_Eta0_final"),
            FlavourClass::Light => format!("csv_ratio_Pt{pt_bin}_Eta{eta_bin}_final"),
        };
        let (kind, dir) = code.decode();
        if kind == SystType::Nominal {
            return Some(base);
        }
        let (_, stem) = self.variations().iter().find(|(k, _)| *k == kind)?;
        Some(format!("{base}{stem}{dir}"))
    }
}

impl fmt::Display for FlavourClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlavourClass::Bottom => f.write_str("b quark"),
            FlavourClass::Charm => f.write_str("c quark"),
            FlavourClass::Light => f.write_str("light-flavour"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert_eq!(FlavourClass::from_pdg(5), FlavourClass::Bottom);
        assert_eq!(FlavourClass::from_pdg(-5), FlavourClass::Bottom);
        assert_eq!(FlavourClass::from_pdg(-4), FlavourClass::Charm);
        assert_eq!(FlavourClass::from_pdg(21), FlavourClass::Light);
        assert_eq!(FlavourClass::from_pdg(0), FlavourClass::Light);
    }

    #[test]
    fn table_names() {
        let up = SystCode::encode(SystType::BTagPurityHF, SystDirection::Up);
        assert_eq!(
            FlavourClass::Bottom.table_name(up, 2, 0).as_deref(),
            Some("csv_ratio_Pt2_Eta0_final_LFUp")
        );
        let down = SystCode::encode(SystType::BTagCharmUnc2, SystDirection::Down);
        assert_eq!(
            FlavourClass::Charm.table_name(down, 5, 0).as_deref(),
            Some("c_csv_ratio_Pt5_Eta0_final_cErr2Down")
        );
        assert_eq!(
            FlavourClass::Light.table_name(SystCode::NOMINAL, 3, 2).as_deref(),
            Some("csv_ratio_Pt3_Eta2_final")
        );
        assert_eq!(FlavourClass::Charm.table_name(up, 0, 0), None);
    }

    #[test]
    fn bottom_has_statistical_sources_charm_lacks() {
        let bottom = FlavourClass::Bottom.codes();
        let charm = FlavourClass::Charm.codes();
        let stat = SystCode::encode(SystType::BTagStatHF1, SystDirection::Up);
        assert!(bottom.contains(&stat));
        assert!(!charm.contains(&stat));
        assert_eq!(bottom.len(), 9);
        assert_eq!(charm.len(), 5);
        assert_eq!(FlavourClass::Light.codes().len(), 9);
    }
}

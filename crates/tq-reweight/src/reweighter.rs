//! CSV (b-tag discriminator shape) reweighting of jets.

use std::collections::BTreeMap;
use std::path::Path;

use tq_core::{Error, Histogram, Jet, Kinematics, Result, SystCode, SystDirection, SystType};

use crate::binning::{self, FALLBACK_BIN};
use crate::calibration::{CalibrationSource, HF_FILE_NAME, JsonCalibrationFile, LF_FILE_NAME};
use crate::flavour::FlavourClass;

/// Tables of one flavour family, indexed by systematic code and then `pt_bin * n_eta + eta_bin`.
#[derive(Debug, Clone)]
struct FlavourTables {
    class: FlavourClass,
    tables: BTreeMap<SystCode, Vec<Histogram>>,
}

impl FlavourTables {
    /// Read every table the family needs. Any missing or malformed histogram is fatal.
    fn load(class: FlavourClass, source: &dyn CalibrationSource) -> Result<Self> {
        let n_pt = class.n_pt_bins();
        let n_eta = class.n_eta_bins();
        let mut tables = BTreeMap::new();

        for code in class.codes() {
            let mut bins = Vec::with_capacity(n_pt * n_eta);
            for pt_bin in 0..n_pt {
                for eta_bin in 0..n_eta {
                    let name = class.table_name(code, pt_bin, eta_bin).ok_or_else(|| {
                        Error::Validation(format!("no table naming rule for {class} code {code}"))
                    })?;
                    let hist = source.histogram(&name).ok_or_else(|| {
                        Error::CalibrationTableNotFound {
                            name: name.clone(),
                            flavour: class.to_string(),
                            code: code.value(),
                            pt_bin,
                            eta_bin,
                        }
                    })?;
                    hist.validate().map_err(|e| {
                        Error::Validation(format!("{} in {}: {e}", name, source.location()))
                    })?;
                    bins.push(hist.clone());
                }
            }
            tables.insert(code, bins);
        }

        log::info!(
            "loaded {} {} calibration tables from {}",
            tables.len() * n_pt * n_eta,
            class,
            source.location()
        );
        Ok(Self { class, tables })
    }

    fn table(&self, code: SystCode, pt_bin: usize, eta_bin: usize) -> Option<&Histogram> {
        let bins = self.tables.get(&code)?;
        bins.get(pt_bin * self.class.n_eta_bins() + eta_bin)
    }
}

/// Computes per-jet CSV weights.
///
/// The reweighter only provides per-jet factors; the per-event weight is the product over the
/// jets of the event. All tables are loaded at construction and never modified, so one instance
/// can be shared between readers and threads behind an `Arc`.
#[derive(Debug, Clone)]
pub struct CsvReweighter {
    bottom: FlavourTables,
    charm: FlavourTables,
    light: FlavourTables,
}

impl CsvReweighter {
    /// Load the calibration files from a directory.
    ///
    /// The directory must contain `csv_rwt_hf.json` and `csv_rwt_lf.json`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let hf = JsonCalibrationFile::open(dir.join(HF_FILE_NAME))?;
        let lf = JsonCalibrationFile::open(dir.join(LF_FILE_NAME))?;
        Self::from_sources(&hf, &lf)
    }

    /// Build from already opened heavy- and light-flavour calibration sources.
    pub fn from_sources(hf: &dyn CalibrationSource, lf: &dyn CalibrationSource) -> Result<Self> {
        Ok(Self {
            bottom: FlavourTables::load(FlavourClass::Bottom, hf)?,
            charm: FlavourTables::load(FlavourClass::Charm, hf)?,
            light: FlavourTables::load(FlavourClass::Light, lf)?,
        })
    }

    fn family(&self, class: FlavourClass) -> &FlavourTables {
        match class {
            FlavourClass::Bottom => &self.bottom,
            FlavourClass::Charm => &self.charm,
            FlavourClass::Light => &self.light,
        }
    }

    /// Whether a flavour family has dedicated tables for the given variation.
    pub fn supports(&self, class: FlavourClass, kind: SystType, direction: SystDirection) -> bool {
        self.family(class).tables.contains_key(&SystCode::normalized(kind, direction))
    }

    /// Per-jet weight for the requested variation.
    ///
    /// Jets outside the calibrated phase space get a weight of 1. A variation that does not apply
    /// to the jet's flavour family (e.g. a light-flavour statistical component for a b jet)
    /// yields the nominal weight. A negative discriminator reads the first discriminator bin.
    pub fn jet_weight(&self, jet: &Jet, kind: SystType, direction: SystDirection) -> f64 {
        let (Some(mut pt_bin), Some(eta_bin)) = (binning::pt_bin(jet.pt()), binning::eta_bin(jet.eta()))
        else {
            return 1.0;
        };

        let class = FlavourClass::from_pdg(jet.flavour());
        let family = self.family(class);
        let eta_bin = match class {
            FlavourClass::Light => {
                pt_bin = pt_bin.min(class.n_pt_bins() - 1);
                eta_bin
            }
            FlavourClass::Bottom | FlavourClass::Charm => 0,
        };

        let mut code = SystCode::normalized(kind, direction);
        if !family.tables.contains_key(&code) {
            code = SystCode::NOMINAL;
        }

        // Every (code, bin) pair was checked at construction.
        let Some(table) = family.table(code, pt_bin, eta_bin) else {
            return 1.0;
        };
        let csv = jet.btag();
        let bin = if csv >= 0.0 { table.find_bin(csv) } else { FALLBACK_BIN };
        table.content(bin)
    }

    /// Per-jet weight for the nominal configuration.
    pub fn nominal_jet_weight(&self, jet: &Jet) -> f64 {
        self.jet_weight(jet, SystType::Nominal, SystDirection::Up)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A calibration where every table is flat and its content encodes the family and code.
    fn flat_calibration() -> (JsonCalibrationFile, JsonCalibrationFile) {
        let mut hf = Vec::new();
        let mut lf = Vec::new();
        for class in FlavourClass::ALL {
            let offset = match class {
                FlavourClass::Bottom => 1.0,
                FlavourClass::Charm => 2.0,
                FlavourClass::Light => 3.0,
            };
            for code in class.codes() {
                for pt in 0..class.n_pt_bins() {
                    for eta in 0..class.n_eta_bins() {
                        let name = class.table_name(code, pt, eta).unwrap();
                        let v = offset + code.value() as f64 / 100.0;
                        let h = Histogram::with_contents(name, vec![0.0, 0.5, 1.0], vec![v, v]).unwrap();
                        match class {
                            FlavourClass::Light => lf.push(h),
                            _ => hf.push(h),
                        }
                    }
                }
            }
        }
        (
            JsonCalibrationFile::from_histograms("hf.json", hf),
            JsonCalibrationFile::from_histograms("lf.json", lf),
        )
    }

    #[test]
    fn mismatched_variation_falls_back_to_nominal() {
        let (hf, lf) = flat_calibration();
        let rw = CsvReweighter::from_sources(&hf, &lf).unwrap();
        let b = Jet::new(50.0, 0.3, 0.0, 0.7, 5);
        assert_eq!(
            rw.jet_weight(&b, SystType::BTagStatLF1, SystDirection::Up),
            rw.nominal_jet_weight(&b)
        );
        assert_ne!(
            rw.jet_weight(&b, SystType::BTagStatHF1, SystDirection::Up),
            rw.nominal_jet_weight(&b)
        );
        assert!(!rw.supports(FlavourClass::Charm, SystType::Jec, SystDirection::Up));
        assert!(rw.supports(FlavourClass::Charm, SystType::Nominal, SystDirection::Down));
    }

    #[test]
    fn missing_table_is_fatal() {
        let (hf, lf) = flat_calibration();
        let pruned = JsonCalibrationFile::from_histograms(
            "hf.json",
            hf.names()
                .filter(|n| *n != "c_csv_ratio_Pt4_Eta0_final_cErr1Down")
                .map(|n| hf.histogram(n).unwrap().clone())
                .collect::<Vec<_>>(),
        );
        let err = CsvReweighter::from_sources(&pruned, &lf).unwrap_err();
        match err {
            Error::CalibrationTableNotFound { name, pt_bin, .. } => {
                assert_eq!(name, "c_csv_ratio_Pt4_Eta0_final_cErr1Down");
                assert_eq!(pt_bin, 4);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}

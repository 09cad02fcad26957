//! Integration tests: CSV reweighting against calibration files written to a temp directory.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use approx::assert_abs_diff_eq;
use proptest::prelude::*;
use tq_core::{Error, Histogram, Jet, SystCode, SystDirection, SystType};
use tq_reweight::binning::{N_ETA_BINS_LF, N_PT_BINS_HF};
use tq_reweight::calibration::{HF_FILE_NAME, LF_FILE_NAME};
use tq_reweight::{CsvReweighter, FlavourClass, JsonCalibrationFile};

/// Content of the known bottom nominal table in pt bin 2, discriminator bins of width 0.1.
const BOTTOM_PT2_NOMINAL: [f64; 10] = [0.91, 0.92, 0.93, 0.94, 0.95, 0.96, 0.97, 0.98, 1.234, 1.10];

fn fixture_dir(tag: &str) -> PathBuf {
    let mut p = std::env::temp_dir();
    p.push(format!("tq-reweight-{}-{tag}", std::process::id()));
    std::fs::create_dir_all(&p).unwrap();
    p
}

/// Content of a generic table: distinct per family, code, pt and eta bin and discriminator bin.
fn generic_content(class: FlavourClass, code: SystCode, pt: usize, eta: usize, bin: usize) -> f64 {
    let family = match class {
        FlavourClass::Bottom => 0.0,
        FlavourClass::Charm => 0.3,
        FlavourClass::Light => 0.6,
    };
    1.0 + family + 0.01 * code.value() as f64 + 0.001 * (pt * N_ETA_BINS_LF + eta) as f64
        + 0.0001 * bin as f64
}

fn write_calibration(dir: &Path, skip: Option<&str>) {
    let edges: Vec<f64> = (0..=10).map(|i| i as f64 / 10.0).collect();
    let mut hf = Vec::new();
    let mut lf = Vec::new();
    for class in FlavourClass::ALL {
        for code in class.codes() {
            for pt in 0..class.n_pt_bins() {
                for eta in 0..class.n_eta_bins() {
                    let name = class.table_name(code, pt, eta).unwrap();
                    if Some(name.as_str()) == skip {
                        continue;
                    }
                    let content: Vec<f64> = if class == FlavourClass::Bottom
                        && code == SystCode::NOMINAL
                        && pt == 2
                    {
                        BOTTOM_PT2_NOMINAL.to_vec()
                    } else {
                        (0..10).map(|b| generic_content(class, code, pt, eta, b)).collect()
                    };
                    let mut h = Histogram::with_contents(name, edges.clone(), content).unwrap();
                    h.underflow = 0.5;
                    h.overflow = 1.5;
                    match class {
                        FlavourClass::Light => lf.push(h),
                        _ => hf.push(h),
                    }
                }
            }
        }
    }
    JsonCalibrationFile::from_histograms(dir.join(HF_FILE_NAME), hf)
        .save(dir.join(HF_FILE_NAME))
        .unwrap();
    JsonCalibrationFile::from_histograms(dir.join(LF_FILE_NAME), lf)
        .save(dir.join(LF_FILE_NAME))
        .unwrap();
}

fn reweighter() -> &'static CsvReweighter {
    static SHARED: OnceLock<CsvReweighter> = OnceLock::new();
    SHARED.get_or_init(|| {
        let dir = fixture_dir("shared");
        write_calibration(&dir, None);
        CsvReweighter::from_dir(&dir).expect("fixture calibration must load")
    })
}

#[test]
fn known_bottom_jet_reads_fixture_bin() {
    let rw = reweighter();
    let jet = Jet::new(50.0, 1.0, 0.2, 0.85, 5);
    assert_abs_diff_eq!(rw.jet_weight(&jet, SystType::Nominal, SystDirection::Up), 1.234);
    let anti_b = Jet::new(50.0, -1.0, 0.2, 0.85, -5);
    assert_abs_diff_eq!(rw.nominal_jet_weight(&anti_b), 1.234);
}

#[test]
fn negative_discriminator_uses_first_bin() {
    let rw = reweighter();
    let jet = Jet::new(50.0, 1.0, 0.2, -10.0, 5);
    assert_abs_diff_eq!(rw.nominal_jet_weight(&jet), BOTTOM_PT2_NOMINAL[0]);
}

#[test]
fn discriminator_above_range_reads_overflow() {
    let rw = reweighter();
    let jet = Jet::new(50.0, 1.0, 0.2, 1.2, 5);
    assert_abs_diff_eq!(rw.nominal_jet_weight(&jet), 1.5);
}

#[test]
fn light_jets_clip_pt_bin() {
    let rw = reweighter();
    let lf_high = Jet::new(300.0, 1.9, 0.0, 0.35, 21);
    let lf_clip = Jet::new(70.0, 1.9, 0.0, 0.35, 21);
    let expected = generic_content(FlavourClass::Light, SystCode::NOMINAL, 3, 2, 3);
    assert_abs_diff_eq!(rw.nominal_jet_weight(&lf_high), expected);
    assert_abs_diff_eq!(rw.nominal_jet_weight(&lf_clip), expected);
}

#[test]
fn highest_heavy_flavour_bin_is_open_ended() {
    let rw = reweighter();
    let jet = Jet::new(450.0, 0.1, 0.0, 0.55, 4);
    let expected = generic_content(FlavourClass::Charm, SystCode::NOMINAL, N_PT_BINS_HF - 1, 0, 5);
    assert_abs_diff_eq!(rw.nominal_jet_weight(&jet), expected);
}

#[test]
fn variations_select_their_own_tables() {
    let rw = reweighter();
    let jet = Jet::new(35.0, 0.5, 0.0, 0.45, 4);
    let code = SystCode::encode(SystType::BTagCharmUnc1, SystDirection::Down);
    assert_abs_diff_eq!(
        rw.jet_weight(&jet, SystType::BTagCharmUnc1, SystDirection::Down),
        generic_content(FlavourClass::Charm, code, 1, 0, 4)
    );
}

#[test]
fn missing_table_aborts_construction() {
    let dir = fixture_dir("missing-table");
    write_calibration(&dir, Some("csv_ratio_Pt1_Eta2_final_Stats2Up"));
    let err = CsvReweighter::from_dir(&dir).unwrap_err();
    assert!(
        err.to_string().contains("csv_ratio_Pt1_Eta2_final_Stats2Up"),
        "error should name the table: {err}"
    );
    assert!(matches!(err, Error::CalibrationTableNotFound { pt_bin: 1, eta_bin: 2, .. }));
}

#[test]
fn missing_file_aborts_construction() {
    let dir = fixture_dir("missing-file");
    write_calibration(&dir, None);
    std::fs::remove_file(dir.join(LF_FILE_NAME)).unwrap();
    let err = CsvReweighter::from_dir(&dir).unwrap_err();
    assert!(matches!(err, Error::CalibrationFileNotFound { .. }));
    assert!(err.to_string().contains(LF_FILE_NAME));
}

fn any_syst() -> impl Strategy<Value = (SystType, SystDirection)> {
    (
        prop::sample::select(SystType::ALL.to_vec()),
        prop::sample::select(SystDirection::BOTH.to_vec()),
    )
}

fn any_flavour() -> impl Strategy<Value = i32> {
    prop::sample::select(vec![0, 1, 2, 3, 4, -4, 5, -5, 21])
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn out_of_acceptance_is_neutral(
        pt in 0.0f64..2000.0,
        abs_eta in 2.4f64..5.0,
        btag in -1.0f64..1.0,
        flavour in any_flavour(),
        (kind, dir) in any_syst(),
    ) {
        let rw = reweighter();
        let forward = Jet::new(pt, abs_eta, 0.0, btag, flavour);
        prop_assert_eq!(rw.jet_weight(&forward, kind, dir), 1.0);
        let soft = Jet::new(pt.min(19.99), 0.5, 0.0, btag, flavour);
        prop_assert_eq!(rw.jet_weight(&soft, kind, dir), 1.0);
    }

    #[test]
    fn nominal_ignores_direction(
        pt in 20.0f64..500.0,
        eta in -2.39f64..2.39,
        btag in -1.0f64..1.2,
        flavour in any_flavour(),
    ) {
        let rw = reweighter();
        let jet = Jet::new(pt, eta, 0.0, btag, flavour);
        prop_assert_eq!(
            rw.jet_weight(&jet, SystType::Nominal, SystDirection::Down),
            rw.jet_weight(&jet, SystType::Nominal, SystDirection::Up)
        );
    }

    #[test]
    fn unsupported_variation_equals_nominal(
        pt in 20.0f64..500.0,
        eta in -2.39f64..2.39,
        btag in 0.0f64..1.0,
        flavour in any_flavour(),
        (kind, dir) in any_syst(),
    ) {
        let rw = reweighter();
        let jet = Jet::new(pt, eta, 0.0, btag, flavour);
        let class = FlavourClass::from_pdg(flavour);
        if !rw.supports(class, kind, dir) {
            prop_assert_eq!(rw.jet_weight(&jet, kind, dir), rw.nominal_jet_weight(&jet));
        }
    }
}

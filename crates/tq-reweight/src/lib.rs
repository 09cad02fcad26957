//! # tq-reweight
//!
//! Per-jet reweighting of the b-tagging discriminator shape.
//!
//! The weights follow the CSV shape-calibration recipe: for every jet a multiplicative scale
//! factor is read from a 1D histogram binned in the discriminator value, selected by the jet
//! flavour family and its (pt, |eta|) bin. Each table exists for the nominal configuration and
//! for every systematic variation that applies to the flavour family.
//!
//! ```no_run
//! use tq_core::{Jet, SystDirection, SystType};
//! use tq_reweight::CsvReweighter;
//!
//! let rw = CsvReweighter::from_dir("Reader/data").unwrap();
//! let jet = Jet::new(50.0, 1.0, 0.0, 0.85, 5);
//! let w = rw.jet_weight(&jet, SystType::BTagStatHF1, SystDirection::Up);
//! println!("per-jet weight: {w}");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod binning;
pub mod calibration;
pub mod flavour;
pub mod reweighter;

pub use calibration::{CalibrationSource, JsonCalibrationFile};
pub use flavour::FlavourClass;
pub use reweighter::CsvReweighter;

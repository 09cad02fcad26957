//! # tq-analysis
//!
//! Reusable pieces of the lepton+jets top-quark analysis built on `tq-reader`:
//! - four-vector kinematics (transverse W mass, neutrino reconstruction)
//! - event selection
//! - top-quark reconstruction from jet combinatorics
//! - the b-tagging systematic envelope of the event weight
//! - per-process-group histogram filling driven by a YAML configuration

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod envelope;
pub mod group;
pub mod kinematics;
pub mod selection;
pub mod top;

pub use config::{AnalysisConfig, ProcessGroup};
pub use envelope::{Envelope, btag_envelope};
pub use group::{GroupResult, run_all, run_group, save_results};
pub use kinematics::{LorentzVector, W_MASS, invariant_mass, neutrino_p4, transverse_mass};
pub use selection::{BTAG_MEDIUM, BTAG_TIGHT, SelectedEvent, SelectionConfig};
pub use top::{TopMasses, reconstruct_top};

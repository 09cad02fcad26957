//! # tq-core
//!
//! Core types shared by the tq crates.
//!
//! This crate provides:
//! - The error type used across the workspace
//! - The physics object model (`Candidate`, `Lepton`, `Jet`, `MissingEnergy`)
//! - The systematics taxonomy and its compact encoding
//! - A 1D histogram with ROOT bin-numbering conventions

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod histogram;
pub mod physics;
pub mod systematics;

pub use error::{Error, Result};
pub use histogram::Histogram;
pub use physics::{Candidate, Jet, Kinematics, Lepton, MissingEnergy, sort_by_pt_descending};
pub use systematics::{SystCode, SystDirection, SystType};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

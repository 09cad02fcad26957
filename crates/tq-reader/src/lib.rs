//! # tq-reader
//!
//! Sequential event reader over columnar n-tuples.
//!
//! A [`Reader`] walks through an ordered list of trees of an [`EventStore`], decodes the
//! per-event lepton, jet and missing-energy columns into `tq-core` physics objects, and provides
//! the event weight including per-jet CSV reweighting for the active systematic variation.
//!
//! ```no_run
//! use std::sync::Arc;
//! use tq_reader::{MemoryStore, Reader, SampleKind};
//! use tq_reweight::CsvReweighter;
//!
//! let store = Arc::new(MemoryStore::open("mujets.json").unwrap());
//! let rw = Arc::new(CsvReweighter::from_dir("calibration").unwrap());
//! let mut reader = Reader::builder(store)
//!     .trees(["TTJets"])
//!     .sample(SampleKind::Simulation)
//!     .reweighter(rw)
//!     .build()
//!     .unwrap();
//! while reader.read_next_event().unwrap() {
//!     println!("{} jets, weight {}", reader.jets().len(), reader.weight());
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod buffers;
pub mod layout;
pub mod reader;
pub mod store;

pub use layout::{ColumnLayout, MetColumns, ObjectColumns};
pub use reader::{Reader, ReaderBuilder, ReaderState, SampleKind};
pub use store::{Column, EventStore, EventTree, JaggedCol, MemoryStore, MemoryTree};

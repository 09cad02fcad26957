//! Error types for tq

use std::path::PathBuf;

use thiserror::Error;

/// tq error type
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// The event source does not exist or cannot be used.
    #[error("event source not available: {0}")]
    SourceNotFound(String),

    /// A named tree is missing from the event source.
    #[error("cannot find tree \"{tree}\" in \"{source_name}\"")]
    TreeNotFound {
        /// Requested tree name.
        tree: String,
        /// Name of the event source that was searched.
        source_name: String,
    },

    /// A named column is missing from a tree.
    #[error("cannot find column \"{column}\" in tree \"{tree}\"")]
    ColumnNotFound {
        /// Tree being bound.
        tree: String,
        /// Requested column name.
        column: String,
    },

    /// Column content does not match what the reader expects (shape, length, entry range).
    #[error("column \"{column}\" in tree \"{tree}\": {reason}")]
    ColumnMismatch {
        /// Tree being read.
        tree: String,
        /// Offending column.
        column: String,
        /// Human-readable description.
        reason: String,
    },

    /// A calibration file does not exist or is corrupted.
    #[error("calibration file \"{}\" does not exist or is corrupted: {reason}", path.display())]
    CalibrationFileNotFound {
        /// Path that was opened.
        path: PathBuf,
        /// Underlying failure.
        reason: String,
    },

    /// A calibration table required by the reweighting engine is missing.
    #[error(
        "cannot find histogram \"{name}\" for {flavour} jets, systematic variation #{code}, \
         pt bin #{pt_bin}, eta bin #{eta_bin}"
    )]
    CalibrationTableNotFound {
        /// Table name looked up in the calibration source.
        name: String,
        /// Flavour family ("b quark", "c quark", "light-flavour").
        flavour: String,
        /// Encoded systematic variation.
        code: u32,
        /// Transverse-momentum bin index.
        pt_bin: usize,
        /// Pseudorapidity bin index.
        eta_bin: usize,
    },

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_error_names_the_missing_resource() {
        let err = Error::CalibrationTableNotFound {
            name: "c_csv_ratio_Pt3_Eta0_final_cErr1Up".into(),
            flavour: "c quark".into(),
            code: 16,
            pt_bin: 3,
            eta_bin: 0,
        };
        let msg = err.to_string();
        assert!(msg.contains("c_csv_ratio_Pt3_Eta0_final_cErr1Up"));
        assert!(msg.contains("pt bin #3"));
        assert!(msg.contains("c quark"));
    }

    #[test]
    fn tree_error_names_tree_and_source() {
        let err = Error::TreeNotFound { tree: "TTJets".into(), source_name: "mujets.json".into() };
        assert_eq!(err.to_string(), "cannot find tree \"TTJets\" in \"mujets.json\"");
    }
}

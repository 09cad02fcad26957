//! Calibration data sources.
//!
//! A calibration source is a named collection of 1D histograms. The reweighter only needs
//! lookup by name, so any storage format can be plugged in through [`CalibrationSource`]. The
//! bundled format is a JSON document:
//!
//! ```text
//! { "histograms": { "csv_ratio_Pt0_Eta0_final": { "bin_edges": [...], "bin_content": [...] }, ... } }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tq_core::{Error, Histogram, Result};

/// File name of the heavy-flavour calibration inside a calibration directory.
pub const HF_FILE_NAME: &str = "csv_rwt_hf.json";

/// File name of the light-flavour calibration inside a calibration directory.
pub const LF_FILE_NAME: &str = "csv_rwt_lf.json";

/// A named collection of calibration histograms.
pub trait CalibrationSource {
    /// Human-readable location, used in error messages.
    fn location(&self) -> String;

    /// Look up a histogram by name.
    fn histogram(&self, name: &str) -> Option<&Histogram>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CalibrationDocument {
    histograms: BTreeMap<String, Histogram>,
}

/// Calibration histograms loaded from a JSON file.
#[derive(Debug, Clone)]
pub struct JsonCalibrationFile {
    path: PathBuf,
    histograms: BTreeMap<String, Histogram>,
}

impl JsonCalibrationFile {
    /// Open and parse a calibration file.
    ///
    /// A missing or unparsable file is reported as [`Error::CalibrationFileNotFound`].
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let bytes = std::fs::read(&path).map_err(|e| Error::CalibrationFileNotFound {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        let doc: CalibrationDocument = serde_json::from_slice(&bytes).map_err(|e| {
            Error::CalibrationFileNotFound { path: path.clone(), reason: e.to_string() }
        })?;

        let mut histograms = BTreeMap::new();
        for (name, mut h) in doc.histograms {
            if h.name.is_empty() {
                h.name = name.clone();
            }
            histograms.insert(name, h.prepared());
        }
        log::debug!("read {} calibration histograms from {}", histograms.len(), path.display());
        Ok(Self { path, histograms })
    }

    /// Build an in-memory calibration, e.g. for tests or conversions from other formats.
    pub fn from_histograms(
        path: impl Into<PathBuf>,
        histograms: impl IntoIterator<Item = Histogram>,
    ) -> Self {
        let histograms =
            histograms.into_iter().map(|h| (h.name.clone(), h.prepared())).collect();
        Self { path: path.into(), histograms }
    }

    /// Write the calibration to `path` in the JSON format read by [`JsonCalibrationFile::open`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let doc = CalibrationDocument { histograms: self.histograms.clone() };
        let text = serde_json::to_string(&doc)?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Number of histograms in the file.
    pub fn len(&self) -> usize {
        self.histograms.len()
    }

    /// Whether the file holds no histograms.
    pub fn is_empty(&self) -> bool {
        self.histograms.is_empty()
    }

    /// Names of all histograms, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.histograms.keys().map(String::as_str)
    }
}

impl CalibrationSource for JsonCalibrationFile {
    fn location(&self) -> String {
        self.path.display().to_string()
    }

    fn histogram(&self, name: &str) -> Option<&Histogram> {
        self.histograms.get(name)
    }
}

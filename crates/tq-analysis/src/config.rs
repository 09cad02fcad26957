//! Analysis configuration (YAML).
//!
//! ```yaml
//! calibration_dir: data/btag
//! selection:
//!   btag_working_point: 0.679
//! groups:
//!   - name: Data
//!     trees: [SingleMuRun2012A, SingleMuRun2012B]
//!     sample: Data
//!   - name: ttbar
//!     trees: [TTJets]
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tq_core::{Error, Result};
use tq_reader::{ColumnLayout, SampleKind};

use crate::selection::SelectionConfig;

/// Trees that are processed together under one name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessGroup {
    /// Group name; prefixes the names of the output histograms.
    pub name: String,
    /// Trees of the group, read in order.
    pub trees: Vec<String>,
    /// Sample kind of the trees.
    #[serde(default = "default_sample")]
    pub sample: SampleKind,
}

fn default_sample() -> SampleKind {
    SampleKind::Simulation
}

impl ProcessGroup {
    /// Create a group.
    pub fn new<I, S>(name: impl Into<String>, trees: I, sample: SampleKind) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { name: name.into(), trees: trees.into_iter().map(Into::into).collect(), sample }
    }
}

/// Complete analysis configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Directory with the CSV calibration files. Without it events are not reweighted.
    #[serde(default)]
    pub calibration_dir: Option<PathBuf>,
    /// Column names of the n-tuples.
    #[serde(default)]
    pub layout: ColumnLayout,
    /// Selection thresholds.
    #[serde(default)]
    pub selection: SelectionConfig,
    /// Process groups, processed in order.
    pub groups: Vec<ProcessGroup>,
}

impl AnalysisConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let config: Self = serde_yaml_ng::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML file.
    pub fn from_yaml_path(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        let config: Self = serde_yaml_ng::from_slice(&bytes)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that group names are unique and every group has trees.
    pub fn validate(&self) -> Result<()> {
        if self.groups.is_empty() {
            return Err(Error::Validation("analysis config defines no groups".into()));
        }
        let mut seen = HashSet::new();
        for g in &self.groups {
            if !seen.insert(g.name.as_str()) {
                return Err(Error::Validation(format!("duplicate group name: {}", g.name)));
            }
            if g.trees.is_empty() {
                return Err(Error::Validation(format!("group {} has no trees", g.name)));
            }
        }
        Ok(())
    }

    /// The process groups of the 2012 muon+jets n-tuples.
    pub fn mujets_2012_groups() -> Vec<ProcessGroup> {
        use SampleKind::{Data, Simulation};
        vec![
            ProcessGroup::new(
                "Data",
                ["SingleMuRun2012A", "SingleMuRun2012B", "SingleMuRun2012C", "SingleMuRun2012D"],
                Data,
            ),
            ProcessGroup::new("ttbar", ["TTJets"], Simulation),
            ProcessGroup::new(
                "SingleTop",
                ["T_t-channel", "Tbar_t-channel", "T_tW-channel", "Tbar_tW-channel"],
                Simulation,
            ),
            ProcessGroup::new(
                "Wjets",
                ["W1JetToLNu", "W2JetsToLNu", "W3JetsToLNu", "W4JetsToLNu"],
                Simulation,
            ),
            ProcessGroup::new("VV", ["WWJetsIncl", "WZJetsIncl", "ZZJetsIncl"], Simulation),
            ProcessGroup::new("DrellYan", ["DYJetsToLL_M-10To50", "DYJetsToLL_M-50"], Simulation),
            ProcessGroup::new(
                "QCD",
                [
                    "QCD_Pt-20to30_MuEnrichedPt5",
                    "QCD_Pt-30to50_MuEnrichedPt5",
                    "QCD_Pt-50to80_MuEnrichedPt5",
                    "QCD_Pt-80to120_MuEnrichedPt5",
                    "QCD_Pt-120to170_MuEnrichedPt5",
                    "QCD_Pt-170to300_MuEnrichedPt5",
                    "QCD_Pt-300to470_MuEnrichedPt5",
                ],
                Simulation,
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_yaml() {
        let cfg = AnalysisConfig::from_yaml_str(
            "groups:\n  - name: ttbar\n    trees: [TTJets]\n  - name: Data\n    trees: [Run]\n    sample: Data\n",
        )
        .unwrap();
        assert_eq!(cfg.groups.len(), 2);
        assert_eq!(cfg.groups[0].sample, SampleKind::Simulation);
        assert_eq!(cfg.groups[1].sample, SampleKind::Data);
        assert!(cfg.calibration_dir.is_none());
        assert_eq!(cfg.selection, SelectionConfig::default());
        assert_eq!(cfg.layout, ColumnLayout::default());
    }

    #[test]
    fn rejects_duplicates_and_empty_groups() {
        let dup = "groups:\n  - {name: a, trees: [X]}\n  - {name: a, trees: [Y]}\n";
        assert!(matches!(AnalysisConfig::from_yaml_str(dup), Err(Error::Validation(_))));
        let empty = "groups:\n  - {name: a, trees: []}\n";
        assert!(matches!(AnalysisConfig::from_yaml_str(empty), Err(Error::Validation(_))));
        assert!(matches!(AnalysisConfig::from_yaml_str("groups: []\n"), Err(Error::Validation(_))));
        assert!(matches!(AnalysisConfig::from_yaml_str("groups: 3\n"), Err(Error::Yaml(_))));
    }

    #[test]
    fn standard_groups_are_valid() {
        let cfg = AnalysisConfig {
            calibration_dir: None,
            layout: ColumnLayout::default(),
            selection: SelectionConfig::default(),
            groups: AnalysisConfig::mujets_2012_groups(),
        };
        cfg.validate().unwrap();
        assert_eq!(cfg.groups[0].sample, SampleKind::Data);
        assert_eq!(cfg.groups[6].trees.len(), 7);
    }
}

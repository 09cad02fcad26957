//! Lepton+jets event selection.

use serde::{Deserialize, Serialize};
use tq_core::{Jet, Kinematics, Lepton};

/// Medium working point of the CSV b-tagging discriminator.
pub const BTAG_MEDIUM: f64 = 0.679;
/// Tight working point of the CSV b-tagging discriminator.
pub const BTAG_TIGHT: f64 = 0.898;

/// Thresholds of the lepton+jets selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Minimal lepton pt, GeV.
    pub lepton_min_pt: f64,
    /// Maximal lepton |eta|.
    pub lepton_max_abs_eta: f64,
    /// Minimal pt of a good jet, GeV.
    pub jet_min_pt: f64,
    /// Good jets have |eta| below this value.
    pub jet_max_abs_eta: f64,
    /// Minimal number of good jets.
    pub min_good_jets: usize,
    /// Jets with a discriminator above this value are b-tagged.
    pub btag_working_point: f64,
    /// Number of b-tagged jets required for top-quark reconstruction.
    pub top_n_btags: usize,
    /// Minimal transverse W mass for top-quark reconstruction, GeV.
    pub top_min_mtw: f64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            lepton_min_pt: 26.0,
            lepton_max_abs_eta: 2.1,
            jet_min_pt: 30.0,
            jet_max_abs_eta: 2.4,
            min_good_jets: 4,
            btag_working_point: BTAG_MEDIUM,
            top_n_btags: 2,
            top_min_mtw: 50.0,
        }
    }
}

/// Objects of an event that passed the selection.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedEvent {
    /// The single selected lepton.
    pub lepton: Lepton,
    /// Good jets above the b-tagging working point, by descending pt.
    pub tagged: Vec<Jet>,
    /// Remaining good jets, by descending pt.
    pub untagged: Vec<Jet>,
}

impl SelectedEvent {
    /// Number of good jets.
    pub fn n_good_jets(&self) -> usize {
        self.tagged.len() + self.untagged.len()
    }
}

impl SelectionConfig {
    /// Apply the selection.
    ///
    /// `jets` must be sorted by descending pt: the scan stops at the first jet below the pt
    /// threshold.
    pub fn select(&self, leptons: &[Lepton], jets: &[Jet]) -> Option<SelectedEvent> {
        let [lepton] = leptons else {
            return None;
        };
        if lepton.pt() < self.lepton_min_pt || lepton.eta().abs() > self.lepton_max_abs_eta {
            return None;
        }

        let mut tagged = Vec::new();
        let mut untagged = Vec::new();
        for jet in jets {
            if jet.pt() < self.jet_min_pt {
                break;
            }
            if jet.eta().abs() >= self.jet_max_abs_eta {
                continue;
            }
            if jet.btag() > self.btag_working_point {
                tagged.push(*jet);
            } else {
                untagged.push(*jet);
            }
        }

        let event = SelectedEvent { lepton: *lepton, tagged, untagged };
        (event.n_good_jets() >= self.min_good_jets).then_some(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jets(specs: &[(f64, f64, f64)]) -> Vec<Jet> {
        specs.iter().map(|&(pt, eta, btag)| Jet::new(pt, eta, 0.0, btag, 0)).collect()
    }

    #[test]
    fn four_central_jets_pass() {
        let cfg = SelectionConfig::default();
        let mu = [Lepton::new(13, 30.0, 1.0, 0.0, 0.02)];
        let js = jets(&[(90.0, 0.1, 0.95), (70.0, 2.5, 0.1), (60.0, -1.0, 0.3), (45.0, 0.5, 0.7), (31.0, 1.2, 0.2)]);
        let ev = cfg.select(&mu, &js).unwrap();
        assert_eq!(ev.n_good_jets(), 4);
        assert_eq!(ev.tagged.len(), 2);
        assert_eq!(ev.untagged[0].pt(), 60.0);
    }

    #[test]
    fn scan_stops_at_first_soft_jet() {
        let cfg = SelectionConfig::default();
        let mu = [Lepton::new(13, 30.0, 1.0, 0.0, 0.02)];
        // unsorted input: the hard jet after the soft one is never looked at
        let js = jets(&[(90.0, 0.1, 0.1), (80.0, 0.1, 0.1), (70.0, 0.1, 0.1), (20.0, 0.1, 0.1), (60.0, 0.1, 0.1)]);
        assert!(cfg.select(&mu, &js).is_none());
    }

    #[test]
    fn lepton_requirements() {
        let cfg = SelectionConfig::default();
        let js = jets(&[(90.0, 0.1, 0.1); 4]);
        assert!(cfg.select(&[], &js).is_none());
        let two = [Lepton::new(13, 30.0, 0.0, 0.0, 0.0), Lepton::new(11, 28.0, 0.0, 0.0, 0.0)];
        assert!(cfg.select(&two, &js).is_none());
        assert!(cfg.select(&[Lepton::new(13, 25.0, 0.0, 0.0, 0.0)], &js).is_none());
        assert!(cfg.select(&[Lepton::new(13, 30.0, 2.2, 0.0, 0.0)], &js).is_none());
        assert!(cfg.select(&[Lepton::new(13, 26.0, 2.1, 0.0, 0.0)], &js).is_some());
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let cfg: SelectionConfig = serde_yaml_ng::from_str("btag_working_point: 0.898\n").unwrap();
        assert_eq!(cfg.btag_working_point, BTAG_TIGHT);
        assert_eq!(cfg.min_good_jets, 4);
    }
}

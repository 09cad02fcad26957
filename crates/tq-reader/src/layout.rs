//! Column names of the n-tuple layout.
//!
//! The defaults match the branch names written by the n-tuple producer. A store with different
//! names can be read by deserializing a custom [`ColumnLayout`] (any omitted field keeps its
//! default).

use serde::{Deserialize, Serialize};

/// Columns describing one collection of objects (leptons or jets).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectColumns {
    /// Scalar column with the number of objects in the event.
    pub count: String,
    /// Per-object transverse momentum.
    pub pt: String,
    /// Per-object pseudorapidity.
    pub eta: String,
    /// Per-object azimuthal angle.
    pub phi: String,
    /// Per-object isolation (leptons) or b-tagging discriminator (jets).
    pub discriminator: String,
    /// Per-object flavour code.
    pub flavour: String,
}

impl ObjectColumns {
    fn new(count: &str, prefix: &str, discriminator: &str) -> Self {
        Self {
            count: count.to_string(),
            pt: format!("{prefix}_pt"),
            eta: format!("{prefix}_eta"),
            phi: format!("{prefix}_phi"),
            discriminator: format!("{prefix}_{discriminator}"),
            flavour: format!("{prefix}_flav"),
        }
    }

    /// Every column name, count first.
    pub fn names(&self) -> [&str; 6] {
        [&self.count, &self.pt, &self.eta, &self.phi, &self.discriminator, &self.flavour]
    }
}

/// Columns of a missing-energy vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetColumns {
    /// Magnitude.
    pub pt: String,
    /// Azimuthal angle.
    pub phi: String,
}

impl MetColumns {
    fn new(prefix: &str) -> Self {
        Self { pt: format!("{prefix}_pt"), phi: format!("{prefix}_phi") }
    }
}

/// Complete mapping from event content to column names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnLayout {
    /// Leptons.
    pub leptons: ObjectColumns,
    /// Nominal jets.
    pub jets: ObjectColumns,
    /// Jets with the energy scale shifted up (simulation only).
    pub jets_jec_up: ObjectColumns,
    /// Jets with the energy scale shifted down (simulation only).
    pub jets_jec_down: ObjectColumns,
    /// Nominal missing energy.
    pub met: MetColumns,
    /// Missing energy recomputed with jets shifted up (simulation only).
    pub met_jec_up: MetColumns,
    /// Missing energy recomputed with jets shifted down (simulation only).
    pub met_jec_down: MetColumns,
    /// Raw event weight (simulation only). Its presence also identifies simulated trees.
    pub weight: String,
    /// Number of reconstructed primary vertices.
    pub num_pv: String,
}

impl Default for ColumnLayout {
    fn default() -> Self {
        Self {
            leptons: ObjectColumns::new("nlepton", "lept", "iso"),
            jets: ObjectColumns::new("njets", "jet", "btagdiscri"),
            jets_jec_up: ObjectColumns::new("jesup_njets", "jet_jesup", "btagdiscri"),
            jets_jec_down: ObjectColumns::new("jesdown_njets", "jet_jesdown", "btagdiscri"),
            met: MetColumns::new("met"),
            met_jec_up: MetColumns::new("met_jesup"),
            met_jec_down: MetColumns::new("met_jesdown"),
            weight: "evtweight".to_string(),
            num_pv: "nvertex".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_names() {
        let l = ColumnLayout::default();
        assert_eq!(
            l.leptons.names(),
            ["nlepton", "lept_pt", "lept_eta", "lept_phi", "lept_iso", "lept_flav"]
        );
        assert_eq!(l.jets.discriminator, "jet_btagdiscri");
        assert_eq!(l.jets_jec_up.count, "jesup_njets");
        assert_eq!(l.jets_jec_down.pt, "jet_jesdown_pt");
        assert_eq!(l.met_jec_down.phi, "met_jesdown_phi");
        assert_eq!(l.weight, "evtweight");
        assert_eq!(l.num_pv, "nvertex");
    }

    #[test]
    fn partial_override_keeps_defaults() {
        let l: ColumnLayout = serde_json::from_str(r#"{"weight": "genweight"}"#).unwrap();
        assert_eq!(l.weight, "genweight");
        assert_eq!(l.jets, ColumnLayout::default().jets);
    }
}

//! Histogram filling per process group.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tq_core::{Histogram, Result};
use tq_reader::{EventStore, Reader};
use tq_reweight::CsvReweighter;

use crate::config::{AnalysisConfig, ProcessGroup};
use crate::envelope::btag_envelope;
use crate::kinematics::{invariant_mass, transverse_mass};
use crate::top::reconstruct_top;

/// Histograms and counters of one process group.
#[derive(Debug, Clone)]
pub struct GroupResult {
    /// Group name.
    pub name: String,
    /// Events read from all trees of the group.
    pub events_read: u64,
    /// Events passing the lepton+jets selection.
    pub events_selected: u64,
    /// Events entering the top-quark histograms.
    pub events_reconstructed: u64,
    /// Transverse W mass of selected events.
    pub mtw: Histogram,
    /// Mass of the two leading jets of selected events.
    pub leading_dijet_mass: Histogram,
    /// Event yield weighted with the smallest b-tagging variation.
    pub yield_btag_min: Histogram,
    /// Event yield weighted with the largest b-tagging variation.
    pub yield_btag_max: Histogram,
    /// Hadronic top mass: nominal weight, smallest and largest b-tagging variation.
    pub top_hadronic: [Histogram; 3],
    /// Leptonic top mass: nominal weight, smallest and largest b-tagging variation.
    pub top_leptonic: [Histogram; 3],
}

fn histogram(
    name: String,
    title: &str,
    n_bins: usize,
    x_min: f64,
    x_max: f64,
) -> Result<Histogram> {
    let mut h = Histogram::uniform(name, n_bins, x_min, x_max)?;
    h.title = title.to_string();
    Ok(h)
}

fn variations(group: &str, stem: &str, what: &str) -> Result<[Histogram; 3]> {
    Ok([
        histogram(format!("{group}_{stem}"), &format!("Nominal {what}"), 300, 0.0, 600.0)?,
        histogram(format!("{group}_{stem}min"), &format!("Min {what}"), 300, 0.0, 600.0)?,
        histogram(format!("{group}_{stem}max"), &format!("Max {what}"), 300, 0.0, 600.0)?,
    ])
}

impl GroupResult {
    fn new(name: &str) -> Result<Self> {
        Ok(Self {
            name: name.to_string(),
            events_read: 0,
            events_selected: 0,
            events_reconstructed: 0,
            mtw: histogram(
                format!("{name}_MtW"),
                "Transverse W mass;M_{T}(W), GeV;Events",
                60,
                0.0,
                120.0,
            )?,
            leading_dijet_mass: histogram(
                format!("{name}_LeadingJetMass"),
                "Leading jet mass;M, GeV;Events",
                250,
                0.0,
                500.0,
            )?,
            yield_btag_min: histogram(
                format!("{name}_BtagSys_min"),
                "Number of events, b-tag min",
                1,
                0.0,
                1.0,
            )?,
            yield_btag_max: histogram(
                format!("{name}_BtagSys_max"),
                "Number of events, b-tag max",
                1,
                0.0,
                1.0,
            )?,
            top_hadronic: variations(name, "hTopMass1", "top mass, hadronic;M(top), GeV;Events")?,
            top_leptonic: variations(name, "hTopMass2", "top mass, leptonic;M(top), GeV;Events")?,
        })
    }

    /// Every histogram of the group.
    pub fn histograms(&self) -> impl Iterator<Item = &Histogram> {
        [&self.mtw, &self.leading_dijet_mass, &self.yield_btag_min, &self.yield_btag_max]
            .into_iter()
            .chain(self.top_hadronic.iter())
            .chain(self.top_leptonic.iter())
    }
}

/// Read every event of a group and fill its histograms.
pub fn run_group(
    store: Arc<dyn EventStore>,
    group: &ProcessGroup,
    reweighter: Option<Arc<CsvReweighter>>,
    config: &AnalysisConfig,
) -> Result<GroupResult> {
    log::info!("processing group \"{}\" ({} trees)", group.name, group.trees.len());

    let mut builder = Reader::builder(store)
        .trees(group.trees.iter().cloned())
        .sample(group.sample)
        .layout(config.layout.clone());
    if let Some(rw) = reweighter {
        builder = builder.reweighter(rw);
    }
    let mut reader = builder.build()?;
    let mut out = GroupResult::new(&group.name)?;
    let sel = &config.selection;

    while reader.read_next_event()? {
        out.events_read += 1;
        let Some(event) = sel.select(reader.leptons(), reader.jets()) else {
            continue;
        };
        out.events_selected += 1;

        let weight = reader.weight();
        let met = *reader.met();
        let mtw = transverse_mass(&event.lepton, &met);
        out.mtw.fill(mtw, weight);
        out.leading_dijet_mass.fill(invariant_mass(reader.jets().iter().take(2)), weight);

        if event.tagged.len() != sel.top_n_btags || mtw < sel.top_min_mtw {
            continue;
        }
        let env = btag_envelope(&mut reader);
        out.yield_btag_min.fill(0.0, env.min);
        out.yield_btag_max.fill(0.0, env.max);

        let Some(top) = reconstruct_top(&event.tagged, &event.untagged, &event.lepton, &met) else {
            continue;
        };
        out.events_reconstructed += 1;
        for (h, w) in out.top_hadronic.iter_mut().zip([env.nominal, env.min, env.max]) {
            h.fill(top.hadronic, w);
        }
        for (h, w) in out.top_leptonic.iter_mut().zip([env.nominal, env.min, env.max]) {
            h.fill(top.leptonic, w);
        }
    }

    log::info!(
        "group \"{}\": {} events read, {} selected, {} reconstructed",
        group.name,
        out.events_read,
        out.events_selected,
        out.events_reconstructed
    );
    Ok(out)
}

/// Run every group of the configuration over one store.
///
/// The calibration is loaded once from `calibration_dir` when configured and shared by all
/// groups.
pub fn run_all(store: Arc<dyn EventStore>, config: &AnalysisConfig) -> Result<Vec<GroupResult>> {
    config.validate()?;
    let reweighter = match &config.calibration_dir {
        Some(dir) => Some(Arc::new(CsvReweighter::from_dir(dir)?)),
        None => None,
    };
    config
        .groups
        .iter()
        .map(|g| run_group(Arc::clone(&store), g, reweighter.clone(), config))
        .collect()
}

#[derive(Serialize)]
struct HistogramDocument<'a> {
    histograms: BTreeMap<&'a str, &'a Histogram>,
}

/// Write the histograms of all groups as one JSON document keyed by histogram name.
pub fn save_results(path: impl AsRef<Path>, results: &[GroupResult]) -> Result<()> {
    let histograms = results
        .iter()
        .flat_map(GroupResult::histograms)
        .map(|h| (h.name.as_str(), h))
        .collect();
    let text = serde_json::to_string_pretty(&HistogramDocument { histograms })?;
    std::fs::write(path.as_ref(), text)?;
    log::info!("saved {} groups to {}", results.len(), path.as_ref().display());
    Ok(())
}

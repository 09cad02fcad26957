//! Sequential event reader.

use std::cell::Cell;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tq_core::{
    Error, Jet, Lepton, MissingEnergy, Result, SystDirection, SystType, sort_by_pt_descending,
};
use tq_reweight::CsvReweighter;

use crate::buffers::{MetBlock, ObjectBlock, bind_column};
use crate::layout::ColumnLayout;
use crate::store::{EventStore, EventTree};

/// Lifecycle state of a [`Reader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    /// More events may be available.
    Active,
    /// Every tree has been read; only [`Reader::rewind`] leaves this state.
    Exhausted,
}

/// Whether the trees hold simulated or recorded events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleKind {
    /// Simulated events: event weights, JEC-shifted collections and flavour information.
    Simulation,
    /// Recorded events. The event weight is always 1.
    Data,
    /// Decide per tree: simulation when the raw-weight column or a JEC-shifted collection
    /// exists.
    #[default]
    Auto,
}

impl fmt::Display for SampleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleKind::Simulation => f.write_str("simulation"),
            SampleKind::Data => f.write_str("data"),
            SampleKind::Auto => f.write_str("auto"),
        }
    }
}

/// Objects of the current event.
#[derive(Debug, Clone)]
struct Event {
    leptons: Vec<Lepton>,
    jets: Vec<Jet>,
    jets_jec_up: Vec<Jet>,
    jets_jec_down: Vec<Jet>,
    met: MissingEnergy,
    met_jec_up: MissingEnergy,
    met_jec_down: MissingEnergy,
    raw_weight: f64,
    num_pv: u32,
}

impl Default for Event {
    fn default() -> Self {
        Self {
            leptons: Vec::new(),
            jets: Vec::new(),
            jets_jec_up: Vec::new(),
            jets_jec_down: Vec::new(),
            met: MissingEnergy::default(),
            met_jec_up: MissingEnergy::default(),
            met_jec_down: MissingEnergy::default(),
            raw_weight: 1.0,
            num_pv: 0,
        }
    }
}

/// Column bindings of the tree being read.
struct BoundTree {
    tree: Arc<dyn EventTree>,
    is_mc: bool,
    leptons: ObjectBlock,
    jets: ObjectBlock,
    jets_jec_up: Option<ObjectBlock>,
    jets_jec_down: Option<ObjectBlock>,
    met: MetBlock,
    met_jec_up: Option<MetBlock>,
    met_jec_down: Option<MetBlock>,
    weight: Option<usize>,
    num_pv: Option<usize>,
}

impl BoundTree {
    fn bind(tree: Arc<dyn EventTree>, layout: &ColumnLayout, sample: SampleKind) -> Result<Self> {
        let t = &*tree;
        let is_mc = match sample {
            SampleKind::Simulation => true,
            SampleKind::Data => false,
            SampleKind::Auto => {
                let mc = [&layout.weight, &layout.jets_jec_up.count, &layout.met_jec_up.pt]
                    .into_iter()
                    .any(|col| t.column_index(col).is_some());
                if !mc {
                    log::warn!(
                        "tree \"{}\" has none of the simulation columns, reading it as data",
                        t.name()
                    );
                }
                mc
            }
        };

        let leptons = ObjectBlock::bind(t, &layout.leptons)?;
        let jets = ObjectBlock::bind(t, &layout.jets)?;
        let met = MetBlock::bind(t, &layout.met)?;
        let (jets_jec_up, jets_jec_down, met_jec_up, met_jec_down, weight, num_pv) = if is_mc {
            (
                Some(ObjectBlock::bind(t, &layout.jets_jec_up)?),
                Some(ObjectBlock::bind(t, &layout.jets_jec_down)?),
                Some(MetBlock::bind(t, &layout.met_jec_up)?),
                Some(MetBlock::bind(t, &layout.met_jec_down)?),
                Some(bind_column(t, &layout.weight)?),
                Some(bind_column(t, &layout.num_pv)?),
            )
        } else {
            // Older data n-tuples do not store the vertex count.
            (None, None, None, None, None, t.column_index(&layout.num_pv))
        };

        log::info!(
            "reading tree \"{}\": {} entries, {}",
            t.name(),
            t.entries(),
            if is_mc { SampleKind::Simulation } else { SampleKind::Data }
        );

        Ok(Self {
            tree,
            is_mc,
            leptons,
            jets,
            jets_jec_up,
            jets_jec_down,
            met,
            met_jec_up,
            met_jec_down,
            weight,
            num_pv,
        })
    }

    fn decode(&mut self, entry: u64, ev: &mut Event) -> Result<()> {
        let tree = &*self.tree;

        self.leptons.read(tree, entry)?;
        ev.leptons.clear();
        ev.leptons.extend(
            self.leptons
                .rows()
                .map(|r| Lepton::new(r.flavour, r.pt, r.eta, r.phi, r.discriminator)),
        );
        sort_by_pt_descending(&mut ev.leptons);

        decode_jets(&mut self.jets, tree, entry, &mut ev.jets)?;
        let (pt, phi) = self.met.read(tree, entry)?;
        ev.met.set(pt, phi);

        match &mut self.jets_jec_up {
            Some(block) => decode_jets(block, tree, entry, &mut ev.jets_jec_up)?,
            None => ev.jets_jec_up.clear(),
        }
        match &mut self.jets_jec_down {
            Some(block) => decode_jets(block, tree, entry, &mut ev.jets_jec_down)?,
            None => ev.jets_jec_down.clear(),
        }
        ev.met_jec_up = match &self.met_jec_up {
            Some(block) => decode_met(block, tree, entry)?,
            None => ev.met,
        };
        ev.met_jec_down = match &self.met_jec_down {
            Some(block) => decode_met(block, tree, entry)?,
            None => ev.met,
        };

        ev.raw_weight = match self.weight {
            Some(col) => tree.read_scalar(col, entry)?,
            None => 1.0,
        };
        ev.num_pv = match self.num_pv {
            Some(col) => tree.read_scalar(col, entry)?.max(0.0) as u32,
            None => 0,
        };
        Ok(())
    }
}

fn decode_jets(
    block: &mut ObjectBlock,
    tree: &dyn EventTree,
    entry: u64,
    out: &mut Vec<Jet>,
) -> Result<()> {
    block.read(tree, entry)?;
    out.clear();
    out.extend(block.rows().map(|r| Jet::new(r.pt, r.eta, r.phi, r.discriminator, r.flavour)));
    sort_by_pt_descending(out);
    Ok(())
}

fn decode_met(block: &MetBlock, tree: &dyn EventTree, entry: u64) -> Result<MissingEnergy> {
    let (pt, phi) = block.read(tree, entry)?;
    Ok(MissingEnergy::new(pt, phi))
}

/// Builder for [`Reader`].
pub struct ReaderBuilder {
    store: Arc<dyn EventStore>,
    trees: Vec<String>,
    sample: SampleKind,
    layout: ColumnLayout,
    reweighter: Option<Arc<CsvReweighter>>,
    btag_reweighting: bool,
}

impl ReaderBuilder {
    /// Trees to read, in order.
    pub fn trees<I, S>(mut self, trees: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.trees = trees.into_iter().map(Into::into).collect();
        self
    }

    /// Sample kind (default: [`SampleKind::Auto`]).
    pub fn sample(mut self, sample: SampleKind) -> Self {
        self.sample = sample;
        self
    }

    /// Column names (default: [`ColumnLayout::default`]).
    pub fn layout(mut self, layout: ColumnLayout) -> Self {
        self.layout = layout;
        self
    }

    /// CSV reweighter used for the event weight of simulated events.
    pub fn reweighter(mut self, reweighter: Arc<CsvReweighter>) -> Self {
        self.reweighter = Some(reweighter);
        self
    }

    /// Initial state of b-tag reweighting (default: enabled).
    pub fn btag_reweighting(mut self, on: bool) -> Self {
        self.btag_reweighting = on;
        self
    }

    /// Resolve every tree and bind the first one.
    pub fn build(self) -> Result<Reader> {
        if self.trees.is_empty() {
            return Err(Error::Validation("reader needs at least one tree".into()));
        }
        for name in &self.trees {
            self.store.tree(name)?;
        }
        let first = self.store.tree(&self.trees[0])?;
        let bound = BoundTree::bind(first, &self.layout, self.sample)?;

        Ok(Reader {
            store: self.store,
            trees: self.trees,
            sample: self.sample,
            layout: self.layout,
            reweighter: self.reweighter,
            btag_reweighting: self.btag_reweighting,
            tree_index: 0,
            entry: 0,
            bound,
            state: ReaderState::Active,
            event: Event::default(),
            scratch: Event::default(),
            syst: (SystType::Nominal, SystDirection::Up),
            weight: Cell::new(None),
        })
    }
}

/// Reads events from an ordered list of trees.
///
/// After construction the reader points at the first entry of the first tree. Each successful
/// [`read_next_event`](Reader::read_next_event) rebuilds the per-event collections, sorted by
/// descending pt. The systematic variation and the b-tag reweighting switch are session
/// properties: they persist across reads and rewinds.
///
/// The event weight is computed on first access and cached until the next read or any change
/// of the systematic selection.
pub struct Reader {
    store: Arc<dyn EventStore>,
    trees: Vec<String>,
    sample: SampleKind,
    layout: ColumnLayout,
    reweighter: Option<Arc<CsvReweighter>>,
    btag_reweighting: bool,
    tree_index: usize,
    entry: u64,
    bound: BoundTree,
    state: ReaderState,
    event: Event,
    scratch: Event,
    syst: (SystType, SystDirection),
    weight: Cell<Option<f64>>,
}

impl Reader {
    /// Start building a reader over `store`.
    pub fn builder(store: Arc<dyn EventStore>) -> ReaderBuilder {
        ReaderBuilder {
            store,
            trees: Vec::new(),
            sample: SampleKind::Auto,
            layout: ColumnLayout::default(),
            reweighter: None,
            btag_reweighting: true,
        }
    }

    /// Reader with the default layout, the sample kind detected per tree.
    pub fn new<I, S>(
        store: Arc<dyn EventStore>,
        trees: I,
        reweighter: Option<Arc<CsvReweighter>>,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut builder = Self::builder(store).trees(trees);
        builder.reweighter = reweighter;
        builder.build()
    }

    /// Decode the next event.
    ///
    /// Returns `Ok(false)` once every tree has been read. Empty trees are skipped. Errors come
    /// from binding a new tree (missing tree or column) or from malformed column content; the
    /// previous event stays current after an error.
    pub fn read_next_event(&mut self) -> Result<bool> {
        loop {
            if self.state == ReaderState::Exhausted {
                return Ok(false);
            }
            if self.entry < self.bound.tree.entries() {
                self.bound.decode(self.entry, &mut self.scratch)?;
                std::mem::swap(&mut self.event, &mut self.scratch);
                self.entry += 1;
                self.weight.set(None);
                return Ok(true);
            }
            if self.tree_index + 1 >= self.trees.len() {
                self.state = ReaderState::Exhausted;
                log::debug!("all {} trees read", self.trees.len());
                return Ok(false);
            }
            self.bind_tree(self.tree_index + 1)?;
        }
    }

    /// Go back to the first entry of the first tree.
    pub fn rewind(&mut self) -> Result<()> {
        self.bind_tree(0)?;
        self.state = ReaderState::Active;
        self.event = Event::default();
        self.weight.set(None);
        log::debug!("rewound to tree \"{}\"", self.trees[0]);
        Ok(())
    }

    fn bind_tree(&mut self, index: usize) -> Result<()> {
        let tree = self.store.tree(&self.trees[index])?;
        self.bound = BoundTree::bind(tree, &self.layout, self.sample)?;
        self.tree_index = index;
        self.entry = 0;
        Ok(())
    }

    /// Leptons of the current event, by descending pt.
    pub fn leptons(&self) -> &[Lepton] {
        &self.event.leptons
    }

    /// Jets of the current event for the active variation, by descending pt.
    ///
    /// The JEC systematic selects the shifted collection in simulation.
    pub fn jets(&self) -> &[Jet] {
        match self.jec_shift() {
            Some(SystDirection::Up) => &self.event.jets_jec_up,
            Some(SystDirection::Down) => &self.event.jets_jec_down,
            None => &self.event.jets,
        }
    }

    /// Missing energy of the current event for the active variation.
    pub fn met(&self) -> &MissingEnergy {
        match self.jec_shift() {
            Some(SystDirection::Up) => &self.event.met_jec_up,
            Some(SystDirection::Down) => &self.event.met_jec_down,
            None => &self.event.met,
        }
    }

    fn jec_shift(&self) -> Option<SystDirection> {
        (self.bound.is_mc && self.syst.0 == SystType::Jec).then_some(self.syst.1)
    }

    /// Weight stored in the tree (1 for data).
    pub fn raw_weight(&self) -> f64 {
        self.event.raw_weight
    }

    /// Number of reconstructed primary vertices (0 when not stored).
    pub fn num_pv(&self) -> u32 {
        self.event.num_pv
    }

    /// Total event weight: the raw weight times the CSV weight of every jet of the active
    /// collection. Jets with a zero factor are left out of the product.
    pub fn weight(&self) -> f64 {
        if let Some(w) = self.weight.get() {
            return w;
        }
        let w = self.compute_weight();
        self.weight.set(Some(w));
        w
    }

    fn compute_weight(&self) -> f64 {
        if !self.bound.is_mc {
            return 1.0;
        }
        let raw = self.event.raw_weight;
        let Some(rw) = self.reweighter.as_deref().filter(|_| self.btag_reweighting) else {
            return raw;
        };
        let (kind, direction) = self.syst;
        self.jets()
            .iter()
            .map(|jet| rw.jet_weight(jet, kind, direction))
            .filter(|&f| f != 0.0)
            .fold(raw, |acc, f| acc * f)
    }

    /// Select the systematic variation. Nominal ignores the direction.
    pub fn set_systematics(&mut self, kind: SystType, direction: SystDirection) {
        let direction = if kind == SystType::Nominal { SystDirection::Up } else { direction };
        self.syst = (kind, direction);
        self.weight.set(None);
    }

    /// Active systematic variation.
    pub fn systematics(&self) -> (SystType, SystDirection) {
        self.syst
    }

    /// Enable or disable CSV reweighting in [`weight`](Reader::weight).
    pub fn switch_btag_reweighting(&mut self, on: bool) {
        self.btag_reweighting = on;
        self.weight.set(None);
    }

    /// Whether CSV reweighting is enabled.
    pub fn btag_reweighting(&self) -> bool {
        self.btag_reweighting
    }

    /// Current state.
    pub fn state(&self) -> ReaderState {
        self.state
    }

    /// Name of the tree being read.
    pub fn current_tree(&self) -> &str {
        self.bound.tree.name()
    }

    /// Index of the next entry to read in the current tree.
    pub fn current_entry(&self) -> u64 {
        self.entry
    }

    /// Whether the current tree holds simulated events.
    pub fn is_mc(&self) -> bool {
        self.bound.is_mc
    }

    /// Configured sample kind.
    pub fn sample(&self) -> SampleKind {
        self.sample
    }

    /// Trees read by this reader, in order.
    pub fn trees(&self) -> &[String] {
        &self.trees
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Column, JaggedCol, MemoryStore, MemoryTree};
    use tq_core::Kinematics;

    fn data_tree(name: &str, met: Vec<f64>) -> MemoryTree {
        let n = met.len();
        let empty = || Column::Jagged(JaggedCol::from_rows(vec![Vec::new(); n]));
        let mut cols = vec![
            ("nlepton".to_string(), Column::Scalar(vec![0.0; n])),
            ("njets".to_string(), Column::Scalar(vec![0.0; n])),
            ("met_pt".to_string(), Column::Scalar(met)),
            ("met_phi".to_string(), Column::Scalar(vec![0.0; n])),
        ];
        for prefix in ["lept", "jet"] {
            let disc = if prefix == "lept" { "iso" } else { "btagdiscri" };
            for field in ["pt", "eta", "phi", disc, "flav"] {
                cols.push((format!("{prefix}_{field}"), empty()));
            }
        }
        MemoryTree::from_columns(name, cols).unwrap()
    }

    #[test]
    fn empty_tree_list_is_rejected() {
        let store = Arc::new(MemoryStore::new("s"));
        assert!(matches!(Reader::builder(store).build(), Err(Error::Validation(_))));
    }

    #[test]
    fn data_without_vertex_count() {
        let store = Arc::new(MemoryStore::new("s").with_tree(data_tree("Data", vec![12.0])));
        let mut r = Reader::new(store, ["Data"], None).unwrap();
        assert!(!r.is_mc());
        assert!(r.read_next_event().unwrap());
        assert_eq!(r.met().pt(), 12.0);
        assert_eq!(r.num_pv(), 0);
        assert_eq!(r.raw_weight(), 1.0);
        assert_eq!(r.weight(), 1.0);
        r.set_systematics(SystType::Jec, SystDirection::Up);
        assert_eq!(r.met().pt(), 12.0);
        assert!(!r.read_next_event().unwrap());
        assert_eq!(r.state(), ReaderState::Exhausted);
        assert!(!r.read_next_event().unwrap());
    }

    #[test]
    fn nominal_ignores_direction() {
        let store = Arc::new(MemoryStore::new("s").with_tree(data_tree("Data", vec![1.0])));
        let mut r = Reader::new(store, ["Data"], None).unwrap();
        r.set_systematics(SystType::Nominal, SystDirection::Down);
        assert_eq!(r.systematics(), (SystType::Nominal, SystDirection::Up));
    }
}
